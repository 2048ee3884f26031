//! Motion-Capture Rigid-Body Command Server
//!
//! This library exposes a live motion-capture rigid-body stream to external
//! clients (MATLAB analysis tools and similar) over a small line-oriented
//! socket protocol. An upstream capture feed continuously produces 6-DoF
//! pose updates and marker positions for tracked assets; remote clients can
//! query the latest pose, calibrate a custom origin, test whether the
//! current pose sits inside a tolerance window of that origin, and record a
//! tracking session for later range evaluation.
//!
//! # Wire Protocol
//!
//! Messages are newline-free single-byte text of the form
//! `COMMAND#PAYLOAD`; command names are case-insensitive. Replies are
//! ASCII decimals, `"1"`/`"0"` flags, or JSON.
//!
//! | Command | Payload | Reply |
//! |---------|---------|-------|
//! | `echosocket` | - | literal `connected` |
//! | `serverdescription` | - | capture-host description (JSON) |
//! | `enableasset` / `disableasset` | asset name | `1` |
//! | `resetorigin` | asset id (`0` clears calibration) | `1` |
//! | `getposition` | `id$RigidBody` or `id$Markers` | JSON transform / marker list |
//! | `setrange` | JSON tolerance window | `1` |
//! | `checkrange` | - | `1` / `0` |
//! | `getrange` | - | JSON tolerance echo |
//! | `starttracking` / `endtracking` | - | buffered sample count |
//! | `checktracking` | - | out-of-range sample count |
//! | `getallmarkers` | - | JSON list of unlabeled markers |
//!
//! Commands that fail a configuration precondition (range check before
//! `setrange`, for example) are answered with `ERROR#<detail>`. Unrecognized
//! commands are silently ignored; deployed clients depend on that.
//!
//! # Transports
//!
//! Two variants carry the protocol:
//!
//! - **TCP** ([`io::TcpCommandServer`]) accepts any number of concurrent
//!   clients; replies are delivered through a broadcast-to-all primitive,
//!   so every connected client observes every reply.
//! - **UDP** ([`io::UdpCommandEndpoint`]) receives commands but has no
//!   reply path; its send primitive is a documented no-op.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mocaplink_rust::server::{RigidBodyBridge, ServerConfig};
//! use mocaplink_rust::source::MocapSource;
//!
//! # fn capture_client() -> Arc<dyn MocapSource> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> mocaplink_rust::Result<()> {
//!     let source: Arc<dyn MocapSource> = capture_client();
//!
//!     let mut bridge = RigidBodyBridge::new(ServerConfig::default(), source, 1);
//!     bridge.start().await?;
//!
//!     // Either call feed().tick() from a render loop, or let it self-drive:
//!     let feed = bridge.feed().spawn_periodic(Duration::from_millis(16));
//!
//!     tokio::signal::ctrl_c().await?;
//!     feed.stop().await;
//!     bridge.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **`protocol`** - message codec (`COMMAND#PAYLOAD` split, reply
//!   encoding), the closed command set, and the wire DTOs with their exact
//!   client-facing field names
//! - **`session`** - the guarded mutable model: active asset, latest pose,
//!   calibration origin, tolerance window, tracking buffer
//! - **`dispatch`** - the command state machine mapping commands to
//!   handlers over the session state
//! - **`io`** - the TCP and UDP transports
//! - **`source`** - the collaborator contract onto the external capture
//!   system
//! - **`server`** - configuration and assembly, plus the pose-feed tick
//!
//! # Concurrency
//!
//! Command handlers run on their connection's receive task, concurrently
//! with other clients and with the pose-feed tick. All shared state sits
//! behind a single mutex ([`session::SharedState`]); handlers compute their
//! reply inside the critical section and write to the socket only after
//! releasing it. Switching the active asset waits out a settle delay so the
//! capture feed can start reporting the new asset; that wait blocks only
//! the requesting handler, never the feed or other clients.

pub mod dispatch;
pub mod error;
pub mod io;
pub mod math;
pub mod protocol;
pub mod server;
pub mod session;
pub mod source;

// Re-export commonly used types
pub use error::{LinkError, Result};
pub use server::{PoseFeed, RigidBodyBridge, ServerConfig, TransportKind};
pub use source::{MocapSource, Pose};
