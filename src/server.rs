//! Server assembly: configuration, pose feed, and the top-level bridge
//!
//! [`RigidBodyBridge`] wires one mocap source, one shared session state, the
//! command dispatcher, and one transport variant into a running server. The
//! pose side is pulled, not pushed: a [`PoseFeed`] performs one adapter tick
//! per call and hands the resolved pose back so a presentation layer can
//! apply it to a renderable. Deployments without a render loop can let the
//! feed drive itself on a tokio interval.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::CommandDispatcher;
use crate::error::Result;
use crate::io::{TcpCommandServer, UdpCommandEndpoint};
use crate::session::SharedState;
use crate::source::{MocapSource, Pose};

/// Which transport variant carries the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Multi-client broadcast server
    Tcp,
    /// Receive-only endpoint (no reply path)
    Udp,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local address to bind
    pub bind_addr: String,
    pub transport: TransportKind,
    /// Wait after an asset switch before the next pose read, giving the
    /// capture feed time to report the newly selected asset
    pub settle_delay: Duration,
    /// Request latency compensation from the capture source
    pub network_compensation: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:8888".into(),
            transport: TransportKind::Tcp,
            settle_delay: Duration::from_millis(100),
            network_compensation: true,
        }
    }
}

/// One pose-source adapter tick per call
///
/// Pulls the latest pose and definition for the active asset, overwrites the
/// session's asset state, appends to the tracking buffer while a session is
/// active, and returns the pose for the caller's own use (typically applying
/// it to a rendered object). Runs concurrently with command handlers; the
/// session guard is the only synchronization.
#[derive(Clone)]
pub struct PoseFeed {
    state: SharedState,
    source: Arc<dyn MocapSource>,
    network_compensation: bool,
}

impl PoseFeed {
    pub fn new(state: SharedState, source: Arc<dyn MocapSource>, network_compensation: bool) -> Self {
        PoseFeed {
            state,
            source,
            network_compensation,
        }
    }

    /// Refresh the session from the source; `None` while the source has
    /// nothing for the active asset
    pub fn tick(&self) -> Option<Pose> {
        let mut state = self.state.lock();
        let pose = self
            .source
            .latest_rigid_body_state(state.asset_id, self.network_compensation)?;
        state.latest_pose = Some(pose);
        if let Some(definition) = self.source.rigid_body_definition(state.asset_id) {
            state.rigid_body = Some(definition);
        }
        state.tracking.append(pose);
        Some(pose)
    }

    /// Drive the tick from a tokio interval until the handle is stopped
    pub fn spawn_periodic(self, period: Duration) -> FeedHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        self.tick();
                    }
                }
            }
            debug!("pose feed stopped");
        });
        FeedHandle { shutdown, handle }
    }
}

/// Handle to a periodically driven [`PoseFeed`]
pub struct FeedHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FeedHandle {
    /// Stop the feed task and wait for it to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "pose feed task failed");
        }
    }
}

enum ActiveTransport {
    Tcp(TcpCommandServer),
    Udp(UdpCommandEndpoint),
}

/// The assembled command server for one tracked asset stream
pub struct RigidBodyBridge {
    config: ServerConfig,
    state: SharedState,
    source: Arc<dyn MocapSource>,
    dispatcher: Arc<CommandDispatcher>,
    transport: Option<ActiveTransport>,
}

impl RigidBodyBridge {
    /// Assemble a bridge for `asset_id`, registering it with the source
    pub fn new(config: ServerConfig, source: Arc<dyn MocapSource>, asset_id: i32) -> Self {
        source.register_rigid_body(asset_id);
        let state = SharedState::new(asset_id);
        let dispatcher = Arc::new(CommandDispatcher::new(
            state.clone(),
            Arc::clone(&source),
            config.settle_delay,
            config.network_compensation,
        ));
        RigidBodyBridge {
            config,
            state,
            source,
            dispatcher,
            transport: None,
        }
    }

    /// Bind the configured transport and begin serving
    pub async fn start(&mut self) -> Result<()> {
        match self.config.transport {
            TransportKind::Tcp => {
                let server = TcpCommandServer::bind(&self.config.bind_addr).await?;
                server.start(Arc::clone(&self.dispatcher)).await;
                info!(addr = %server.local_addr(), "serving commands over TCP");
                self.transport = Some(ActiveTransport::Tcp(server));
            }
            TransportKind::Udp => {
                let endpoint = UdpCommandEndpoint::bind(&self.config.bind_addr).await?;
                endpoint.start(Arc::clone(&self.dispatcher)).await;
                info!(addr = %endpoint.local_addr(), "receiving commands over UDP");
                self.transport = Some(ActiveTransport::Udp(endpoint));
            }
        }
        Ok(())
    }

    /// Stop the transport; in-flight handlers finish normally
    pub async fn stop(&self) {
        match &self.transport {
            Some(ActiveTransport::Tcp(server)) => server.stop().await,
            Some(ActiveTransport::Udp(endpoint)) => endpoint.stop().await,
            None => {}
        }
    }

    /// Address the transport is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.transport {
            Some(ActiveTransport::Tcp(server)) => Some(server.local_addr()),
            Some(ActiveTransport::Udp(endpoint)) => Some(endpoint.local_addr()),
            None => None,
        }
    }

    /// Pose-side handle for the presentation loop
    pub fn feed(&self) -> PoseFeed {
        PoseFeed::new(
            self.state.clone(),
            Arc::clone(&self.source),
            self.config.network_compensation,
        )
    }

    /// The guarded session state (shared with the dispatcher and feed)
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}
