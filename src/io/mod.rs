//! Network I/O layer
//!
//! Two transport variants carry the same command protocol: a multi-client
//! broadcast TCP server and a receive-only UDP endpoint.

pub mod tcp;
pub mod udp;

pub use tcp::{ClientId, TcpCommandServer};
pub use udp::UdpCommandEndpoint;
