//! Receive-only UDP command endpoint
//!
//! Binds one socket and treats each inbound datagram as one complete
//! message. The reply path is intentionally not implemented: clients on UDP
//! can push commands but receive nothing back, an asymmetry deployed
//! clients already account for when choosing their transport. Replies the
//! dispatcher produces are therefore dropped here, not sent.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, trace, warn};

use crate::dispatch::CommandDispatcher;
use crate::error::Result;

/// Largest accepted datagram; commands are far smaller in practice
const MAX_DATAGRAM_SIZE: usize = 4096;

struct Inner {
    socket: Mutex<Option<UdpSocket>>,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

/// UDP transport: one socket, receive-only
///
/// Cheap to clone; all clones drive the same socket.
#[derive(Clone)]
pub struct UdpCommandEndpoint {
    inner: Arc<Inner>,
}

impl UdpCommandEndpoint {
    /// Bind to a local address
    ///
    /// # Errors
    ///
    /// - [`LinkError::Io`](crate::error::LinkError::Io) - port in use,
    ///   permission denied
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mocaplink_rust::io::UdpCommandEndpoint;
    ///
    /// #[tokio::main]
    /// async fn main() -> mocaplink_rust::Result<()> {
    ///     let endpoint = UdpCommandEndpoint::bind("0.0.0.0:8888").await?;
    ///     println!("receiving on {}", endpoint.local_addr());
    ///     Ok(())
    /// }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!(%local_addr, "UDP command endpoint listening");
        let (shutdown, _) = watch::channel(false);
        Ok(UdpCommandEndpoint {
            inner: Arc::new(Inner {
                socket: Mutex::new(Some(socket)),
                local_addr,
                shutdown,
            }),
        })
    }

    /// Address this endpoint is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Begin receiving datagrams on a background task
    ///
    /// Each datagram is dispatched from the receive task; any reply is
    /// handed to [`UdpCommandEndpoint::send_immediate_to_all`], which drops
    /// it. Receive errors are logged and the loop continues.
    pub async fn start(&self, dispatcher: Arc<CommandDispatcher>) {
        let socket = match self.inner.socket.lock().await.take() {
            Some(socket) => socket,
            None => {
                warn!("start called twice; receive loop already running");
                return;
            }
        };

        let endpoint = self.clone();
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((n, peer)) => {
                            trace!(%peer, bytes = n, "datagram received");
                            if let Some(reply) = dispatcher.handle_message(&buf[..n]).await {
                                endpoint.send_immediate_to_all(reply);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "receive failed");
                        }
                    },
                }
            }
            debug!("receive loop stopped");
        });
    }

    /// Stop receiving and release the port
    pub async fn stop(&self) {
        let _ = self.inner.shutdown.send(true);
        info!("UDP command endpoint stopped");
    }

    /// Reply delivery, a known no-op on this transport
    ///
    /// UDP peers are not tracked, so there is nobody to deliver to. Kept as
    /// the counterpart of the TCP broadcast so the dispatcher's reply flow
    /// is identical on both transports.
    pub fn send_immediate_to_all(&self, _data: Bytes) {
        trace!("reply dropped: UDP transport has no send path");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SharedState;
    use crate::source::stub::ScriptedSource;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    async fn started_endpoint() -> (UdpCommandEndpoint, SharedState) {
        let state = SharedState::new(1);
        let dispatcher = Arc::new(CommandDispatcher::new(
            state.clone(),
            Arc::new(ScriptedSource::new()),
            Duration::ZERO,
            true,
        ));
        let endpoint = UdpCommandEndpoint::bind("127.0.0.1:0").await.unwrap();
        endpoint.start(dispatcher).await;
        (endpoint, state)
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let endpoint = UdpCommandEndpoint::bind("127.0.0.1:0").await;
        assert_ok!(&endpoint);
    }

    #[tokio::test]
    async fn test_datagram_commands_mutate_state() {
        let (endpoint, state) = started_endpoint().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(b"starttracking#", endpoint.local_addr())
            .await
            .unwrap();

        timeout(Duration::from_secs(2), async {
            while !state.lock().tracking.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("datagram was never dispatched");
    }

    #[tokio::test]
    async fn test_no_reply_is_sent() {
        let (endpoint, _state) = started_endpoint().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(b"echosocket#", endpoint.local_addr())
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let reply = timeout(Duration::from_millis(200), client.recv_from(&mut buf)).await;
        assert!(reply.is_err(), "UDP endpoint unexpectedly replied");
    }

    #[tokio::test]
    async fn test_stop_ends_receive_loop() {
        let (endpoint, state) = started_endpoint().await;
        endpoint.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // after stop, datagrams go nowhere
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(b"starttracking#", endpoint.local_addr())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!state.lock().tracking.is_active());
    }
}
