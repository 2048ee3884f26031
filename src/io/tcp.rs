//! Multi-client TCP command server
//!
//! Accepts unboundedly many concurrent connections, runs one receive loop
//! per client, and answers through a broadcast-to-all primitive: every reply
//! is written to every live connection, and a peer that fails to accept a
//! write is pruned without disturbing the rest. Inbound traffic is never
//! relayed between clients.
//!
//! Framing is inherited from the wire protocol: messages are newline-free
//! and clients issue one command per write, so each successful read is
//! treated as one complete message.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::dispatch::CommandDispatcher;
use crate::error::Result;

/// Unique identifier for each connected client
pub type ClientId = u64;

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
struct ClientHandle {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Bytes>,
}

struct Inner {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    clients: RwLock<HashMap<ClientId, ClientHandle>>,
    next_client_id: AtomicU64,
    shutdown: watch::Sender<bool>,
}

/// TCP transport: listener plus registry of live client connections
///
/// Cheap to clone; all clones drive the same listener and registry.
/// `start` begins accepting on a background task and returns immediately;
/// `stop` ends the accept loop (releasing the bound port), unblocks every
/// pending read, and lets in-flight handlers finish.
#[derive(Clone)]
pub struct TcpCommandServer {
    inner: Arc<Inner>,
}

impl TcpCommandServer {
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
    /// use mocaplink_rust::io::TcpCommandServer;
    ///
    /// #[tokio::main]
    /// async fn main() -> mocaplink_rust::Result<()> {
    ///     let server = TcpCommandServer::bind("0.0.0.0:8888").await?;
    ///     println!("listening on {}", server.local_addr());
    ///     Ok(())
    /// }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "TCP command server listening");
        let (shutdown, _) = watch::channel(false);
        Ok(TcpCommandServer {
            inner: Arc::new(Inner {
                listener: Mutex::new(Some(listener)),
                local_addr,
                clients: RwLock::new(HashMap::new()),
                next_client_id: AtomicU64::new(1),
                shutdown,
            }),
        })
    }

    /// Address this server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Number of currently connected clients
    pub async fn client_count(&self) -> usize {
        self.inner.clients.read().await.len()
    }

    /// Begin accepting clients on a background task
    ///
    /// Each accepted connection gets its own receive loop; replies produced
    /// by the dispatcher are delivered with [`TcpCommandServer::broadcast`].
    /// Calling `start` a second time without an intervening bind is a no-op.
    pub async fn start(&self, dispatcher: Arc<CommandDispatcher>) {
        let listener = match self.inner.listener.lock().await.take() {
            Some(listener) => listener,
            None => {
                warn!("start called twice; accept loop already running");
                return;
            }
        };

        let server = self.clone();
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((socket, addr)) => {
                            server.register_client(socket, addr, Arc::clone(&dispatcher)).await;
                        }
                        Err(e) => {
                            // Transient accept failures must not stop service.
                            warn!(error = %e, "accept failed");
                        }
                    },
                }
            }
            debug!("accept loop stopped");
        });
    }

    /// Stop accepting, disconnect all clients, release the port
    pub async fn stop(&self) {
        let _ = self.inner.shutdown.send(true);
        let disconnected = {
            let mut clients = self.inner.clients.write().await;
            let count = clients.len();
            clients.clear();
            count
        };
        info!(disconnected, "TCP command server stopped");
    }

    /// Write `data` to every live connection
    ///
    /// A peer whose channel is gone is dropped from the registry; the
    /// broadcast itself never fails.
    pub async fn broadcast(&self, data: Bytes) {
        let mut dead = Vec::new();
        {
            let clients = self.inner.clients.read().await;
            for (id, handle) in clients.iter() {
                if handle.tx.send(data.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            if let Some(handle) = self.inner.clients.write().await.remove(&id) {
                warn!(client_id = id, addr = %handle.addr, "dropping unreachable client");
            }
        }
    }

    async fn register_client(
        &self,
        socket: TcpStream,
        addr: SocketAddr,
        dispatcher: Arc<CommandDispatcher>,
    ) {
        let client_id = self.inner.next_client_id.fetch_add(1, Ordering::SeqCst);
        info!(client_id, %addr, "client connected");

        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        self.inner
            .clients
            .write()
            .await
            .insert(client_id, ClientHandle { addr, tx });

        let (mut reader, mut writer) = socket.into_split();

        // Writer task: drains this client's share of broadcasts.
        tokio::spawn(async move {
            while let Some(data) = rx.recv().await {
                if writer.write_all(&data).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        // Reader task: one read is one message; handlers run right here.
        let server = self.clone();
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    read = reader.read(&mut buf) => match read {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Some(reply) = dispatcher.handle_message(&buf[..n]).await {
                                server.broadcast(reply).await;
                            }
                        }
                        Err(e) => {
                            warn!(client_id, error = %e, "read failed");
                            break;
                        }
                    },
                }
            }
            server.inner.clients.write().await.remove(&client_id);
            info!(client_id, "client disconnected");
        });
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

    async fn started_server() -> (TcpCommandServer, SharedState) {
        let state = SharedState::new(1);
        let dispatcher = Arc::new(CommandDispatcher::new(
            state.clone(),
            Arc::new(ScriptedSource::new()),
            Duration::ZERO,
            true,
        ));
        let server = TcpCommandServer::bind("127.0.0.1:0").await.unwrap();
        server.start(dispatcher).await;
        (server, state)
    }

    async fn read_reply(stream: &mut TcpStream) -> String {
        let mut buf = vec![0u8; 1024];
        let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .expect("reply timed out")
            .unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let server = TcpCommandServer::bind("127.0.0.1:0").await;
        assert_ok!(&server);
        assert!(server.unwrap().local_addr().port() > 0);
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let (server, _state) = started_server().await;
        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();

        client.write_all(b"echosocket#").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "connected");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_but_requests_do_not() {
        let (server, _state) = started_server().await;
        let mut sender = TcpStream::connect(server.local_addr()).await.unwrap();
        let mut observer = TcpStream::connect(server.local_addr()).await.unwrap();

        // Let both register before dispatching.
        timeout(Duration::from_secs(2), async {
            while server.client_count().await < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        // Malformed message: no reply, and nothing is relayed to the observer.
        sender.write_all(b"garbage-without-delimiter").await.unwrap();
        let mut buf = [0u8; 64];
        let relayed = timeout(Duration::from_millis(200), observer.read(&mut buf)).await;
        assert!(relayed.is_err(), "observer unexpectedly received data");

        // A handled command is answered through the broadcast primitive:
        // both the sender and the observer see the reply.
        sender.write_all(b"echosocket#").await.unwrap();
        assert_eq!(read_reply(&mut sender).await, "connected");
        assert_eq!(read_reply(&mut observer).await, "connected");
    }

    #[tokio::test]
    async fn test_disconnect_prunes_registry() {
        let (server, _state) = started_server().await;
        let client = TcpStream::connect(server.local_addr()).await.unwrap();
        timeout(Duration::from_secs(2), async {
            while server.client_count().await < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        drop(client);
        timeout(Duration::from_secs(2), async {
            while server.client_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_stop_disconnects_and_is_idempotent() {
        let (server, _state) = started_server().await;
        let _client = TcpStream::connect(server.local_addr()).await.unwrap();

        server.stop().await;
        assert_eq!(server.client_count().await, 0);
        // second stop is harmless
        server.stop().await;
    }

    #[tokio::test]
    async fn test_state_mutations_visible_across_connections() {
        let (server, state) = started_server().await;
        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();

        client.write_all(b"starttracking#").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "0");
        assert!(state.lock().tracking.is_active());
    }
}
