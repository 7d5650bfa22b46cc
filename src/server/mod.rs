//! Server lifecycle (component K): bind, accept loop, graceful shutdown.
//!
//! The accept loop is generic over the connection handler so the same
//! lifecycle code serves both the composed HTTP handler ([`connection::serve`])
//! and a raw socket handler (tests, and the plaintext-to-TLS [`redirect`]).

pub mod connection;
pub mod redirect;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

/// How long [`Server::close`] waits for in-flight connection tasks to finish
/// after the accept loop stops, before abandoning them. `SO_REUSEADDR` makes
/// the immediate rebind safe regardless; this only bounds shutdown latency.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept loop task panicked")]
    AcceptLoopPanicked,
}

/// A running server: bound, accepting connections, dispatching each one to
/// the handler supplied to [`Server::start`].
pub struct Server {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<()>,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Binds `addr` with a reuse-address socket option set before bind (so a
    /// closed server's port can be immediately rebound without relying on
    /// the host OS granting it), spawns the accept loop, and submits each
    /// accepted socket to `handler` via `tokio::spawn`.
    pub async fn start<H, F>(addr: &str, handler: H) -> Result<Self, ServerError>
    where
        H: Fn(TcpStream, SocketAddr) -> F + Send + Sync + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let socket_addr: SocketAddr = addr.parse().map_err(|_| ServerError::Bind {
            addr: addr.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let socket = if socket_addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(socket_addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let listener = socket.listen(1024)?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        let handler = Arc::new(handler);
        let tasks = Arc::new(Mutex::new(JoinSet::new()));

        info!(address = %local_addr, "minum listening");

        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer_addr)) => {
                                debug!(peer = %peer_addr, "connection accepted");
                                let handler = Arc::clone(&handler);
                                let mut guard = tasks.lock().await;
                                guard.spawn(async move { handler(stream, peer_addr).await; });
                            }
                            Err(e) => {
                                error!(error = %e, "failed to accept connection");
                            }
                        }
                    }
                }
            }

            let mut guard = tasks.lock().await;
            let grace = tokio::time::sleep(SHUTDOWN_GRACE);
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    _ = &mut grace => {
                        debug!("shutdown grace period elapsed with tasks still in flight");
                        break;
                    }
                    next = guard.join_next() => {
                        if next.is_none() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            local_addr,
            shutdown_tx,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Interrupts the accept loop, awaits in-flight handlers for a short
    /// grace period, and releases the port.
    pub async fn close(self) -> Result<(), ServerError> {
        let _ = self.shutdown_tx.send(());
        self.accept_task.await.map_err(|_| ServerError::AcceptLoopPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn start_and_close_releases_the_port() {
        let server = Server::start("127.0.0.1:0", |_stream, _peer| async {}).await.unwrap();
        let addr = server.local_addr();
        server.close().await.unwrap();

        // SO_REUSEADDR makes an immediate rebind to the same port safe.
        let rebound = TcpSocket::new_v4().unwrap();
        rebound.set_reuseaddr(true).unwrap();
        rebound.bind(addr).unwrap();
        let _listener = rebound.listen(16).unwrap();
    }

    #[tokio::test]
    async fn dispatches_accepted_connections_to_handler() {
        let server = Server::start("127.0.0.1:0", |mut stream: TcpStream, _peer| async move {
            let mut buf = [0u8; 5];
            if stream.read_exact(&mut buf).await.is_ok() {
                let _ = stream.write_all(b"pong").await;
            }
        })
        .await
        .unwrap();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"pong");

        server.close().await.unwrap();
    }
}
