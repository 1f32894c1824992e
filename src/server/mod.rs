//! TCP bridge server
//!
//! Accepts connections for the life of the process and runs one command loop
//! per connection on its own task.

pub mod handler;

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::filter::CommandFilter;
use crate::interpreter::CommandInterpreter;

pub use handler::{handle_connection, CommandExecutor};

const LISTEN_BACKLOG: u32 = 128;

pub struct BridgeServer {
    listener: TcpListener,
    executor: CommandExecutor,
    exclusive: bool,
    active: Arc<AtomicUsize>,
}

impl BridgeServer {
    /// Bind the listening socket with address reuse enabled.
    ///
    /// Failing to bind is fatal for the server.
    pub async fn bind(config: &ServerConfig, interpreter: Box<dyn CommandInterpreter>) -> Result<Self, ServerError> {
        let addr_str = format!("{}:{}", config.host, config.port);
        let bind_err = |source: io::Error| ServerError::Bind { addr: addr_str.clone(), source };

        let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
            .await
            .map_err(bind_err)?
            .next()
            .ok_or_else(|| bind_err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved")))?;

        let socket = (if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }).map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;

        let filter = CommandFilter::new(config.blacklist.iter().cloned());

        Ok(Self {
            listener,
            executor: CommandExecutor::new(filter, interpreter),
            exclusive: config.exclusive,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever
    pub async fn serve(self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            };

            if self.exclusive && self.active.load(Ordering::SeqCst) > 0 {
                warn!("Rejecting {}: another client is connected", peer);
                drop(stream);
                continue;
            }

            info!("Client connected: {}", peer);
            self.active.fetch_add(1, Ordering::SeqCst);

            let executor = self.executor.clone();
            let active = Arc::clone(&self.active);
            tokio::spawn(async move {
                let (read, write) = stream.into_split();
                match handle_connection(BufReader::new(read), write, executor).await {
                    Ok(()) => info!("Client disconnected: {}", peer),
                    Err(e) => debug!("Connection {} closed: {}", peer, e),
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Interpreter launch failed: {0}")]
    InterpreterLaunch(String),
}
