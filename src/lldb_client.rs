//! Client for the LLDB bridge server
//!
//! Holds one persistent line-oriented TCP connection. Every command runs under
//! the client's lock: probe the connection, reconnect if needed, write the
//! command, read exactly one JSON response line.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::protocol::Response;

/// Returned when LLDB succeeded without printing anything
pub const EXECUTED_SUCCESSFULLY: &str = "Executed successfully";

/// Prefix of every transport failure rendered for a tool caller
pub const SEND_ERROR_PREFIX: &str = "ERROR: Cannot send command:";

type Connection = BufStream<TcpStream>;

pub struct LldbClient {
    host: String,
    port: u16,
    /// Lazily created; `None` until first use or after a transport failure
    connection: Mutex<Option<Connection>>,
}

impl LldbClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connection: Mutex::new(None),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<Connection, ClientError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await.map_err(|e| {
            ClientError::ConnectionFailed(format!(
                "Failed to connect to LLDB server at {}: {}",
                self.address(),
                e
            ))
        })?;
        info!("Connected to LLDB server at {}", self.address());
        Ok(BufStream::new(stream))
    }

    /// Write one command line and read one response line. `None` means the
    /// peer closed the stream before answering.
    async fn exchange(conn: &mut Connection, command: &str) -> std::io::Result<Option<String>> {
        conn.write_all(command.as_bytes()).await?;
        conn.write_all(b"\n").await?;
        conn.flush().await?;

        let mut raw = String::new();
        if conn.read_line(&mut raw).await? == 0 {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    /// Send a single LLDB command and return its text result.
    ///
    /// A reused connection that fails mid-exchange is replaced and the command
    /// retried once on the fresh connection.
    pub async fn send_command(&self, command: &str) -> Result<String, ClientError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ClientError::InvalidCommand("empty command".to_string()));
        }
        if command.contains('\n') || command.contains('\r') {
            return Err(ClientError::InvalidCommand("embedded newline".to_string()));
        }

        let mut slot = self.connection.lock().await;
        debug!("LLDB command: {}", command);

        let (mut conn, reused) = match slot.take() {
            Some(conn) if conn.get_ref().peer_addr().is_ok() => (conn, true),
            Some(_) => {
                warn!("Connection to {} is dead, reconnecting", self.address());
                (self.connect().await?, false)
            }
            None => (self.connect().await?, false),
        };

        let mut reply = Self::exchange(&mut conn, command).await;
        if reused && !matches!(reply, Ok(Some(_))) {
            match &reply {
                Err(e) => warn!("Connection to {} failed ({}), reconnecting", self.address(), e),
                _ => warn!("Connection to {} closed by peer, reconnecting", self.address()),
            }
            conn = self.connect().await?;
            reply = Self::exchange(&mut conn, command).await;
        }

        let raw = match reply {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("LLDB server closed the connection without a response");
                return Ok(String::new());
            }
            Err(e) => return Err(ClientError::Io(e)),
        };

        // Still line-synchronised even if the payload turns out malformed
        *slot = Some(conn);
        drop(slot);

        debug!("LLDB response: {}", raw.trim_end());
        interpret_response(&raw)
    }

    /// `send_command` rendered for a tool caller; never fails
    pub async fn send(&self, command: &str) -> String {
        self.send_command(command)
            .await
            .unwrap_or_else(|e| format!("{} {}", SEND_ERROR_PREFIX, e))
    }

    /// Load an executable and launch it stopped at its entry point.
    ///
    /// Returns the load text followed by the launch text, or the first error.
    pub async fn init(&self, path: &Path) -> String {
        if !path.is_file() {
            return format!("ERROR: file {} does not exist", path.display());
        }

        // Previous target is discarded whatever happens
        let _ = self.send_command("target delete --all").await;

        let loaded = self.send(&format!("file {}", quote_argument(&path.to_string_lossy()))).await;
        if is_error_text(&loaded) {
            warn!("Loading {} failed: {}", path.display(), loaded.trim_end());
            return loaded;
        }

        let launched = self.send("process launch --stop-at-entry").await;
        info!("Launched {}", path.display());
        format!("{}{}", loaded, launched)
    }
}

/// Map a response line to the text handed back to the caller
pub fn interpret_response(raw: &str) -> Result<String, ClientError> {
    let response = Response::from_line(raw).map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    if !response.error.is_empty() {
        Ok(response.error)
    } else if response.output.is_empty() {
        Ok(EXECUTED_SUCCESSFULLY.to_string())
    } else {
        Ok(response.output)
    }
}

/// Double-quote an argument for LLDB's command parser, escaping `\\` and `"`
pub fn quote_argument(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// True for LLDB (`error: ...`), policy (`Error, ...`) and transport
/// (`ERROR: ...`) failures
pub fn is_error_text(text: &str) -> bool {
    text.trim_start()
        .get(..5)
        .map_or(false, |head| head.eq_ignore_ascii_case("error"))
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
