//! LLDB MCP bridge
//!
//! Two halves of a command-forwarding protocol for LLDB:
//! `lldb-server` hosts the interpreter behind a newline-delimited TCP protocol
//! (default 127.0.0.1:3003) and `lldb-mcp` exposes it to MCP clients as the
//! `lldb_init` and `lldb` tools.

pub mod config;
pub mod filter;
pub mod interpreter;
pub mod lldb_client;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{Args, Config, ServerArgs, ServerConfig};
pub use lldb_client::{ClientError, LldbClient};
pub use server::{BridgeServer, ServerError};
pub use tools::LldbToolHandler;
