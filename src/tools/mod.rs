//! LLDB MCP tools module
//!
//! Exposes the bridge client as the `lldb_init` and `lldb` tools.

pub mod lldb_tools;
pub mod types;

pub use lldb_tools::*;
pub use types::*;
