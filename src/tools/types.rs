//! Type definitions for LLDB MCP tools

use serde::Deserialize;
use schemars::JsonSchema;

// ============================================================================
// lldb_init
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LldbInitArgs {
    /// Absolute path to the executable to debug
    pub fullpath: String,
}

// ============================================================================
// lldb
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LldbArgs {
    /// A single LLDB command (e.g., "breakpoint set -n main", "thread backtrace")
    pub command: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_args_deserialize() {
        let args: LldbInitArgs = serde_json::from_str(r#"{"fullpath": "/tmp/a.out"}"#).unwrap();
        assert_eq!(args.fullpath, "/tmp/a.out");
    }

    #[test]
    fn test_command_args_require_command() {
        assert!(serde_json::from_str::<LldbArgs>("{}").is_err());
        let args: LldbArgs = serde_json::from_str(r#"{"command": "bt"}"#).unwrap();
        assert_eq!(args.command, "bt");
    }
}
