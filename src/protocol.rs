//! Wire format shared by the bridge server and the MCP proxy
//!
//! Client sends one command per line. Server answers every non-blank line
//! with exactly one JSON object on its own line:
//! `{"command": "...", "output": "...", "error": "..."}`.

use serde::{Deserialize, Serialize};

/// Default bridge address
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bridge port
pub const DEFAULT_PORT: u16 = 3003;

/// One response line from the bridge server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    /// Command text as received (trimmed)
    pub command: String,
    /// Sanitized interpreter output
    #[serde(default)]
    pub output: String,
    /// Sanitized interpreter or policy error
    #[serde(default)]
    pub error: String,
}

impl Response {
    pub fn rejected(command: &str, error: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            output: String::new(),
            error: error.into(),
        }
    }

    /// Serialize as a single newline-terminated line.
    ///
    /// serde_json escapes control characters inside strings, so the encoded
    /// object never contains a raw newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_line_is_single_line() {
        let resp = Response {
            command: "thread list".to_string(),
            output: "thread #1\nthread #2\n".to_string(),
            error: String::new(),
        };
        let line = resp.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(Response::from_line(&line).unwrap(), resp);
    }

    #[test]
    fn test_field_names_on_wire() {
        let line = Response::rejected("shell ls", "nope").to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["command"], "shell ls");
        assert_eq!(value["output"], "");
        assert_eq!(value["error"], "nope");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let resp = Response::from_line("{\"command\": \"bt\"}\n").unwrap();
        assert_eq!(resp.command, "bt");
        assert!(resp.output.is_empty());
        assert!(resp.error.is_empty());
    }

    #[test]
    fn test_from_line_rejects_garbage() {
        assert!(Response::from_line("not json").is_err());
        assert!(Response::from_line("{\"command\": \"bt\", \"out").is_err());
    }
}
