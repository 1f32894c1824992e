//! Tracing subscriber setup shared by both binaries
//!
//! Logs go to stderr or a file; stdout of `lldb-mcp` carries the MCP stdio
//! transport and must stay clean.

use std::path::Path;

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init_logging(log_level: &str, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    if let Some(log_file) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        subscriber
            .with_ansi(false)
            .with_writer(file)
            .try_init()
            .map_err(|e| e as Box<dyn std::error::Error>)?;
    } else {
        subscriber
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| e as Box<dyn std::error::Error>)?;
    }

    debug!("Logging initialized with level: {}", log_level);
    Ok(())
}
