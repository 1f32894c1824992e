//! Configuration for the lldb-mcp proxy and the lldb-server bridge

use std::path::PathBuf;
use clap::Parser;

use crate::filter::DEFAULT_BLACKLIST;
use crate::protocol::{DEFAULT_HOST, DEFAULT_PORT};

/// Command line arguments for the MCP proxy
#[derive(Parser, Debug)]
#[command(name = "lldb-mcp")]
#[command(about = "MCP server forwarding LLDB commands to an lldb-server bridge")]
#[command(version)]
pub struct Args {
    /// Bridge server host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bridge server port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Runtime configuration for the MCP proxy
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Command line arguments for the bridge server
#[derive(Parser, Debug)]
#[command(name = "lldb-server")]
#[command(about = "Expose an LLDB command interpreter over a TCP line protocol")]
#[command(version)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Path to lldb binary (defaults to searching PATH)
    #[arg(long)]
    pub lldb_path: Option<PathBuf>,

    /// Comma separated command names to refuse (replaces the default list)
    #[arg(long, value_delimiter = ',')]
    pub blacklist: Option<Vec<String>>,

    /// Close new connections while a client is already connected
    #[arg(long)]
    pub exclusive: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Runtime configuration for the bridge server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub lldb_path: Option<PathBuf>,
    pub blacklist: Vec<String>,
    pub exclusive: bool,
}

impl ServerConfig {
    pub fn from_args(args: &ServerArgs) -> Self {
        let blacklist = match &args.blacklist {
            Some(names) => names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
            None => default_blacklist(),
        };

        Self {
            host: args.host.clone(),
            port: args.port,
            lldb_path: args.lldb_path.clone(),
            blacklist,
            exclusive: args.exclusive,
        }
    }

    /// Find lldb binary path: config, then PATH
    pub fn find_lldb(&self) -> Result<PathBuf, String> {
        if let Some(path) = &self.lldb_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(format!("Configured lldb path does not exist: {}", path.display()));
        }

        which("lldb").map_err(|_| {
            "lldb not found. Install LLDB or pass --lldb-path".to_string()
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            lldb_path: None,
            blacklist: default_blacklist(),
            exclusive: false,
        }
    }
}

fn default_blacklist() -> Vec<String> {
    DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect()
}

/// Find an executable on PATH (simple which implementation)
fn which(name: &str) -> Result<PathBuf, ()> {
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_finds_sh() {
        assert!(which("sh").is_ok());
    }

    #[test]
    fn test_which_nonexistent() {
        assert!(which("nonexistent_binary_12345").is_err());
    }

    #[test]
    fn test_find_lldb_with_bad_path() {
        let config = ServerConfig {
            lldb_path: Some(PathBuf::from("/nonexistent/lldb")),
            ..ServerConfig::default()
        };
        let err = config.find_lldb().unwrap_err();
        assert!(err.contains("/nonexistent/lldb"));
    }

    #[test]
    fn test_server_args_defaults() {
        let args = ServerArgs::parse_from(["lldb-server"]);
        let config = ServerConfig::from_args(&args);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3003);
        assert!(!config.exclusive);
        assert_eq!(config.blacklist.len(), DEFAULT_BLACKLIST.len());
        assert!(config.blacklist.contains(&"shell".to_string()));
    }

    #[test]
    fn test_server_args_custom_blacklist() {
        let args = ServerArgs::parse_from([
            "lldb-server",
            "--port", "4000",
            "--blacklist", "shell, gui,,memory",
            "--exclusive",
        ]);
        let config = ServerConfig::from_args(&args);
        assert_eq!(config.port, 4000);
        assert!(config.exclusive);
        assert_eq!(config.blacklist, vec!["shell", "gui", "memory"]);
    }
}
