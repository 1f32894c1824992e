//! LLDB command interpreter adapter
//!
//! The bridge only needs "run one command, get output and error". `LldbProcess`
//! provides that on top of the `lldb` driver: every command is wrapped in a
//! single `script` line that runs it through `HandleCommand` on an
//! `SBCommandReturnObject` and prints the result as JSON behind a sentinel.
//! Only stdout is parsed; stderr is drained into the log.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::server::ServerError;

/// Captured result of one interpreter command
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
}

/// Synchronous command execution. Implementations return only after the
/// command and all of its output are complete.
pub trait CommandInterpreter: Send {
    fn run_command(&mut self, command: &str) -> CommandOutput;
}

/// Settings applied once after launch
const SETUP_COMMANDS: &[&str] = &[
    "settings set auto-confirm true",
    "settings set use-color false",
];

/// `lldb` child process driven over pipes
pub struct LldbProcess {
    runtime: Handle,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    sentinel: String,
    exited: bool,
}

impl LldbProcess {
    /// Spawn `lldb` and apply the session settings.
    ///
    /// Must be called inside a tokio runtime; `run_command` later blocks on
    /// that runtime and so must run off its worker threads (`spawn_blocking`).
    pub async fn spawn(lldb_path: &Path) -> Result<Self, ServerError> {
        info!("Starting LLDB: {}", lldb_path.display());

        let mut child = Command::new(lldb_path)
            .arg("--no-use-colors")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ServerError::InterpreterLaunch(format!("Failed to spawn {}: {}", lldb_path.display(), e))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ServerError::InterpreterLaunch("Failed to get lldb stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ServerError::InterpreterLaunch("Failed to get lldb stdout".to_string())
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        let mut process = Self {
            runtime: Handle::current(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            sentinel: format!("--lldb-mcp-{}--", uuid::Uuid::new_v4().simple()),
            exited: false,
        };

        for cmd in SETUP_COMMANDS {
            let result = process.execute(cmd).await;
            if !result.error.is_empty() {
                warn!("LLDB setup '{}' reported: {}", cmd, result.error.trim());
            }
        }
        if process.exited {
            return Err(ServerError::InterpreterLaunch(
                "lldb exited during startup".to_string(),
            ));
        }

        Ok(process)
    }

    async fn execute(&mut self, command: &str) -> CommandOutput {
        if self.exited {
            return not_running("");
        }

        debug!("LLDB command: {}", command);
        let mut line = wrap_command(&self.sentinel, command);
        line.push('\n');
        if let Err(e) = self.write(&line).await {
            warn!("Write to lldb failed: {}", e);
            self.exited = true;
            return not_running(&e.to_string());
        }

        loop {
            match self.stdout.next_line().await {
                Ok(Some(line)) => {
                    if let Some(payload) = line.trim_end().strip_prefix(self.sentinel.as_str()) {
                        return parse_result(payload);
                    }
                    debug!("lldb: {}", line);
                }
                Ok(None) => {
                    warn!("lldb closed its output stream");
                    self.exited = true;
                    return not_running("");
                }
                Err(e) => {
                    warn!("Read from lldb failed: {}", e);
                    self.exited = true;
                    return not_running(&e.to_string());
                }
            }
        }
    }

    async fn write(&mut self, line: &str) -> std::io::Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await
    }

    /// Check if the lldb process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl CommandInterpreter for LldbProcess {
    fn run_command(&mut self, command: &str) -> CommandOutput {
        let runtime = self.runtime.clone();
        runtime.block_on(self.execute(command))
    }
}

/// One `script` line running `command` through `HandleCommand`.
///
/// The command travels as a JSON string literal, which Python reads as the
/// same string, so LLDB never parses it as a line of its own.
pub fn wrap_command(sentinel: &str, command: &str) -> String {
    let literal = serde_json::Value::String(command.to_string()).to_string();
    format!(
        "script import json as _j, lldb as _l; \
         _l.debugger.SetAsync(False); \
         _r = _l.SBCommandReturnObject(); \
         _l.debugger.GetCommandInterpreter().HandleCommand({literal}, _r); \
         print('{sentinel}' + _j.dumps({{'output': _r.GetOutput() or '', 'error': _r.GetError() or ''}}))"
    )
}

fn parse_result(payload: &str) -> CommandOutput {
    serde_json::from_str(payload).unwrap_or_else(|e| CommandOutput {
        output: String::new(),
        error: format!("error: unreadable lldb result: {}\n", e),
    })
}

fn not_running(detail: &str) -> CommandOutput {
    let error = if detail.is_empty() {
        "error: lldb process is not running\n".to_string()
    } else {
        format!("error: lldb process is not running: {}\n", detail)
    };
    CommandOutput { output: String::new(), error }
}

async fn drain_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("lldb stderr: {}", line);
    }
}
