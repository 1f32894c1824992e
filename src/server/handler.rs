//! Per-connection command loop
//!
//! AWAIT_LINE -> (EOF) CLOSED | (blank) AWAIT_LINE | FILTER
//! FILTER -> RESPOND (rejected) | EXECUTE -> RESPOND -> AWAIT_LINE

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::filter::{sanitize, CommandFilter};
use crate::interpreter::{CommandInterpreter, CommandOutput};
use crate::protocol::Response;

/// Interpreter shared by every connection
pub type SharedInterpreter = Arc<Mutex<Box<dyn CommandInterpreter>>>;

/// Filters and runs commands against the shared interpreter
#[derive(Clone)]
pub struct CommandExecutor {
    filter: Arc<CommandFilter>,
    interpreter: SharedInterpreter,
}

impl CommandExecutor {
    pub fn new(filter: CommandFilter, interpreter: Box<dyn CommandInterpreter>) -> Self {
        Self {
            filter: Arc::new(filter),
            interpreter: Arc::new(Mutex::new(interpreter)),
        }
    }

    /// Produce the response for one non-blank command
    pub async fn respond(&self, command: &str) -> Response {
        info!("(mcp) >>> {}", command);

        if let Err(rejection) = self.filter.check(command) {
            warn!("{}", rejection.message());
            return Response::rejected(command, rejection.message());
        }

        let result = self.execute(command).await;
        if !result.output.is_empty() {
            debug!("{}", result.output.trim_end());
        }
        if !result.error.is_empty() {
            warn!("{}", result.error.trim_end());
        }

        Response {
            command: command.to_string(),
            output: sanitize(&result.output).into_owned(),
            error: sanitize(&result.error).into_owned(),
        }
    }

    /// Run on the blocking pool; the interpreter call may take arbitrarily long
    async fn execute(&self, command: &str) -> CommandOutput {
        let interpreter = Arc::clone(&self.interpreter);
        let command = command.to_string();

        let joined = tokio::task::spawn_blocking(move || {
            let mut interpreter = interpreter.lock().unwrap_or_else(PoisonError::into_inner);
            interpreter.run_command(&command)
        })
        .await;

        joined.unwrap_or_else(|e| CommandOutput {
            output: String::new(),
            error: format!("error: command execution failed: {}\n", e),
        })
    }
}

/// Serve one connection until EOF.
///
/// Every non-blank line gets exactly one JSON response line. Read and write
/// errors end the connection and are returned to the caller.
pub async fn handle_connection<R, W>(reader: R, mut writer: W, executor: CommandExecutor) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(raw) = lines.next_line().await? {
        let command = raw.trim();
        if command.is_empty() {
            continue;
        }

        let response = executor.respond(command).await;
        writer.write_all(response.to_line()?.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, BufReader};

    /// Records every command and replies with a fixed result
    struct Recording {
        calls: Arc<Mutex<Vec<String>>>,
        reply: CommandOutput,
    }

    impl CommandInterpreter for Recording {
        fn run_command(&mut self, command: &str) -> CommandOutput {
            self.calls.lock().unwrap().push(command.to_string());
            self.reply.clone()
        }
    }

    /// Never returns from `expression` until released
    struct Stalling {
        release: mpsc::Receiver<()>,
    }

    impl CommandInterpreter for Stalling {
        fn run_command(&mut self, command: &str) -> CommandOutput {
            if command == "expression" {
                let _ = self.release.recv();
            }
            CommandOutput {
                output: format!("ran {}", command),
                error: String::new(),
            }
        }
    }

    fn executor(reply: CommandOutput) -> (CommandExecutor, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let interpreter = Recording { calls: calls.clone(), reply };
        (CommandExecutor::new(CommandFilter::default(), Box::new(interpreter)), calls)
    }

    /// Feed `input` through a connection and collect the response lines
    async fn run_session(executor: CommandExecutor, input: &str) -> Vec<Response> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(handle_connection(BufReader::new(server_read), server_write, executor));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(input.as_bytes()).await.unwrap();
        client_write.shutdown().await.unwrap();

        task.await.unwrap().unwrap();

        let mut raw = String::new();
        client_read.read_to_string(&mut raw).await.unwrap();
        raw.lines().map(|l| Response::from_line(l).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_blank_lines_produce_no_response() {
        let (executor, calls) = executor(CommandOutput::default());
        let responses = run_session(executor, "\n   \n\t\n").await;
        assert!(responses.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_response_per_command() {
        let (executor, calls) = executor(CommandOutput {
            output: "ok\n".to_string(),
            error: String::new(),
        });
        let responses = run_session(executor, "bt\n\n  thread list  \nshell ls\nframe variable\n").await;

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0].command, "bt");
        assert_eq!(responses[1].command, "thread list");
        assert_eq!(responses[2].command, "shell ls");
        assert_eq!(responses[3].command, "frame variable");
        assert_eq!(*calls.lock().unwrap(), vec!["bt", "thread list", "frame variable"]);
    }

    #[tokio::test]
    async fn test_separator_never_reaches_interpreter() {
        let (executor, calls) = executor(CommandOutput::default());
        let responses = run_session(executor, "bt; shell id\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error, "Error, multiple commands not allowed");
        assert!(responses[0].output.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blacklisted_command_rejected() {
        let (executor, calls) = executor(CommandOutput::default());
        let responses = run_session(executor, "shell\nshell ls\ndetach\n").await;

        assert_eq!(responses.len(), 3);
        for resp in &responses {
            assert_eq!(resp.error, "Error, current command not allowed");
        }
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_output_and_error_sanitized() {
        let (executor, _) = executor(CommandOutput {
            output: "\x1b[31mfoo\x1b[0m".to_string(),
            error: "\x1b[1;31merror:\x1b[0m no target".to_string(),
        });
        let responses = run_session(executor, "register read\n").await;

        assert_eq!(responses[0].output, "foo");
        assert_eq!(responses[0].error, "error: no target");
    }

    #[tokio::test]
    async fn test_eof_without_newline_still_answered() {
        let (executor, calls) = executor(CommandOutput::default());
        let responses = run_session(executor, "version").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["version"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stalled_command_holds_interpreter_but_not_filter() {
        let (release, stalled_on) = mpsc::channel();
        let executor = CommandExecutor::new(CommandFilter::default(), Box::new(Stalling { release: stalled_on }));

        let stalled = tokio::spawn({
            let executor = executor.clone();
            async move { executor.respond("expression").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Rejections never touch the interpreter
        let rejected = tokio::time::timeout(Duration::from_secs(1), executor.respond("shell ls"))
            .await
            .expect("rejection must not wait for the interpreter");
        assert_eq!(rejected.error, "Error, current command not allowed");

        let queued = tokio::time::timeout(Duration::from_millis(200), executor.respond("bt")).await;
        assert!(queued.is_err());

        release.send(()).unwrap();
        let resp = stalled.await.unwrap();
        assert_eq!(resp.output, "ran expression");

        let resp = executor.respond("bt").await;
        assert_eq!(resp.output, "ran bt");
    }
}
