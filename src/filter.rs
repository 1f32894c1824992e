//! Command policy and output sanitation for the bridge server

use std::borrow::Cow;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Reserved separator LLDB would otherwise accept for command chaining
pub const COMMAND_SEPARATOR: char = ';';

/// Commands that attach to other processes, open a GUI, run a shell,
/// switch platform or detach. None of them make sense for a scripted session.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "attach",
    "gdb-remote",
    "kdp-remote",
    "gui",
    "shell",
    "platform",
    "detach",
];

pub const MULTIPLE_COMMANDS_ERROR: &str = "Error, multiple commands not allowed";
pub const BLACKLISTED_COMMAND_ERROR: &str = "Error, current command not allowed";

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("must compile"));

/// Why a command never reached the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MultipleCommands,
    Blacklisted,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::MultipleCommands => MULTIPLE_COMMANDS_ERROR,
            Rejection::Blacklisted => BLACKLISTED_COMMAND_ERROR,
        }
    }
}

/// Immutable command blacklist, fixed at startup
#[derive(Debug, Clone)]
pub struct CommandFilter {
    blacklist: HashSet<String>,
}

impl CommandFilter {
    pub fn new<I, S>(blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blacklist: blacklist.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a non-blank command. Separator check runs first.
    pub fn check(&self, command: &str) -> Result<(), Rejection> {
        if command.contains(COMMAND_SEPARATOR) {
            return Err(Rejection::MultipleCommands);
        }
        match command.split_whitespace().next() {
            Some(name) if self.blacklist.contains(name) => Err(Rejection::Blacklisted),
            _ => Ok(()),
        }
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }
}

impl Default for CommandFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied())
    }
}

/// Strip ANSI SGR sequences (`ESC [ <digits/semicolons> m`)
pub fn sanitize(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}
