//! The command contract shared by WASM units and native commands

use std::io::Write;

/// Errors raised by a command invocation.
///
/// The display text is the bare message, since the interpreter embeds it in
/// `[Error] in <cmd>: <message>`.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command explicitly failed with a message
    #[error("{0}")]
    Raised(String),

    /// The WASM guest trapped
    #[error("{0}")]
    Trap(String),

    /// The unit loaded but has nothing to call
    #[error("no exported '{0}' function")]
    MissingEntryPoint(String),

    /// A native command panicked
    #[error("{0}")]
    Panicked(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    pub fn raised(message: impl Into<String>) -> Self {
        CommandError::Raised(message.into())
    }
}

/// A named unit of work callable from a script line.
///
/// `args` are the whitespace-separated tokens after the command name.
/// Anything the command wants shown goes to `out`; the return value only
/// signals success or failure. Panics are caught by the interpreter, though
/// the default panic hook still reports them on stderr.
pub trait Command {
    fn run(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError>;
}

impl<F> Command for F
where
    F: FnMut(&[String], &mut dyn Write) -> Result<(), CommandError>,
{
    fn run(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        self(args, out)
    }
}
