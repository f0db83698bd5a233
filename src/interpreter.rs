//! Line interpreter
//!
//! A script is a sequence of lines. Each non-blank line names a command
//! followed by whitespace-separated arguments; there is no quoting, no
//! variables and no control flow. Every invocation writes into a private
//! buffer, and the buffers are concatenated in line order to form the run
//! result. Failures are annotated inline and never stop the run:
//!
//! ```text
//! [Unknown Command] <cmd>
//! [Error] in <cmd>: <message>
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::plugin::{Command, CommandError, CommandRegistry};

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub args: Vec<String>,
}

impl<'a> Invocation<'a> {
    /// Tokenize a line, returning `None` for blank lines
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        Some(Invocation {
            name,
            args: tokens.map(String::from).collect(),
        })
    }
}

/// Characters that end a line: `\n`, `\r` (so `\r\n` too) and the rest of
/// the Unicode line boundaries.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split a script into lines
pub fn lines(script: &str) -> impl Iterator<Item = &str> {
    script.split(is_line_break)
}

/// Run a script against a registry and return the combined output
pub fn execute(script: &str, registry: &mut CommandRegistry) -> String {
    let mut result = String::new();

    for line in lines(script) {
        let Some(invocation) = Invocation::parse(line) else {
            continue;
        };
        let name = invocation.name;

        match registry.get_mut(name) {
            Some(command) => {
                tracing::debug!(command = %name, args = ?invocation.args, "dispatching");
                match invoke(command, &invocation.args) {
                    Ok(output) => result.push_str(&output),
                    Err(e) => {
                        tracing::debug!(command = %name, error = %e, "command failed");
                        result.push_str(&format!("[Error] in {}: {}\n", name, e));
                    }
                }
            }
            None => {
                result.push_str(&format!("[Unknown Command] {}\n", name));
            }
        }
    }

    result
}

/// Build a fresh registry from `functions_dir` and execute `script` against it
pub fn run(script: &str, functions_dir: &Path) -> String {
    let mut registry = CommandRegistry::build(functions_dir);
    execute(script, &mut registry)
}

/// Invoke one command with a private output buffer.
///
/// The buffer only reaches the caller when the command succeeds. A panic
/// becomes [`CommandError::Panicked`], but the process panic hook is left
/// alone, so it still prints its usual message to stderr.
fn invoke<C: Command + ?Sized>(command: &mut C, args: &[String]) -> Result<String, CommandError> {
    let mut sink: Vec<u8> = Vec::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| command.run(args, &mut sink)));
    match outcome {
        Ok(Ok(())) => Ok(String::from_utf8_lossy(&sink).into_owned()),
        Ok(Err(e)) => Err(e),
        Err(payload) => Err(CommandError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked".to_string()
    }
}
