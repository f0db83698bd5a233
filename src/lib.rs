//! OpenCode - a line-oriented scripting runtime
//!
//! # Overview
//!
//! OpenCode runs tiny scripts where every line calls one command:
//!
//! ```text
//! add 2 3
//! add x y
//! ```
//!
//! Commands are WebAssembly modules discovered in a functions directory
//! (`add.wat` or `add.wasm` provides `add`). Each run reloads that
//! directory, executes the script line by line and returns everything the
//! commands printed:
//!
//! ```text
//! The sum is: 5.0
//! Enter valid numbers.
//! ```
//!
//! # Error Containment
//!
//! A unit that fails to load is skipped. An unknown command or a failing
//! command is annotated inline and the next line still runs:
//!
//! ```text
//! [Unknown Command] foo
//! [Error] in div: division by zero
//! ```
//!
//! # Example
//!
//! ```rust
//! use opencode::{execute, CommandError, CommandRegistry};
//! use std::io::Write;
//!
//! let mut registry = CommandRegistry::new("functions");
//! registry.insert("hi", |args: &[String], out: &mut dyn Write| -> Result<(), CommandError> {
//!     writeln!(out, "hi {}", args.join(" "))?;
//!     Ok(())
//! });
//!
//! let output = execute("hi there\nbye", &mut registry);
//! assert_eq!(output, "hi there\n[Unknown Command] bye\n");
//! ```

pub mod config;
pub mod interpreter;
pub mod plugin;
pub mod runtime;

// Re-export commonly used items
pub use config::{Config, ConfigError};
pub use interpreter::{execute, run, Invocation};
pub use plugin::{list_functions, Command, CommandError, CommandRegistry, PluginError};
pub use runtime::{RunOutput, Runtime};
