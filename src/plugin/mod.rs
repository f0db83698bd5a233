//! WASM command plugins for OpenCode
//!
//! Every command a script can call is a WebAssembly module dropped into the
//! functions directory. The registry rebuilds itself from that directory on
//! every run, so edited or newly added commands take effect immediately.
//!
//! # Functions Directory
//!
//! ```text
//! functions/
//! ├── add.wat        # text-format module, command `add`
//! ├── greet.wasm     # binary module, command `greet`
//! └── notes.txt      # ignored
//! ```
//!
//! # Plugin ABI
//!
//! A module exports `run` (no parameters) and optionally `init`, which is
//! called once at load time. Arguments and output go through host imports
//! in the `env` namespace, see [`imports`] for the full list.

mod abi;
mod command;
mod hot_reload;
mod imports;
mod loader;
mod registry;

pub use abi::format_number;
pub use command::{Command, CommandError};
pub use hot_reload::{try_create_watcher, FunctionsWatcher};
pub use loader::{PluginLoader, WasmCommand};
pub use registry::{list_functions, unit_name, CommandRegistry, UNIT_EXTENSIONS};

/// Error types for loading command units
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WASM compilation error: {0}")]
    Compilation(String),

    #[error("WASM instantiation error: {0}")]
    Instantiation(String),

    #[error("init failed: {0}")]
    Init(String),

    #[error("watch error: {0}")]
    Watch(String),
}
