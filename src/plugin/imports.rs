//! Host function implementations for command units
//!
//! These are the only channel between a unit and the outside world: the
//! guest reads its arguments and appends to the invocation's output buffer
//! through them.
//!
//! | import                                    | purpose                              |
//! |-------------------------------------------|--------------------------------------|
//! | `oc_arg_count() -> i32`                   | number of arguments                  |
//! | `oc_arg_len(i) -> i32`                    | byte length of argument `i`          |
//! | `oc_arg_read(i, ptr, max) -> i32`         | copy argument `i` into guest memory  |
//! | `oc_arg_is_number(i) -> i32`              | 1 if argument `i` parses as a number |
//! | `oc_arg_number(i) -> f64`                 | argument `i` as a number, NaN if not |
//! | `oc_print(ptr, len)`                      | append text to the output            |
//! | `oc_print_number(f64)`                    | append a formatted number            |
//! | `oc_fail(ptr, len)`                       | raise an error with a message        |
//!
//! `oc_print` decodes invalid UTF-8 lossily and raises when the range falls
//! outside guest memory.

use wasmer::{Function, FunctionEnv, FunctionEnvMut, Imports, Memory, RuntimeError, Store};

use super::abi::{format_number, parse_number, read_bytes, read_string, write_string};

/// Per-unit state shared between the host functions and the loader
pub struct PluginEnv {
    /// Reference to WASM memory (set after instantiation)
    pub memory: Option<Memory>,

    /// Arguments of the invocation in progress
    pub args: Vec<String>,

    /// Output written by the invocation in progress
    pub output: String,

    /// Message passed to `oc_fail`, if the guest raised
    pub failure: Option<String>,

    /// Command name (for diagnostics)
    pub name: String,
}

impl PluginEnv {
    pub fn new(name: String) -> Self {
        Self {
            memory: None,
            args: Vec::new(),
            output: String::new(),
            failure: None,
            name,
        }
    }

    pub fn set_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }

    /// Reset per-invocation state before calling into the guest
    pub fn begin(&mut self, args: &[String]) {
        self.args = args.to_vec();
        self.output.clear();
        self.failure = None;
    }

    fn arg(&self, index: u32) -> Option<&str> {
        self.args.get(index as usize).map(String::as_str)
    }
}

/// Create the imports object for a unit
pub fn create_imports(store: &mut Store, env: &FunctionEnv<PluginEnv>) -> Imports {
    let mut imports = Imports::new();

    // Argument access
    imports.define(
        "env",
        "oc_arg_count",
        Function::new_typed_with_env(store, env, oc_arg_count),
    );
    imports.define(
        "env",
        "oc_arg_len",
        Function::new_typed_with_env(store, env, oc_arg_len),
    );
    imports.define(
        "env",
        "oc_arg_read",
        Function::new_typed_with_env(store, env, oc_arg_read),
    );
    imports.define(
        "env",
        "oc_arg_is_number",
        Function::new_typed_with_env(store, env, oc_arg_is_number),
    );
    imports.define(
        "env",
        "oc_arg_number",
        Function::new_typed_with_env(store, env, oc_arg_number),
    );

    // Output
    imports.define(
        "env",
        "oc_print",
        Function::new_typed_with_env(store, env, oc_print),
    );
    imports.define(
        "env",
        "oc_print_number",
        Function::new_typed_with_env(store, env, oc_print_number),
    );

    // Errors
    imports.define(
        "env",
        "oc_fail",
        Function::new_typed_with_env(store, env, oc_fail),
    );

    imports
}

// === Arguments ===

fn oc_arg_count(env: FunctionEnvMut<PluginEnv>) -> u32 {
    env.data().args.len() as u32
}

fn oc_arg_len(env: FunctionEnvMut<PluginEnv>, index: u32) -> u32 {
    env.data().arg(index).map_or(0, |a| a.len() as u32)
}

fn oc_arg_read(mut env: FunctionEnvMut<PluginEnv>, index: u32, out_ptr: u32, max_len: u32) -> u32 {
    let (data, store) = env.data_and_store_mut();
    if let (Some(memory), Some(arg)) = (data.memory.as_ref(), data.arg(index)) {
        return write_string(memory, &store, out_ptr, max_len, arg);
    }
    0
}

fn oc_arg_is_number(env: FunctionEnvMut<PluginEnv>, index: u32) -> u32 {
    match env.data().arg(index).and_then(parse_number) {
        Some(_) => 1,
        None => 0,
    }
}

fn oc_arg_number(env: FunctionEnvMut<PluginEnv>, index: u32) -> f64 {
    env.data()
        .arg(index)
        .and_then(parse_number)
        .unwrap_or(f64::NAN)
}

// === Output ===

fn oc_print(mut env: FunctionEnvMut<PluginEnv>, ptr: u32, len: u32) -> Result<(), RuntimeError> {
    let (data, store) = env.data_and_store_mut();
    let bytes = match data.memory.as_ref() {
        Some(memory) => read_bytes(memory, &store, ptr, len),
        None => None,
    };

    match bytes {
        Some(bytes) => {
            data.output.push_str(&String::from_utf8_lossy(&bytes));
            Ok(())
        }
        None => {
            let message = match data.memory {
                Some(_) => format!("oc_print: {} bytes at {} are outside guest memory", len, ptr),
                None => "oc_print: module exports no memory".to_string(),
            };
            tracing::debug!(command = %data.name, ptr, len, "oc_print: bad range");
            data.failure = Some(message.clone());
            Err(RuntimeError::new(message))
        }
    }
}

fn oc_print_number(mut env: FunctionEnvMut<PluginEnv>, value: f64) {
    env.data_mut().output.push_str(&format_number(value));
}

// === Errors ===

fn oc_fail(mut env: FunctionEnvMut<PluginEnv>, ptr: u32, len: u32) -> Result<(), RuntimeError> {
    let (data, store) = env.data_and_store_mut();
    let message = data
        .memory
        .as_ref()
        .and_then(|memory| read_string(memory, &store, ptr, len))
        .unwrap_or_else(|| "command failed".to_string());

    data.failure = Some(message.clone());
    Err(RuntimeError::new(message))
}
