//! Plugin loader with WASM support
//!
//! Compiles a unit file, instantiates it in a store of its own and wraps the
//! result as a [`Command`].

use std::io::Write;
use std::path::Path;

use wasmer::{Engine, FunctionEnv, Instance, Module, Store};

use super::abi::{ENTRY_POINT, INIT_EXPORT};
use super::command::{Command, CommandError};
use super::imports::{create_imports, PluginEnv};
use super::PluginError;

/// A loaded and instantiated command unit
pub struct WasmCommand {
    /// The WASM instance
    instance: Instance,

    /// The unit's own store; nothing else lives in it
    store: Store,

    /// Host-side state for this unit's imports
    env: FunctionEnv<PluginEnv>,
}

impl WasmCommand {
    /// Call the unit's init function if it exists
    fn call_init(&mut self) -> Result<(), PluginError> {
        if let Ok(func) = self.instance.exports.get_function(INIT_EXPORT) {
            let func = func.clone();
            func.call(&mut self.store, &[]).map_err(|e| {
                let message = self
                    .env
                    .as_mut(&mut self.store)
                    .failure
                    .take()
                    .unwrap_or_else(|| e.message());
                PluginError::Init(message)
            })?;
        }
        Ok(())
    }
}

impl Command for WasmCommand {
    fn run(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), CommandError> {
        let func = self
            .instance
            .exports
            .get_function(ENTRY_POINT)
            .map_err(|_| CommandError::MissingEntryPoint(ENTRY_POINT.to_string()))?
            .clone();

        self.env.as_mut(&mut self.store).begin(args);

        let result = func.call(&mut self.store, &[]);
        let data = self.env.as_mut(&mut self.store);
        let output = std::mem::take(&mut data.output);

        match result {
            Ok(_) => {
                out.write_all(output.as_bytes())?;
                Ok(())
            }
            Err(e) => match data.failure.take() {
                Some(message) => Err(CommandError::Raised(message)),
                None => Err(CommandError::Trap(e.message())),
            },
        }
    }
}

/// Plugin loader responsible for compiling and instantiating units
pub struct PluginLoader {
    /// Wasmer engine (shared across all units of one build)
    engine: Engine,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self {
            engine: Engine::default(),
        }
    }

    /// Load a unit file (`.wasm` binary or `.wat` text) as command `name`
    pub fn load(&self, path: &Path, name: &str) -> Result<WasmCommand, PluginError> {
        let wasm_bytes = std::fs::read(path).map_err(|e| {
            PluginError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;

        self.load_bytes(&wasm_bytes, name)
    }

    /// Load a unit from in-memory module bytes
    pub fn load_bytes(&self, bytes: &[u8], name: &str) -> Result<WasmCommand, PluginError> {
        // Each unit gets a store of its own, so no memory or globals are shared
        let mut store = Store::new(self.engine.clone());

        let module = Module::new(&store, bytes)
            .map_err(|e| PluginError::Compilation(e.to_string()))?;

        let env = FunctionEnv::new(&mut store, PluginEnv::new(name.to_string()));
        let imports = create_imports(&mut store, &env);

        let instance = Instance::new(&mut store, &module, &imports)
            .map_err(|e| PluginError::Instantiation(e.to_string()))?;

        if let Ok(memory) = instance.exports.get_memory("memory") {
            env.as_mut(&mut store).set_memory(memory.clone());
        }

        let mut command = WasmCommand { instance, store, env };
        command.call_init()?;

        Ok(command)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO_ARGS: &str = r#"
(module
  (import "env" "oc_arg_count" (func $count (result i32)))
  (import "env" "oc_arg_len" (func $len (param i32) (result i32)))
  (import "env" "oc_arg_read" (func $read (param i32 i32 i32) (result i32)))
  (import "env" "oc_print" (func $print (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "|")
  (func (export "run")
    (local $i i32)
    (local $n i32)
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (call $count)))
        (local.set $n (call $read (local.get $i) (i32.const 64) (i32.const 1024)))
        (call $print (i32.const 64) (local.get $n))
        (call $print (i32.const 0) (i32.const 1))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))))
"#;

    fn load(source: &str) -> Result<WasmCommand, PluginError> {
        PluginLoader::new().load_bytes(source.as_bytes(), "test")
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args_reach_guest() {
        let mut cmd = load(ECHO_ARGS).unwrap();
        let mut out = Vec::new();
        cmd.run(&args(&["a", "bc"]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a|bc|");
    }

    #[test]
    fn test_output_does_not_leak_between_calls() {
        let mut cmd = load(ECHO_ARGS).unwrap();

        let mut first = Vec::new();
        cmd.run(&args(&["one"]), &mut first).unwrap();
        let mut second = Vec::new();
        cmd.run(&args(&["two"]), &mut second).unwrap();

        assert_eq!(String::from_utf8(first).unwrap(), "one|");
        assert_eq!(String::from_utf8(second).unwrap(), "two|");
    }

    #[test]
    fn test_fail_carries_message() {
        let source = r#"
(module
  (import "env" "oc_print" (func $print (param i32 i32)))
  (import "env" "oc_fail" (func $fail (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "partial")
  (data (i32.const 16) "boom")
  (func (export "run")
    (call $print (i32.const 0) (i32.const 7))
    (call $fail (i32.const 16) (i32.const 4))))
"#;
        let mut cmd = load(source).unwrap();
        let mut out = Vec::new();
        let err = cmd.run(&[], &mut out).unwrap_err();
        assert!(matches!(err, CommandError::Raised(_)));
        assert_eq!(err.to_string(), "boom");
        // Partial output is dropped on failure
        assert!(out.is_empty());
    }

    #[test]
    fn test_trap_is_an_error() {
        let source = r#"(module (func (export "run") unreachable))"#;
        let mut cmd = load(source).unwrap();
        let err = cmd.run(&[], &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CommandError::Trap(_)));
    }

    #[test]
    fn test_missing_entry_point_loads_but_fails_on_call() {
        let mut cmd = load("(module)").unwrap();
        let err = cmd.run(&[], &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "no exported 'run' function");
    }

    #[test]
    fn test_init_trap_is_load_error() {
        let source = r#"(module (func (export "init") unreachable) (func (export "run")))"#;
        assert!(matches!(load(source), Err(PluginError::Init(_))));
    }

    #[test]
    fn test_malformed_module_is_compilation_error() {
        assert!(matches!(load("(module (func"), Err(PluginError::Compilation(_))));
    }

    #[test]
    fn test_unknown_import_is_instantiation_error() {
        let source = r#"(module (import "env" "nope" (func)) (func (export "run")))"#;
        assert!(matches!(load(source), Err(PluginError::Instantiation(_))));
    }

    #[test]
    fn test_arg_imports_out_of_range_and_truncated() {
        let source = r#"
(module
  (import "env" "oc_arg_len" (func $len (param i32) (result i32)))
  (import "env" "oc_arg_read" (func $read (param i32 i32 i32) (result i32)))
  (import "env" "oc_print" (func $print (param i32 i32)))
  (import "env" "oc_print_number" (func $num (param f64)))
  (memory (export "memory") 1)
  (data (i32.const 0) "|")
  (func $sep (call $print (i32.const 0) (i32.const 1)))
  (func (export "run")
    (call $num (f64.convert_i32_u (call $len (i32.const 0))))
    (call $sep)
    (call $num (f64.convert_i32_u (call $len (i32.const 7))))
    (call $sep)
    (call $print (i32.const 64) (call $read (i32.const 0) (i32.const 64) (i32.const 2)))
    (call $sep)
    (call $num (f64.convert_i32_u (call $read (i32.const 7) (i32.const 64) (i32.const 10))))))
"#;
        let mut cmd = load(source).unwrap();
        let mut out = Vec::new();
        cmd.run(&args(&["hello"]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "5.0|0.0|he|0.0");
    }

    #[test]
    fn test_print_larger_than_64k() {
        let source = r#"
(module
  (import "env" "oc_print" (func $print (param i32 i32)))
  (memory (export "memory") 2)
  (func (export "run")
    (call $print (i32.const 0) (i32.const 70000))))
"#;
        let mut cmd = load(source).unwrap();
        let mut out = Vec::new();
        cmd.run(&[], &mut out).unwrap();
        assert_eq!(out.len(), 70000);
    }

    #[test]
    fn test_print_invalid_utf8_is_replaced() {
        let source = r#"
(module
  (import "env" "oc_print" (func $print (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "ab\ff")
  (func (export "run")
    (call $print (i32.const 0) (i32.const 3))))
"#;
        let mut cmd = load(source).unwrap();
        let mut out = Vec::new();
        cmd.run(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ab\u{FFFD}");
    }

    #[test]
    fn test_print_outside_memory_is_an_error() {
        let source = r#"
(module
  (import "env" "oc_print" (func $print (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "run")
    (call $print (i32.const 65530) (i32.const 100))))
"#;
        let mut cmd = load(source).unwrap();
        let mut out = Vec::new();
        let err = cmd.run(&[], &mut out).unwrap_err();
        assert!(matches!(err, CommandError::Raised(_)));
        assert!(err.to_string().contains("outside guest memory"));
        assert!(out.is_empty());
    }
}
