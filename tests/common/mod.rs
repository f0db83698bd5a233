//! Common test utilities for opencode integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub use opencode::{execute, run, CommandRegistry};
pub use tempfile::TempDir;

/// Sample units shipped in ./functions
pub const ADD: &str = include_str!("../../functions/add.wat");
pub const ECHO: &str = include_str!("../../functions/echo.wat");
pub const FAIL: &str = include_str!("../../functions/fail.wat");

/// A unit that prints `text` verbatim
pub fn printer(text: &str) -> String {
    let escaped: String = text
        .bytes()
        .map(|b| format!("\\{:02x}", b))
        .collect();
    format!(
        r#"(module
  (import "env" "oc_print" (func $print (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{}")
  (func (export "run") (call $print (i32.const 0) (i32.const {}))))"#,
        escaped,
        text.len()
    )
}

/// Write a unit file into `dir`
pub fn write_unit(dir: &Path, file_name: &str, source: &str) {
    fs::write(dir.join(file_name), source).unwrap();
}

/// A temp functions directory holding the shipped sample units
pub fn sample_functions() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "add.wat", ADD);
    write_unit(dir.path(), "echo.wat", ECHO);
    write_unit(dir.path(), "fail.wat", FAIL);
    dir
}
