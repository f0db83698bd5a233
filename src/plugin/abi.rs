//! Plugin ABI constants and memory helpers
//!
//! Helpers for moving strings across the host/guest boundary plus the
//! number conventions used by the `oc_arg_number` and `oc_print_number`
//! imports.

use wasmer::{Memory, MemoryView, StoreMut, WasmPtr};

/// Maximum size for a single string crossing the boundary
pub const MAX_STRING_LEN: u32 = 65536; // 64KB

/// Name of the exported entry point every command is invoked through
pub const ENTRY_POINT: &str = "run";

/// Name of the optional export called once after instantiation
pub const INIT_EXPORT: &str = "init";

/// Read a string from WASM memory
pub fn read_string(memory: &Memory, store: &StoreMut, ptr: u32, len: u32) -> Option<String> {
    if len > MAX_STRING_LEN {
        return None;
    }
    String::from_utf8(read_bytes(memory, store, ptr, len)?).ok()
}

/// Read raw bytes from WASM memory.
///
/// Only bounded by the guest's memory: `None` means `ptr..ptr + len` falls
/// outside it.
pub fn read_bytes(memory: &Memory, store: &StoreMut, ptr: u32, len: u32) -> Option<Vec<u8>> {
    if len == 0 {
        return Some(Vec::new());
    }

    let view: MemoryView = memory.view(store);
    let end = u64::from(ptr) + u64::from(len);
    if end > view.data_size() {
        return None;
    }

    let mut buffer = vec![0u8; len as usize];
    let wasm_ptr: WasmPtr<u8> = WasmPtr::new(ptr);
    let slice = wasm_ptr.slice(&view, len).ok()?;
    slice.read_slice(&mut buffer).ok()?;

    Some(buffer)
}

/// Write a string to WASM memory, returning the number of bytes written
pub fn write_string(
    memory: &Memory,
    store: &StoreMut,
    ptr: u32,
    max_len: u32,
    data: &str,
) -> u32 {
    let bytes = data.as_bytes();
    let write_len = std::cmp::min(bytes.len(), max_len as usize);

    if write_len == 0 {
        return 0;
    }

    let view: MemoryView = memory.view(store);
    let wasm_ptr: WasmPtr<u8> = WasmPtr::new(ptr);

    if let Ok(slice) = wasm_ptr.slice(&view, write_len as u32) {
        if slice.write_slice(&bytes[..write_len]).is_ok() {
            return write_len as u32;
        }
    }

    0
}

/// Parse a command argument as a number.
///
/// Accepts surrounding whitespace, `inf`/`infinity`/`nan` in any case and
/// `_` between digits.
pub fn parse_number(arg: &str) -> Option<f64> {
    let trimmed = arg.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(n);
    }

    if !valid_underscores(trimmed) {
        return None;
    }
    trimmed.replace('_', "").parse::<f64>().ok()
}

/// Underscores are only allowed between two digits
fn valid_underscores(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && i + 1 < bytes.len()
                && bytes[i - 1].is_ascii_digit()
                && bytes[i + 1].is_ascii_digit())
    })
}

/// Render a number the way commands print it: shortest round-trip digits,
/// integral values keep a trailing `.0`, exponents carry a sign and at
/// least two digits.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Debug already switches to scientific notation outside 1e-5..1e16
    let repr = format!("{:?}", n);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}
