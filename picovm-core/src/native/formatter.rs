//! `nanovm/util/Formatter`
//!
//! `format(String fmt, int value)` renders `value` into a new heap string
//! using printf-style conversions:
//!
//! ```text
//! %[-][0][width](d|u|x|X|c|%)
//! ```
//!
//! Every conversion formats the same single value. Unknown conversions are
//! copied to the output unchanged.

use core::fmt::Write;

use heapless::{String, Vec};

use super::method::formatter;
use super::{heap_ref, require, BufferWriter, Interpreter, NativeError, Value};

pub(super) fn invoke<V: Interpreter>(vm: &mut V, method: u8) -> Result<(), NativeError> {
    match method {
        formatter::FORMAT => {
            require(vm, 2)?;
            let value = vm.stack_pop_int();
            let format = vm.stack_pop();
            let result = heap_ref(vm.heap_alloc(false, 1));
            render(vm, result, format, value);
            vm.stack_push(result);
            Ok(())
        }
        _ => Err(NativeError::UnknownMethod),
    }
}

#[derive(Debug, Default, PartialEq)]
struct Spec {
    left: bool,
    zero: bool,
    width: usize,
}

fn render<V: Interpreter>(vm: &mut V, result: Value, format: Value, value: i32) {
    let len = super::string_len(vm, format);
    let mut out = BufferWriter::new(vm, result);
    let mut index = 0;

    while index < len {
        let Some(byte) = out.vm.string_byte(format, index) else {
            break;
        };
        index += 1;
        if byte != b'%' {
            out.push(byte);
            continue;
        }

        let start = index - 1;
        let mut spec = Spec::default();
        let mut conversion = None;
        while let Some(next) = out.vm.string_byte(format, index) {
            index += 1;
            match next {
                b'-' if spec.width == 0 => spec.left = true,
                b'0' if spec.width == 0 => spec.zero = true,
                b'0'..=b'9' => {
                    spec.width = (spec.width * 10 + (next - b'0') as usize).min(MAX_WIDTH);
                }
                _ => {
                    conversion = Some(next);
                    break;
                }
            }
        }

        match conversion.and_then(|c| convert(c, value)) {
            Some(body) => pad(&mut out, &spec, &body),
            None => {
                // Not a conversion, copy the directive through
                for raw in start..index {
                    if let Some(b) = out.vm.string_byte(format, raw) {
                        out.push(b);
                    }
                }
            }
        }
    }
    out.finish();
}

/// Widest field a directive may request
const MAX_WIDTH: usize = 64;

/// Unpadded text of one conversion
fn convert(conversion: u8, value: i32) -> Option<Vec<u8, 12>> {
    let mut text: String<12> = String::new();
    let written = match conversion {
        b'd' => write!(text, "{value}"),
        b'u' => write!(text, "{}", value as u32),
        b'x' => write!(text, "{:x}", value as u32),
        b'X' => write!(text, "{:X}", value as u32),
        b'c' => return Vec::from_slice(&[value as u8]).ok(),
        b'%' => return Vec::from_slice(b"%").ok(),
        _ => return None,
    };
    written.ok()?;
    Some(text.into_bytes())
}

fn pad<V: Interpreter>(out: &mut BufferWriter<'_, V>, spec: &Spec, body: &[u8]) {
    let fill = spec.width.saturating_sub(body.len());
    if spec.left {
        out.push_bytes(body);
        out.repeat(b' ', fill);
    } else if spec.zero {
        // Zeros go between the sign and the digits
        let digits = match body.strip_prefix(b"-") {
            Some(digits) => {
                out.push(b'-');
                digits
            }
            None => body,
        };
        out.repeat(b'0', fill);
        out.push_bytes(digits);
    } else {
        out.repeat(b' ', fill);
        out.push_bytes(body);
    }
}

impl<V: Interpreter> BufferWriter<'_, V> {
    fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    fn repeat(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.push(byte);
        }
    }
}
