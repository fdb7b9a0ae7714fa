//! Console streams and string buffers
//!
//! `System.out` and `System.in` both map onto the serial transport. The
//! stream object itself carries no state, so the receiver is popped and
//! dropped.

use core::fmt::Write;

use super::method::{input_stream, print_stream, string_buffer};
use super::{require, BufferWriter, Interpreter, NativeError, Value};
use crate::serial::{SerialIo, SerialTransport};

pub(super) fn print_stream<V: Interpreter, S: SerialTransport>(
    vm: &mut V,
    serial: &mut S,
    method: u8,
) -> Result<(), NativeError> {
    let newline = match method {
        print_stream::PRINTLN_STRING | print_stream::PRINTLN_INT | print_stream::PRINTLN_CHAR => {
            true
        }
        print_stream::PRINT_STRING | print_stream::PRINT_INT | print_stream::PRINT_CHAR => false,
        _ => return Err(NativeError::UnknownMethod),
    };
    require(vm, 2)?;

    match method {
        print_stream::PRINTLN_STRING | print_stream::PRINT_STRING => {
            let string = vm.stack_pop();
            vm.stack_pop();
            let mut index = 0;
            while let Some(byte) = vm.string_byte(string, index) {
                serial.putc(byte);
                index += 1;
            }
        }
        print_stream::PRINTLN_INT | print_stream::PRINT_INT => {
            let value = vm.stack_pop_int();
            vm.stack_pop();
            // SerialIo never fails
            let _ = write!(SerialIo(&mut *serial), "{value}");
        }
        _ => {
            let ch = vm.stack_pop_int();
            vm.stack_pop();
            serial.putc(ch as u8);
        }
    }

    if newline {
        serial.putc(b'\n');
    }
    Ok(())
}

pub(super) fn input_stream<V: Interpreter, S: SerialTransport>(
    vm: &mut V,
    serial: &mut S,
    method: u8,
) -> Result<(), NativeError> {
    let result = match method {
        input_stream::AVAILABLE => {
            require(vm, 1)?;
            vm.stack_pop();
            serial.available().min(Value::MAX as usize) as Value
        }
        input_stream::READ => {
            require(vm, 1)?;
            vm.stack_pop();
            serial.read_byte() as Value
        }
        _ => return Err(NativeError::UnknownMethod),
    };
    vm.stack_push(result);
    Ok(())
}

pub(super) fn string_buffer<V: Interpreter>(vm: &mut V, method: u8) -> Result<(), NativeError> {
    match method {
        string_buffer::INIT => {
            require(vm, 1)?;
            vm.stack_pop();
        }
        string_buffer::INIT_STRING => {
            require(vm, 2)?;
            let string = vm.stack_pop();
            let buffer = vm.stack_pop();
            let mut writer = BufferWriter::new(vm, buffer);
            writer.push_string(string);
            writer.finish();
        }
        string_buffer::APPEND_STRING => {
            require(vm, 2)?;
            let string = vm.stack_pop();
            let buffer = vm.stack_pop();
            let mut writer = BufferWriter::new(vm, buffer);
            writer.push_string(string);
            writer.finish();
            vm.stack_push(buffer);
        }
        string_buffer::APPEND_INT => {
            require(vm, 2)?;
            let value = vm.stack_pop_int();
            let buffer = vm.stack_pop();
            let mut writer = BufferWriter::new(vm, buffer);
            let _ = write!(writer, "{value}");
            writer.finish();
            vm.stack_push(buffer);
        }
        string_buffer::APPEND_CHAR => {
            require(vm, 2)?;
            let ch = vm.stack_pop_int();
            let buffer = vm.stack_pop();
            vm.buffer_append(buffer, &[ch as u8]);
            vm.stack_push(buffer);
        }
        string_buffer::TO_STRING => {
            // Heap buffers double as strings, the reference is the result
            require(vm, 1)?;
            let buffer = vm.stack_pop();
            vm.stack_push(buffer);
        }
        _ => return Err(NativeError::UnknownMethod),
    }
    Ok(())
}
