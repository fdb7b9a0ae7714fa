//! Board peripheral classes: board info, GPIO and the tick timer
//!
//! All methods are static, no receiver is popped.

use picovm_hal::gpio::GpioController;

use super::method::{board, gpio, timer};
use super::{require, Interpreter, NativeError, Value};
use crate::tick::TickSource;

pub(super) fn board<V: Interpreter>(
    vm: &mut V,
    clock_hz: u32,
    method: u8,
) -> Result<(), NativeError> {
    match method {
        board::GET_CLOCK => {
            vm.stack_push((clock_hz / 1000) as Value);
            Ok(())
        }
        _ => Err(NativeError::UnknownMethod),
    }
}

pub(super) fn gpio<V: Interpreter, G: GpioController>(
    vm: &mut V,
    ports: &mut G,
    method: u8,
) -> Result<(), NativeError> {
    let op: fn(&mut G, u8, u8) = match method {
        gpio::SET_INPUT => G::set_input,
        gpio::SET_OUTPUT => G::set_output,
        gpio::SET_BIT => G::set_bit,
        gpio::CLR_BIT => G::clear_bit,
        _ => return Err(NativeError::UnknownMethod),
    };
    require(vm, 2)?;
    let bit = pin_index(vm.stack_pop_int());
    let port = pin_index(vm.stack_pop_int());
    op(ports, port, bit);
    Ok(())
}

/// Narrow a port or bit operand; anything out of `u8` range maps to a
/// value every controller ignores
fn pin_index(value: i32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

pub(super) fn timer<V: Interpreter>(
    vm: &mut V,
    ticks: &TickSource<'_>,
    method: u8,
) -> Result<(), NativeError> {
    match method {
        timer::SET_SPEED => {
            require(vm, 1)?;
            ticks.set_speed(vm.stack_pop_int().max(0) as u32);
        }
        timer::GET => vm.stack_push(ticks.get() as Value),
        timer::WAIT => {
            require(vm, 1)?;
            ticks.wait(vm.stack_pop_int().max(0) as u32);
        }
        timer::SET_PRESCALER => {
            require(vm, 1)?;
            ticks.set_prescaler(vm.stack_pop_int().max(0) as u32);
        }
        _ => return Err(NativeError::UnknownMethod),
    }
    Ok(())
}
