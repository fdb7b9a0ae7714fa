//! Native method dispatch
//!
//! The interpreter hands every call into a builtin class to
//! [`native_invoke`] as a [`NativeRef`]. The dispatcher decodes the class,
//! hands the method id to that class's handler, and the handler exchanges
//! operands with the interpreter's stack:
//!
//! - arguments are popped last-argument-first, then the receiver (if any)
//! - at most one result is pushed
//!
//! Unknown classes and methods are reported before anything is popped.
//!
//! ```text
//! NativeRef 0x0102
//!   │  class 0x01 ──► PrintStream ──► println(int)
//!   │                      │
//!   ▼                      ▼
//! Interpreter stack    SerialTransport::putc
//! ```

mod object;
pub mod reference;

#[cfg(feature = "formatter")]
mod formatter;
#[cfg(feature = "math")]
mod math;
#[cfg(feature = "platform")]
mod platform;
#[cfg(feature = "stdio")]
mod stdio;

use picovm_hal::gpio::GpioController;

use crate::serial::SerialTransport;
use crate::tick::TickSource;

pub use reference::{method, NativeClass, NativeRef};

/// Operand stack cell
pub type Value = i32;

/// Type tag marking a [`Value`] as a heap reference
pub const HEAP_TAG: Value = 0x4000_0000;

/// Tag a heap object id as a reference value
pub const fn heap_ref(id: u16) -> Value {
    HEAP_TAG | id as Value
}

/// Native call failures, forwarded to the interpreter's error sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NativeError {
    /// Class id not compiled into this build
    UnknownClass,
    /// Class known, method id not
    UnknownMethod,
    /// Fewer operands on the stack than the method pops
    StackUnderflow,
}

/// Services the interpreter provides to native methods
pub trait Interpreter {
    /// Push a value onto the operand stack
    fn stack_push(&mut self, value: Value);

    /// Pop a reference or raw cell
    fn stack_pop(&mut self) -> Value;

    /// Pop an integer, sign-extended to full width
    fn stack_pop_int(&mut self) -> i32;

    /// Allocate a heap object of `size` bytes, returning its id
    ///
    /// Exhaustion is the allocator's to report; this call does not fail.
    fn heap_alloc(&mut self, zero: bool, size: u16) -> u16;

    /// Byte `index` of a string value (constant or heap), `None` past the end
    fn string_byte(&self, string: Value, index: usize) -> Option<u8>;

    /// Append bytes to a heap string buffer, growing it as needed
    fn buffer_append(&mut self, buffer: Value, bytes: &[u8]);

    /// Current operand stack depth, if the interpreter tracks it
    fn stack_depth(&self) -> Option<usize> {
        None
    }

    /// Abort the current native call with `kind`
    fn error(&mut self, kind: NativeError);
}

/// Routes native references to their class handlers
///
/// Owns the peripherals the natives drive.
pub struct NativeDispatcher<'a, S, G> {
    #[cfg_attr(not(feature = "stdio"), allow(dead_code))]
    serial: S,
    #[cfg_attr(not(feature = "platform"), allow(dead_code))]
    ticks: TickSource<'a>,
    #[cfg_attr(not(feature = "platform"), allow(dead_code))]
    gpio: G,
    #[cfg_attr(not(feature = "platform"), allow(dead_code))]
    clock_hz: u32,
}

impl<'a, S: SerialTransport, G: GpioController> NativeDispatcher<'a, S, G> {
    /// # Arguments
    /// * `serial` - Transport behind `System.out` / `System.in`
    /// * `ticks` - Counter behind the timer natives
    /// * `gpio` - Ports behind the GPIO natives
    /// * `clock_hz` - Core clock reported by the board natives
    pub fn new(serial: S, ticks: TickSource<'a>, gpio: G, clock_hz: u32) -> Self {
        Self {
            serial,
            ticks,
            gpio,
            clock_hz,
        }
    }

    /// Access the serial transport outside of native calls
    pub fn serial(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Access the GPIO controller outside of native calls
    pub fn gpio(&mut self) -> &mut G {
        &mut self.gpio
    }

    /// Execute a native method
    pub fn invoke<V: Interpreter>(
        &mut self,
        vm: &mut V,
        reference: NativeRef,
    ) -> Result<(), NativeError> {
        let class = NativeClass::from_id(reference.class_id()).ok_or(NativeError::UnknownClass)?;
        let method = reference.method_id();

        match class {
            NativeClass::Object => object::invoke(vm, method),
            #[cfg(feature = "stdio")]
            NativeClass::PrintStream => stdio::print_stream(vm, &mut self.serial, method),
            #[cfg(feature = "stdio")]
            NativeClass::InputStream => stdio::input_stream(vm, &mut self.serial, method),
            #[cfg(feature = "stdio")]
            NativeClass::StringBuffer => stdio::string_buffer(vm, method),
            #[cfg(feature = "math")]
            NativeClass::Math => math::invoke(vm, method),
            #[cfg(feature = "formatter")]
            NativeClass::Formatter => formatter::invoke(vm, method),
            #[cfg(feature = "platform")]
            NativeClass::Board => platform::board(vm, self.clock_hz, method),
            #[cfg(feature = "platform")]
            NativeClass::Gpio => platform::gpio(vm, &mut self.gpio, method),
            #[cfg(feature = "platform")]
            NativeClass::Timer => platform::timer(vm, &self.ticks, method),
        }
    }

    /// Allocate an instance of a native class (`new` bytecode)
    ///
    /// Only `StringBuffer` can be instantiated; the new object is an empty
    /// heap buffer and its tagged reference is pushed.
    pub fn invoke_new<V: Interpreter>(
        &mut self,
        vm: &mut V,
        reference: NativeRef,
    ) -> Result<(), NativeError> {
        match NativeClass::from_id(reference.class_id()) {
            #[cfg(feature = "stdio")]
            Some(NativeClass::StringBuffer) => {
                let id = vm.heap_alloc(false, 1);
                vm.stack_push(heap_ref(id));
                Ok(())
            }
            _ => Err(NativeError::UnknownClass),
        }
    }
}

/// Interpreter entry point for native calls
///
/// Failures go to [`Interpreter::error`].
pub fn native_invoke<V, S, G>(
    dispatcher: &mut NativeDispatcher<'_, S, G>,
    vm: &mut V,
    reference: NativeRef,
) where
    V: Interpreter,
    S: SerialTransport,
    G: GpioController,
{
    if let Err(kind) = dispatcher.invoke(vm, reference) {
        vm.error(kind);
    }
}

/// Interpreter entry point for `new` on a native class
pub fn native_new<V, S, G>(
    dispatcher: &mut NativeDispatcher<'_, S, G>,
    vm: &mut V,
    reference: NativeRef,
) where
    V: Interpreter,
    S: SerialTransport,
    G: GpioController,
{
    if let Err(kind) = dispatcher.invoke_new(vm, reference) {
        vm.error(kind);
    }
}

/// Check that `operands` cells can be popped
///
/// Always succeeds unless built with `stack-check` and the interpreter
/// reports its depth.
fn require<V: Interpreter>(vm: &V, operands: usize) -> Result<(), NativeError> {
    if cfg!(feature = "stack-check") {
        if let Some(depth) = vm.stack_depth() {
            if depth < operands {
                return Err(NativeError::StackUnderflow);
            }
        }
    }
    Ok(())
}

/// Number of bytes in a string value
#[cfg(any(feature = "stdio", feature = "formatter"))]
fn string_len<V: Interpreter>(vm: &V, string: Value) -> usize {
    let mut len = 0;
    while vm.string_byte(string, len).is_some() {
        len += 1;
    }
    len
}

/// Batches bytes into `buffer_append` calls on a heap buffer
#[cfg(any(feature = "stdio", feature = "formatter"))]
struct BufferWriter<'v, V: Interpreter> {
    vm: &'v mut V,
    buffer: Value,
    chunk: heapless::Vec<u8, 16>,
}

#[cfg(any(feature = "stdio", feature = "formatter"))]
impl<'v, V: Interpreter> BufferWriter<'v, V> {
    fn new(vm: &'v mut V, buffer: Value) -> Self {
        Self {
            vm,
            buffer,
            chunk: heapless::Vec::new(),
        }
    }

    fn push(&mut self, byte: u8) {
        if self.chunk.is_full() {
            self.flush();
        }
        // Cannot fail: the chunk was just flushed if it was full
        let _ = self.chunk.push(byte);
    }

    /// Append a whole string value
    ///
    /// The length is taken up front so appending a buffer to itself
    /// terminates.
    fn push_string(&mut self, string: Value) {
        let len = string_len(self.vm, string);
        for index in 0..len {
            match self.vm.string_byte(string, index) {
                Some(byte) => self.push(byte),
                None => break,
            }
        }
    }

    fn flush(&mut self) {
        if !self.chunk.is_empty() {
            self.vm.buffer_append(self.buffer, &self.chunk);
            self.chunk.clear();
        }
    }

    fn finish(mut self) {
        self.flush();
    }
}

#[cfg(any(feature = "stdio", feature = "formatter"))]
impl<V: Interpreter> core::fmt::Write for BufferWriter<'_, V> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.push(byte);
        }
        Ok(())
    }
}
