//! Board-agnostic native bridge for the picovm bytecode runtime
//!
//! Everything between the interpreter and the hardware traits of
//! `picovm-hal`:
//!
//! - Lock-free byte ring buffers shared with interrupt handlers
//! - Serial transport contract and its interrupt-driven backend
//! - Tick counter and timing natives
//! - Persistent byte store (direct and virtual-tag addressing)
//! - Native method dispatcher
//! - Compile-time feature report
//! - Boot banner and echo monitor
//!
//! The opcode loop, operand stack and heap belong to the interpreter and
//! are reached through [`native::Interpreter`].
//!
//! # Testing
//!
//! The math, formatter, platform and stack-check natives are off by
//! default, and so are their integration tests. Run the full set with:
//!
//! ```text
//! cargo test -p picovm-core --all-features
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod irq;
pub mod monitor;
pub mod native;
pub mod ring;
pub mod serial;
pub mod store;
pub mod tick;

pub use config::{VmFeatures, FEATURES};
pub use irq::Handoff;
pub use native::{native_invoke, native_new, Interpreter, NativeDispatcher, NativeError, NativeRef, Value};
pub use ring::RingBuffer;
pub use serial::{InterruptSerial, SerialIo, SerialIsr, SerialPolicy, SerialTransport};
pub use store::{DirectStore, PersistentStore, StoreError, VirtualMap, VirtualRegion, VirtualStore};
pub use tick::{TickCounter, TickSource};
