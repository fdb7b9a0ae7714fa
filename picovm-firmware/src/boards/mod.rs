//! Board bring-up
//!
//! Each board module wires its chip HAL to the core: serial transport with
//! statically allocated ring buffers, tick timer, GPIO and the persistent
//! store. Interrupt handlers only reach their state through [`Handoff`]
//! slots filled here before the interrupt is unmasked.
//!
//! [`Handoff`]: picovm_core::Handoff

use picovm_core::store::VirtualMap;
use picovm_core::NativeDispatcher;

use crate::config::{CODE_SIZE, STORE_REGIONS};

#[cfg(feature = "rp2040")]
mod rp2040;
#[cfg(feature = "stm32f103rb")]
mod stm32f103rb;

#[cfg(feature = "rp2040")]
pub use rp2040::{board_init, Gpio, Serial, Store};
#[cfg(feature = "stm32f103rb")]
pub use stm32f103rb::{board_init, Gpio, Serial, Store};

/// Tag layout of the emulated EEPROM
pub const STORE_MAP: VirtualMap<'static> = VirtualMap::new(STORE_REGIONS);

const _: () = assert!(STORE_MAP.validate(), "store regions overlap or use tag 0xFFFF");
const _: () = assert!(STORE_MAP.capacity() >= CODE_SIZE, "store cannot hold the code image");

/// Everything the interpreter needs from the board
pub struct Board {
    pub natives: NativeDispatcher<'static, Serial, Gpio>,
    pub store: Store,
}
