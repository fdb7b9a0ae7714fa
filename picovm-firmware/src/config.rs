//! Board configuration
//!
//! Generated by build.rs from `boards/<board>.toml`.

use picovm_core::serial::{RxOverflow, RxUnderflow, SerialPolicy};
use picovm_core::store::VirtualRegion;

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));
