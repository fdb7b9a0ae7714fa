//! picovm - firmware image
//!
//! Boots one board (selected by Cargo feature), brings up the native
//! bridge and hands the serial line to the monitor until an interpreter is
//! linked in.

#![no_std]
#![no_main]

#[cfg(not(any(feature = "stm32f103rb", feature = "rp2040")))]
compile_error!("select a board: --features stm32f103rb or --features rp2040");

#[cfg(all(feature = "stm32f103rb", feature = "rp2040"))]
compile_error!("features stm32f103rb and rp2040 are mutually exclusive");

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use picovm_core::{monitor, PersistentStore, FEATURES};

mod boards;
mod config;

/// Bytes of the stored program image shown at boot
const IMAGE_HEADER_LEN: usize = 4;

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("picovm firmware starting on {}", config::BOARD_NAME);

    let mut board = boards::board_init();
    monitor::banner(board.natives.serial(), config::BOARD_NAME);

    info!(
        "Store: {} bytes (code {}, heap {})",
        board.store.capacity(),
        config::CODE_SIZE,
        config::HEAP_SIZE
    );
    info!("Features: {}", FEATURES);

    let mut header = [0u8; IMAGE_HEADER_LEN];
    match board.store.read_block(&mut header, 0) {
        Ok(()) => info!("Image header: {:02x}", header),
        Err(e) => warn!("Image header unreadable: {}", e),
    }

    info!("Entering serial monitor");
    loop {
        if monitor::echo(board.natives.serial()).is_none() {
            // Any interrupt (RX or tick) wakes the core
            cortex_m::asm::wfi();
        }
    }
}
