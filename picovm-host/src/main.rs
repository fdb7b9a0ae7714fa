//! picovm desktop emulation target
//!
//! Runs the native bridge on a workstation: the controlling terminal (or a
//! device) is the serial line, a thread emulates the tick interrupt and
//! the persistent store is a file. Log output goes to stderr so it never
//! mixes with the serial stream on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use picovm_core::{monitor, NativeDispatcher, PersistentStore, TickCounter, FEATURES};
use picovm_hal::gpio::PortImage;

mod image;
mod terminal;
mod ticker;

use image::FileImage;
use terminal::TerminalSerial;
use ticker::TickThread;

/// Ports the emulated GPIO controller exposes
const GPIO_PORTS: usize = 4;

/// Bytes of the stored program image shown at start
const IMAGE_HEADER_LEN: usize = 4;

static TICKS: TickCounter = TickCounter::new();

#[derive(Debug, Parser)]
#[command(version, about = "picovm desktop emulation target")]
struct Cli {
    /// Serial device to use instead of the controlling terminal.
    #[arg(long, value_name = "PATH")]
    port: Option<PathBuf>,

    /// EEPROM image file.
    #[arg(long, value_name = "FILE", default_value = "eeprom.bin")]
    eeprom: PathBuf,

    /// EEPROM image size in bytes.
    #[arg(long, default_value_t = 1024)]
    eeprom_size: usize,

    /// Emulated tick interrupt rate in Hz.
    #[arg(long, default_value_t = 1000)]
    tick_hz: u32,

    /// Clock frequency reported to programs, in Hz.
    #[arg(long, default_value_t = 8_000_000)]
    clock_hz: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let serial = match &cli.port {
        Some(path) => TerminalSerial::open(path)?,
        None => TerminalSerial::stdio()?,
    };
    let _ticker = TickThread::spawn(&TICKS, cli.tick_hz)?;
    let mut image = FileImage::load(&cli.eeprom, cli.eeprom_size)?;

    let mut natives = NativeDispatcher::new(
        serial,
        TICKS.source(),
        PortImage::<GPIO_PORTS>::new(),
        cli.clock_hz,
    );

    info!(
        "Store: {} bytes in {}",
        image.capacity(),
        image.path().display()
    );
    info!("Features: {:?}", FEATURES);

    let mut header = [0u8; IMAGE_HEADER_LEN];
    match image.read_block(&mut header, 0) {
        Ok(()) => info!("Image header: {:02x?}", header),
        Err(e) => warn!("Image header unreadable: {e:?}"),
    }

    monitor::banner(natives.serial(), "host");
    info!("Entering serial monitor, Ctrl-D exits");
    loop {
        match monitor::echo(natives.serial()) {
            Some(monitor::EOT) => break,
            None if natives.serial().at_eof() => break,
            _ => {}
        }
    }

    image.save().context("failed to save EEPROM image")?;
    Ok(())
}
