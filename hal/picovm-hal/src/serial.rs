//! UART serial controller abstractions
//!
//! The transport in `picovm-core` drives the UART one byte at a time from
//! its interrupt handler, so the trait exposes the data register and the
//! interrupt enables rather than a buffered read/write API.

/// UART controller registers
///
/// Implementations are thin register handles. They must be cheap to clone:
/// one clone is owned by the main context (it only touches the transmit
/// interrupt enable), the other by the interrupt handler.
pub trait SerialController: Clone {
    /// Apply bit rate and frame format, enable receiver and transmitter
    ///
    /// # Arguments
    /// * `config` - Frame configuration
    /// * `clock_hz` - Peripheral clock feeding the baud rate generator
    fn configure(&mut self, config: &UartConfig, clock_hz: u32);

    /// A received byte is waiting in the data register
    fn rx_ready(&self) -> bool;

    /// Read the received byte (clears the receive flag)
    fn read_data(&mut self) -> u8;

    /// The transmit data register can accept a byte
    fn tx_ready(&self) -> bool;

    /// Load a byte into the transmit data register
    fn write_data(&mut self, byte: u8);

    /// Enable or disable the receive interrupt
    fn set_rx_interrupt(&mut self, enabled: bool);

    /// Enable or disable the transmit-empty interrupt
    fn set_tx_interrupt(&mut self, enabled: bool);

    /// Check whether the transmit-empty interrupt is currently enabled
    fn tx_interrupt_enabled(&self) -> bool;
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// 8N1 frame at the given bit rate
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::with_baudrate(9600)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

/// Integer baud rate divisor for a 16x oversampling UART
///
/// Returns the divisor in 1/16 units, i.e. mantissa in the upper bits and
/// the 4-bit fraction in the low nibble, rounded to nearest.
pub const fn oversample16_divisor(clock_hz: u32, baudrate: u32) -> u32 {
    if baudrate == 0 {
        return 0;
    }
    (clock_hz + baudrate / 2) / baudrate
}

/// Integer and fractional baud divisors for a PL011 UART
///
/// The PL011 divides `clock_hz / (16 * baudrate)` into a 16-bit integer
/// part and a 6-bit fraction. Out-of-range results clamp to the slowest
/// or fastest rate the divider supports.
pub const fn pl011_divisors(clock_hz: u32, baudrate: u32) -> (u16, u8) {
    if baudrate == 0 {
        return (0xFFFF, 0);
    }
    // Fraction scaled by 128 so rounding to 64ths is a shift plus one
    let div = (8 * clock_hz as u64) / baudrate as u64;
    let int = div >> 7;
    if int == 0 {
        (1, 0)
    } else if int >= 0xFFFF {
        (0xFFFF, 0)
    } else {
        (int as u16, (((div & 0x7F) + 1) / 2) as u8)
    }
}
