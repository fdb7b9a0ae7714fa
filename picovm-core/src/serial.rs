//! Byte-oriented serial transport
//!
//! One logical byte stream per direction. Every backend presents the same
//! [`SerialTransport`] contract to the natives; how bytes move underneath
//! differs per target:
//!
//! - [`InterruptSerial`]: microcontrollers. Two [`RingBuffer`]s are filled
//!   and drained by [`SerialIsr::on_interrupt`]; the main thread never
//!   blocks. A full transmit buffer silently drops the byte.
//! - Terminal emulation on the desktop target lives in `picovm-host` and
//!   writes through immediately.
//!
//! Receive overflow and read-on-empty behavior are per-board choices, see
//! [`SerialPolicy`].

use picovm_hal::serial::{SerialController, UartConfig};

use crate::ring::{Consumer, Producer, RingBuffer};

/// Serial transport contract shared by all backends
pub trait SerialTransport {
    /// Queue or send one byte
    ///
    /// Interrupt-driven backends drop the byte when the transmit buffer is
    /// full. Write-through backends block until the channel accepted it.
    fn write_byte(&mut self, byte: u8);

    /// Take one received byte
    ///
    /// What an empty buffer yields is backend specific; call
    /// [`available`](Self::available) first.
    fn read_byte(&mut self) -> u8;

    /// Number of bytes that can be read without blocking
    ///
    /// Only the zero/non-zero distinction is exact across backends.
    fn available(&mut self) -> usize;

    /// Write a byte, expanding `\n` to `\r\n`
    fn putc(&mut self, byte: u8) {
        if byte == b'\n' {
            self.write_byte(b'\r');
        }
        self.write_byte(byte);
    }

    /// Write every byte of `bytes` through [`putc`](Self::putc)
    fn puts(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.putc(byte);
        }
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for &mut T {
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }

    fn read_byte(&mut self) -> u8 {
        (**self).read_byte()
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }
}

/// What the receive interrupt does when the RX buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOverflow {
    /// Keep the buffered data, discard the incoming byte
    DropNewest,
    /// Store the incoming byte over the oldest unread one
    OverwriteOldest,
}

/// What [`SerialTransport::read_byte`] returns when nothing was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxUnderflow {
    /// Return `0`
    Sentinel,
    /// Return whatever the slot at the read index holds, without advancing
    StaleSlot,
}

/// Per-board receive policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialPolicy {
    pub rx_overflow: RxOverflow,
    pub rx_underflow: RxUnderflow,
}

impl SerialPolicy {
    /// Drop incoming bytes on overflow, read `0` when empty
    pub const DROP_NEWEST: SerialPolicy = SerialPolicy {
        rx_overflow: RxOverflow::DropNewest,
        rx_underflow: RxUnderflow::Sentinel,
    };

    /// Overwrite the oldest byte on overflow, read the stale slot when empty
    pub const OVERWRITE_OLDEST: SerialPolicy = SerialPolicy {
        rx_overflow: RxOverflow::OverwriteOldest,
        rx_underflow: RxUnderflow::StaleSlot,
    };
}

/// Errors from bringing up the interrupt-driven backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// A ring buffer was already split for another transport
    BufferInUse,
}

/// Transmit side state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Transmit interrupt disabled and buffer empty
    Idle,
    /// Transmit interrupt armed, draining the buffer
    Transmitting,
}

/// Main-context half of the interrupt-driven transport
///
/// Owns the RX consumer and the TX producer.
pub struct InterruptSerial<'a, C, const RX: usize, const TX: usize> {
    controller: C,
    rx: Consumer<'a, RX>,
    tx: Producer<'a, TX>,
    policy: SerialPolicy,
}

/// Interrupt-context half of the interrupt-driven transport
///
/// Owns the RX producer and the TX consumer. Install it in a
/// [`Handoff`](crate::irq::Handoff) and call
/// [`on_interrupt`](Self::on_interrupt) from the UART vector.
pub struct SerialIsr<'a, C, const RX: usize, const TX: usize> {
    controller: C,
    rx: Producer<'a, RX>,
    tx: Consumer<'a, TX>,
    policy: SerialPolicy,
}

impl<'a, C: SerialController, const RX: usize, const TX: usize> InterruptSerial<'a, C, RX, TX> {
    /// Configure the UART and split both buffers between the two contexts
    ///
    /// Enables the receive interrupt in the peripheral. The interrupt line
    /// itself must stay masked until the returned [`SerialIsr`] is reachable
    /// from the handler. Neither buffer is split unless both are free.
    pub fn init(
        mut controller: C,
        config: &UartConfig,
        clock_hz: u32,
        rx: &'a RingBuffer<RX>,
        tx: &'a RingBuffer<TX>,
        policy: SerialPolicy,
    ) -> Result<(Self, SerialIsr<'a, C, RX, TX>), SerialError> {
        if rx.is_split() || tx.is_split() {
            return Err(SerialError::BufferInUse);
        }
        let (rx_producer, rx_consumer) = rx.split().ok_or(SerialError::BufferInUse)?;
        let (tx_producer, tx_consumer) = tx.split().ok_or(SerialError::BufferInUse)?;

        controller.set_tx_interrupt(false);
        controller.configure(config, clock_hz);
        controller.set_rx_interrupt(true);

        let isr = SerialIsr {
            controller: controller.clone(),
            rx: rx_producer,
            tx: tx_consumer,
            policy,
        };
        let serial = Self {
            controller,
            rx: rx_consumer,
            tx: tx_producer,
            policy,
        };
        Ok((serial, isr))
    }

    /// Receive policy in effect
    pub fn policy(&self) -> SerialPolicy {
        self.policy
    }

    /// Current transmitter state
    pub fn tx_state(&self) -> TxState {
        if !self.controller.tx_interrupt_enabled() && self.tx.is_empty() {
            TxState::Idle
        } else {
            TxState::Transmitting
        }
    }

    /// Spin until every queued byte has been handed to the UART
    ///
    /// Requires the UART interrupt to be running.
    pub fn flush(&mut self) {
        while self.tx_state() != TxState::Idle {
            core::hint::spin_loop();
        }
    }
}

impl<C: SerialController, const RX: usize, const TX: usize> SerialTransport
    for InterruptSerial<'_, C, RX, TX>
{
    fn write_byte(&mut self, byte: u8) {
        if !self.tx.push(byte) {
            return;
        }
        if !self.controller.tx_interrupt_enabled() {
            self.controller.set_tx_interrupt(true);
        }
    }

    fn read_byte(&mut self) -> u8 {
        match self.rx.pop() {
            Some(byte) => byte,
            None => match self.policy.rx_underflow {
                RxUnderflow::Sentinel => 0,
                RxUnderflow::StaleSlot => self.rx.peek_stale(),
            },
        }
    }

    fn available(&mut self) -> usize {
        self.rx.len()
    }
}

impl<C: SerialController, const RX: usize, const TX: usize> SerialIsr<'_, C, RX, TX> {
    /// Service the UART interrupt
    ///
    /// Moves at most one received byte into the RX buffer and at most one
    /// queued byte into the transmitter. When the TX buffer runs dry the
    /// transmit interrupt is disabled, returning the transmitter to idle.
    pub fn on_interrupt(&mut self) {
        if self.controller.rx_ready() {
            let byte = self.controller.read_data();
            match self.policy.rx_overflow {
                RxOverflow::DropNewest => {
                    self.rx.push(byte);
                }
                RxOverflow::OverwriteOldest => self.rx.force_push(byte),
            }
        }

        if self.controller.tx_interrupt_enabled() && self.controller.tx_ready() {
            match self.tx.pop() {
                Some(byte) => self.controller.write_data(byte),
                None => {
                    self.controller.set_tx_interrupt(false);
                    // A byte queued after the pop saw the interrupt still
                    // enabled and did not re-arm it
                    if !self.tx.is_empty() {
                        self.controller.set_tx_interrupt(true);
                    }
                }
            }
        }
    }
}

/// Adapter exposing a [`SerialTransport`] through `core::fmt::Write` and
/// the `embedded-io` blocking traits
///
/// `fmt::Write` goes through [`SerialTransport::putc`] (newline expansion);
/// `embedded_io::Write` sends bytes untranslated.
pub struct SerialIo<T>(pub T);

impl<T: SerialTransport> core::fmt::Write for SerialIo<T> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.puts(s.as_bytes());
        Ok(())
    }
}

impl<T> embedded_io::ErrorType for SerialIo<T> {
    type Error = core::convert::Infallible;
}

impl<T: SerialTransport> embedded_io::Write for SerialIo<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.0.write_byte(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: SerialTransport> embedded_io::Read for SerialIo<T> {
    /// Blocks until at least one byte arrived, then returns what is buffered
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.0.available() == 0 {
            core::hint::spin_loop();
        }
        let mut count = 0;
        while count < buf.len() && (count == 0 || self.0.available() > 0) {
            buf[count] = self.0.read_byte();
            count += 1;
        }
        Ok(count)
    }
}
