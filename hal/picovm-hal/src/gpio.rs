//! GPIO port abstractions
//!
//! Bytecode programs address pins as `(port, bit)` pairs, so the controller
//! works on whole ports rather than on typed pins.

/// Port/bit addressed digital I/O
///
/// Ports are numbered from 0 (`A`). Requests for a port or bit the chip
/// does not have are ignored by implementations.
pub trait GpioController {
    /// Configure a pin as input
    fn set_input(&mut self, port: u8, bit: u8);

    /// Configure a pin as push-pull output
    fn set_output(&mut self, port: u8, bit: u8);

    /// Drive an output pin high
    fn set_bit(&mut self, port: u8, bit: u8);

    /// Drive an output pin low
    fn clear_bit(&mut self, port: u8, bit: u8);
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Input,
    Output,
}

/// In-memory port image
///
/// Tracks direction and output latch for up to `P` ports of 16 bits. Used
/// by targets without real pins (desktop emulation) and by tests.
#[derive(Debug, Clone)]
pub struct PortImage<const P: usize> {
    outputs: [u16; P],
    latches: [u16; P],
}

impl<const P: usize> Default for PortImage<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const P: usize> PortImage<P> {
    /// Create an image with every pin an input driven low
    pub const fn new() -> Self {
        Self {
            outputs: [0; P],
            latches: [0; P],
        }
    }

    /// Direction of a pin, or `None` if it does not exist
    pub fn direction(&self, port: u8, bit: u8) -> Option<Direction> {
        let (port, mask) = Self::locate(port, bit)?;
        Some(if self.outputs[port] & mask != 0 {
            Direction::Output
        } else {
            Direction::Input
        })
    }

    /// Output latch level of a pin, or `None` if it does not exist
    pub fn level(&self, port: u8, bit: u8) -> Option<bool> {
        let (port, mask) = Self::locate(port, bit)?;
        Some(self.latches[port] & mask != 0)
    }

    fn locate(port: u8, bit: u8) -> Option<(usize, u16)> {
        if (port as usize) < P && bit < 16 {
            Some((port as usize, 1 << bit))
        } else {
            None
        }
    }
}

impl<const P: usize> GpioController for PortImage<P> {
    fn set_input(&mut self, port: u8, bit: u8) {
        if let Some((port, mask)) = Self::locate(port, bit) {
            self.outputs[port] &= !mask;
        }
    }

    fn set_output(&mut self, port: u8, bit: u8) {
        if let Some((port, mask)) = Self::locate(port, bit) {
            self.outputs[port] |= mask;
        }
    }

    fn set_bit(&mut self, port: u8, bit: u8) {
        if let Some((port, mask)) = Self::locate(port, bit) {
            self.latches[port] |= mask;
        }
    }

    fn clear_bit(&mut self, port: u8, bit: u8) {
        if let Some((port, mask)) = Self::locate(port, bit) {
            self.latches[port] &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_image_direction() {
        let mut ports = PortImage::<2>::new();
        assert_eq!(ports.direction(1, 3), Some(Direction::Input));

        ports.set_output(1, 3);
        assert_eq!(ports.direction(1, 3), Some(Direction::Output));

        ports.set_input(1, 3);
        assert_eq!(ports.direction(1, 3), Some(Direction::Input));
    }

    #[test]
    fn test_port_image_levels() {
        let mut ports = PortImage::<1>::new();
        ports.set_bit(0, 15);
        assert_eq!(ports.level(0, 15), Some(true));
        assert_eq!(ports.level(0, 14), Some(false));

        ports.clear_bit(0, 15);
        assert_eq!(ports.level(0, 15), Some(false));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut ports = PortImage::<1>::new();
        ports.set_output(4, 0);
        ports.set_bit(0, 16);
        assert_eq!(ports.direction(4, 0), None);
        assert_eq!(ports.level(0, 16), None);
    }
}
