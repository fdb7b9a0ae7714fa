//! Serial monitor
//!
//! What a board runs once it is up and no interpreter is linked in: print
//! a banner, then echo every received byte. A carriage return comes back
//! as CR LF so a raw terminal moves to a fresh line.

use core::fmt::Write;

use crate::serial::{SerialIo, SerialTransport};

/// End of transmission (`Ctrl-D`), never echoed
pub const EOT: u8 = 0x04;

/// Print the boot banner for `board`
pub fn banner<S: SerialTransport>(serial: &mut S, board: &str) {
    let _ = writeln!(
        SerialIo(serial),
        "picovm {} ({board})",
        env!("CARGO_PKG_VERSION")
    );
}

/// Echo one pending byte
///
/// Returns the byte that was consumed, or `None` when nothing was waiting.
/// Never blocks longer than the backend's `available()` does.
pub fn echo<S: SerialTransport>(serial: &mut S) -> Option<u8> {
    if serial.available() == 0 {
        return None;
    }
    let byte = serial.read_byte();
    match byte {
        b'\r' => serial.putc(b'\n'),
        EOT => {}
        _ => serial.write_byte(byte),
    }
    Some(byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::{Deque, Vec};

    #[derive(Default)]
    struct Loopback {
        input: Deque<u8, 16>,
        output: Vec<u8, 64>,
    }

    impl SerialTransport for Loopback {
        fn write_byte(&mut self, byte: u8) {
            let _ = self.output.push(byte);
        }

        fn read_byte(&mut self) -> u8 {
            self.input.pop_front().unwrap_or(0)
        }

        fn available(&mut self) -> usize {
            self.input.len()
        }
    }

    #[test]
    fn test_banner_ends_in_crlf() {
        let mut serial = Loopback::default();
        banner(&mut serial, "test");
        assert!(serial.output.starts_with(b"picovm "));
        assert!(serial.output.ends_with(b"(test)\r\n"));
    }

    #[test]
    fn test_echo_idle() {
        let mut serial = Loopback::default();
        assert_eq!(echo(&mut serial), None);
        assert!(serial.output.is_empty());
    }

    #[test]
    fn test_echo_translates_cr() {
        let mut serial = Loopback::default();
        for &b in b"a\rb" {
            serial.input.push_back(b).unwrap();
        }
        while echo(&mut serial).is_some() {}
        assert_eq!(serial.output.as_slice(), b"a\r\nb");
    }

    #[test]
    fn test_eot_is_reported_not_echoed() {
        let mut serial = Loopback::default();
        serial.input.push_back(EOT).unwrap();
        assert_eq!(echo(&mut serial), Some(EOT));
        assert!(serial.output.is_empty());
    }
}
