//! Terminal-emulation serial backend
//!
//! Reads stdin and writes stdout (or a device given with `--port`).
//! Writes go straight through; `available()` waits at most
//! [`POLL_TIMEOUT_MS`] for input.
//!
//! When the input is a terminal (the controlling one or a `--port` tty),
//! canonical mode, echo and CR-to-NL input translation are switched off
//! for the session. The saved mode is put back on that descriptor when the
//! backend is dropped, from an `atexit` hook, and from a `SIGINT` handler.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use log::{debug, warn};
use picovm_core::SerialTransport;

/// Upper bound on how long `available()` blocks
pub const POLL_TIMEOUT_MS: libc::c_int = 1;

/// Terminal and its mode saved before entering raw mode
static SAVED_MODE: OnceLock<(libc::c_int, libc::termios)> = OnceLock::new();

/// Set while the saved mode still has to be put back
static RESTORE_PENDING: AtomicBool = AtomicBool::new(false);

/// Byte channel over a terminal, a device or any readable descriptor
pub struct TerminalSerial {
    input: File,
    output: Box<dyn Write + Send>,
    raw_mode: bool,
    eof: bool,
}

impl TerminalSerial {
    /// Use the controlling terminal through stdin/stdout
    pub fn stdio() -> Result<Self> {
        let input = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .context("failed to duplicate stdin")?;
        let raw_mode = enter_raw_mode(input.as_raw_fd());

        let mut serial = Self::from_parts(input, Box::new(io::stdout()));
        serial.raw_mode = raw_mode;
        Ok(serial)
    }

    /// Use a serial device or FIFO for both directions
    ///
    /// A tty device is switched to raw mode like the controlling terminal.
    pub fn open(path: &Path) -> Result<Self> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .with_context(|| format!("unable to open {}", path.display()))?;
        let output = device
            .try_clone()
            .with_context(|| format!("unable to clone handle for {}", path.display()))?;
        let raw_mode = enter_raw_mode(device.as_raw_fd());

        let mut serial = Self::from_parts(OwnedFd::from(device), Box::new(output));
        serial.raw_mode = raw_mode;
        Ok(serial)
    }

    /// Build a backend from an input descriptor and an output sink
    pub fn from_parts(input: OwnedFd, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: File::from(input),
            output,
            raw_mode: false,
            eof: false,
        }
    }

    /// Whether the input side has reached end of file
    pub fn at_eof(&self) -> bool {
        self.eof
    }
}

impl SerialTransport for TerminalSerial {
    fn write_byte(&mut self, byte: u8) {
        let result = self
            .output
            .write_all(&[byte])
            .and_then(|()| self.output.flush());
        if let Err(e) = result {
            debug!("serial write failed: {e}");
        }
    }

    /// Blocks until a byte arrives; `0` once the input is closed
    fn read_byte(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(1) => return byte[0],
                Ok(_) => {
                    self.eof = true;
                    return 0;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("serial read failed: {e}");
                    self.eof = true;
                    return 0;
                }
            }
        }
    }

    /// `1` while input is pending; the exact count is unknown
    fn available(&mut self) -> usize {
        if self.eof {
            return 0;
        }
        let mut fds = libc::pollfd {
            fd: self.input.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `fds` is a single valid pollfd for the duration of the call
        let ready = unsafe { libc::poll(&mut fds, 1, POLL_TIMEOUT_MS) };
        usize::from(ready == 1 && fds.revents & (libc::POLLIN | libc::POLLHUP) != 0)
    }
}

impl Drop for TerminalSerial {
    fn drop(&mut self) {
        if self.raw_mode {
            restore_mode();
        }
    }
}

/// Switch `fd` to raw mode and register the teardown hooks
///
/// Returns `false` (and leaves the mode alone) when `fd` is not a terminal.
fn enter_raw_mode(fd: libc::c_int) -> bool {
    // SAFETY: termios is plain data; tcgetattr fills it or fails
    let mut mode: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut mode) } != 0 {
        warn!(
            "input is not a terminal, leaving its mode alone: {}",
            io::Error::last_os_error()
        );
        return false;
    }
    if SAVED_MODE.set((fd, mode)).is_err() {
        warn!("another terminal is already in raw mode, leaving this one alone");
        return false;
    }

    let mut raw = mode;
    raw.c_iflag &= !libc::ICRNL;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON);
    raw.c_cc[libc::VMIN] = 1;
    raw.c_cc[libc::VTIME] = 0;

    // SAFETY: plain libc calls on a valid descriptor and termios value;
    // the handlers only call async-signal-safe functions
    unsafe {
        libc::tcflush(fd, libc::TCIFLUSH);
        if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
            warn!("tcsetattr failed: {}", io::Error::last_os_error());
            return false;
        }
        RESTORE_PENDING.store(true, Ordering::Release);
        libc::atexit(restore_at_exit);
        libc::signal(
            libc::SIGINT,
            on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
    true
}

/// Put the saved mode back on the terminal it was taken from
///
/// Runs at most once, so the exit hook never touches a descriptor the
/// backend already closed.
fn restore_mode() {
    if !RESTORE_PENDING.swap(false, Ordering::AcqRel) {
        return;
    }
    if let Some((fd, mode)) = SAVED_MODE.get() {
        // SAFETY: `mode` came from tcgetattr on `fd`, which stays open
        // until the backend is dropped
        unsafe { libc::tcsetattr(*fd, libc::TCSANOW, mode) };
    }
}

extern "C" fn restore_at_exit() {
    restore_mode();
}

extern "C" fn on_sigint(_signal: libc::c_int) {
    restore_mode();
    // SAFETY: _exit is async-signal-safe and skips the atexit hooks
    unsafe { libc::_exit(130) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    /// Backend whose input and output are the far ends of two socket pairs
    fn backend() -> (TerminalSerial, UnixStream, UnixStream) {
        let (input, feed) = UnixStream::pair().unwrap();
        let (output, sink) = UnixStream::pair().unwrap();
        let serial = TerminalSerial::from_parts(OwnedFd::from(input), Box::new(output));
        (serial, feed, sink)
    }

    #[test]
    fn test_available_is_bounded_when_idle() {
        let (mut serial, _feed, _sink) = backend();
        assert_eq!(serial.available(), 0);
    }

    #[test]
    fn test_read_after_available() {
        let (mut serial, mut feed, _sink) = backend();
        feed.write_all(b"hi").unwrap();

        assert_eq!(serial.available(), 1);
        assert_eq!(serial.read_byte(), b'h');
        assert_eq!(serial.available(), 1);
        assert_eq!(serial.read_byte(), b'i');
        assert_eq!(serial.available(), 0);
    }

    #[test]
    fn test_putc_writes_crlf_through() {
        let (mut serial, _feed, mut sink) = backend();
        serial.putc(b'A');
        serial.putc(b'\n');

        let mut received = [0u8; 3];
        sink.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"A\r\n");
    }

    /// Mode flags of the terminal behind `fd`
    #[cfg(target_os = "linux")]
    fn local_flags(fd: libc::c_int) -> libc::tcflag_t {
        let mut mode: libc::termios = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::tcgetattr(fd, &mut mode) }, 0);
        mode.c_lflag
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_port_tty_enters_and_leaves_raw_mode() {
        use std::ffi::CStr;
        use std::os::fd::FromRawFd;

        // Pseudo-terminal pair; the subordinate side stands in for a device
        let master = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        assert!(master >= 0);
        let master = unsafe { OwnedFd::from_raw_fd(master) };
        assert_eq!(unsafe { libc::grantpt(master.as_raw_fd()) }, 0);
        assert_eq!(unsafe { libc::unlockpt(master.as_raw_fd()) }, 0);
        let mut name = [0 as libc::c_char; 128];
        assert_eq!(
            unsafe { libc::ptsname_r(master.as_raw_fd(), name.as_mut_ptr(), name.len()) },
            0
        );
        let path = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_str()
            .unwrap()
            .to_owned();

        let watcher = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .unwrap();
        assert_ne!(local_flags(watcher.as_raw_fd()) & libc::ICANON, 0);

        let serial = TerminalSerial::open(Path::new(&path)).unwrap();
        assert!(serial.raw_mode);
        let flags = local_flags(watcher.as_raw_fd());
        assert_eq!(flags & libc::ICANON, 0);
        assert_eq!(flags & libc::ECHO, 0);

        drop(serial);
        assert_ne!(local_flags(watcher.as_raw_fd()) & libc::ICANON, 0);
    }

    #[test]
    fn test_eof_reads_zero() {
        let (mut serial, feed, _sink) = backend();
        drop(feed);

        assert_eq!(serial.available(), 1);
        assert_eq!(serial.read_byte(), 0);
        assert!(serial.at_eof());
        assert_eq!(serial.available(), 0);
    }
}
