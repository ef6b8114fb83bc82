//! Write-only serial (TTY-like) device.

use std::io::Write;

use crate::exception::Exception;

/// Address of the single-byte serial output aperture.
///
/// Chosen well outside the DRAM region so the two can never overlap.
pub const SERIAL_BASE: u32 = 0x1000_0000;

/// The serial aperture is exactly one byte wide.
pub const SERIAL_END: u32 = SERIAL_BASE;

/// A write-only serial port: bytes stored to [`SERIAL_BASE`] are emitted verbatim to an output
/// stream. Reads are permitted and always return `0`, performing no side effect.
pub struct Serial {
    out: Box<dyn Write + Send>,
}

impl Serial {
    /// Creates a serial device that writes to the process's standard output.
    pub fn new() -> Self {
        Self {
            out: Box::new(std::io::stdout()),
        }
    }

    /// Creates a serial device that writes to an arbitrary sink, for testing.
    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(sink),
        }
    }

    /// Reads are a no-op: the reference leaves serial read behavior unspecified, so this always
    /// returns `0`.
    pub fn load(&self, _address: u32, _size: u32) -> Result<u32, Exception> {
        Ok(0)
    }

    /// Writes the low byte of `value` to the output stream. Only 8-bit stores are meaningful for
    /// a single-byte aperture; larger sizes still emit just the low byte.
    pub fn store(&mut self, _address: u32, value: u32, _size: u32) -> Result<(), Exception> {
        let byte = [value as u8];
        let _ = self.out.write_all(&byte);
        let _ = self.out.flush();
        Ok(())
    }

    /// Returns `true` if `address` falls within the serial aperture.
    pub fn contains(address: u32) -> bool {
        address == SERIAL_BASE
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn store_emits_low_byte() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut serial = Serial::with_sink(SharedBuf(captured.clone()));
        serial.store(SERIAL_BASE, 0x1241, 8).unwrap();
        assert_eq!(*captured.lock().unwrap(), vec![0x41]);
    }

    #[test]
    fn load_is_a_no_op_returning_zero() {
        let serial = Serial::new();
        assert_eq!(serial.load(SERIAL_BASE, 8).unwrap(), 0);
    }
}
