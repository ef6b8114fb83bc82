//! Address-decoding router between DRAM and the serial device.

use log::warn;

use crate::dram::Dram;
use crate::exception::Exception;
use crate::serial::Serial;

/// The memory bus: routes loads and stores by address range to either [`Dram`] or [`Serial`],
/// and raises an access fault for any address that falls outside both.
pub struct Bus {
    dram: Dram,
    serial: Serial,
}

impl Bus {
    /// Creates a bus with a freshly constructed [`Dram`] (initialized from `image`) and
    /// [`Serial`] device.
    pub fn new(image: &[u8]) -> Self {
        Self {
            dram: Dram::new(image),
            serial: Serial::new(),
        }
    }

    /// Reads `size` bits (`8`, `16`, or `32`) at `address`, zero-extended into a `u32`.
    pub fn load(&self, address: u32, size: u32) -> Result<u32, Exception> {
        if Dram::contains(address) {
            self.dram.load(address, size)
        } else if Serial::contains(address) {
            self.serial.load(address, size)
        } else {
            warn!(address; "load from unmapped address");
            Err(Exception::LoadAccessFault(address))
        }
    }

    /// Writes the low `size` bits of `value` to `address`.
    pub fn store(&mut self, address: u32, value: u32, size: u32) -> Result<(), Exception> {
        if Dram::contains(address) {
            self.dram.store(address, value, size)
        } else if Serial::contains(address) {
            self.serial.store(address, value, size)
        } else {
            warn!(address; "store to unmapped address");
            Err(Exception::StoreOrAmoAccessFault(address))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dram::DRAM_BASE;

    #[test]
    fn routes_to_dram() {
        let mut bus = Bus::new(&[]);
        bus.store(DRAM_BASE, 42, 32).unwrap();
        assert_eq!(bus.load(DRAM_BASE, 32).unwrap(), 42);
    }

    #[test]
    fn unmapped_address_faults() {
        let bus = Bus::new(&[]);
        assert_eq!(bus.load(0, 32).unwrap_err(), Exception::LoadAccessFault(0));
    }
}
