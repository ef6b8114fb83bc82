//! Byte-addressable DRAM backing store.

use log::warn;

use crate::exception::Exception;

/// Base address of the DRAM region in the physical address space.
pub const DRAM_BASE: u32 = 0x8000_0000;

/// Size of the DRAM region, in bytes.
pub const DRAM_SIZE: u32 = 1024 * 1024;

/// Last valid address within the DRAM region (inclusive).
pub const DRAM_END: u32 = DRAM_BASE + DRAM_SIZE - 1;

/// A flat, byte-addressable memory region mapped at [`DRAM_BASE`].
///
/// Reads and writes are little-endian and sized in `{8, 16, 32}` bits; any other size, or any
/// access that falls outside the mapped range, raises an access fault.
#[derive(Debug, Clone)]
pub struct Dram {
    data: Vec<u8>,
}

impl Dram {
    /// Creates a fresh DRAM of [`DRAM_SIZE`] bytes, all zeroed, with `image` copied in at offset 0.
    ///
    /// Panics if `image` is larger than [`DRAM_SIZE`]; an oversized program image is a host-side
    /// error that should be rejected before a [`Dram`] is ever constructed.
    pub fn new(image: &[u8]) -> Self {
        assert!(
            image.len() <= DRAM_SIZE as usize,
            "program image ({} bytes) does not fit in {} bytes of DRAM",
            image.len(),
            DRAM_SIZE
        );
        let mut data = vec![0u8; DRAM_SIZE as usize];
        data[..image.len()].copy_from_slice(image);
        Self { data }
    }

    /// Reads `size` bits (`8`, `16`, or `32`) at `address`, little-endian, zero-extended into a `u32`.
    pub fn load(&self, address: u32, size: u32) -> Result<u32, Exception> {
        let nbytes = match size {
            8 | 16 | 32 => (size / 8) as usize,
            _ => {
                warn!(address; "invalid DRAM load size {size}, expected 8, 16 or 32");
                return Err(Exception::LoadAccessFault(address));
            }
        };
        let index = address.wrapping_sub(DRAM_BASE) as usize;
        let Some(end) = index.checked_add(nbytes) else {
            warn!(address; "invalid DRAM load address");
            return Err(Exception::LoadAccessFault(address));
        };
        let Some(bytes) = self.data.get(index..end) else {
            warn!(address; "DRAM load out of range");
            return Err(Exception::LoadAccessFault(address));
        };
        let mut buf = [0u8; 4];
        buf[..nbytes].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    /// Writes the low `size` bits (`8`, `16`, or `32`) of `value` to `address`, little-endian.
    pub fn store(&mut self, address: u32, value: u32, size: u32) -> Result<(), Exception> {
        let nbytes = match size {
            8 | 16 | 32 => (size / 8) as usize,
            _ => {
                warn!(address; "invalid DRAM store size {size}, expected 8, 16 or 32");
                return Err(Exception::StoreOrAmoAccessFault(address));
            }
        };
        let index = address.wrapping_sub(DRAM_BASE) as usize;
        let Some(end) = index.checked_add(nbytes) else {
            warn!(address; "invalid DRAM store address");
            return Err(Exception::StoreOrAmoAccessFault(address));
        };
        let Some(bytes) = self.data.get_mut(index..end) else {
            warn!(address; "DRAM store out of range");
            return Err(Exception::StoreOrAmoAccessFault(address));
        };
        bytes.copy_from_slice(&value.to_le_bytes()[..nbytes]);
        Ok(())
    }

    /// Returns `true` if `address` falls within the mapped DRAM range.
    pub fn contains(address: u32) -> bool {
        (DRAM_BASE..=DRAM_END).contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_stored_bytes_little_endian() {
        let mut dram = Dram::new(&[]);
        dram.store(DRAM_BASE, 0x1234_5678, 32).unwrap();
        assert_eq!(dram.load(DRAM_BASE, 32).unwrap(), 0x1234_5678);
        assert_eq!(dram.load(DRAM_BASE, 8).unwrap(), 0x78);
        assert_eq!(dram.load(DRAM_BASE, 16).unwrap(), 0x5678);
    }

    #[test]
    fn image_is_copied_at_offset_zero() {
        let dram = Dram::new(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(dram.load(DRAM_BASE, 8).unwrap(), 0xAA);
        assert_eq!(dram.load(DRAM_BASE + 2, 8).unwrap(), 0xCC);
    }

    #[test]
    fn out_of_range_access_faults() {
        let dram = Dram::new(&[]);
        assert_eq!(
            dram.load(DRAM_END, 32).unwrap_err(),
            Exception::LoadAccessFault(DRAM_END)
        );
        assert_eq!(
            dram.load(0, 32).unwrap_err(),
            Exception::LoadAccessFault(0)
        );
    }

    #[test]
    fn invalid_size_faults() {
        let mut dram = Dram::new(&[]);
        assert_eq!(
            dram.load(DRAM_BASE, 24).unwrap_err(),
            Exception::LoadAccessFault(DRAM_BASE)
        );
        assert_eq!(
            dram.store(DRAM_BASE, 0, 24).unwrap_err(),
            Exception::StoreOrAmoAccessFault(DRAM_BASE)
        );
    }
}
