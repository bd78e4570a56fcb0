//! espart-dummy - In-memory flash medium emulator
//!
//! Emulates a NOR flash medium in memory for testing and development
//! without hardware or an image file. The emulation is faithful to
//! erase-before-write semantics: erase sets bytes to 0xFF, and a write
//! that would need any bit to go from 0 back to 1 is rejected as a
//! device fault instead of silently AND-ing, so misuse of the
//! extended-write contract shows up in tests.
//!
//! Every read, write and erase is also recorded, which lets tests
//! assert on the exact medium traffic an algorithm produced.

use espart_core::error::{Error, Fault, Result};
use espart_core::medium::{FlashMedium, ERASED_BYTE, NATIVE_BLOCK_SIZE};

/// Status reported when a write targets cells that are not erased
pub const STATUS_NOT_ERASED: i32 = 0x10;
/// Status reported for an erase with unaligned address or length
pub const STATUS_UNALIGNED_ERASE: i32 = 0x11;
/// Status reported when an operation runs past the end of the medium
pub const STATUS_OUT_OF_RANGE: i32 = 0x12;
/// Status reported by injected faults
pub const STATUS_INJECTED: i32 = 0x1F;

/// In-memory NOR flash emulator
pub struct RamFlash {
    data: Vec<u8>,
    reads: Vec<(u32, usize)>,
    writes: Vec<(u32, Vec<u8>)>,
    erases: Vec<(u32, u32)>,
    fail_erase_at: Option<u32>,
}

impl RamFlash {
    /// Create an emulator of `size` bytes, fully erased
    pub fn new(size: u32) -> Self {
        Self {
            data: vec![ERASED_BYTE; size as usize],
            reads: Vec::new(),
            writes: Vec::new(),
            erases: Vec::new(),
            fail_erase_at: None,
        }
    }

    /// Create an emulator pre-filled with `initial` at offset 0
    pub fn with_data(size: u32, initial: &[u8]) -> Self {
        let mut flash = Self::new(size);
        let len = initial.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial[..len]);
        flash
    }

    /// Raw medium contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Record of read operations: (address, length)
    pub fn reads(&self) -> &[(u32, usize)] {
        &self.reads
    }

    /// Record of write operations: (address, data)
    pub fn writes(&self) -> &[(u32, Vec<u8>)] {
        &self.writes
    }

    /// Record of erase operations: (address, length)
    pub fn erases(&self) -> Vec<(u32, u32)> {
        self.erases.clone()
    }

    /// Forget all recorded operations
    pub fn clear_log(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.erases.clear();
    }

    /// Inject a device fault into the next erase touching `addr`
    pub fn fail_erase_at(&mut self, addr: u32) {
        self.fail_erase_at = Some(addr);
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr as usize + len > self.data.len() {
            return Err(Error::Io(Fault::Device(STATUS_OUT_OF_RANGE)));
        }
        Ok(())
    }
}

impl FlashMedium for RamFlash {
    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(addr, buf.len())?;
        self.reads.push((addr, buf.len()));
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.check_range(addr, data.len())?;
        let start = addr as usize;
        // NOR programming can only clear bits. A write needing a 0->1
        // transition means the target was not erased.
        for (have, want) in self.data[start..start + data.len()].iter().zip(data) {
            if have & want != *want {
                log::debug!("write to non-erased cells at 0x{:08X}", addr);
                return Err(Error::Io(Fault::Device(STATUS_NOT_ERASED)));
            }
        }
        self.writes.push((addr, data.to_vec()));
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        if addr % NATIVE_BLOCK_SIZE != 0 || len % NATIVE_BLOCK_SIZE != 0 {
            return Err(Error::Io(Fault::Device(STATUS_UNALIGNED_ERASE)));
        }
        self.check_range(addr, len as usize)?;
        if let Some(fail) = self.fail_erase_at {
            if fail >= addr && fail < addr + len {
                self.fail_erase_at = None;
                return Err(Error::Io(Fault::Device(STATUS_INJECTED)));
            }
        }
        self.erases.push((addr, len));
        let start = addr as usize;
        for byte in &mut self.data[start..start + len as usize] {
            *byte = ERASED_BYTE;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_erased() {
        let mut flash = RamFlash::new(8192);
        let mut buf = [0u8; 16];
        flash.read(4000, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn write_then_read() {
        let mut flash = RamFlash::new(8192);
        flash.write(100, &[0x12, 0x34, 0x56, 0x78]).unwrap();
        let mut buf = [0u8; 4];
        flash.read(100, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn rejects_write_over_programmed_cells() {
        let mut flash = RamFlash::new(8192);
        flash.write(0, &[0x00]).unwrap();
        assert_eq!(
            flash.write(0, &[0x01]),
            Err(Error::Io(Fault::Device(STATUS_NOT_ERASED)))
        );
        // Clearing further bits is still representable.
        flash.write(0, &[0x00]).unwrap();
    }

    #[test]
    fn erase_restores_erased_state() {
        let mut flash = RamFlash::new(8192);
        flash.write(10, &[0u8; 32]).unwrap();
        flash.erase(0, 4096).unwrap();
        let mut buf = [0u8; 32];
        flash.read(10, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(flash.erases(), vec![(0, 4096)]);
    }

    #[test]
    fn erase_must_be_aligned() {
        let mut flash = RamFlash::new(8192);
        assert_eq!(
            flash.erase(100, 4096),
            Err(Error::Io(Fault::Device(STATUS_UNALIGNED_ERASE)))
        );
        assert_eq!(
            flash.erase(0, 100),
            Err(Error::Io(Fault::Device(STATUS_UNALIGNED_ERASE)))
        );
    }

    #[test]
    fn out_of_range_is_a_device_fault() {
        let mut flash = RamFlash::new(4096);
        let mut buf = [0u8; 8];
        assert_eq!(
            flash.read(4092, &mut buf),
            Err(Error::Io(Fault::Device(STATUS_OUT_OF_RANGE)))
        );
    }

    #[test]
    fn injected_erase_fault_fires_once() {
        let mut flash = RamFlash::new(8192);
        flash.fail_erase_at(4096);
        assert_eq!(
            flash.erase(4096, 4096),
            Err(Error::Io(Fault::Device(STATUS_INJECTED)))
        );
        flash.erase(4096, 4096).unwrap();
    }
}
