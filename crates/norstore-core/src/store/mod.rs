//! Persistent object store
//!
//! Stores self-describing records at caller-chosen, sector-aligned flash
//! addresses inside a configured [`Region`]. A record is a 28-byte header
//! (see [`header`]) followed immediately by the payload. There is no
//! directory and no wear leveling; the caller's address is the only index.
//!
//! The write path is erase, program, then a mandatory read-back compare.
//! NOR flash programming can only clear bits, and a program operation that
//! silently fails leaves no status trace, so the read-back is the one
//! integrity guarantee this layer can actually make at write time.

pub mod header;

pub use header::{ObjectHeader, HEADER_LEN, MAGIC};

use log::{debug, info};

use crate::device::NorFlash;
use crate::error::{CorruptKind, Error, Result};
use crate::store::header::{is_erased, CRC32};

/// Read-back compare window, kept small to bound stack use
const VERIFY_CHUNK: usize = 64;
/// Payload read window per bus transfer
const READ_CHUNK: usize = 256;

/// A sector-aligned span of the flash array the store is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First byte of the region; must be sector-aligned
    pub base: u32,
    /// Region length in sectors
    pub sector_count: u32,
}

impl Region {
    /// Describe a region by base address and sector count
    pub const fn new(base: u32, sector_count: u32) -> Self {
        Region { base, sector_count }
    }
}

/// Object store over a probed flash device.
///
/// Owns the device, which owns the bus; single-threaded mutual exclusion
/// falls out of ownership.
pub struct ObjectStore<D> {
    dev: D,
    region: Region,
}

impl<D: NorFlash> ObjectStore<D> {
    /// Bind a store to `region` on `dev`. The device is expected to be
    /// probed already.
    pub fn new(dev: D, region: Region) -> Self {
        ObjectStore { dev, region }
    }

    /// Borrow the device, for diagnostics
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    /// Release the device
    pub fn into_device(self) -> D {
        self.dev
    }

    /// One past the last byte this store may touch
    fn region_end(&self) -> u64 {
        u64::from(self.region.base) + u64::from(self.region.sector_count) * u64::from(D::SECTOR_SIZE)
    }

    /// Sector-aligned and inside the region, or the reason it is not
    fn check_addr(&self, addr: u32, len: u64) -> Result<()> {
        if addr % D::SECTOR_SIZE != 0 {
            return Err(Error::Unsupported);
        }
        if addr < self.region.base || u64::from(addr) + len > self.region_end() {
            return Err(Error::CapacityExceeded);
        }
        Ok(())
    }

    /// Write `payload` as an object record at sector-aligned `addr`.
    ///
    /// The payload must be non-empty; a record always carries at least one
    /// payload byte. Erases every sector the record covers, programs header
    /// then payload in page-bounded chunks, and re-reads the whole record to
    /// confirm the flash took it. On any error the covered sectors are left
    /// in an unspecified state.
    pub fn write(&mut self, addr: u32, payload: &[u8], type_tag: u32, version: u32) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::Unsupported);
        }
        let total = HEADER_LEN as u64 + payload.len() as u64;
        self.check_addr(addr, total)?;

        let hdr = ObjectHeader::new(type_tag, version, payload);
        let hdr_bytes = hdr.to_bytes();

        let sectors = (total.div_ceil(u64::from(D::SECTOR_SIZE))) as u32;
        for k in 0..sectors {
            debug!("store: erasing sector {}/{} at {:#x}", k + 1, sectors, addr);
            self.dev.sector_erase(addr + k * D::SECTOR_SIZE)?;
            self.dev.wait_ready(D::ERASE_BUDGET)?;
        }

        debug!("store: programming header at {:#x}", addr);
        self.program_chunked(addr, &hdr_bytes)?;
        debug!("store: programming {} payload bytes", payload.len());
        self.program_chunked(addr + HEADER_LEN as u32, payload)?;

        debug!("store: verifying");
        self.verify(addr, &hdr_bytes)?;
        self.verify(addr + HEADER_LEN as u32, payload)?;

        info!(
            "store: wrote object type {:#x} v{} ({} bytes) at {:#x}",
            type_tag,
            version,
            payload.len(),
            addr
        );
        Ok(())
    }

    /// Read the object record at `addr` into `dest`.
    ///
    /// An erased header region reports `NotFound`. `dest` is not written
    /// until the header has fully validated and the payload is known to fit.
    /// With `verify_payload_crc` the payload checksum is recomputed and
    /// compared; without it only the header is validated.
    pub fn read(
        &mut self,
        addr: u32,
        dest: &mut [u8],
        verify_payload_crc: bool,
    ) -> Result<ObjectHeader> {
        self.check_addr(addr, HEADER_LEN as u64)?;

        let mut hdr_bytes = [0u8; HEADER_LEN];
        self.dev.read(addr, &mut hdr_bytes)?;
        if is_erased(&hdr_bytes) {
            return Err(Error::NotFound);
        }
        let hdr = ObjectHeader::from_bytes(&hdr_bytes)?;

        let len = hdr.payload_len as usize;
        if u64::from(addr) + HEADER_LEN as u64 + len as u64 > self.region_end() {
            return Err(Error::Corrupt(CorruptKind::PayloadLength));
        }
        if len > dest.len() {
            return Err(Error::CapacityExceeded);
        }

        let mut off = 0;
        while off < len {
            let n = (len - off).min(READ_CHUNK);
            self.dev
                .read(addr + HEADER_LEN as u32 + off as u32, &mut dest[off..off + n])?;
            off += n;
        }

        if verify_payload_crc && CRC32.checksum(&dest[..len]) != hdr.payload_crc {
            return Err(Error::Corrupt(CorruptKind::PayloadCrc));
        }
        Ok(hdr)
    }

    /// Erase the record whose header sits at `addr`, so a later read reports
    /// `NotFound`. Only the header sector is erased; payload sectors beyond
    /// it are left as they are.
    pub fn erase_object(&mut self, addr: u32) -> Result<()> {
        self.check_addr(addr, u64::from(D::SECTOR_SIZE))?;
        self.dev.sector_erase(addr)?;
        self.dev.wait_ready(D::ERASE_BUDGET)?;
        info!("store: erased object at {:#x}", addr);
        Ok(())
    }

    /// [`write`](Self::write) addressed by sector index within the region
    pub fn write_sector(
        &mut self,
        index: u32,
        payload: &[u8],
        type_tag: u32,
        version: u32,
    ) -> Result<()> {
        self.write(self.sector_addr(index)?, payload, type_tag, version)
    }

    /// [`read`](Self::read) addressed by sector index within the region
    pub fn read_sector(
        &mut self,
        index: u32,
        dest: &mut [u8],
        verify_payload_crc: bool,
    ) -> Result<ObjectHeader> {
        let addr = self.sector_addr(index)?;
        self.read(addr, dest, verify_payload_crc)
    }

    /// [`erase_object`](Self::erase_object) addressed by sector index
    pub fn erase_sector(&mut self, index: u32) -> Result<()> {
        let addr = self.sector_addr(index)?;
        self.erase_object(addr)
    }

    fn sector_addr(&self, index: u32) -> Result<u32> {
        if index >= self.region.sector_count {
            return Err(Error::CapacityExceeded);
        }
        Ok(self.region.base + index * D::SECTOR_SIZE)
    }

    /// Program `data` starting at `addr` without ever straddling a page
    fn program_chunked(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let mut off = 0;
        while off < data.len() {
            let a = addr + off as u32;
            let page_room = (D::PAGE_SIZE - a % D::PAGE_SIZE) as usize;
            let n = page_room.min(data.len() - off);
            self.dev.page_program(a, &data[off..off + n])?;
            self.dev.wait_ready(D::PROGRAM_BUDGET)?;
            off += n;
        }
        Ok(())
    }

    /// Re-read `expect.len()` bytes at `addr` and compare
    fn verify(&mut self, addr: u32, expect: &[u8]) -> Result<()> {
        let mut scratch = [0u8; VERIFY_CHUNK];
        let mut off = 0;
        while off < expect.len() {
            let n = (expect.len() - off).min(VERIFY_CHUNK);
            self.dev.read(addr + off as u32, &mut scratch[..n])?;
            if scratch[..n] != expect[off..off + n] {
                debug!("store: read-back mismatch at {:#x}", addr + off as u32);
                return Err(Error::Corrupt(CorruptKind::Readback));
            }
            off += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Budget;
    use std::vec;
    use std::vec::Vec;

    /// Plain in-memory NOR model: erase sets ones, programming clears bits,
    /// and a program that straddles a page is a bug in the caller.
    struct MemFlash {
        mem: Vec<u8>,
    }

    impl MemFlash {
        fn new() -> Self {
            MemFlash {
                mem: vec![0xFF; Self::CAPACITY as usize],
            }
        }
    }

    impl NorFlash for MemFlash {
        const JEDEC_ID: [u8; 3] = [0x00, 0x00, 0x00];
        const CAPACITY: u32 = 64 * 1024;
        const SECTOR_SIZE: u32 = 4096;
        const PAGE_SIZE: u32 = 256;
        const ERASE_BUDGET: Budget = Budget::Polls(4);
        const PROGRAM_BUDGET: Budget = Budget::Polls(4);

        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
        fn probe(&mut self) -> Result<()> {
            Ok(())
        }
        fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
            Ok(Self::JEDEC_ID)
        }
        fn enable_quad_io(&mut self) -> Result<()> {
            Ok(())
        }
        fn quad_command_active(&self) -> bool {
            false
        }
        fn read_status(&mut self) -> Result<u8> {
            Ok(0)
        }
        fn write_enable(&mut self) -> Result<()> {
            Ok(())
        }
        fn wait_ready(&mut self, _budget: Budget) -> Result<()> {
            Ok(())
        }
        fn sector_erase(&mut self, address: u32) -> Result<()> {
            let base = (address - address % Self::SECTOR_SIZE) as usize;
            self.mem[base..base + Self::SECTOR_SIZE as usize].fill(0xFF);
            Ok(())
        }
        fn page_program(&mut self, address: u32, data: &[u8]) -> Result<()> {
            assert!(
                address % Self::PAGE_SIZE + data.len() as u32 <= Self::PAGE_SIZE,
                "program straddles a page"
            );
            for (i, &b) in data.iter().enumerate() {
                self.mem[address as usize + i] &= b;
            }
            Ok(())
        }
        fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
            let a = address as usize;
            buf.copy_from_slice(&self.mem[a..a + buf.len()]);
            Ok(())
        }
    }

    fn store() -> ObjectStore<MemFlash> {
        ObjectStore::new(MemFlash::new(), Region::new(0, 16))
    }

    #[test]
    fn round_trips_within_one_sector() {
        let mut s = store();
        s.write_sector(2, b"boot counters", 0x42, 3).unwrap();

        let mut buf = [0u8; 64];
        let hdr = s.read_sector(2, &mut buf, true).unwrap();
        assert_eq!(hdr.type_tag, 0x42);
        assert_eq!(hdr.version, 3);
        assert_eq!(&buf[..hdr.payload_len as usize], b"boot counters");
    }

    #[test]
    fn payload_spans_sectors() {
        let mut s = store();
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();
        s.write_sector(0, &payload, 1, 1).unwrap();

        let mut buf = vec![0u8; payload.len()];
        let hdr = s.read_sector(0, &mut buf, true).unwrap();
        assert_eq!(hdr.payload_len as usize, payload.len());
        assert_eq!(buf, payload);
    }

    #[test]
    fn misaligned_address_rejected() {
        let mut s = store();
        assert_eq!(s.write(100, b"x", 1, 1), Err(Error::Unsupported));
    }

    #[test]
    fn empty_payload_rejected() {
        let mut s = store();
        assert_eq!(s.write_sector(0, b"", 1, 1), Err(Error::Unsupported));
        // Nothing landed on media.
        assert_eq!(
            s.read_sector(0, &mut [0u8; 16], false),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn record_must_fit_the_region() {
        let mut s = ObjectStore::new(MemFlash::new(), Region::new(0, 2));
        let too_big = vec![0u8; 2 * 4096];
        assert_eq!(
            s.write(0, &too_big, 1, 1),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(s.write_sector(2, b"x", 1, 1), Err(Error::CapacityExceeded));
    }

    #[test]
    fn small_dest_leaves_it_untouched() {
        let mut s = store();
        s.write_sector(0, b"twelve bytes", 1, 1).unwrap();

        let mut buf = [0xAAu8; 4];
        assert_eq!(
            s.read_sector(0, &mut buf, true),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(buf, [0xAA; 4]);
    }

    #[test]
    fn erased_sector_reads_not_found() {
        let mut s = store();
        assert_eq!(
            s.read_sector(5, &mut [0u8; 16], false),
            Err(Error::NotFound)
        );

        s.write_sector(5, b"soon gone", 1, 1).unwrap();
        s.erase_sector(5).unwrap();
        assert_eq!(
            s.read_sector(5, &mut [0u8; 16], false),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn corrupted_payload_detected_only_when_verifying() {
        let mut s = store();
        s.write_sector(1, b"sensor calibration", 1, 1).unwrap();

        // Flip a payload bit behind the store's back.
        let addr = 4096 + HEADER_LEN;
        s.device_mut().mem[addr + 3] ^= 0x10;

        let mut buf = [0u8; 64];
        assert!(s.read_sector(1, &mut buf, false).is_ok());
        assert_eq!(
            s.read_sector(1, &mut buf, true),
            Err(Error::Corrupt(CorruptKind::PayloadCrc))
        );
    }

    #[test]
    fn corrupted_header_detected() {
        let mut s = store();
        s.write_sector(0, b"x", 1, 1).unwrap();
        s.device_mut().mem[8] ^= 0x01;
        assert_eq!(
            s.read_sector(0, &mut [0u8; 8], false),
            Err(Error::Corrupt(CorruptKind::HeaderCrc))
        );
    }

    #[test]
    fn overwrite_with_shorter_payload_wins() {
        let mut s = store();
        s.write_sector(0, b"a much longer original payload", 1, 1)
            .unwrap();
        s.write_sector(0, b"short", 1, 2).unwrap();

        let mut buf = [0u8; 64];
        let hdr = s.read_sector(0, &mut buf, true).unwrap();
        assert_eq!(hdr.version, 2);
        assert_eq!(&buf[..hdr.payload_len as usize], b"short");
    }
}
