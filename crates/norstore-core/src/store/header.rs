//! On-media object header
//!
//! Every stored object starts with this 28-byte little-endian header. The
//! layout is explicit field-by-field serialization; nothing here depends on
//! struct layout or host endianness. Two CRC32 values cover the record: one
//! over the header itself (computed with its own field zeroed) and one over
//! the payload bytes.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::{CorruptKind, Error, Result};

/// Reflected IEEE 802.3 CRC32, the same polynomial Ethernet and zlib use
pub const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Header magic, `b"NOBJ"` read as a little-endian word
pub const MAGIC: u32 = u32::from_le_bytes(*b"NOBJ");

/// Serialized header size in bytes
pub const HEADER_LEN: usize = 28;

/// Object record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Must equal [`MAGIC`]
    pub magic: u32,
    /// Must equal [`HEADER_LEN`]; lets future layouts grow
    pub header_len: u16,
    /// Reserved, written as zero
    pub flags: u16,
    /// Caller-chosen object kind discriminator
    pub type_tag: u32,
    /// Caller-chosen object version
    pub version: u32,
    /// Payload size in bytes, stored immediately after the header.
    /// Always non-zero in a valid record.
    pub payload_len: u32,
    /// CRC32 over the payload bytes
    pub payload_crc: u32,
    /// CRC32 over these 28 bytes with this field zeroed
    pub header_crc: u32,
}

impl ObjectHeader {
    /// Build a header for `payload`, computing both CRCs
    pub fn new(type_tag: u32, version: u32, payload: &[u8]) -> Self {
        let mut hdr = ObjectHeader {
            magic: MAGIC,
            header_len: HEADER_LEN as u16,
            flags: 0,
            type_tag,
            version,
            payload_len: payload.len() as u32,
            payload_crc: CRC32.checksum(payload),
            header_crc: 0,
        };
        hdr.header_crc = hdr.compute_header_crc();
        hdr
    }

    fn compute_header_crc(&self) -> u32 {
        let mut bytes = self.to_bytes();
        bytes[24..28].copy_from_slice(&[0; 4]);
        CRC32.checksum(&bytes)
    }

    /// Serialize, little-endian
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut b = [0u8; HEADER_LEN];
        b[0..4].copy_from_slice(&self.magic.to_le_bytes());
        b[4..6].copy_from_slice(&self.header_len.to_le_bytes());
        b[6..8].copy_from_slice(&self.flags.to_le_bytes());
        b[8..12].copy_from_slice(&self.type_tag.to_le_bytes());
        b[12..16].copy_from_slice(&self.version.to_le_bytes());
        b[16..20].copy_from_slice(&self.payload_len.to_le_bytes());
        b[20..24].copy_from_slice(&self.payload_crc.to_le_bytes());
        b[24..28].copy_from_slice(&self.header_crc.to_le_bytes());
        b
    }

    /// Deserialize and validate magic, length and header CRC.
    ///
    /// Callers check for erased flash with [`is_erased`] first; an all-ones
    /// region is absence of an object, not corruption.
    pub fn from_bytes(b: &[u8; HEADER_LEN]) -> Result<Self> {
        let hdr = ObjectHeader {
            magic: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            header_len: u16::from_le_bytes([b[4], b[5]]),
            flags: u16::from_le_bytes([b[6], b[7]]),
            type_tag: u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
            version: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
            payload_len: u32::from_le_bytes([b[16], b[17], b[18], b[19]]),
            payload_crc: u32::from_le_bytes([b[20], b[21], b[22], b[23]]),
            header_crc: u32::from_le_bytes([b[24], b[25], b[26], b[27]]),
        };

        if hdr.magic != MAGIC {
            return Err(Error::Corrupt(CorruptKind::Magic));
        }
        if hdr.header_len != HEADER_LEN as u16 {
            return Err(Error::Corrupt(CorruptKind::HeaderLength));
        }
        if hdr.header_crc != hdr.compute_header_crc() {
            return Err(Error::Corrupt(CorruptKind::HeaderCrc));
        }
        // A record always carries at least one payload byte; a zero length
        // under a valid CRC is still not a record this layer ever writes.
        if hdr.payload_len == 0 {
            return Err(Error::Corrupt(CorruptKind::PayloadLength));
        }
        Ok(hdr)
    }
}

/// Whether a header region reads as erased flash
pub fn is_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0xFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hdr = ObjectHeader::new(0x4341_4C31, 7, b"calibration blob");
        let bytes = hdr.to_bytes();
        let back = ObjectHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back, hdr);
        assert_eq!(back.payload_len, 16);
    }

    #[test]
    fn known_crc_value() {
        // CRC_32_ISO_HDLC("123456789") is the classic check value.
        assert_eq!(CRC32.checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn any_single_bit_flip_fails_the_crc() {
        let bytes = ObjectHeader::new(1, 1, b"payload").to_bytes();
        for byte in 0..HEADER_LEN {
            for bit in 0..8 {
                let mut copy = bytes;
                copy[byte] ^= 1 << bit;
                assert!(
                    ObjectHeader::from_bytes(&copy).is_err(),
                    "flip at byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn wrong_magic_reported_before_crc() {
        let mut bytes = ObjectHeader::new(1, 1, b"x").to_bytes();
        bytes[0] = b'X';
        assert_eq!(
            ObjectHeader::from_bytes(&bytes),
            Err(Error::Corrupt(CorruptKind::Magic))
        );
    }

    #[test]
    fn zero_payload_length_never_validates() {
        // Even with a correct CRC over it, a zero-length record is invalid.
        let mut hdr = ObjectHeader::new(1, 1, b"x");
        hdr.payload_len = 0;
        hdr.header_crc = hdr.compute_header_crc();
        assert_eq!(
            ObjectHeader::from_bytes(&hdr.to_bytes()),
            Err(Error::Corrupt(CorruptKind::PayloadLength))
        );
    }

    #[test]
    fn erased_region_is_not_corrupt() {
        assert!(is_erased(&[0xFF; HEADER_LEN]));
        let mut partial = [0xFF; HEADER_LEN];
        partial[5] = 0x00;
        assert!(!is_erased(&partial));
    }
}
