//! Serial NOR flash opcodes
//!
//! The JEDEC-common command set plus the vendor-specific opcodes used by the
//! SST26 and N25Q drivers.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit in the status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status and identification
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Read JEDEC ID (manufacturer, type, capacity)
pub const RDID: u8 = 0x9F;
/// Multiple I/O Read ID - JEDEC ID while the command phase is multi-wire
pub const RDID_MIO: u8 = 0xAF;

// ============================================================================
// Read / program / erase
// ============================================================================

/// High Speed Read (with dummy cycles)
pub const FAST_READ: u8 = 0x0B;
/// Page Program
pub const PP: u8 = 0x02;
/// Sector Erase (4 KiB)
pub const SE: u8 = 0x20;
/// Block Erase (64 KiB)
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE: u8 = 0xC7;

// ============================================================================
// Software reset
// ============================================================================

/// Reset Enable
pub const RSTEN: u8 = 0x66;
/// Reset Device
pub const RST: u8 = 0x99;

// ============================================================================
// SST26-specific
// ============================================================================

/// Enable Quad I/O - switches the part to 4-4-4 commands
pub const SST26_EQIO: u8 = 0x38;
/// Reset Quad I/O - back to 1-1-1 commands
pub const SST26_RSTQIO: u8 = 0xFF;
/// Global Block Protection Unlock
pub const SST26_ULBPR: u8 = 0x98;

// ============================================================================
// N25Q-specific configuration registers
// ============================================================================

/// Read Nonvolatile Configuration Register (2 bytes, LSB first)
pub const N25Q_RDNVCR: u8 = 0xB5;
/// Write Nonvolatile Configuration Register
pub const N25Q_WRNVCR: u8 = 0xB1;
/// Read Volatile Configuration Register
pub const N25Q_RDVCR: u8 = 0x85;
/// Write Volatile Configuration Register
pub const N25Q_WRVCR: u8 = 0x81;
/// Read Enhanced Volatile Configuration Register
pub const N25Q_RDEVCR: u8 = 0x65;
/// Write Enhanced Volatile Configuration Register
pub const N25Q_WREVCR: u8 = 0x61;
/// Enter 4-Byte Address Mode
pub const N25Q_EN4B: u8 = 0xB7;
/// Exit 4-Byte Address Mode
pub const N25Q_EX4B: u8 = 0xE9;

// ============================================================================
// Status register bits
// ============================================================================

/// Write In Progress / Busy
pub const SR_WIP: u8 = 1 << 0;
/// Write Enable Latch
pub const SR_WEL: u8 = 1 << 1;

// ============================================================================
// N25Q configuration register bits
// ============================================================================

/// VCR dummy-cycle field position
pub const N25Q_VCR_DUMMY_POS: u8 = 4;
/// VCR dummy-cycle field mask
pub const N25Q_VCR_DUMMY_MASK: u8 = 0xF << N25Q_VCR_DUMMY_POS;
/// EVCR quad-disable bit (0 = quad I/O enabled)
pub const N25Q_EVCR_QUAD_DISABLE: u8 = 1 << 7;
/// EVCR dual-disable bit
pub const N25Q_EVCR_DUAL_DISABLE: u8 = 1 << 6;
