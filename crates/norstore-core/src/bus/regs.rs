//! QSPI peripheral register definitions
//!
//! Register offsets and bit masks for the SAM D5x/E5x QSPI controller,
//! which fronts the flash with an instruction register pair
//! (INSTRCTRL/INSTRFRAME) plus an AHB-mapped data window.

/// Control A (32 bits)
pub const REG_CTRLA: usize = 0x00;
/// Control B (32 bits)
pub const REG_CTRLB: usize = 0x04;
/// Baud rate (32 bits)
pub const REG_BAUD: usize = 0x08;
/// Interrupt flag status and clear (32 bits)
pub const REG_INTFLAG: usize = 0x1C;
/// Status (32 bits)
pub const REG_STATUS: usize = 0x20;
/// Synchronization busy (32 bits)
pub const REG_SYNCBUSY: usize = 0x24;
/// Instruction address (32 bits)
pub const REG_INSTRADDR: usize = 0x30;
/// Instruction code (32 bits)
pub const REG_INSTRCTRL: usize = 0x34;
/// Instruction frame (32 bits)
pub const REG_INSTRFRAME: usize = 0x38;

// CTRLA bits
/// Software reset
pub const CTRLA_SWRST: u32 = 1 << 0;
/// Enable the peripheral
pub const CTRLA_ENABLE: u32 = 1 << 1;
/// Terminate the current transfer (deassert chip select)
pub const CTRLA_LASTXFER: u32 = 1 << 24;

// CTRLB bits
/// Serial-memory (XIP) mode; clear for register mode
pub const CTRLB_MODE_MEMORY: u32 = 1 << 0;
/// Chip-select mode field
pub const CTRLB_CSMODE_MASK: u32 = 0x3 << 4;
/// Keep chip select asserted between transfers of one instruction
pub const CTRLB_CSMODE_NORELOAD: u32 = 0x0 << 4;

// BAUD fields
/// Baud divisor position
pub const BAUD_BAUD_POS: u32 = 8;
/// Baud divisor mask
pub const BAUD_BAUD_MASK: u32 = 0xFF << BAUD_BAUD_POS;

// INTFLAG bits
/// Instruction end: the framed transfer has completed
pub const INTFLAG_INSTREND: u32 = 1 << 10;

// STATUS bits
/// Peripheral is enabled
pub const STATUS_ENABLE: u32 = 1 << 1;

// SYNCBUSY bits
/// Software reset synchronization in progress
pub const SYNCBUSY_SWRST: u32 = 1 << 0;
/// Enable synchronization in progress
pub const SYNCBUSY_ENABLE: u32 = 1 << 1;
/// CTRLB synchronization in progress
pub const SYNCBUSY_CTRLB: u32 = 1 << 2;

// INSTRCTRL fields
/// Instruction opcode position
pub const INSTRCTRL_INSTR_POS: u32 = 0;
/// Instruction opcode mask
pub const INSTRCTRL_INSTR_MASK: u32 = 0xFF;
/// Option code position
pub const INSTRCTRL_OPTCODE_POS: u32 = 16;
/// Option code mask
pub const INSTRCTRL_OPTCODE_MASK: u32 = 0xFF << INSTRCTRL_OPTCODE_POS;

// INSTRFRAME fields
/// Per-phase width field position
pub const INSTRFRAME_WIDTH_POS: u32 = 0;
/// Per-phase width field mask
pub const INSTRFRAME_WIDTH_MASK: u32 = 0x7;
/// Instruction phase enable
pub const INSTRFRAME_INSTREN: u32 = 1 << 4;
/// Address phase enable
pub const INSTRFRAME_ADDREN: u32 = 1 << 5;
/// Option phase enable
pub const INSTRFRAME_OPTEN: u32 = 1 << 6;
/// Data phase enable
pub const INSTRFRAME_DATAEN: u32 = 1 << 7;
/// Option code length position
pub const INSTRFRAME_OPTCODELEN_POS: u32 = 8;
/// Option code length mask
pub const INSTRFRAME_OPTCODELEN_MASK: u32 = 0x3 << INSTRFRAME_OPTCODELEN_POS;
/// Address length position
pub const INSTRFRAME_ADDRLEN_POS: u32 = 10;
/// Address length mask
pub const INSTRFRAME_ADDRLEN_MASK: u32 = 0x3 << INSTRFRAME_ADDRLEN_POS;
/// Address length value: 24-bit
pub const INSTRFRAME_ADDRLEN_24BITS: u32 = 0x0;
/// Address length value: 32-bit
pub const INSTRFRAME_ADDRLEN_32BITS: u32 = 0x3;
/// Transfer type position
pub const INSTRFRAME_TFRTYPE_POS: u32 = 12;
/// Transfer type mask
pub const INSTRFRAME_TFRTYPE_MASK: u32 = 0x3 << INSTRFRAME_TFRTYPE_POS;
/// Transfer type value: register read
pub const INSTRFRAME_TFRTYPE_READ: u32 = 0x0;
/// Transfer type value: memory read through the AHB window
pub const INSTRFRAME_TFRTYPE_READMEMORY: u32 = 0x1;
/// Transfer type value: register write
pub const INSTRFRAME_TFRTYPE_WRITE: u32 = 0x2;
/// Transfer type value: memory write through the AHB window
pub const INSTRFRAME_TFRTYPE_WRITEMEMORY: u32 = 0x3;
/// Dummy cycle count position
pub const INSTRFRAME_DUMMYLEN_POS: u32 = 16;
/// Dummy cycle count mask
pub const INSTRFRAME_DUMMYLEN_MASK: u32 = 0x1F << INSTRFRAME_DUMMYLEN_POS;

/// Default AHB window physical base on SAM D5x/E5x
pub const AHB_WINDOW_BASE: u32 = 0x0400_0000;
