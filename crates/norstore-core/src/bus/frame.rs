//! QSPI instruction frames
//!
//! One [`InstrFrame`] describes a complete flash instruction: opcode,
//! optional address and option byte, dummy cycles, the per-phase bus width
//! and the transfer kind. Frames are transient - built per operation and
//! encoded into the peripheral's INSTRFRAME word.

use bitflags::bitflags;

use super::regs;
use super::width::BusWidth;

bitflags! {
    /// Phase-enable bits of an instruction frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        /// Send the instruction opcode
        const INSTREN = regs::INSTRFRAME_INSTREN;
        /// Send an address after the opcode
        const ADDREN = regs::INSTRFRAME_ADDREN;
        /// Send the option code after the address
        const OPTEN = regs::INSTRFRAME_OPTEN;
        /// Transfer data through the window
        const DATAEN = regs::INSTRFRAME_DATAEN;
    }
}

/// Address phase length
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddrLen {
    /// No address phase
    #[default]
    None,
    /// 24-bit address - parts up to 16 MiB
    Bits24,
    /// 32-bit address - parts above 16 MiB, after entering 4-byte mode
    Bits32,
}

impl AddrLen {
    /// Number of address bits on the wire
    pub const fn bits(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bits24 => 24,
            Self::Bits32 => 32,
        }
    }

    /// Raw ADDRLEN field value
    pub const fn value(&self) -> u32 {
        match self {
            // No address phase leaves the field at its reset value.
            Self::None | Self::Bits24 => regs::INSTRFRAME_ADDRLEN_24BITS,
            Self::Bits32 => regs::INSTRFRAME_ADDRLEN_32BITS,
        }
    }
}

/// Option (mode) byte length in bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLen {
    /// No option phase
    #[default]
    None,
    /// 1-bit option
    Bits1,
    /// 2-bit option
    Bits2,
    /// 4-bit option
    Bits4,
    /// 8-bit option
    Bits8,
}

impl OptLen {
    /// Raw OPTCODELEN field value
    pub const fn value(&self) -> u32 {
        match self {
            Self::None | Self::Bits1 => 0,
            Self::Bits2 => 1,
            Self::Bits4 => 2,
            Self::Bits8 => 3,
        }
    }

    /// Option length in bits
    pub const fn bits(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bits1 => 1,
            Self::Bits2 => 2,
            Self::Bits4 => 4,
            Self::Bits8 => 8,
        }
    }
}

/// What a frame moves, and in which direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferKind {
    /// Instruction only, no data phase
    #[default]
    Command,
    /// Register-style read (status, configuration, identification)
    RegisterRead,
    /// Register-style write
    RegisterWrite,
    /// Bulk read through the address-indexed window
    MemoryRead,
    /// Bulk write through the address-indexed window
    MemoryWrite,
}

impl TransferKind {
    /// Raw TFRTYPE field value
    pub const fn value(&self) -> u32 {
        match self {
            // A bare command is framed as a register read with no data.
            Self::Command | Self::RegisterRead => regs::INSTRFRAME_TFRTYPE_READ,
            Self::RegisterWrite => regs::INSTRFRAME_TFRTYPE_WRITE,
            Self::MemoryRead => regs::INSTRFRAME_TFRTYPE_READMEMORY,
            Self::MemoryWrite => regs::INSTRFRAME_TFRTYPE_WRITEMEMORY,
        }
    }

    /// Whether the transfer reads data from the device
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::RegisterRead | Self::MemoryRead)
    }

    /// Whether the transfer writes data to the device
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::RegisterWrite | Self::MemoryWrite)
    }

    /// Whether the transfer has a data phase at all
    pub const fn has_data(&self) -> bool {
        !matches!(self, Self::Command)
    }
}

/// A single QSPI instruction frame
///
/// Constructed per operation with the builder-style constructors, then
/// encoded with [`InstrFrame::encode`]. Invariants: a data phase implies a
/// read or write direction; an address phase implies a non-zero address
/// length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstrFrame {
    /// The opcode byte
    pub opcode: u8,
    /// Address (if any)
    pub address: Option<u32>,
    /// Address width on the wire
    pub addr_len: AddrLen,
    /// Option/mode byte (if any)
    pub option: Option<u8>,
    /// Option width in bits
    pub opt_len: OptLen,
    /// Dummy cycles inserted between address and data phases (0-15)
    pub dummy_cycles: u8,
    /// Per-phase bus width
    pub width: BusWidth,
    /// Transfer kind and direction
    pub kind: TransferKind,
}

impl InstrFrame {
    /// Instruction-only frame (e.g. WREN, RSTEN)
    pub fn command(opcode: u8, width: BusWidth) -> Self {
        Self {
            opcode,
            address: None,
            addr_len: AddrLen::None,
            option: None,
            opt_len: OptLen::None,
            dummy_cycles: 0,
            width,
            kind: TransferKind::Command,
        }
    }

    /// Instruction plus address, no data (e.g. sector erase)
    pub fn command_with_address(opcode: u8, width: BusWidth, addr_len: AddrLen, address: u32) -> Self {
        Self {
            opcode,
            address: Some(address),
            addr_len,
            ..Self::command(opcode, width)
        }
    }

    /// Register read frame (e.g. RDSR, RDID)
    pub fn register_read(opcode: u8, width: BusWidth) -> Self {
        Self {
            kind: TransferKind::RegisterRead,
            ..Self::command(opcode, width)
        }
    }

    /// Register write frame (e.g. WRSR, configuration registers)
    pub fn register_write(opcode: u8, width: BusWidth) -> Self {
        Self {
            kind: TransferKind::RegisterWrite,
            ..Self::command(opcode, width)
        }
    }

    /// Bulk read through the memory window
    pub fn memory_read(opcode: u8, width: BusWidth, addr_len: AddrLen, address: u32) -> Self {
        Self {
            address: Some(address),
            addr_len,
            kind: TransferKind::MemoryRead,
            ..Self::command(opcode, width)
        }
    }

    /// Bulk write through the memory window
    pub fn memory_write(opcode: u8, width: BusWidth, addr_len: AddrLen, address: u32) -> Self {
        Self {
            address: Some(address),
            addr_len,
            kind: TransferKind::MemoryWrite,
            ..Self::command(opcode, width)
        }
    }

    /// Set the number of dummy cycles; counts above 15 saturate to 15
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles.min(15);
        self
    }

    /// Set the option/mode byte
    pub fn with_option(mut self, option: u8, len: OptLen) -> Self {
        self.option = Some(option);
        self.opt_len = len;
        self
    }

    /// Whether the frame has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Check the frame invariants: data-enable implies a direction,
    /// address-enable implies a non-zero address length.
    pub fn is_valid(&self) -> bool {
        if self.kind.has_data() && !(self.kind.is_read() || self.kind.is_write()) {
            return false;
        }
        if self.address.is_some() && self.addr_len == AddrLen::None {
            return false;
        }
        if self.option.is_some() && self.opt_len == OptLen::None {
            return false;
        }
        self.dummy_cycles <= 15
    }

    /// Phase-enable flags for this frame
    pub fn flags(&self) -> FrameFlags {
        let mut flags = FrameFlags::INSTREN;
        if self.address.is_some() {
            flags |= FrameFlags::ADDREN;
        }
        if self.option.is_some() {
            flags |= FrameFlags::OPTEN;
        }
        if self.kind.has_data() {
            flags |= FrameFlags::DATAEN;
        }
        flags
    }

    /// Encode the INSTRFRAME register word
    pub fn encode(&self) -> u32 {
        debug_assert!(self.is_valid());
        let mut word = self.width.value() << regs::INSTRFRAME_WIDTH_POS;
        word |= self.flags().bits();
        word |= self.opt_len.value() << regs::INSTRFRAME_OPTCODELEN_POS;
        word |= self.addr_len.value() << regs::INSTRFRAME_ADDRLEN_POS;
        word |= self.kind.value() << regs::INSTRFRAME_TFRTYPE_POS;
        word |= ((self.dummy_cycles as u32) << regs::INSTRFRAME_DUMMYLEN_POS)
            & regs::INSTRFRAME_DUMMYLEN_MASK;
        word
    }

    /// Encode the INSTRCTRL register word (opcode plus option code)
    pub fn encode_instruction(&self) -> u32 {
        let mut word = (self.opcode as u32) << regs::INSTRCTRL_INSTR_POS;
        if let Some(option) = self.option {
            word |= (option as u32) << regs::INSTRCTRL_OPTCODE_POS;
        }
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command_frame() {
        let frame = InstrFrame::command(0x06, BusWidth::Single);
        assert!(frame.is_valid());
        assert_eq!(frame.flags(), FrameFlags::INSTREN);
        // WIDTH=0, INSTREN, TFRTYPE=READ, everything else clear
        assert_eq!(frame.encode(), regs::INSTRFRAME_INSTREN);
        assert_eq!(frame.encode_instruction(), 0x06);
    }

    #[test]
    fn register_read_sets_data_enable() {
        let frame = InstrFrame::register_read(0x05, BusWidth::QuadCmd).with_dummy_cycles(2);
        let word = frame.encode();
        assert_eq!(word & regs::INSTRFRAME_WIDTH_MASK, 6);
        assert_ne!(word & regs::INSTRFRAME_DATAEN, 0);
        assert_eq!(
            (word & regs::INSTRFRAME_DUMMYLEN_MASK) >> regs::INSTRFRAME_DUMMYLEN_POS,
            2
        );
        assert_eq!(
            (word & regs::INSTRFRAME_TFRTYPE_MASK) >> regs::INSTRFRAME_TFRTYPE_POS,
            regs::INSTRFRAME_TFRTYPE_READ
        );
    }

    #[test]
    fn memory_write_frame() {
        let frame =
            InstrFrame::memory_write(0x02, BusWidth::QuadCmd, AddrLen::Bits24, 0x1F_0000);
        let word = frame.encode();
        assert_ne!(word & regs::INSTRFRAME_ADDREN, 0);
        assert_ne!(word & regs::INSTRFRAME_DATAEN, 0);
        assert_eq!(
            (word & regs::INSTRFRAME_TFRTYPE_MASK) >> regs::INSTRFRAME_TFRTYPE_POS,
            regs::INSTRFRAME_TFRTYPE_WRITEMEMORY
        );
        assert_eq!(
            (word & regs::INSTRFRAME_ADDRLEN_MASK) >> regs::INSTRFRAME_ADDRLEN_POS,
            regs::INSTRFRAME_ADDRLEN_24BITS
        );
    }

    #[test]
    fn oversized_dummy_count_saturates() {
        let frame = InstrFrame::register_read(0x05, BusWidth::QuadCmd).with_dummy_cycles(200);
        assert_eq!(frame.dummy_cycles, 15);
        assert_eq!(
            (frame.encode() & regs::INSTRFRAME_DUMMYLEN_MASK) >> regs::INSTRFRAME_DUMMYLEN_POS,
            15
        );
    }

    #[test]
    fn thirty_two_bit_address_encoding() {
        let frame =
            InstrFrame::memory_read(0x0B, BusWidth::QuadCmd, AddrLen::Bits32, 0x0100_0000)
                .with_dummy_cycles(6);
        let word = frame.encode();
        assert_eq!(
            (word & regs::INSTRFRAME_ADDRLEN_MASK) >> regs::INSTRFRAME_ADDRLEN_POS,
            regs::INSTRFRAME_ADDRLEN_32BITS
        );
    }

    #[test]
    fn option_byte_lands_in_instrctrl() {
        let frame = InstrFrame::memory_read(0xEB, BusWidth::QuadIo, AddrLen::Bits24, 0)
            .with_option(0xA5, OptLen::Bits8);
        assert_ne!(frame.encode() & regs::INSTRFRAME_OPTEN, 0);
        assert_eq!(frame.encode_instruction() >> 16, 0xA5);
    }

    #[test]
    fn invariants_rejected() {
        let mut frame = InstrFrame::command_with_address(0x20, BusWidth::Single, AddrLen::Bits24, 0);
        assert!(frame.is_valid());
        frame.addr_len = AddrLen::None;
        assert!(!frame.is_valid());
    }
}
