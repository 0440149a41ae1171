//! Instruction-level NOR flash simulator
//!
//! Implements [`QspiBus`] over an in-memory model of either supported part,
//! decoding the same opcodes the real devices do. The point is not cycle
//! accuracy; it is that the drivers' bring-up choreography runs against
//! something that reacts the way the silicon does:
//!
//! - a command whose command-phase width disagrees with the device's current
//!   mode is not decoded; reads in that state return all-ones, writes are
//!   dropped
//! - erase and program require the write-enable latch and report busy for a
//!   few status polls afterwards
//! - the SST26 model powers up block-protected and must be unlocked before
//!   anything programs
//! - the N25Q model routes quad entry through the EVCR and honors the VCR
//!   dummy-cycle field on reads
//!
//! State lives behind an `Rc<RefCell<..>>`, so a test can keep one handle
//! for fault injection while the driver under test owns another.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use norstore_core::bus::{regs, AddrLen, BusWidth, OptLen, QspiBus};
use norstore_core::device::opcodes;
use norstore_core::diag::BusSnapshot;
use norstore_core::Result;

/// Which part the simulator behaves as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// Microchip SST26VF064B, 8 MiB
    Sst26,
    /// Micron N25Q256A, 32 MiB
    N25q,
}

impl Vendor {
    fn jedec_id(self) -> [u8; 3] {
        match self {
            Vendor::Sst26 => [0xBF, 0x26, 0x43],
            Vendor::N25q => [0x20, 0xBA, 0x19],
        }
    }

    fn capacity(self) -> usize {
        match self {
            Vendor::Sst26 => 8 << 20,
            Vendor::N25q => 32 << 20,
        }
    }
}

/// Fault injection switches, all off by default
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Status register reports write-in-progress forever
    pub stuck_busy: bool,
    /// WREN never sets the write-enable latch
    pub wel_stuck_clear: bool,
    /// Page programs are acknowledged but change nothing
    pub drop_programs: bool,
}

/// Status polls that report busy after an erase
const ERASE_BUSY_POLLS: u32 = 4;
/// Status polls that report busy after a program
const PROGRAM_BUSY_POLLS: u32 = 2;
/// Power-on VCR value: 15 dummy cycles, XIP disabled
const N25Q_VCR_RESET: u8 = 0xFB;

struct SimState {
    vendor: Vendor,
    mem: Vec<u8>,
    quad: bool,
    addr4: bool,
    wel: bool,
    unlocked: bool,
    reset_armed: bool,
    busy_polls: u32,
    vcr: u8,
    evcr: u8,
    nvcr: u16,
    clock_ms: u32,
    faults: Faults,
    last_frame: LastFrame,
}

#[derive(Default, Clone, Copy)]
struct LastFrame {
    opcode: u8,
    width: u8,
    kind: u8,
    addr_len: u8,
    dummy: u8,
}

impl SimState {
    fn new(vendor: Vendor) -> Self {
        SimState {
            vendor,
            mem: vec![0xFF; vendor.capacity()],
            quad: false,
            addr4: false,
            wel: false,
            // The SST26 powers up with all blocks protected.
            unlocked: vendor != Vendor::Sst26,
            reset_armed: false,
            busy_polls: 0,
            vcr: N25Q_VCR_RESET,
            evcr: 0xFF,
            nvcr: 0xFFFF,
            clock_ms: 0,
            faults: Faults::default(),
            last_frame: LastFrame::default(),
        }
    }

    /// Whether the device decodes a command sent at `width`
    fn decodes(&self, width: BusWidth) -> bool {
        if self.quad {
            width == BusWidth::QuadCmd
        } else {
            width.cmd_lines() == 1
        }
    }

    fn expected_addr_len(&self) -> AddrLen {
        if self.addr4 {
            AddrLen::Bits32
        } else {
            AddrLen::Bits24
        }
    }

    fn status(&mut self) -> u8 {
        let mut sr = 0;
        if self.faults.stuck_busy || self.busy_polls > 0 {
            sr |= opcodes::SR_WIP;
            self.busy_polls = self.busy_polls.saturating_sub(1);
        }
        if self.wel {
            sr |= opcodes::SR_WEL;
        }
        sr
    }

    fn soft_reset(&mut self) {
        self.quad = false;
        self.addr4 = false;
        self.wel = false;
        self.busy_polls = 0;
        self.vcr = N25Q_VCR_RESET;
        self.evcr = 0xFF;
        if self.vendor == Vendor::Sst26 {
            self.unlocked = false;
        }
    }

    fn expected_read_dummy(&self) -> u8 {
        match self.vendor {
            Vendor::Sst26 => {
                if self.quad {
                    6
                } else {
                    8
                }
            }
            Vendor::N25q => (self.vcr & opcodes::N25Q_VCR_DUMMY_MASK) >> opcodes::N25Q_VCR_DUMMY_POS,
        }
    }
}

/// Cloneable handle onto one simulated flash part
#[derive(Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    /// A fresh, erased SST26 model
    pub fn sst26() -> Self {
        SimBus {
            state: Rc::new(RefCell::new(SimState::new(Vendor::Sst26))),
        }
    }

    /// A fresh, erased N25Q model
    pub fn n25q() -> Self {
        SimBus {
            state: Rc::new(RefCell::new(SimState::new(Vendor::N25q))),
        }
    }

    /// Change the fault switches, effective immediately
    pub fn set_faults(&self, faults: Faults) {
        self.state.borrow_mut().faults = faults;
    }

    /// XOR `mask` into the byte at `addr`, bypassing device semantics
    pub fn corrupt(&self, addr: u32, mask: u8) {
        self.state.borrow_mut().mem[addr as usize] ^= mask;
    }

    /// Raw array contents at `addr`
    pub fn peek(&self, addr: u32, buf: &mut [u8]) {
        let s = self.state.borrow();
        buf.copy_from_slice(&s.mem[addr as usize..addr as usize + buf.len()]);
    }

    /// Whether the modeled part is currently decoding 4-4-4 commands
    pub fn device_quad_active(&self) -> bool {
        self.state.borrow().quad
    }

    /// Whether the modeled part is in 4-byte address mode
    pub fn device_addr4_active(&self) -> bool {
        self.state.borrow().addr4
    }

    fn note_frame(s: &mut SimState, opcode: u8, width: BusWidth, kind: u32, addr_len: u8, dummy: u8) {
        s.last_frame = LastFrame {
            opcode,
            width: width.value() as u8,
            kind: kind as u8,
            addr_len,
            dummy,
        };
    }
}

impl QspiBus for SimBus {
    fn command(&mut self, opcode: u8, width: BusWidth) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(s, opcode, width, regs::INSTRFRAME_TFRTYPE_READ, 0, 0);
        if !s.decodes(width) {
            trace!("sim: command {:#04x} at {} not decoded", opcode, width.name());
            return Ok(());
        }

        let armed = s.reset_armed;
        s.reset_armed = false;
        match opcode {
            opcodes::RSTEN => s.reset_armed = true,
            opcodes::RST => {
                if armed {
                    s.soft_reset();
                }
            }
            opcodes::WREN => {
                if !s.faults.wel_stuck_clear {
                    s.wel = true;
                }
            }
            opcodes::WRDI => s.wel = false,
            opcodes::SST26_EQIO if s.vendor == Vendor::Sst26 => s.quad = true,
            opcodes::SST26_RSTQIO if s.vendor == Vendor::Sst26 => s.quad = false,
            opcodes::SST26_ULBPR if s.vendor == Vendor::Sst26 => {
                if s.wel {
                    s.unlocked = true;
                    s.wel = false;
                }
            }
            opcodes::N25Q_EN4B if s.vendor == Vendor::N25q => {
                if s.wel {
                    s.addr4 = true;
                    s.wel = false;
                }
            }
            opcodes::N25Q_EX4B if s.vendor == Vendor::N25q => {
                if s.wel {
                    s.addr4 = false;
                    s.wel = false;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn command_with_address(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
    ) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(
            s,
            opcode,
            width,
            regs::INSTRFRAME_TFRTYPE_READ,
            addr_len.value() as u8,
            0,
        );
        if !s.decodes(width) || addr_len != s.expected_addr_len() {
            return Ok(());
        }

        if opcode == opcodes::SE && s.wel && s.unlocked {
            let sector = address as usize & !0xFFF;
            if sector + 0x1000 <= s.mem.len() {
                s.mem[sector..sector + 0x1000].fill(0xFF);
                s.busy_polls = ERASE_BUSY_POLLS;
            }
            s.wel = false;
        }
        Ok(())
    }

    fn read_reg(
        &mut self,
        opcode: u8,
        width: BusWidth,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(s, opcode, width, regs::INSTRFRAME_TFRTYPE_READ, 0, dummy_cycles);
        if !s.decodes(width) {
            buf.fill(0xFF);
            return Ok(());
        }

        match opcode {
            opcodes::RDSR => {
                let sr = s.status();
                buf.fill(sr);
            }
            opcodes::RDID if !s.quad => {
                fill_id(buf, s.vendor.jedec_id());
            }
            opcodes::RDID_MIO if s.quad => {
                // The SST26 wants two dummy cycles ahead of a quad ID read.
                let expected = if s.vendor == Vendor::Sst26 { 2 } else { 0 };
                if dummy_cycles == expected {
                    fill_id(buf, s.vendor.jedec_id());
                } else {
                    buf.fill(0xFF);
                }
            }
            opcodes::N25Q_RDVCR if s.vendor == Vendor::N25q => buf.fill(s.vcr),
            opcodes::N25Q_RDEVCR if s.vendor == Vendor::N25q => buf.fill(s.evcr),
            opcodes::N25Q_RDNVCR if s.vendor == Vendor::N25q => {
                let bytes = s.nvcr.to_le_bytes();
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = bytes[i % 2];
                }
            }
            _ => buf.fill(0xFF),
        }
        Ok(())
    }

    fn write_reg(&mut self, opcode: u8, width: BusWidth, data: &[u8]) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(s, opcode, width, regs::INSTRFRAME_TFRTYPE_WRITE, 0, 0);
        if !s.decodes(width) || data.is_empty() {
            return Ok(());
        }

        match opcode {
            opcodes::N25Q_WREVCR if s.vendor == Vendor::N25q => {
                if s.wel {
                    s.evcr = data[0];
                    // Takes effect at the end of the command.
                    s.quad = s.evcr & opcodes::N25Q_EVCR_QUAD_DISABLE == 0;
                    s.wel = false;
                    s.busy_polls = PROGRAM_BUSY_POLLS;
                }
            }
            opcodes::N25Q_WRVCR if s.vendor == Vendor::N25q => {
                if s.wel {
                    s.vcr = data[0];
                    s.wel = false;
                }
            }
            opcodes::N25Q_WRNVCR if s.vendor == Vendor::N25q => {
                if s.wel && data.len() >= 2 {
                    s.nvcr = u16::from_le_bytes([data[0], data[1]]);
                    s.wel = false;
                    s.busy_polls = ERASE_BUSY_POLLS;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn memory_read(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        _option: Option<(u8, OptLen)>,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(
            s,
            opcode,
            width,
            regs::INSTRFRAME_TFRTYPE_READMEMORY,
            addr_len.value() as u8,
            dummy_cycles,
        );
        if !s.decodes(width)
            || addr_len != s.expected_addr_len()
            || opcode != opcodes::FAST_READ
            || dummy_cycles != s.expected_read_dummy()
        {
            buf.fill(0xFF);
            return Ok(());
        }

        let a = address as usize;
        if a + buf.len() <= s.mem.len() {
            buf.copy_from_slice(&s.mem[a..a + buf.len()]);
        } else {
            buf.fill(0xFF);
        }
        Ok(())
    }

    fn memory_write(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        data: &[u8],
    ) -> Result<()> {
        let s = &mut *self.state.borrow_mut();
        Self::note_frame(
            s,
            opcode,
            width,
            regs::INSTRFRAME_TFRTYPE_WRITEMEMORY,
            addr_len.value() as u8,
            0,
        );
        if !s.decodes(width) || addr_len != s.expected_addr_len() {
            return Ok(());
        }

        if opcode == opcodes::PP && s.wel && s.unlocked {
            let a = address as usize;
            if !s.faults.drop_programs && a + data.len() <= s.mem.len() {
                for (i, &b) in data.iter().enumerate() {
                    // NOR programming can only clear bits.
                    s.mem[a + i] &= b;
                }
            }
            s.wel = false;
            s.busy_polls = PROGRAM_BUSY_POLLS;
        }
        Ok(())
    }

    fn now_ms(&self) -> u32 {
        let s = &mut *self.state.borrow_mut();
        s.clock_ms = s.clock_ms.wrapping_add(1);
        s.clock_ms
    }

    fn delay_us(&self, us: u32) {
        let s = &mut *self.state.borrow_mut();
        s.clock_ms = s.clock_ms.wrapping_add(us.div_ceil(1000));
    }

    fn snapshot(&self) -> BusSnapshot {
        let s = self.state.borrow();
        BusSnapshot {
            enabled: true,
            memory_mode: true,
            baud_divisor: 2,
            opcode: s.last_frame.opcode,
            option_code: 0,
            width: s.last_frame.width,
            transfer_kind: s.last_frame.kind,
            addr_len: s.last_frame.addr_len,
            dummy_cycles: s.last_frame.dummy,
        }
    }
}

fn fill_id(buf: &mut [u8], id: [u8; 3]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b = if i < 3 { id[i] } else { 0xFF };
    }
}
