//! Bus and device diagnostics
//!
//! Decodes the controller's live register state into a plain struct so the
//! interpretation is testable without hardware, and renders both the bus and
//! the identified part through the `log` facade.

use log::info;

use crate::bus::{regs, BusWidth, QspiBus};
use crate::device::{opcodes, NorFlash};
use crate::error::Result;

/// Decoded controller state: enable/mode bits, clock divisor, and the most
/// recently latched instruction frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSnapshot {
    /// Peripheral enable bit, from STATUS rather than CTRLA
    pub enabled: bool,
    /// Memory (XIP) mode versus plain register mode
    pub memory_mode: bool,
    /// Raw baud divisor field
    pub baud_divisor: u32,
    /// Opcode of the last latched frame
    pub opcode: u8,
    /// Option code of the last latched frame
    pub option_code: u8,
    /// Raw WIDTH field of the last latched frame
    pub width: u8,
    /// Raw TFRTYPE field of the last latched frame
    pub transfer_kind: u8,
    /// Raw ADDRLEN field of the last latched frame
    pub addr_len: u8,
    /// DUMMYLEN field of the last latched frame
    pub dummy_cycles: u8,
}

impl BusSnapshot {
    /// Interpret raw STATUS, CTRLB, BAUD, INSTRCTRL and INSTRFRAME values
    pub fn decode(status: u32, ctrlb: u32, baud: u32, instrctrl: u32, instrframe: u32) -> Self {
        BusSnapshot {
            enabled: status & regs::STATUS_ENABLE != 0,
            memory_mode: ctrlb & regs::CTRLB_MODE_MEMORY != 0,
            baud_divisor: (baud & regs::BAUD_BAUD_MASK) >> regs::BAUD_BAUD_POS,
            opcode: (instrctrl & regs::INSTRCTRL_INSTR_MASK) as u8,
            option_code: ((instrctrl & regs::INSTRCTRL_OPTCODE_MASK)
                >> regs::INSTRCTRL_OPTCODE_POS) as u8,
            width: (instrframe & regs::INSTRFRAME_WIDTH_MASK) as u8,
            transfer_kind: ((instrframe & regs::INSTRFRAME_TFRTYPE_MASK)
                >> regs::INSTRFRAME_TFRTYPE_POS) as u8,
            addr_len: ((instrframe & regs::INSTRFRAME_ADDRLEN_MASK)
                >> regs::INSTRFRAME_ADDRLEN_POS) as u8,
            dummy_cycles: ((instrframe & regs::INSTRFRAME_DUMMYLEN_MASK)
                >> regs::INSTRFRAME_DUMMYLEN_POS) as u8,
        }
    }

    /// Serial clock the divisor yields from `ref_clk_hz`
    pub fn sck_hz(&self, ref_clk_hz: u32) -> u32 {
        ref_clk_hz / (2 * (self.baud_divisor + 1))
    }

    /// Phase-width string for the last frame, "1-1-1" through "4-4-4"
    pub fn width_name(&self) -> &'static str {
        match BusWidth::from_value(u32::from(self.width)) {
            Some(w) => w.name(),
            None => "unknown",
        }
    }

    /// Transfer-type string for the last frame
    pub fn transfer_name(&self) -> &'static str {
        match u32::from(self.transfer_kind) {
            regs::INSTRFRAME_TFRTYPE_READ => "register read",
            regs::INSTRFRAME_TFRTYPE_WRITE => "register write",
            regs::INSTRFRAME_TFRTYPE_READMEMORY => "memory read",
            regs::INSTRFRAME_TFRTYPE_WRITEMEMORY => "memory write",
            _ => "unknown",
        }
    }

    /// Address-phase length in bits for the last frame
    pub fn addr_bits(&self) -> u8 {
        if u32::from(self.addr_len) == regs::INSTRFRAME_ADDRLEN_32BITS {
            32
        } else {
            24
        }
    }
}

/// Human-readable vendor for a JEDEC manufacturer byte. All-ones and
/// all-zeroes are what a floating or shorted bus reads back.
pub fn manufacturer_name(mfr: u8) -> &'static str {
    match mfr {
        0x20 => "Micron (N25Q family)",
        0xBF => "SST/Microchip (SST26)",
        0x00 | 0xFF => "invalid (check wiring/CS/clock)",
        _ => "unknown manufacturer",
    }
}

/// Log the decoded controller state. `ref_clk_hz` is the clock feeding the
/// peripheral's baud generator.
pub fn report_bus(bus: &impl QspiBus, ref_clk_hz: u32) {
    let snap = bus.snapshot();
    info!(
        "qspi: {} in {} mode",
        if snap.enabled { "enabled" } else { "disabled" },
        if snap.memory_mode { "memory" } else { "register" },
    );
    info!(
        "qspi: baud divisor {} (sck {} kHz)",
        snap.baud_divisor,
        snap.sck_hz(ref_clk_hz) / 1000,
    );
    info!(
        "qspi: last frame opcode {:#04x} width {} {} addr {}-bit dummy {}",
        snap.opcode,
        snap.width_name(),
        snap.transfer_name(),
        snap.addr_bits(),
        snap.dummy_cycles,
    );
}

/// Identify the attached part and log its readiness
pub fn report_device<D: NorFlash>(dev: &mut D) -> Result<()> {
    let id = dev.read_jedec_id()?;
    info!(
        "flash: jedec id {:02x} {:02x} {:02x}, {}",
        id[0],
        id[1],
        id[2],
        manufacturer_name(id[0]),
    );
    let sr = dev.read_status()?;
    info!(
        "flash: status {:#04x}, {}",
        sr,
        if sr & opcodes::SR_WIP == 0 {
            "ready"
        } else {
            "busy"
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_picks_fields_apart() {
        // 4-4-4 memory read, 32-bit address, 6 dummy cycles, opcode 0x0b.
        let instrctrl = 0x0B | (0xC0 << 16);
        let instrframe = 0x6
            | (regs::INSTRFRAME_ADDRLEN_32BITS << regs::INSTRFRAME_ADDRLEN_POS)
            | (regs::INSTRFRAME_TFRTYPE_READMEMORY << regs::INSTRFRAME_TFRTYPE_POS)
            | (6 << regs::INSTRFRAME_DUMMYLEN_POS);
        let snap = BusSnapshot::decode(
            regs::STATUS_ENABLE,
            regs::CTRLB_MODE_MEMORY,
            2 << regs::BAUD_BAUD_POS,
            instrctrl,
            instrframe,
        );

        assert!(snap.enabled);
        assert!(snap.memory_mode);
        assert_eq!(snap.baud_divisor, 2);
        assert_eq!(snap.opcode, 0x0B);
        assert_eq!(snap.option_code, 0xC0);
        assert_eq!(snap.width_name(), "4-4-4");
        assert_eq!(snap.transfer_name(), "memory read");
        assert_eq!(snap.addr_bits(), 32);
        assert_eq!(snap.dummy_cycles, 6);
    }

    #[test]
    fn sck_follows_divisor() {
        let mut snap = BusSnapshot::decode(0, 0, 0, 0, 0);
        assert_eq!(snap.sck_hz(120_000_000), 60_000_000);
        snap.baud_divisor = 2;
        assert_eq!(snap.sck_hz(120_000_000), 20_000_000);
    }

    #[test]
    fn manufacturer_names() {
        assert_eq!(manufacturer_name(0xBF), "SST/Microchip (SST26)");
        assert_eq!(manufacturer_name(0x20), "Micron (N25Q family)");
        assert_eq!(manufacturer_name(0xFF), "invalid (check wiring/CS/clock)");
        assert_eq!(manufacturer_name(0xC2), "unknown manufacturer");
    }
}
