//! Memory-mapped QSPI controller
//!
//! Drives the peripheral's instruction register pair and moves data through
//! the AHB window. Register-style transfers use window offset zero; memory
//! transfers index the window by flash address. Completion is the INSTREND
//! flag, waited on with a bounded spin budget.

use crate::diag::BusSnapshot;
use crate::error::{Error, Result};
use crate::time::Ticker;

use super::frame::{AddrLen, InstrFrame, OptLen};
use super::regs;
use super::width::BusWidth;
use super::QspiBus;

/// Default spin budget for the INSTREND wait.
///
/// Register transfers complete in tens of cycles; this bound is generous
/// enough for a full page through the window at the slowest baud divisor.
pub const DEFAULT_SPIN_BUDGET: u32 = 1_000_000;

/// QSPI controller bound to a peripheral register block and its AHB window
pub struct QspiController<T: Ticker> {
    regs: *mut u8,
    window: *mut u8,
    ticker: T,
    spin_budget: u32,
}

// The register block and window are exclusively owned for the process
// lifetime; the raw pointers are never aliased by safe code.
unsafe impl<T: Ticker + Send> Send for QspiController<T> {}

impl<T: Ticker> QspiController<T> {
    /// Create a controller over a mapped QSPI register block and AHB window.
    ///
    /// # Safety
    ///
    /// `regs` must point at the QSPI peripheral register block and `window`
    /// at its AHB data window, both valid for the controller's lifetime and
    /// not accessed by anything else.
    pub unsafe fn new(regs: *mut u8, window: *mut u8, ticker: T) -> Self {
        Self {
            regs,
            window,
            ticker,
            spin_budget: DEFAULT_SPIN_BUDGET,
        }
    }

    /// Override the INSTREND spin budget
    pub fn with_spin_budget(mut self, budget: u32) -> Self {
        self.spin_budget = budget;
        self
    }

    #[inline]
    fn read_reg32(&self, offset: usize) -> u32 {
        unsafe { (self.regs.add(offset) as *const u32).read_volatile() }
    }

    #[inline]
    fn write_reg32(&self, offset: usize, value: u32) {
        unsafe { (self.regs.add(offset) as *mut u32).write_volatile(value) }
    }

    fn wait_sync(&self, mask: u32) {
        while self.read_reg32(regs::REG_SYNCBUSY) & mask != 0 {}
    }

    /// Software-reset and enable the peripheral in register mode.
    ///
    /// Clock-tree and pin-mux bring-up belong to the board layer; this only
    /// touches the QSPI block itself.
    pub fn init(&mut self) {
        self.write_reg32(regs::REG_CTRLA, regs::CTRLA_SWRST);
        self.wait_sync(regs::SYNCBUSY_SWRST);

        self.write_reg32(
            regs::REG_CTRLB,
            regs::CTRLB_MODE_MEMORY | regs::CTRLB_CSMODE_NORELOAD,
        );
        self.wait_sync(regs::SYNCBUSY_CTRLB);

        let ctrla = self.read_reg32(regs::REG_CTRLA);
        self.write_reg32(regs::REG_CTRLA, ctrla | regs::CTRLA_ENABLE);
        self.wait_sync(regs::SYNCBUSY_ENABLE);
    }

    /// Program the baud divisor: SCK = ref / (2 * (div + 1))
    pub fn set_baud_divisor(&mut self, div: u8) {
        self.write_reg32(regs::REG_BAUD, (div as u32) << regs::BAUD_BAUD_POS);
    }

    /// Copy from the AHB window into `buf`, wide where alignment allows.
    ///
    /// The window is byte-addressable, but 32-bit accesses on 32-bit-aligned
    /// runs cut the AHB transaction count by four. The window cursor's
    /// alignment is checked, never assumed.
    fn window_read(&self, offset: usize, buf: &mut [u8]) {
        let src = unsafe { self.window.add(offset) };
        let mut i = 0;

        let misalign = (src as usize) % 4;
        let head = if misalign == 0 { 0 } else { (4 - misalign).min(buf.len()) };
        while i < head {
            buf[i] = unsafe { src.add(i).read_volatile() };
            i += 1;
        }

        while i + 4 <= buf.len() {
            let word = unsafe { (src.add(i) as *const u32).read_volatile() };
            buf[i..i + 4].copy_from_slice(&word.to_le_bytes());
            i += 4;
        }

        while i < buf.len() {
            buf[i] = unsafe { src.add(i).read_volatile() };
            i += 1;
        }
    }

    /// Copy `data` into the AHB window, wide where alignment allows
    fn window_write(&self, offset: usize, data: &[u8]) {
        let dst = unsafe { self.window.add(offset) };
        let mut i = 0;

        let misalign = (dst as usize) % 4;
        let head = if misalign == 0 { 0 } else { (4 - misalign).min(data.len()) };
        while i < head {
            unsafe { dst.add(i).write_volatile(data[i]) };
            i += 1;
        }

        while i + 4 <= data.len() {
            let word = u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
            unsafe { (dst.add(i) as *mut u32).write_volatile(word) };
            i += 4;
        }

        while i < data.len() {
            unsafe { dst.add(i).write_volatile(data[i]) };
            i += 1;
        }
    }

    /// Latch the instruction registers for `frame`
    fn start(&mut self, frame: &InstrFrame) {
        if let Some(address) = frame.address {
            self.write_reg32(regs::REG_INSTRADDR, address);
        }
        self.write_reg32(regs::REG_INSTRCTRL, frame.encode_instruction());
        self.write_reg32(regs::REG_INSTRFRAME, frame.encode());
        // Dummy read back to synchronize the bus before touching the window
        let _ = self.read_reg32(regs::REG_INSTRFRAME);
    }

    /// Deassert chip select and wait for INSTREND within the spin budget
    fn finish(&mut self) -> Result<()> {
        let ctrla = self.read_reg32(regs::REG_CTRLA);
        self.write_reg32(regs::REG_CTRLA, ctrla | regs::CTRLA_LASTXFER);

        for _ in 0..self.spin_budget {
            if self.read_reg32(regs::REG_INTFLAG) & regs::INTFLAG_INSTREND != 0 {
                // Write-one-to-clear
                self.write_reg32(regs::REG_INTFLAG, regs::INTFLAG_INSTREND);
                return Ok(());
            }
        }
        log::warn!("qspi: INSTREND never rose, aborting transfer");
        Err(Error::BusTimeout)
    }

    fn run_command(&mut self, frame: InstrFrame) -> Result<()> {
        self.start(&frame);
        self.finish()
    }
}

impl<T: Ticker> QspiBus for QspiController<T> {
    fn command(&mut self, opcode: u8, width: BusWidth) -> Result<()> {
        self.run_command(InstrFrame::command(opcode, width))
    }

    fn command_with_address(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
    ) -> Result<()> {
        self.run_command(InstrFrame::command_with_address(
            opcode, width, addr_len, address,
        ))
    }

    fn read_reg(
        &mut self,
        opcode: u8,
        width: BusWidth,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()> {
        let frame = InstrFrame::register_read(opcode, width).with_dummy_cycles(dummy_cycles);
        self.start(&frame);
        self.window_read(0, buf);
        self.finish()
    }

    fn write_reg(&mut self, opcode: u8, width: BusWidth, data: &[u8]) -> Result<()> {
        let frame = InstrFrame::register_write(opcode, width);
        self.start(&frame);
        self.window_write(0, data);
        self.finish()
    }

    fn memory_read(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        option: Option<(u8, OptLen)>,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()> {
        let mut frame = InstrFrame::memory_read(opcode, width, addr_len, address)
            .with_dummy_cycles(dummy_cycles);
        if let Some((code, len)) = option {
            frame = frame.with_option(code, len);
        }
        self.start(&frame);
        self.window_read(address as usize, buf);
        self.finish()
    }

    fn memory_write(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        data: &[u8],
    ) -> Result<()> {
        let frame = InstrFrame::memory_write(opcode, width, addr_len, address);
        self.start(&frame);
        self.window_write(address as usize, data);
        self.finish()
    }

    fn now_ms(&self) -> u32 {
        self.ticker.now_ms()
    }

    fn delay_us(&self, us: u32) {
        self.ticker.delay_us(us)
    }

    fn snapshot(&self) -> BusSnapshot {
        BusSnapshot::decode(
            self.read_reg32(regs::REG_STATUS),
            self.read_reg32(regs::REG_CTRLB),
            self.read_reg32(regs::REG_BAUD),
            self.read_reg32(regs::REG_INSTRCTRL),
            self.read_reg32(regs::REG_INSTRFRAME),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;

    struct NullTicker;
    impl Ticker for NullTicker {
        fn now_ms(&self) -> u32 {
            0
        }
        fn delay_us(&self, _us: u32) {}
    }

    // A plain memory block stands in for the register file; nothing in the
    // controller's host-visible behavior needs real hardware side effects.
    #[repr(align(4))]
    struct FakePeripheral {
        regs: [u8; 0x40],
        window: [u8; 64],
    }

    impl FakePeripheral {
        fn new() -> Box<Self> {
            Box::new(FakePeripheral {
                regs: [0; 0x40],
                window: [0; 64],
            })
        }

        fn reg32(&self, offset: usize) -> u32 {
            u32::from_le_bytes([
                self.regs[offset],
                self.regs[offset + 1],
                self.regs[offset + 2],
                self.regs[offset + 3],
            ])
        }

        fn set_reg32(&mut self, offset: usize, value: u32) {
            self.regs[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    #[test]
    fn command_latches_registers_and_times_out_without_instrend() {
        let mut hw = FakePeripheral::new();
        let mut ctl = unsafe {
            QspiController::new(hw.regs.as_mut_ptr(), hw.window.as_mut_ptr(), NullTicker)
        }
        .with_spin_budget(32);

        assert_eq!(ctl.command(0x06, BusWidth::QuadCmd), Err(Error::BusTimeout));

        let instrctrl = ctl.read_reg32(regs::REG_INSTRCTRL);
        assert_eq!(instrctrl & regs::INSTRCTRL_INSTR_MASK, 0x06);
        let frame = ctl.read_reg32(regs::REG_INSTRFRAME);
        assert_eq!(frame & regs::INSTRFRAME_WIDTH_MASK, BusWidth::QuadCmd.value());
        drop(ctl);
        assert_ne!(hw.reg32(regs::REG_CTRLA) & regs::CTRLA_LASTXFER, 0);
    }

    #[test]
    fn read_moves_window_bytes_and_clears_instrend() {
        let mut hw = FakePeripheral::new();
        hw.set_reg32(regs::REG_INTFLAG, regs::INTFLAG_INSTREND);
        hw.window[..7].copy_from_slice(b"woven\xBF\x26");

        let mut ctl = unsafe {
            QspiController::new(hw.regs.as_mut_ptr(), hw.window.as_mut_ptr(), NullTicker)
        }
        .with_spin_budget(32);

        let mut buf = [0u8; 7];
        ctl.read_reg(0x9F, BusWidth::Single, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"woven\xBF\x26");
    }
}
