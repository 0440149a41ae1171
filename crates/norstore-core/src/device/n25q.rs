//! Micron N25Q256A driver
//!
//! A 32 MiB part, so the array only becomes fully reachable after entering
//! 4-byte addressing. Quad entry goes through the enhanced volatile
//! configuration register rather than a dedicated opcode, and the read dummy
//! cycle count is itself a volatile configuration field that bring-up
//! programs to match the clock the board runs the bus at.

use log::debug;

use crate::bus::{AddrLen, BusWidth, QspiBus};
use crate::device::{opcodes, NorFlash};
use crate::error::{Error, Result};
use crate::time::Budget;

/// Confirmation bound for the write-enable latch
const WEL_BUDGET: Budget = Budget::Polls(200_000);
/// Wall-clock bound for configuration register writes
const CFG_BUDGET: Budget = Budget::Millis(1_000);
/// Dummy cycles programmed into the VCR during bring-up
const READ_DUMMY_CYCLES: u8 = 8;

/// EVCR value that enables quad I/O with hold/reset disabled
const EVCR_QUAD_ENABLED: u8 = 0x1F;

/// N25Q256A on a QSPI bus
pub struct N25q<B> {
    bus: B,
    quad: bool,
    addr_len: AddrLen,
    dummy_cycles: u8,
}

impl<B: QspiBus> N25q<B> {
    /// Wrap a bus. The part is assumed unprobed; call
    /// [`probe`](NorFlash::probe) before any array access.
    pub fn new(bus: B) -> Self {
        N25q {
            bus,
            quad: false,
            addr_len: AddrLen::Bits24,
            dummy_cycles: READ_DUMMY_CYCLES,
        }
    }

    /// Borrow the underlying bus, for diagnostics
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Release the bus
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn cmd_width(&self) -> BusWidth {
        if self.quad {
            BusWidth::QuadCmd
        } else {
            BusWidth::Single
        }
    }

    /// Read the two-byte nonvolatile configuration register, LSB first
    pub fn read_nvcr(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.bus
            .read_reg(opcodes::N25Q_RDNVCR, self.cmd_width(), 0, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Write the nonvolatile configuration register. Nonvolatile writes cycle
    /// the internal state machine, so completion is awaited here.
    pub fn write_nvcr(&mut self, nvcr: u16) -> Result<()> {
        self.write_enable()?;
        self.bus
            .write_reg(opcodes::N25Q_WRNVCR, self.cmd_width(), &nvcr.to_le_bytes())?;
        self.wait_ready(CFG_BUDGET)
    }

    /// Read the volatile configuration register
    pub fn read_vcr(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.bus
            .read_reg(opcodes::N25Q_RDVCR, self.cmd_width(), 0, &mut buf)?;
        Ok(buf[0])
    }

    /// Write the volatile configuration register
    pub fn write_vcr(&mut self, vcr: u8) -> Result<()> {
        self.write_enable()?;
        self.bus
            .write_reg(opcodes::N25Q_WRVCR, self.cmd_width(), &[vcr])?;
        self.wait_ready(CFG_BUDGET)
    }

    /// Program the read dummy cycle count into the VCR. `dummy_cycles` must
    /// fit the four-bit field.
    pub fn set_dummy_cycles(&mut self, dummy_cycles: u8) -> Result<()> {
        if dummy_cycles > 15 {
            return Err(Error::Unsupported);
        }
        let vcr = self.read_vcr()?;
        let vcr = (vcr & !opcodes::N25Q_VCR_DUMMY_MASK)
            | (dummy_cycles << opcodes::N25Q_VCR_DUMMY_POS);
        self.write_vcr(vcr)?;
        self.dummy_cycles = dummy_cycles;
        Ok(())
    }

    /// Read the enhanced volatile configuration register
    pub fn read_evcr(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.bus
            .read_reg(opcodes::N25Q_RDEVCR, self.cmd_width(), 0, &mut buf)?;
        Ok(buf[0])
    }

    /// Switch the array to 4-byte addressing. Required before anything above
    /// the first 16 MiB is reachable.
    pub fn enter_4byte_mode(&mut self) -> Result<()> {
        self.write_enable()?;
        self.bus.command(opcodes::N25Q_EN4B, self.cmd_width())?;
        self.addr_len = AddrLen::Bits32;
        Ok(())
    }

    /// Return to 3-byte addressing
    pub fn exit_4byte_mode(&mut self) -> Result<()> {
        self.write_enable()?;
        self.bus.command(opcodes::N25Q_EX4B, self.cmd_width())?;
        self.addr_len = AddrLen::Bits24;
        Ok(())
    }
}

impl<B: QspiBus> NorFlash for N25q<B> {
    const JEDEC_ID: [u8; 3] = [0x20, 0xBA, 0x19];
    const CAPACITY: u32 = 32 * 1024 * 1024;
    const SECTOR_SIZE: u32 = 4096;
    const PAGE_SIZE: u32 = 256;
    const ERASE_BUDGET: Budget = Budget::Millis(3_000);
    const PROGRAM_BUDGET: Budget = Budget::Millis(10);

    fn reset(&mut self) -> Result<()> {
        // A warm reboot can leave the part in quad with 4-byte addressing;
        // send the reset pair on four wires first, then on one.
        self.quad = false;
        self.addr_len = AddrLen::Bits24;
        self.bus.command(opcodes::RSTEN, BusWidth::QuadCmd)?;
        self.bus.command(opcodes::RST, BusWidth::QuadCmd)?;
        self.bus.delay_us(50);
        self.bus.command(opcodes::RSTEN, BusWidth::Single)?;
        self.bus.command(opcodes::RST, BusWidth::Single)?;
        self.bus.delay_us(50);
        Ok(())
    }

    fn probe(&mut self) -> Result<()> {
        self.reset()?;

        let id = self.read_jedec_id()?;
        if id != Self::JEDEC_ID {
            debug!(
                "n25q: unexpected jedec id {:02x} {:02x} {:02x}",
                id[0], id[1], id[2]
            );
            return Err(Error::Unsupported);
        }

        self.enable_quad_io()?;
        self.set_dummy_cycles(READ_DUMMY_CYCLES)?;
        self.enter_4byte_mode()?;
        debug!("n25q: probe ok, quad command mode and 4-byte addressing active");
        Ok(())
    }

    fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
        let mut id = [0u8; 3];
        let opcode = if self.quad {
            opcodes::RDID_MIO
        } else {
            opcodes::RDID
        };
        self.bus.read_reg(opcode, self.cmd_width(), 0, &mut id)?;
        Ok(id)
    }

    fn enable_quad_io(&mut self) -> Result<()> {
        // The EVCR write takes effect the moment the command completes, so
        // the flag has to flip before the readiness poll or the poll would go
        // out on the wrong number of wires.
        self.write_enable()?;
        self.bus
            .write_reg(opcodes::N25Q_WREVCR, BusWidth::Single, &[EVCR_QUAD_ENABLED])?;
        self.quad = true;
        self.wait_ready(CFG_BUDGET)
    }

    fn quad_command_active(&self) -> bool {
        self.quad
    }

    fn read_status(&mut self) -> Result<u8> {
        let mut sr = [0u8; 1];
        self.bus
            .read_reg(opcodes::RDSR, self.cmd_width(), 0, &mut sr)?;
        Ok(sr[0])
    }

    fn write_enable(&mut self) -> Result<()> {
        self.bus.command(opcodes::WREN, self.cmd_width())?;

        let width = self.cmd_width();
        let latched = WEL_BUDGET.poll(
            &mut self.bus,
            |b| b.now_ms(),
            |b| {
                let mut sr = [0u8; 1];
                b.read_reg(opcodes::RDSR, width, 0, &mut sr)?;
                Ok(sr[0] & opcodes::SR_WEL != 0)
            },
        )?;
        if latched {
            Ok(())
        } else {
            Err(Error::DeviceNotReady)
        }
    }

    fn wait_ready(&mut self, budget: Budget) -> Result<()> {
        let width = self.cmd_width();
        let idle = budget.poll(
            &mut self.bus,
            |b| b.now_ms(),
            |b| {
                let mut sr = [0u8; 1];
                b.read_reg(opcodes::RDSR, width, 0, &mut sr)?;
                Ok(sr[0] & opcodes::SR_WIP == 0)
            },
        )?;
        if idle {
            Ok(())
        } else {
            Err(Error::DeviceNotReady)
        }
    }

    fn sector_erase(&mut self, address: u32) -> Result<()> {
        self.write_enable()?;
        self.bus
            .command_with_address(opcodes::SE, self.cmd_width(), self.addr_len, address)
    }

    fn page_program(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.write_enable()?;
        self.bus
            .memory_write(opcodes::PP, self.cmd_width(), self.addr_len, address, data)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.bus.memory_read(
            opcodes::FAST_READ,
            self.cmd_width(),
            self.addr_len,
            address,
            None,
            self.dummy_cycles,
            buf,
        )
    }
}
