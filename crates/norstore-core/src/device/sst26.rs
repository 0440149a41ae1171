//! Microchip SST26VF064B driver
//!
//! The part powers up with all blocks write-protected and speaking 1-1-1.
//! Bring-up moves it to 4-4-4 with the single `EQIO` opcode and then releases
//! the global block protection. Once in quad mode every command, including
//! status polls, rides four wires; the driver tracks that transition in
//! `quad` and derives the command width from it on every call.

use log::debug;

use crate::bus::{AddrLen, BusWidth, QspiBus};
use crate::device::{opcodes, NorFlash};
use crate::error::{Error, Result};
use crate::time::Budget;

/// Confirmation bound for the write-enable latch
const WEL_BUDGET: Budget = Budget::Polls(200_000);

/// SST26VF064B on a QSPI bus
pub struct Sst26<B> {
    bus: B,
    quad: bool,
}

impl<B: QspiBus> Sst26<B> {
    /// Wrap a bus. The part is assumed unprobed; call
    /// [`probe`](NorFlash::probe) before any array access.
    pub fn new(bus: B) -> Self {
        Sst26 { bus, quad: false }
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

    /// Release the power-on global block protection. Needs a write enable
    /// first, like any other write-class command.
    pub fn unlock_global(&mut self) -> Result<()> {
        self.write_enable()?;
        self.bus.command(opcodes::SST26_ULBPR, self.cmd_width())
    }
}

impl<B: QspiBus> NorFlash for Sst26<B> {
    const JEDEC_ID: [u8; 3] = [0xBF, 0x26, 0x43];
    const CAPACITY: u32 = 8 * 1024 * 1024;
    const SECTOR_SIZE: u32 = 4096;
    const PAGE_SIZE: u32 = 256;
    // Loop counts, not milliseconds. The part signals completion well inside
    // these bounds at any sane core clock.
    const ERASE_BUDGET: Budget = Budget::Polls(30_000_000);
    const PROGRAM_BUDGET: Budget = Budget::Polls(3_000_000);

    fn reset(&mut self) -> Result<()> {
        // The reset pair is honored in whatever mode the part is in. Issue
        // it on four wires first in case a warm reboot left SQI active, then
        // again on one wire for the power-on case.
        self.quad = false;
        self.bus.command(opcodes::RSTEN, BusWidth::QuadCmd)?;
        self.bus.command(opcodes::RST, BusWidth::QuadCmd)?;
        self.bus.command(opcodes::RSTEN, BusWidth::Single)?;
        self.bus.command(opcodes::RST, BusWidth::Single)?;
        self.bus.delay_us(100);
        Ok(())
    }

    fn probe(&mut self) -> Result<()> {
        self.reset()?;
        self.enable_quad_io()?;

        let id = self.read_jedec_id()?;
        if id != Self::JEDEC_ID {
            debug!(
                "sst26: unexpected jedec id {:02x} {:02x} {:02x}",
                id[0], id[1], id[2]
            );
            return Err(Error::Unsupported);
        }

        self.unlock_global()?;
        self.wait_ready(Budget::Polls(2_000_000))?;
        debug!("sst26: probe ok, quad command mode active");
        Ok(())
    }

    fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
        let mut id = [0u8; 3];
        if self.quad {
            // Quad ID read wants two dummy cycles before data.
            self.bus
                .read_reg(opcodes::RDID_MIO, BusWidth::QuadCmd, 2, &mut id)?;
        } else {
            self.bus.read_reg(opcodes::RDID, BusWidth::Single, 0, &mut id)?;
        }
        Ok(id)
    }

    fn enable_quad_io(&mut self) -> Result<()> {
        // The part switches to 4-4-4 the moment EQIO completes; the flag
        // flips only once the bus confirms the command went out.
        self.bus.command(opcodes::SST26_EQIO, BusWidth::Single)?;
        self.quad = true;
        Ok(())
    }

    fn quad_command_active(&self) -> bool {
        self.quad
    }

    fn read_status(&mut self) -> Result<u8> {
        let mut sr = [0u8; 1];
        let dummy = if self.quad { 2 } else { 0 };
        self.bus
            .read_reg(opcodes::RDSR, self.cmd_width(), dummy, &mut sr)?;
        Ok(sr[0])
    }

    fn write_enable(&mut self) -> Result<()> {
        self.bus.command(opcodes::WREN, self.cmd_width())?;

        let width = self.cmd_width();
        let dummy = if self.quad { 2 } else { 0 };
        let latched = WEL_BUDGET.poll(
            &mut self.bus,
            |b| b.now_ms(),
            |b| {
                let mut sr = [0u8; 1];
                b.read_reg(opcodes::RDSR, width, dummy, &mut sr)?;
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
        let dummy = if self.quad { 2 } else { 0 };
        let idle = budget.poll(
            &mut self.bus,
            |b| b.now_ms(),
            |b| {
                let mut sr = [0u8; 1];
                b.read_reg(opcodes::RDSR, width, dummy, &mut sr)?;
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
        self.bus.command_with_address(
            opcodes::SE,
            self.cmd_width(),
            AddrLen::Bits24,
            address,
        )
    }

    fn page_program(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.write_enable()?;
        self.bus.memory_write(
            opcodes::PP,
            self.cmd_width(),
            AddrLen::Bits24,
            address,
            data,
        )
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        // High-speed read: six dummy cycles in SQI, a full dummy byte in SPI.
        let dummy = if self.quad { 6 } else { 8 };
        self.bus.memory_read(
            opcodes::FAST_READ,
            self.cmd_width(),
            AddrLen::Bits24,
            address,
            None,
            dummy,
            buf,
        )
    }
}
