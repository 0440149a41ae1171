//! QSPI bus transport
//!
//! Builds instruction frames and moves data through the peripheral's
//! memory-mapped window. This layer has no device knowledge: it runs exactly
//! the transfer it is told to, blocks until the completion flag rises, and
//! reports [`Error::BusTimeout`](crate::Error::BusTimeout) when it does not.

mod controller;
mod frame;
pub mod regs;
mod width;

pub use controller::QspiController;
pub use frame::{AddrLen, FrameFlags, InstrFrame, OptLen, TransferKind};
pub use width::BusWidth;

use crate::diag::BusSnapshot;
use crate::error::Result;

/// Blocking QSPI bus transport
///
/// All operations are synchronous; the only error this layer raises is
/// `BusTimeout`. The implementation holds exactly one in-flight instruction
/// at a time, which is what lets the layers above run without locking in
/// single-threaded use.
pub trait QspiBus {
    /// Issue an instruction-only frame
    fn command(&mut self, opcode: u8, width: BusWidth) -> Result<()>;

    /// Issue an instruction plus address, no data (sector erase addressing)
    fn command_with_address(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
    ) -> Result<()>;

    /// Register-style read (status, configuration, identification)
    fn read_reg(
        &mut self,
        opcode: u8,
        width: BusWidth,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()>;

    /// Register-style write
    fn write_reg(&mut self, opcode: u8, width: BusWidth, data: &[u8]) -> Result<()>;

    /// Bulk read through the address-indexed memory window
    #[allow(clippy::too_many_arguments)]
    fn memory_read(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        option: Option<(u8, OptLen)>,
        dummy_cycles: u8,
        buf: &mut [u8],
    ) -> Result<()>;

    /// Bulk write through the address-indexed memory window
    fn memory_write(
        &mut self,
        opcode: u8,
        width: BusWidth,
        addr_len: AddrLen,
        address: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Monotonic millisecond tick, wrapping; see [`crate::time::Ticker`]
    fn now_ms(&self) -> u32;

    /// Busy-wait for approximately `us` microseconds
    fn delay_us(&self, us: u32);

    /// Read-only snapshot of the current bus configuration, for diagnostics
    fn snapshot(&self) -> BusSnapshot;
}
