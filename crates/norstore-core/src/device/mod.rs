//! Serial NOR flash device drivers
//!
//! Each supported part implements [`NorFlash`] on top of a [`QspiBus`]. The
//! drivers own the bring-up choreography that differs between vendors (reset,
//! quad entry, block-protection release, address-mode selection) and expose a
//! uniform erase/program/read surface to the object store.
//!
//! Which part a firmware image talks to is a build-time decision made with
//! the `sst26` / `n25q` cargo features; [`BoardFlash`] names the selected
//! driver.

pub mod opcodes;

#[cfg(feature = "n25q")]
mod n25q;
#[cfg(feature = "sst26")]
mod sst26;

#[cfg(feature = "n25q")]
pub use n25q::N25q;
#[cfg(feature = "sst26")]
pub use sst26::Sst26;

use crate::error::Result;
use crate::time::Budget;

/// Driver selected by the vendor cargo feature.
///
/// With both features enabled (as the simulator test builds do) the SST26
/// driver wins; firmware builds enable exactly one.
#[cfg(feature = "sst26")]
pub type BoardFlash<B> = Sst26<B>;
/// Driver selected by the vendor cargo feature.
#[cfg(all(feature = "n25q", not(feature = "sst26")))]
pub type BoardFlash<B> = N25q<B>;

/// Uniform interface onto a serial NOR flash part.
///
/// Addresses are absolute byte offsets into the array. Callers are expected
/// to respect `SECTOR_SIZE` / `PAGE_SIZE` alignment; the drivers forward
/// out-of-range or misaligned requests to the part unmodified, the same as
/// the hardware would see them.
pub trait NorFlash {
    /// Expected JEDEC identification bytes (manufacturer, type, capacity)
    const JEDEC_ID: [u8; 3];
    /// Total array size in bytes
    const CAPACITY: u32;
    /// Erase granule in bytes
    const SECTOR_SIZE: u32;
    /// Program granule in bytes
    const PAGE_SIZE: u32;
    /// Poll bound for a sector erase
    const ERASE_BUDGET: Budget;
    /// Poll bound for a page program
    const PROGRAM_BUDGET: Budget;

    /// Software-reset the part and forget any quad-command state
    fn reset(&mut self) -> Result<()>;

    /// Full bring-up: reset, identify, enter the part's fast command mode,
    /// release write protection where the part powers up protected.
    ///
    /// Fails with `Unsupported` when the JEDEC ID does not match the driver.
    fn probe(&mut self) -> Result<()>;

    /// Read the three JEDEC identification bytes
    fn read_jedec_id(&mut self) -> Result<[u8; 3]>;

    /// Switch the part and all subsequent traffic to its quad command mode
    fn enable_quad_io(&mut self) -> Result<()>;

    /// Whether commands are currently issued on four wires
    fn quad_command_active(&self) -> bool;

    /// Read the status register
    fn read_status(&mut self) -> Result<u8>;

    /// Set the write-enable latch, confirming WEL actually rose.
    ///
    /// A latch that never rises means the part is absent or write-locked;
    /// that is reported as `DeviceNotReady`.
    fn write_enable(&mut self) -> Result<()>;

    /// Poll the status register until WIP clears or `budget` runs out
    fn wait_ready(&mut self, budget: Budget) -> Result<()>;

    /// Erase the sector containing `address`. Does not wait for completion;
    /// callers follow up with [`wait_ready`](Self::wait_ready) and
    /// [`ERASE_BUDGET`](Self::ERASE_BUDGET).
    fn sector_erase(&mut self, address: u32) -> Result<()>;

    /// Program up to one page starting at `address`. `data` must not cross a
    /// page boundary. Does not wait for completion.
    fn page_program(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// High-speed read of `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;
}
