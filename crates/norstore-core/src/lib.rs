//! norstore-core - QSPI NOR flash transport and persistent object store
//!
//! This crate drives a serial NOR flash behind a memory-mapped QSPI
//! peripheral and builds a CRC-checked object store on top of it. It is
//! `no_std` and fully synchronous: every wait is a bounded busy-poll, no
//! operation suspends or retries internally.
//!
//! The layers, leaf first:
//!
//! - [`bus`] - instruction framing and the QSPI controller. Knows how to run
//!   a single transfer in any 1/2/4-wire phase combination; knows nothing
//!   about any flash part.
//! - [`device`] - the vendor command sets (SST26, N25Q) behind the
//!   [`device::NorFlash`] trait. One vendor is compiled per board build,
//!   selected with the `sst26`/`n25q` cargo features.
//! - [`store`] - length-prefixed, CRC32-protected records at caller-chosen
//!   flash addresses, with erase-before-write and read-back verification.
//! - [`diag`] - read-only introspection of bus configuration and device
//!   identity, reported through the `log` facade.
//!
//! # Features
//!
//! - `std` - implement `std::error::Error` for the error type
//! - `sst26` / `n25q` - vendor driver selection (default: `sst26`)
//!
//! # Example
//!
//! ```ignore
//! use norstore_core::device::NorFlash;
//! use norstore_core::store::{ObjectStore, Region};
//!
//! fn save<D: NorFlash>(dev: D) -> norstore_core::Result<()> {
//!     let mut store = ObjectStore::new(dev, Region::new(0, 16));
//!     store.write_sector(0, b"calibration", 0x4341_4C31, 1)?;
//!     let mut buf = [0u8; 64];
//!     let header = store.read_sector(0, &mut buf, true)?;
//!     assert_eq!(&buf[..header.payload_len as usize], b"calibration");
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod device;
pub mod diag;
pub mod error;
pub mod store;
pub mod time;

pub use error::{CorruptKind, Error, Result};
