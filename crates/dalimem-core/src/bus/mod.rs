//! Device access over a byte-oriented memory bus.
//!
//! The [`Bus`] trait is the only I/O seam: four commands addressed to one
//! device. [`MemorySession`] drives it, keeping the per-device bank and
//! address pointers so that adjacent reads reuse the selected bank and the
//! device's auto-incrementing pointer.
//!
//! Layering:
//! - `link`: one device transaction, pointer bookkeeping, failure mapping
//! - `checksum`: 2009-layout checksum verification and rewrite
//! - `session`: read/write protocols, unlock scoping, corruption tracking
//! - `state`: per-device context (pointers, per-bank checksum status)

use std::fmt;

use serde::Serialize;

mod checksum;
pub mod error;
mod link;
pub mod options;
mod session;
mod state;

pub use error::{BusError, BusOp, Corruption, ReadError, WriteError};
pub use options::{CancelToken, ReadOptions, UnlockPolicy, WriteOptions};
pub use session::MemorySession;

/// Address of one bus unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceAddress(pub u8);

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device {}", self.0)
    }
}

impl From<u8> for DeviceAddress {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Memory-access commands of a bus unit.
///
/// `read_byte` and `write_byte` act at the device's address pointer and
/// advance it by one. Only one command is outstanding at a time; callers
/// hold `&mut self` for its duration.
pub trait Bus {
    fn select_bank(&mut self, device: DeviceAddress, bank: u8) -> Result<(), BusError>;
    fn set_address(&mut self, device: DeviceAddress, address: u8) -> Result<(), BusError>;
    fn read_byte(&mut self, device: DeviceAddress) -> Result<u8, BusError>;
    fn write_byte(&mut self, device: DeviceAddress, value: u8) -> Result<(), BusError>;
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn select_bank(&mut self, device: DeviceAddress, bank: u8) -> Result<(), BusError> {
        (**self).select_bank(device, bank)
    }

    fn set_address(&mut self, device: DeviceAddress, address: u8) -> Result<(), BusError> {
        (**self).set_address(device, address)
    }

    fn read_byte(&mut self, device: DeviceAddress) -> Result<u8, BusError> {
        (**self).read_byte(device)
    }

    fn write_byte(&mut self, device: DeviceAddress, value: u8) -> Result<(), BusError> {
        (**self).write_byte(device, value)
    }
}
