//! Memory bank schema: types, banks, locations and ranges.
//!
//! Everything here is pure data with validating constructors. Definitions
//! are checked when they are built (`InvalidRange`, `AddressOutOfBank`, ...)
//! and never touch the bus.
//!
//! - `layout`: designated header locations (last address, checksum, lock)
//! - `bank`: `MemoryType` and `MemoryBank`
//! - `range`: `MemoryLocation`, `MemoryRange` and its location iterator
//! - `error`: `SchemaError`

pub mod bank;
pub mod error;
pub mod layout;
pub mod range;

pub use bank::{MemoryBank, MemoryType};
pub use error::SchemaError;
pub use range::{Locations, MemoryLocation, MemoryRange};
