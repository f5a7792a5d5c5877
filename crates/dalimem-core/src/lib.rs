//! dalimem core library: typed access to DALI bus-unit memory banks.
//!
//! Memory banks are schema: banks, locations and ranges are validated when
//! defined and never touch the bus. Value definitions pair an ordered run of
//! locations with a codec (numeric, version number, fixed-scale, temperature)
//! whose sentinels decode to tagged outcomes instead of errors. A
//! `MemorySession` evaluates definitions against devices through the `Bus`
//! trait, tracking per-device pointers, lock bytes and bank checksums.
//!
//! Invariants:
//! - Schema errors surface at definition time, with no bus interaction.
//! - Adjacent reads in one bank reuse the selected bank and address pointer.
//! - A write into a checksummed bank ends with exactly one checksum write,
//!   or leaves the bank marked corrupt until repaired.
//! - A bank unlocked for a scoped write is re-locked on every exit path.
//!
//! Layering follows the memory layout: `location` (bank schema) ->
//! `value` (layout/reader/parser/encoder) -> `bus` (session protocol) ->
//! `catalog` and `readout`. All file I/O stays in `image` and `readout`.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use dalimem_core::inspect_image_file;
//!
//! let report = inspect_image_file(Path::new("device.json"), 0, None)?;
//! println!("report version: {}", report.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod bus;
pub mod catalog;
mod image;
mod location;
mod readout;
mod value;

pub use bus::{
    Bus, BusError, BusOp, CancelToken, Corruption, DeviceAddress, MemorySession, ReadError,
    ReadOptions, UnlockPolicy, WriteError, WriteOptions,
};
pub use catalog::{CatalogError, StandardRevision};
pub use image::{BankImage, DeviceImage, ImageBus, ImageError, MemoryImage};
pub use location::layout as bank_layout;
pub use location::{Locations, MemoryBank, MemoryLocation, MemoryRange, MemoryType, SchemaError};
pub use readout::{ReadoutError, inspect_image_file, read_report};
pub use value::{
    Celsius, DecodeError, EncodeError, Outcome, Quantity, Reading, ValueDef, ValueKind,
    VersionNumber,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used until the caller stamps the report.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Readout of every catalog value of one device.
///
/// # Examples
/// ```
/// use dalimem_core::{StandardRevision, make_stub_report};
///
/// let report = make_stub_report("device.json", 123, 0, StandardRevision::Iec62386_102_2014);
/// assert_eq!(report.report_version, dalimem_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,

    pub input: InputInfo,

    /// Bus address of the device read.
    pub device: u8,
    /// Catalog edition used to interpret bank 0.
    pub revision: StandardRevision,
    /// One entry per catalog value, in catalog order.
    pub values: Vec<ValueSummary>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use dalimem_core::InputInfo;
///
/// let input = InputInfo {
///     path: "device.json".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the reader.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Result of reading one value.
///
/// Exactly one of `outcome` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSummary {
    pub name: String,
    pub bank: u8,
    pub start: u8,
    pub end: u8,
    pub memory_type: MemoryType,
    /// Codec name (e.g., "version number").
    pub kind: String,
    /// Decoded value or sentinel, as displayed (e.g., "2.1", "MASK").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Raw bytes in lowercase hex, most significant first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Empty report for `device`, ready to be filled by a readout.
///
/// # Examples
/// ```
/// use dalimem_core::{StandardRevision, make_stub_report};
///
/// let report = make_stub_report("device.json", 123, 4, StandardRevision::Iec62386_102_2009);
/// assert_eq!(report.device, 4);
/// assert!(report.values.is_empty());
/// ```
pub fn make_stub_report(
    input_path: &str,
    input_bytes: u64,
    device: u8,
    revision: StandardRevision,
) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "dalimem".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        device,
        revision,
        values: Vec::new(),
    }
}
