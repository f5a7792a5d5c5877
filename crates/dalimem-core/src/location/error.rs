use thiserror::Error;

/// Errors raised while defining banks, locations, ranges and values.
///
/// These are schema errors: they surface when a definition is built, never
/// while talking to a device.
///
/// # Examples
/// ```
/// use dalimem_core::{MemoryBank, MemoryRange, MemoryType, SchemaError};
///
/// let bank = MemoryBank::new(0, 0x7f, false)?;
/// let err = MemoryRange::new(bank, 0x08, 0x03, MemoryType::Rom).unwrap_err();
/// assert!(matches!(err, SchemaError::InvalidRange { .. }));
/// # Ok::<(), SchemaError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(
        "invalid range in bank {bank}: start {start:#04x}, end {end:#04x}, last address {last_address:#04x}"
    )]
    InvalidRange {
        bank: u8,
        start: u8,
        end: u8,
        last_address: u8,
    },
    #[error("address {address:#04x} outside bank {bank} (last address {last_address:#04x})")]
    AddressOutOfBank {
        bank: u8,
        address: u8,
        last_address: u8,
    },
    #[error("value '{name}' has no memory locations")]
    EmptyValue { name: String },
    #[error("value '{name}' spans banks {first} and {other}")]
    MixedBanks { name: String, first: u8, other: u8 },
    #[error("value '{name}' cannot be {width} bytes wide as {kind}")]
    UnsupportedWidth {
        name: String,
        kind: &'static str,
        width: usize,
    },
    #[error("value '{name}' has a zero scaling factor")]
    ZeroScalingFactor { name: String },
    #[error("memory bank 0 cannot be lockable")]
    LockableBankZero,
    #[error("bank {bank} is too short for its {header} byte at {address:#04x}")]
    HeaderOutOfBank {
        bank: u8,
        header: &'static str,
        address: u8,
    },
}
