use std::fmt;

use thiserror::Error;

use super::DeviceAddress;
use crate::location::MemoryType;
use crate::value::EncodeError;

/// Transport failure reported by a [`super::Bus`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("no reply")]
    NoReply,
    #[error("framing error: {detail}")]
    Framing { detail: String },
    #[error("timed out")]
    Timeout,
    /// The device signalled that the location is not implemented.
    #[error("location not implemented")]
    Unavailable,
    #[error("command rejected")]
    Rejected,
}

/// Bus command that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    SelectBank,
    SetAddress,
    ReadByte,
    WriteByte,
}

impl fmt::Display for BusOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusOp::SelectBank => "select bank",
            BusOp::SetAddress => "set address",
            BusOp::ReadByte => "read byte",
            BusOp::WriteByte => "write byte",
        })
    }
}

/// Why a checksummed bank is considered corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    ChecksumMismatch { stored: u8, expected: u8 },
    /// A write stopped after its first data byte.
    IncompleteWrite,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::ChecksumMismatch { stored, expected } => write!(
                f,
                "checksum mismatch (stored {stored:#04x}, expected {expected:#04x})"
            ),
            Corruption::IncompleteWrite => f.write_str("incomplete write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("{device}: {op} failed at bank {bank}, address {address:#04x}: {source}")]
    BusReadFailure {
        device: DeviceAddress,
        op: BusOp,
        bank: u8,
        address: u8,
        source: BusError,
    },
    #[error("{device}: {op} timed out at bank {bank}, address {address:#04x}")]
    BusTimeout {
        device: DeviceAddress,
        op: BusOp,
        bank: u8,
        address: u8,
    },
    #[error("{device}: bank {bank}, address {address:#04x} is not implemented")]
    LocationUnavailable {
        device: DeviceAddress,
        bank: u8,
        address: u8,
    },
    #[error("{device}: bank {bank} is corrupt: {reason}")]
    BankCorrupt {
        device: DeviceAddress,
        bank: u8,
        reason: Corruption,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl ReadError {
    /// Whether retrying the same read may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReadError::BusReadFailure { .. } | ReadError::BusTimeout { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("value '{name}' is not writable ({memory_type} at {address:#04x})")]
    NotWritable {
        name: String,
        address: u8,
        memory_type: MemoryType,
    },
    #[error(transparent)]
    ValueOutOfRange(#[from] EncodeError),
    #[error("{device}: bank {bank} is locked")]
    BankLocked { device: DeviceAddress, bank: u8 },
    #[error("{device}: {op} failed at bank {bank}, address {address:#04x}: {source}")]
    BusWriteFailure {
        device: DeviceAddress,
        op: BusOp,
        bank: u8,
        address: u8,
        source: BusError,
    },
    #[error("{device}: {op} failed at bank {bank}, address {address:#04x}: {source}")]
    BusReadFailure {
        device: DeviceAddress,
        op: BusOp,
        bank: u8,
        address: u8,
        source: BusError,
    },
    #[error("{device}: {op} timed out at bank {bank}, address {address:#04x}")]
    BusTimeout {
        device: DeviceAddress,
        op: BusOp,
        bank: u8,
        address: u8,
    },
    #[error("{device}: bank {bank}, address {address:#04x} is not implemented")]
    LocationUnavailable {
        device: DeviceAddress,
        bank: u8,
        address: u8,
    },
    #[error("{device}: bank {bank} is corrupt: {reason}")]
    BankCorrupt {
        device: DeviceAddress,
        bank: u8,
        reason: Corruption,
    },
    #[error("bank {bank} has no checksum")]
    NoChecksum { bank: u8 },
    #[error("operation cancelled")]
    Cancelled,
}

impl WriteError {
    /// Whether retrying the same write may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WriteError::BusWriteFailure { .. }
                | WriteError::BusReadFailure { .. }
                | WriteError::BusTimeout { .. }
        )
    }
}

impl From<ReadError> for WriteError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::BusReadFailure {
                device,
                op,
                bank,
                address,
                source,
            } => WriteError::BusReadFailure {
                device,
                op,
                bank,
                address,
                source,
            },
            ReadError::BusTimeout {
                device,
                op,
                bank,
                address,
            } => WriteError::BusTimeout {
                device,
                op,
                bank,
                address,
            },
            ReadError::LocationUnavailable {
                device,
                bank,
                address,
            } => WriteError::LocationUnavailable {
                device,
                bank,
                address,
            },
            ReadError::BankCorrupt {
                device,
                bank,
                reason,
            } => WriteError::BankCorrupt {
                device,
                bank,
                reason,
            },
            ReadError::Cancelled => WriteError::Cancelled,
        }
    }
}
