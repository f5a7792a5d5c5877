use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SchemaError;
use super::layout;

/// Access semantics of a memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryType {
    /// Factory data, never written.
    Rom,
    /// Volatile runtime state, read-only.
    RamRo,
    /// Volatile runtime state; not written through the memory protocol.
    RamRw,
    /// Non-volatile, read-only.
    NvmRo,
    /// Non-volatile, writable.
    NvmRw,
    /// Non-volatile, writable only while the bank is unlocked.
    NvmRwProt,
}

impl MemoryType {
    /// Whether the memory protocol may write this location.
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::NvmRw | Self::NvmRwProt)
    }

    /// Whether writes require the bank lock byte to be open.
    pub const fn is_lockable(self) -> bool {
        matches!(self, Self::NvmRwProt)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rom => "ROM",
            Self::RamRo => "RAM-RO",
            Self::RamRw => "RAM-RW",
            Self::NvmRo => "NVM-RO",
            Self::NvmRw => "NVM-RW",
            Self::NvmRwProt => "NVM-RW (lockable)",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable memory bank of a bus unit.
///
/// Bank 0 always exists and is never lockable. Banks using the 2009 layout
/// carry a checksum byte at [`layout::CHECKSUM_OFFSET`]; lockable banks carry
/// a lock byte at [`layout::LOCK_BYTE_OFFSET`].
///
/// # Examples
/// ```
/// use dalimem_core::MemoryBank;
///
/// let bank = MemoryBank::new(207, 0x07, true)?;
/// assert_eq!(bank.index(), 207);
/// assert!(bank.contains(0x07));
/// assert!(!bank.contains(0x08));
/// # Ok::<(), dalimem_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBank {
    index: u8,
    last_address: u8,
    has_lock: bool,
    has_checksum: bool,
}

impl MemoryBank {
    pub fn new(index: u8, last_address: u8, has_lock: bool) -> Result<Self, SchemaError> {
        if has_lock && index == 0 {
            return Err(SchemaError::LockableBankZero);
        }
        if has_lock && last_address < layout::LOCK_BYTE_OFFSET {
            return Err(SchemaError::HeaderOutOfBank {
                bank: index,
                header: "lock",
                address: layout::LOCK_BYTE_OFFSET,
            });
        }
        Ok(Self {
            index,
            last_address,
            has_lock,
            has_checksum: false,
        })
    }

    /// Switch the bank to the checksummed (2009) layout.
    pub fn with_checksum(self) -> Result<Self, SchemaError> {
        if self.last_address < layout::CHECKSUM_OFFSET {
            return Err(SchemaError::HeaderOutOfBank {
                bank: self.index,
                header: "checksum",
                address: layout::CHECKSUM_OFFSET,
            });
        }
        Ok(Self {
            has_checksum: true,
            ..self
        })
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn last_address(&self) -> u8 {
        self.last_address
    }

    pub fn has_lock(&self) -> bool {
        self.has_lock
    }

    pub fn has_checksum(&self) -> bool {
        self.has_checksum
    }

    pub fn contains(&self, address: u8) -> bool {
        address <= self.last_address
    }

    pub fn checksum_address(&self) -> Option<u8> {
        self.has_checksum.then_some(layout::CHECKSUM_OFFSET)
    }

    pub fn lock_address(&self) -> Option<u8> {
        self.has_lock.then_some(layout::LOCK_BYTE_OFFSET)
    }

    /// Whether `address` is a header byte left out of the checksum.
    pub(crate) fn is_checksum_exempt(&self, address: u8) -> bool {
        self.checksum_address() == Some(address) || self.lock_address() == Some(address)
    }
}
