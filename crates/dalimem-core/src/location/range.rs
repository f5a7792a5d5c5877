use std::iter::FusedIterator;

use super::bank::{MemoryBank, MemoryType};
use super::error::SchemaError;

/// One addressable byte within a bank.
///
/// Locations are schema: immutable once defined, carrying no device state.
///
/// # Examples
/// ```
/// use dalimem_core::{MemoryBank, MemoryLocation, MemoryType};
///
/// let bank = MemoryBank::new(207, 0x07, true)?;
/// let location = MemoryLocation::new(bank, 0x04, MemoryType::NvmRw)?.with_default(0xff);
/// assert_eq!(location.default(), Some(0xff));
/// # Ok::<(), dalimem_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryLocation {
    bank: MemoryBank,
    address: u8,
    memory_type: MemoryType,
    default: Option<u8>,
    reset: Option<u8>,
}

impl MemoryLocation {
    pub fn new(bank: MemoryBank, address: u8, memory_type: MemoryType) -> Result<Self, SchemaError> {
        if !bank.contains(address) {
            return Err(SchemaError::AddressOutOfBank {
                bank: bank.index(),
                address,
                last_address: bank.last_address(),
            });
        }
        Ok(Self {
            bank,
            address,
            memory_type,
            default: None,
            reset: None,
        })
    }

    pub fn with_default(self, value: u8) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }

    pub fn with_reset(self, value: u8) -> Self {
        Self {
            reset: Some(value),
            ..self
        }
    }

    pub fn bank(&self) -> MemoryBank {
        self.bank
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    /// Factory default byte, when the schema declares one.
    pub fn default(&self) -> Option<u8> {
        self.default
    }

    /// Value restored by a reset, when the schema declares one.
    pub fn reset(&self) -> Option<u8> {
        self.reset
    }
}

/// Contiguous, inclusive run of locations `[start, end]` in one bank.
///
/// Construction validates the span, so schema mistakes surface when the
/// definition is built rather than when a device is read.
///
/// # Examples
/// ```
/// use dalimem_core::{MemoryBank, MemoryRange, MemoryType};
///
/// let bank = MemoryBank::new(0, 0x7f, false)?;
/// let gtin = MemoryRange::new(bank, 0x03, 0x08, MemoryType::Rom)?;
/// let addresses: Vec<u8> = gtin.locations().map(|l| l.address()).collect();
/// assert_eq!(addresses, vec![0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
/// # Ok::<(), dalimem_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    bank: MemoryBank,
    start: u8,
    end: u8,
    memory_type: MemoryType,
    default: Option<u8>,
    reset: Option<u8>,
}

impl MemoryRange {
    pub fn new(
        bank: MemoryBank,
        start: u8,
        end: u8,
        memory_type: MemoryType,
    ) -> Result<Self, SchemaError> {
        if start > end || !bank.contains(end) {
            return Err(SchemaError::InvalidRange {
                bank: bank.index(),
                start,
                end,
                last_address: bank.last_address(),
            });
        }
        Ok(Self {
            bank,
            start,
            end,
            memory_type,
            default: None,
            reset: None,
        })
    }

    /// Default byte shared by every location of the range.
    pub fn with_default(self, value: u8) -> Self {
        Self {
            default: Some(value),
            ..self
        }
    }

    pub fn with_reset(self, value: u8) -> Self {
        Self {
            reset: Some(value),
            ..self
        }
    }

    pub fn bank(&self) -> MemoryBank {
        self.bank
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    /// Number of locations, `end - start + 1`.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Always false: a range holds at least one location.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Locations in ascending address order. Call again to restart.
    pub fn locations(&self) -> Locations {
        Locations {
            range: *self,
            next: Some(self.start),
        }
    }
}

impl IntoIterator for &MemoryRange {
    type Item = MemoryLocation;
    type IntoIter = Locations;

    fn into_iter(self) -> Self::IntoIter {
        self.locations()
    }
}

/// Lazy iterator over the locations of a [`MemoryRange`].
#[derive(Debug, Clone)]
pub struct Locations {
    range: MemoryRange,
    next: Option<u8>,
}

impl Iterator for Locations {
    type Item = MemoryLocation;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.next?;
        self.next = if address < self.range.end {
            Some(address + 1)
        } else {
            None
        };
        Some(MemoryLocation {
            bank: self.range.bank,
            address,
            memory_type: self.range.memory_type,
            default: self.range.default,
            reset: self.range.reset,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(address) => usize::from(self.range.end - address) + 1,
            None => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Locations {}

impl FusedIterator for Locations {}
