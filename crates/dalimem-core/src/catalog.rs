//! Standard memory-bank contents as data.
//!
//! Bank 0 (bus unit identification, IEC 62386-102) changed layout between
//! the 2009 and 2014 editions: the 2009 bank ends at 0x0e, truncates the
//! identification number to four bytes and carries a checksum. A unit
//! answering version number 1 follows the 2009 edition.
//!
//! Bank 207 holds the luminaire maintenance data of DALI Part 253. In that
//! bank MASK means "unknown".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{MemoryBank, MemoryRange, MemoryType, SchemaError};
use crate::value::{ValueDef, ValueKind};

/// Edition of IEC 62386-102 a bus unit implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardRevision {
    #[serde(rename = "2009")]
    Iec62386_102_2009,
    #[serde(rename = "2014")]
    Iec62386_102_2014,
}

impl StandardRevision {
    /// Map a queried version number; 1 is the 2009 edition.
    pub fn from_version_number(version: u8) -> Self {
        if version == 1 {
            Self::Iec62386_102_2009
        } else {
            Self::Iec62386_102_2014
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iec62386_102_2009 => "2009",
            Self::Iec62386_102_2014 => "2014",
        }
    }
}

impl fmt::Display for StandardRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardRevision {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2009" => Ok(Self::Iec62386_102_2009),
            "2014" => Ok(Self::Iec62386_102_2014),
            other => Err(CatalogError::UnknownRevision {
                text: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown standard revision '{text}' (expected 2009 or 2014)")]
    UnknownRevision { text: String },
    #[error("no value named '{name}' in the {revision} catalog")]
    UnknownValue {
        name: String,
        revision: StandardRevision,
    },
    #[error("bank {bank} is not part of the {revision} catalog")]
    UnknownBank {
        bank: u8,
        revision: StandardRevision,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Static description of a bank, turned into a validated [`MemoryBank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSpec {
    pub index: u8,
    pub last_address: u8,
    pub has_lock: bool,
    pub has_checksum: bool,
}

impl BankSpec {
    pub fn build(&self) -> Result<MemoryBank, SchemaError> {
        let bank = MemoryBank::new(self.index, self.last_address, self.has_lock)?;
        if self.has_checksum {
            bank.with_checksum()
        } else {
            Ok(bank)
        }
    }
}

pub const BANK_0: BankSpec = BankSpec {
    index: 0,
    last_address: 0x7f,
    has_lock: false,
    has_checksum: false,
};

pub const BANK_0_LEGACY: BankSpec = BankSpec {
    index: 0,
    last_address: 0x0e,
    has_lock: false,
    has_checksum: true,
};

pub const BANK_207: BankSpec = BankSpec {
    index: 207,
    last_address: 0x07,
    has_lock: true,
    has_checksum: false,
};

/// One catalog row: a named value over `[start, end]` of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub bank: BankSpec,
    pub start: u8,
    pub end: u8,
    pub memory_type: MemoryType,
    pub kind: ValueKind,
    pub default: Option<u8>,
}

impl CatalogEntry {
    pub fn definition(&self) -> Result<ValueDef, SchemaError> {
        let mut range = MemoryRange::new(self.bank.build()?, self.start, self.end, self.memory_type)?;
        if let Some(default) = self.default {
            range = range.with_default(default);
        }
        ValueDef::from_range(self.name, &range, self.kind)
    }
}

const fn rom(name: &'static str, bank: BankSpec, start: u8, end: u8, kind: ValueKind) -> CatalogEntry {
    CatalogEntry {
        name,
        bank,
        start,
        end,
        memory_type: MemoryType::Rom,
        kind,
        default: None,
    }
}

const fn maintenance(name: &'static str, start: u8, end: u8, kind: ValueKind) -> CatalogEntry {
    CatalogEntry {
        name,
        bank: BANK_207,
        start,
        end,
        memory_type: MemoryType::NvmRw,
        kind,
        default: Some(0xff),
    }
}

const BANK_0_VALUES: &[CatalogEntry] = &[
    rom("GTIN", BANK_0, 0x03, 0x08, ValueKind::Numeric),
    rom("FirmwareVersion", BANK_0, 0x09, 0x0a, ValueKind::VersionNumber),
    rom("IdentificationNumber", BANK_0, 0x0b, 0x12, ValueKind::Numeric),
    rom("HardwareVersion", BANK_0, 0x13, 0x14, ValueKind::VersionNumber),
    rom("Part101Version", BANK_0, 0x15, 0x15, ValueKind::VersionNumber),
    rom("Part102Version", BANK_0, 0x16, 0x16, ValueKind::VersionNumber),
    rom("Part103Version", BANK_0, 0x17, 0x17, ValueKind::VersionNumber),
    rom("DeviceUnitCount", BANK_0, 0x18, 0x18, ValueKind::Numeric),
    rom("GearUnitCount", BANK_0, 0x19, 0x19, ValueKind::Numeric),
    rom("UnitIndex", BANK_0, 0x1a, 0x1a, ValueKind::Numeric),
];

const BANK_0_LEGACY_VALUES: &[CatalogEntry] = &[
    rom("GTIN", BANK_0_LEGACY, 0x03, 0x08, ValueKind::Numeric),
    rom("FirmwareVersion", BANK_0_LEGACY, 0x09, 0x0a, ValueKind::VersionNumber),
    rom("IdentificationNumber", BANK_0_LEGACY, 0x0b, 0x0e, ValueKind::Numeric),
];

const BANK_207_VALUES: &[CatalogEntry] = &[
    maintenance(
        "RatedMedianUsefulLifeOfLuminaire",
        0x04,
        0x04,
        ValueKind::FixedScale {
            scaling_factor: 1000,
            unit: "h",
        },
    ),
    maintenance(
        "InternalControlGearReferenceTemperature",
        0x05,
        0x05,
        ValueKind::Temperature,
    ),
    maintenance(
        "RatedMedianUsefulLightSourceStarts",
        0x06,
        0x07,
        ValueKind::FixedScale {
            scaling_factor: 100,
            unit: "starts",
        },
    ),
];

/// Catalog rows for `revision`, bank 0 first.
pub fn entries(revision: StandardRevision) -> impl Iterator<Item = &'static CatalogEntry> {
    let bank_0 = match revision {
        StandardRevision::Iec62386_102_2009 => BANK_0_LEGACY_VALUES,
        StandardRevision::Iec62386_102_2014 => BANK_0_VALUES,
    };
    bank_0.iter().chain(BANK_207_VALUES)
}

pub fn definitions(revision: StandardRevision) -> Result<Vec<ValueDef>, SchemaError> {
    entries(revision).map(CatalogEntry::definition).collect()
}

pub fn find(revision: StandardRevision, name: &str) -> Result<ValueDef, CatalogError> {
    let entry = entries(revision)
        .find(|e| e.name == name)
        .ok_or_else(|| CatalogError::UnknownValue {
            name: name.to_string(),
            revision,
        })?;
    Ok(entry.definition()?)
}

/// Bank `index` as laid out by `revision`.
pub fn bank(revision: StandardRevision, index: u8) -> Result<MemoryBank, CatalogError> {
    let spec = entries(revision)
        .map(|e| e.bank)
        .find(|b| b.index == index)
        .ok_or(CatalogError::UnknownBank {
            bank: index,
            revision,
        })?;
    Ok(spec.build()?)
}
