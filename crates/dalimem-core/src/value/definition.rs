use crate::location::{MemoryBank, MemoryLocation, MemoryRange, SchemaError};

use super::error::{DecodeError, EncodeError};
use super::layout;
use super::outcome::{Outcome, Reading};
use super::{encoder, parser};

/// How the bytes of a value are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Unsigned big-endian integer; all `0xFF` is MASK.
    Numeric,
    /// Packed `major.minor` (one byte) or major then minor (two bytes).
    VersionNumber,
    /// Integer divided by `scaling_factor`, in `unit`; supports TMASK.
    FixedScale {
        scaling_factor: u32,
        unit: &'static str,
    },
    /// One byte, `raw - 60` °C; supports TMASK.
    Temperature,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Numeric => "integer",
            ValueKind::VersionNumber => "version number",
            ValueKind::FixedScale { .. } => "fixed-scale quantity",
            ValueKind::Temperature => "temperature",
        }
    }

    pub fn supports_mask(&self) -> bool {
        !matches!(self, ValueKind::VersionNumber)
    }

    pub fn supports_tmask(&self) -> bool {
        matches!(self, ValueKind::FixedScale { .. } | ValueKind::Temperature)
    }

    pub fn supports_not_implemented(&self) -> bool {
        matches!(self, ValueKind::VersionNumber)
    }

    fn accepts_width(&self, width: usize) -> bool {
        match self {
            ValueKind::Numeric | ValueKind::FixedScale { .. } => {
                (1..=layout::MAX_NUMERIC_WIDTH).contains(&width)
            }
            ValueKind::VersionNumber => width == 1 || width == 2,
            ValueKind::Temperature => width == 1,
        }
    }
}

/// A named value: an ordered run of locations plus the codec reading them.
///
/// Definitions are schema. They are validated once and then evaluated on
/// demand against live devices through a [`crate::MemorySession`].
///
/// # Examples
/// ```
/// use dalimem_core::{MemoryBank, MemoryRange, MemoryType, ValueDef, ValueKind, Outcome, Reading};
///
/// let bank = MemoryBank::new(207, 0x07, true)?;
/// let starts = ValueDef::from_range(
///     "RatedMedianUsefulLightSourceStarts",
///     &MemoryRange::new(bank, 0x06, 0x07, MemoryType::NvmRw)?,
///     ValueKind::FixedScale { scaling_factor: 100, unit: "starts" },
/// )?;
/// assert_eq!(starts.width(), 2);
/// assert_eq!(starts.decode(&[0xff, 0xff]).unwrap(), Outcome::Mask);
/// # Ok::<(), dalimem_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDef {
    name: String,
    locations: Vec<MemoryLocation>,
    kind: ValueKind,
}

impl ValueDef {
    pub fn new(
        name: impl Into<String>,
        locations: impl IntoIterator<Item = MemoryLocation>,
        kind: ValueKind,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let locations: Vec<MemoryLocation> = locations.into_iter().collect();
        let Some(first) = locations.first() else {
            return Err(SchemaError::EmptyValue { name });
        };
        let bank = first.bank().index();
        if let Some(other) = locations.iter().find(|l| l.bank().index() != bank) {
            return Err(SchemaError::MixedBanks {
                first: bank,
                other: other.bank().index(),
                name,
            });
        }
        if !kind.accepts_width(locations.len()) {
            return Err(SchemaError::UnsupportedWidth {
                width: locations.len(),
                kind: kind.name(),
                name,
            });
        }
        if let ValueKind::FixedScale {
            scaling_factor: 0, ..
        } = kind
        {
            return Err(SchemaError::ZeroScalingFactor { name });
        }
        Ok(Self {
            name,
            locations,
            kind,
        })
    }

    pub fn from_range(
        name: impl Into<String>,
        range: &MemoryRange,
        kind: ValueKind,
    ) -> Result<Self, SchemaError> {
        Self::new(name, range.locations(), kind)
    }

    pub fn from_location(
        name: impl Into<String>,
        location: MemoryLocation,
        kind: ValueKind,
    ) -> Result<Self, SchemaError> {
        Self::new(name, [location], kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locations(&self) -> &[MemoryLocation] {
        &self.locations
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Bank shared by every location.
    pub fn bank(&self) -> MemoryBank {
        self.locations[0].bank()
    }

    pub fn width(&self) -> usize {
        self.locations.len()
    }

    pub fn start(&self) -> u8 {
        self.locations[0].address()
    }

    pub fn end(&self) -> u8 {
        self.locations[self.locations.len() - 1].address()
    }

    /// Whether every location may be written through the memory protocol.
    pub fn is_writable(&self) -> bool {
        self.locations
            .iter()
            .all(|l| l.memory_type().is_writable())
    }

    /// Whether any location needs the bank lock byte open before writing.
    pub fn needs_unlock(&self) -> bool {
        self.bank().has_lock()
            && self
                .locations
                .iter()
                .any(|l| l.memory_type().is_lockable())
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Outcome<Reading>, DecodeError> {
        if raw.len() != self.width() {
            return Err(DecodeError {
                name: self.name.clone(),
                expected: self.width(),
                actual: raw.len(),
            });
        }
        Ok(parser::decode(&self.kind, raw))
    }

    /// Decode bytes already read location by location.
    pub(crate) fn decode_read(&self, raw: &[u8]) -> Outcome<Reading> {
        debug_assert_eq!(raw.len(), self.width());
        parser::decode(&self.kind, raw)
    }

    pub fn encode(&self, outcome: &Outcome<Reading>) -> Result<Vec<u8>, EncodeError> {
        encoder::encode(&self.kind, self.width(), outcome)
    }

    /// Decoded factory default, when every location declares one.
    pub fn decode_default(&self) -> Option<Outcome<Reading>> {
        let raw: Option<Vec<u8>> = self.locations.iter().map(|l| l.default()).collect();
        raw.map(|raw| parser::decode(&self.kind, &raw))
    }
}
