use std::fmt;

use serde::Serialize;

/// Result of decoding a value: either a reading or one of the standard's
/// sentinels. Sentinels are valid answers, not errors.
///
/// # Examples
/// ```
/// use dalimem_core::{Outcome, Reading, VersionNumber};
///
/// let version: Outcome<Reading> = Outcome::Value(Reading::Version(VersionNumber::new(2, 0)));
/// assert_eq!(version.to_string(), "2.0");
/// assert_eq!(Outcome::<Reading>::NotImplemented.to_string(), "not implemented");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Value(T),
    /// Value unknown or not implemented (MASK).
    Mask,
    /// Value temporarily unknown (TMASK).
    TemporaryMask,
    /// Feature not implemented by the bus unit.
    NotImplemented,
}

impl<T> Outcome<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Value(value) => Outcome::Value(f(value)),
            Outcome::Mask => Outcome::Mask,
            Outcome::TemporaryMask => Outcome::TemporaryMask,
            Outcome::NotImplemented => Outcome::NotImplemented,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => value.fmt(f),
            Outcome::Mask => f.write_str("MASK"),
            Outcome::TemporaryMask => f.write_str("TMASK"),
            Outcome::NotImplemented => f.write_str("not implemented"),
        }
    }
}

/// Typed payload of a decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reading {
    Integer(u64),
    Version(VersionNumber),
    Quantity(Quantity),
    Temperature(Celsius),
}

impl Reading {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Reading::Integer(_) => "integer",
            Reading::Version(_) => "version number",
            Reading::Quantity(_) => "fixed-scale quantity",
            Reading::Temperature(_) => "temperature",
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Integer(value) => value.fmt(f),
            Reading::Version(version) => version.fmt(f),
            Reading::Quantity(quantity) => quantity.fmt(f),
            Reading::Temperature(celsius) => celsius.fmt(f),
        }
    }
}

/// Major/minor version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VersionNumber {
    pub major: u8,
    pub minor: u8,
}

impl VersionNumber {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Physical quantity stored as `raw / scaling_factor` in `unit`.
///
/// The raw integer is kept so that encoding never loses precision.
///
/// # Examples
/// ```
/// use dalimem_core::Quantity;
///
/// let life = Quantity::from_raw(10, 1000, "h");
/// assert!((life.value() - 0.01).abs() < f64::EPSILON);
/// assert_eq!(life.to_string(), "0.01 h");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Quantity {
    raw: u64,
    scaling_factor: u32,
    unit: &'static str,
}

impl Quantity {
    pub const fn from_raw(raw: u64, scaling_factor: u32, unit: &'static str) -> Self {
        Self {
            raw,
            scaling_factor,
            unit,
        }
    }

    /// Nearest representable quantity for `value`; `None` when negative,
    /// non-finite or beyond 64 bits.
    pub fn from_value(value: f64, scaling_factor: u32, unit: &'static str) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let raw = (value * f64::from(scaling_factor)).round();
        if raw >= u64::MAX as f64 {
            return None;
        }
        Some(Self::from_raw(raw as u64, scaling_factor, unit))
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }

    pub fn scaling_factor(&self) -> u32 {
        self.scaling_factor
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn value(&self) -> f64 {
        self.raw as f64 / f64::from(self.scaling_factor)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.value())
        } else {
            write!(f, "{} {}", self.value(), self.unit)
        }
    }
}

/// Temperature in whole degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Celsius(pub i16);

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} °C", self.0)
    }
}
