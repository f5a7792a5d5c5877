use super::definition::ValueKind;
use super::error::EncodeError;
use super::outcome::{Celsius, Outcome, Quantity, Reading, VersionNumber};

impl ValueKind {
    /// Parse user-facing text into an outcome of this kind.
    ///
    /// Accepts the same spellings `Display` produces: `MASK`, `TMASK`,
    /// `not implemented`, `2.1`, `0.05 h`, `25 °C`, plain integers.
    /// Range checks are left to encoding.
    pub fn parse_outcome(&self, text: &str) -> Result<Outcome<Reading>, EncodeError> {
        let trimmed = text.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "MASK" => return Ok(Outcome::Mask),
            "TMASK" => return Ok(Outcome::TemporaryMask),
            "NOT IMPLEMENTED" => return Ok(Outcome::NotImplemented),
            _ => {}
        }
        let unparseable = || EncodeError::Unparseable {
            text: text.to_string(),
            kind: self.name(),
        };
        let reading = match *self {
            ValueKind::Numeric => Reading::Integer(parse_integer(trimmed).ok_or_else(unparseable)?),
            ValueKind::VersionNumber => {
                let (major, minor) = trimmed.split_once('.').ok_or_else(unparseable)?;
                let major = major.trim().parse().map_err(|_| unparseable())?;
                let minor = minor.trim().parse().map_err(|_| unparseable())?;
                Reading::Version(VersionNumber::new(major, minor))
            }
            ValueKind::FixedScale {
                scaling_factor,
                unit,
            } => {
                let number = strip_unit(trimmed, unit);
                let value: f64 = number.parse().map_err(|_| unparseable())?;
                let quantity =
                    Quantity::from_value(value, scaling_factor, unit).ok_or_else(unparseable)?;
                Reading::Quantity(quantity)
            }
            ValueKind::Temperature => {
                let number = strip_unit(strip_unit(trimmed, "°C"), "C");
                Reading::Temperature(Celsius(number.parse().map_err(|_| unparseable())?))
            }
        };
        Ok(Outcome::Value(reading))
    }
}

fn strip_unit<'a>(text: &'a str, unit: &str) -> &'a str {
    if unit.is_empty() {
        return text;
    }
    text.strip_suffix(unit).unwrap_or(text).trim_end()
}

fn parse_integer(text: &str) -> Option<u64> {
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
