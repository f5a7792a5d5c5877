use super::definition::ValueKind;
use super::error::EncodeError;
use super::layout;
use super::outcome::{Celsius, Outcome, Quantity, Reading, VersionNumber};

/// Encode an outcome into exactly `width` bytes, most significant first.
pub(crate) fn encode(
    kind: &ValueKind,
    width: usize,
    outcome: &Outcome<Reading>,
) -> Result<Vec<u8>, EncodeError> {
    match outcome {
        Outcome::Mask if kind.supports_mask() => Ok(vec![layout::MASK; width]),
        Outcome::TemporaryMask if kind.supports_tmask() => Ok(vec![layout::TMASK; width]),
        Outcome::NotImplemented if kind.supports_not_implemented() => {
            Ok(vec![layout::MASK; width])
        }
        Outcome::Mask => Err(unsupported("MASK", kind)),
        Outcome::TemporaryMask => Err(unsupported("TMASK", kind)),
        Outcome::NotImplemented => Err(unsupported("not implemented", kind)),
        Outcome::Value(reading) => encode_reading(kind, width, reading),
    }
}

fn encode_reading(kind: &ValueKind, width: usize, reading: &Reading) -> Result<Vec<u8>, EncodeError> {
    match (*kind, reading) {
        (ValueKind::Numeric, Reading::Integer(value)) => encode_numeric(*value, width),
        (ValueKind::VersionNumber, Reading::Version(version)) => encode_version(*version, width),
        (
            ValueKind::FixedScale {
                scaling_factor,
                unit,
            },
            Reading::Quantity(quantity),
        ) => encode_fixed_scale(quantity, scaling_factor, unit, width),
        (ValueKind::Temperature, Reading::Temperature(celsius)) => encode_temperature(*celsius),
        (kind, reading) => Err(EncodeError::KindMismatch {
            expected: kind.name(),
            found: reading.kind_name(),
        }),
    }
}

fn encode_numeric(value: u64, width: usize) -> Result<Vec<u8>, EncodeError> {
    let mask = all_ones(width);
    if value >= mask {
        return Err(EncodeError::ValueOutOfRange {
            value: value.to_string(),
            allowed: format!("0..={}", mask - 1),
        });
    }
    Ok(to_be_bytes(value, width))
}

fn encode_version(version: VersionNumber, width: usize) -> Result<Vec<u8>, EncodeError> {
    if width == 1 {
        if version.major > layout::VERSION_MAJOR_MAX || version.minor > layout::VERSION_MINOR_MASK {
            return Err(EncodeError::ValueOutOfRange {
                value: version.to_string(),
                allowed: format!(
                    "major 0..={}, minor 0..={}",
                    layout::VERSION_MAJOR_MAX,
                    layout::VERSION_MINOR_MASK
                ),
            });
        }
        let packed = (version.major << layout::VERSION_MAJOR_SHIFT) | version.minor;
        if packed == layout::MASK {
            return Err(reserved(version.to_string()));
        }
        return Ok(vec![packed]);
    }
    if version.major == layout::MASK && version.minor == layout::MASK {
        return Err(reserved(version.to_string()));
    }
    Ok(vec![version.major, version.minor])
}

fn encode_fixed_scale(
    quantity: &Quantity,
    scaling_factor: u32,
    unit: &'static str,
    width: usize,
) -> Result<Vec<u8>, EncodeError> {
    if quantity.scaling_factor() != scaling_factor || quantity.unit() != unit {
        return Err(EncodeError::KindMismatch {
            expected: "quantity with the definition's scale and unit",
            found: "quantity with a different scale or unit",
        });
    }
    let raw = quantity.raw();
    if raw > all_ones(width) {
        return Err(EncodeError::ValueOutOfRange {
            value: quantity.to_string(),
            allowed: format!("raw 0..={}", all_ones(width) - 1),
        });
    }
    let bytes = to_be_bytes(raw, width);
    if bytes.iter().all(|&b| b == layout::MASK) || bytes.iter().all(|&b| b == layout::TMASK) {
        return Err(reserved(quantity.to_string()));
    }
    Ok(bytes)
}

fn encode_temperature(celsius: Celsius) -> Result<Vec<u8>, EncodeError> {
    if !(layout::TEMPERATURE_MIN..=layout::TEMPERATURE_MAX).contains(&celsius.0) {
        return Err(EncodeError::ValueOutOfRange {
            value: celsius.to_string(),
            allowed: format!(
                "{}..={} °C",
                layout::TEMPERATURE_MIN,
                layout::TEMPERATURE_MAX
            ),
        });
    }
    let raw = celsius.0 + layout::TEMPERATURE_OFFSET;
    Ok(vec![raw as u8])
}

fn all_ones(width: usize) -> u64 {
    if width >= layout::MAX_NUMERIC_WIDTH {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}

fn to_be_bytes(value: u64, width: usize) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    bytes[bytes.len() - width..].to_vec()
}

fn reserved(value: String) -> EncodeError {
    EncodeError::ValueOutOfRange {
        value,
        allowed: "any value not aliasing a sentinel".to_string(),
    }
}

fn unsupported(sentinel: &'static str, kind: &ValueKind) -> EncodeError {
    EncodeError::UnsupportedSentinel {
        sentinel,
        kind: kind.name(),
    }
}
