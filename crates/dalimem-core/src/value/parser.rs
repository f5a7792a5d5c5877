use super::definition::ValueKind;
use super::layout;
use super::outcome::{Celsius, Outcome, Quantity, Reading, VersionNumber};
use super::reader::RawReader;

/// Decode raw bytes (already width-checked) into an outcome.
pub(crate) fn decode(kind: &ValueKind, raw: &[u8]) -> Outcome<Reading> {
    let reader = RawReader::new(raw);
    match *kind {
        ValueKind::Numeric => decode_numeric(&reader).map(Reading::Integer),
        ValueKind::VersionNumber => decode_version(&reader).map(Reading::Version),
        ValueKind::FixedScale {
            scaling_factor,
            unit,
        } => decode_fixed_scale(&reader, scaling_factor, unit).map(Reading::Quantity),
        ValueKind::Temperature => decode_temperature(&reader).map(Reading::Temperature),
    }
}

fn decode_numeric(reader: &RawReader<'_>) -> Outcome<u64> {
    if reader.is_mask() {
        return Outcome::Mask;
    }
    Outcome::Value(reader.read_u64_be())
}

fn decode_version(reader: &RawReader<'_>) -> Outcome<VersionNumber> {
    if reader.is_mask() {
        return Outcome::NotImplemented;
    }
    match (reader.width(), reader.first(), reader.byte(1)) {
        (1, Some(packed), _) => Outcome::Value(VersionNumber::new(
            packed >> layout::VERSION_MAJOR_SHIFT,
            packed & layout::VERSION_MINOR_MASK,
        )),
        (2, Some(major), Some(minor)) => Outcome::Value(VersionNumber::new(major, minor)),
        _ => Outcome::NotImplemented,
    }
}

fn decode_fixed_scale(
    reader: &RawReader<'_>,
    scaling_factor: u32,
    unit: &'static str,
) -> Outcome<Quantity> {
    if reader.is_mask() {
        return Outcome::Mask;
    }
    if reader.is_tmask() {
        return Outcome::TemporaryMask;
    }
    Outcome::Value(Quantity::from_raw(
        reader.read_u64_be(),
        scaling_factor,
        unit,
    ))
}

fn decode_temperature(reader: &RawReader<'_>) -> Outcome<Celsius> {
    match reader.first() {
        Some(layout::MASK) | None => Outcome::Mask,
        Some(layout::TMASK) => Outcome::TemporaryMask,
        Some(raw) => Outcome::Value(Celsius(i16::from(raw) - layout::TEMPERATURE_OFFSET)),
    }
}
