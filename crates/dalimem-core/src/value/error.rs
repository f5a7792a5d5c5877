use thiserror::Error;

/// Errors raised while turning a semantic value into bytes.
///
/// Encoding happens before any bus traffic, so none of these ever reach a
/// device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("value {value} out of range (allowed {allowed})")]
    ValueOutOfRange { value: String, allowed: String },
    #[error("{found} cannot be stored as {expected}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{sentinel} is not supported by {kind} values")]
    UnsupportedSentinel {
        sentinel: &'static str,
        kind: &'static str,
    },
    #[error("cannot parse '{text}' as {kind}")]
    Unparseable { text: String, kind: &'static str },
}

/// Raw byte count did not match the value definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value '{name}' expects {expected} bytes, got {actual}")]
pub struct DecodeError {
    pub name: String,
    pub expected: usize,
    pub actual: usize,
}
