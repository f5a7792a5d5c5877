/// Sentinel byte: value unknown or not implemented.
pub const MASK: u8 = 0xFF;
/// Sentinel byte: value temporarily unknown.
pub const TMASK: u8 = 0xFE;

pub const MAX_NUMERIC_WIDTH: usize = 8;

/// Packed version byte: major in bits 7..2, minor in bits 1..0.
pub const VERSION_MAJOR_SHIFT: u32 = 2;
pub const VERSION_MINOR_MASK: u8 = 0x03;
pub const VERSION_MAJOR_MAX: u8 = 0x3F;

/// Temperature byte `n` encodes `n - 60` °C.
pub const TEMPERATURE_OFFSET: i16 = 60;
pub const TEMPERATURE_MIN: i16 = -TEMPERATURE_OFFSET;
pub const TEMPERATURE_MAX: i16 = TMASK as i16 - 1 - TEMPERATURE_OFFSET;
