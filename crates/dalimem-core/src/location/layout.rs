//! Designated header locations shared by every memory bank.

/// Location holding the address of the last accessible memory location.
pub const LAST_ADDRESS_OFFSET: u8 = 0x00;
/// Checksum byte in banks using the IEC 62386-102:2009 layout.
pub const CHECKSUM_OFFSET: u8 = 0x01;
/// Lock byte in lockable banks (never in bank 0).
pub const LOCK_BYTE_OFFSET: u8 = 0x02;

/// Lock byte value that enables writes to lockable locations.
pub const UNLOCK_CODE: u8 = 0x55;
/// Lock byte value written when re-locking a bank.
pub const LOCK_CODE: u8 = 0x00;
