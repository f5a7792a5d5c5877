use log::{debug, warn};

use super::Bus;
use super::error::Corruption;
use super::link::{Link, LinkError};
use crate::location::MemoryBank;
use crate::location::layout;

/// Two's complement of the sum of every covered byte.
///
/// `bytes` holds the bank from address 0x00 up; the checksum and lock bytes
/// are left out of the sum.
pub(crate) fn checksum_for(bank: &MemoryBank, bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .zip(0u8..=u8::MAX)
        .filter(|&(_, address)| !bank.is_checksum_exempt(address))
        .fold(0u8, |sum, (&byte, _)| sum.wrapping_add(byte))
        .wrapping_neg()
}

/// Read the bank up to the device-reported last address.
///
/// A `cancellable` scan checks the cancel token before every byte.
fn read_bank<B: Bus>(
    link: &mut Link<'_, B>,
    bank: &MemoryBank,
    cancellable: bool,
) -> Result<Vec<u8>, LinkError> {
    let index = bank.index();
    let reported = scan_byte(link, index, layout::LAST_ADDRESS_OFFSET, cancellable)?;
    let last = reported.max(layout::CHECKSUM_OFFSET);
    let mut bytes = Vec::with_capacity(usize::from(last) + 1);
    bytes.push(reported);
    for address in 1..=last {
        bytes.push(scan_byte(link, index, address, cancellable)?);
    }
    Ok(bytes)
}

fn scan_byte<B: Bus>(
    link: &mut Link<'_, B>,
    bank: u8,
    address: u8,
    cancellable: bool,
) -> Result<u8, LinkError> {
    if cancellable {
        link.check_cancelled()?;
    }
    link.read_at(bank, address)
}

/// Compare the stored checksum with the bank contents.
pub(crate) fn verify<B: Bus>(
    link: &mut Link<'_, B>,
    bank: &MemoryBank,
) -> Result<Result<(), Corruption>, LinkError> {
    let bytes = read_bank(link, bank, true)?;
    let expected = checksum_for(bank, &bytes);
    let stored = bytes[usize::from(layout::CHECKSUM_OFFSET)];
    if stored == expected {
        return Ok(Ok(()));
    }
    warn!(
        "{}: bank {} checksum mismatch (stored {stored:#04x}, expected {expected:#04x})",
        link.device(),
        bank.index()
    );
    Ok(Err(Corruption::ChecksumMismatch { stored, expected }))
}

/// Recompute the checksum from the device and write it back.
///
/// Not cancellable: it finishes a write whose data is already out.
pub(crate) fn rewrite<B: Bus>(link: &mut Link<'_, B>, bank: &MemoryBank) -> Result<u8, LinkError> {
    let bytes = read_bank(link, bank, false)?;
    let value = checksum_for(bank, &bytes);
    link.write_at(bank.index(), layout::CHECKSUM_OFFSET, value)?;
    debug!(
        "{}: bank {} checksum written ({value:#04x})",
        link.device(),
        bank.index()
    );
    Ok(value)
}
