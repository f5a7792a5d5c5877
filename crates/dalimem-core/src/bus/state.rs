use std::collections::HashMap;

use crate::bus::error::Corruption;

/// Where the device's bank and address pointers are known to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Pointer {
    #[default]
    Unknown,
    Selected {
        bank: u8,
    },
    Addressed {
        bank: u8,
        address: u8,
    },
}

impl Pointer {
    pub(crate) fn needs_select(&self, target: u8) -> bool {
        !matches!(
            *self,
            Pointer::Selected { bank } | Pointer::Addressed { bank, .. } if bank == target
        )
    }

    pub(crate) fn needs_address(&self, target_bank: u8, target: u8) -> bool {
        !matches!(
            *self,
            Pointer::Addressed { bank, address } if bank == target_bank && address == target
        )
    }

    /// Step past one transferred byte; the pointer does not wrap past 0xFF.
    pub(crate) fn advance(self) -> Self {
        match self {
            Pointer::Addressed { bank, address } => match address.checked_add(1) {
                Some(next) => Pointer::Addressed {
                    bank,
                    address: next,
                },
                None => Pointer::Selected { bank },
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ChecksumState {
    #[default]
    Unverified,
    Valid,
    Corrupt(Corruption),
}

/// Runtime state of one device, owned by the session.
#[derive(Debug, Default)]
pub(crate) struct DeviceContext {
    pub(crate) pointer: Pointer,
    checksums: HashMap<u8, ChecksumState>,
}

impl DeviceContext {
    pub(crate) fn checksum(&self, bank: u8) -> ChecksumState {
        self.checksums.get(&bank).copied().unwrap_or_default()
    }

    pub(crate) fn set_checksum(&mut self, bank: u8, state: ChecksumState) {
        self.checksums.insert(bank, state);
    }

    /// Forget everything another bus participant may have changed.
    /// Corruption marks survive until repaired.
    pub(crate) fn invalidate(&mut self) {
        self.pointer = Pointer::Unknown;
        self.checksums
            .retain(|_, state| matches!(state, ChecksumState::Corrupt(_)));
    }
}
