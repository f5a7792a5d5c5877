use std::sync::{Mutex, PoisonError};

use log::{debug, trace, warn};

use super::error::{BusError, BusOp, ReadError, WriteError};
use super::options::CancelToken;
use super::state::{ChecksumState, DeviceContext, Pointer};
use super::{Bus, DeviceAddress};

/// Failed bus command with the location it was aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BusFault {
    pub(crate) device: DeviceAddress,
    pub(crate) op: BusOp,
    pub(crate) bank: u8,
    pub(crate) address: u8,
    pub(crate) error: BusError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkError {
    Bus(BusFault),
    Cancelled,
}

/// One logical transaction against one device.
///
/// Holds the device context exclusively; the bus mutex is taken per
/// command so other devices can interleave between bytes.
pub(crate) struct Link<'a, B> {
    bus: &'a Mutex<B>,
    device: DeviceAddress,
    ctx: &'a mut DeviceContext,
    cancel: Option<&'a CancelToken>,
}

impl<'a, B: Bus> Link<'a, B> {
    pub(crate) fn new(
        bus: &'a Mutex<B>,
        device: DeviceAddress,
        ctx: &'a mut DeviceContext,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            bus,
            device,
            ctx,
            cancel,
        }
    }

    pub(crate) fn device(&self) -> DeviceAddress {
        self.device
    }

    pub(crate) fn checksum(&self, bank: u8) -> ChecksumState {
        self.ctx.checksum(bank)
    }

    pub(crate) fn set_checksum(&mut self, bank: u8, state: ChecksumState) {
        self.ctx.set_checksum(bank, state);
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), LinkError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => {
                debug!("{}: cancelled", self.device);
                Err(LinkError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn read_at(&mut self, bank: u8, address: u8) -> Result<u8, LinkError> {
        self.position(bank, address)?;
        let device = self.device;
        let value = self.command(BusOp::ReadByte, bank, address, |bus| {
            bus.read_byte(device)
        })?;
        self.ctx.pointer = self.ctx.pointer.advance();
        trace!("{device}: read bank {bank} {address:#04x} = {value:#04x}");
        Ok(value)
    }

    pub(crate) fn write_at(&mut self, bank: u8, address: u8, value: u8) -> Result<(), LinkError> {
        self.position(bank, address)?;
        let device = self.device;
        self.command(BusOp::WriteByte, bank, address, |bus| {
            bus.write_byte(device, value)
        })?;
        self.ctx.pointer = self.ctx.pointer.advance();
        trace!("{device}: wrote bank {bank} {address:#04x} = {value:#04x}");
        Ok(())
    }

    /// Bring the device pointers to `(bank, address)`, skipping commands
    /// whose effect is already known.
    pub(crate) fn position(&mut self, bank: u8, address: u8) -> Result<(), LinkError> {
        let device = self.device;
        if self.ctx.pointer.needs_select(bank) {
            debug!("{device}: select bank {bank}");
            self.command(BusOp::SelectBank, bank, address, |bus| {
                bus.select_bank(device, bank)
            })?;
            self.ctx.pointer = Pointer::Selected { bank };
        }
        if self.ctx.pointer.needs_address(bank, address) {
            self.command(BusOp::SetAddress, bank, address, |bus| {
                bus.set_address(device, address)
            })?;
            self.ctx.pointer = Pointer::Addressed { bank, address };
        }
        Ok(())
    }

    fn command<T>(
        &mut self,
        op: BusOp,
        bank: u8,
        address: u8,
        f: impl FnOnce(&mut B) -> Result<T, BusError>,
    ) -> Result<T, LinkError> {
        let result = {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut *bus)
        };
        result.map_err(|error| {
            warn!(
                "{}: {op} failed at bank {bank} {address:#04x}: {error}",
                self.device
            );
            self.ctx.pointer = Pointer::Unknown;
            LinkError::Bus(BusFault {
                device: self.device,
                op,
                bank,
                address,
                error,
            })
        })
    }
}

impl From<LinkError> for ReadError {
    fn from(value: LinkError) -> Self {
        let fault = match value {
            LinkError::Cancelled => return ReadError::Cancelled,
            LinkError::Bus(fault) => fault,
        };
        let BusFault {
            device,
            op,
            bank,
            address,
            error,
        } = fault;
        match error {
            BusError::Timeout => ReadError::BusTimeout {
                device,
                op,
                bank,
                address,
            },
            BusError::Unavailable => ReadError::LocationUnavailable {
                device,
                bank,
                address,
            },
            source => ReadError::BusReadFailure {
                device,
                op,
                bank,
                address,
                source,
            },
        }
    }
}

impl From<LinkError> for WriteError {
    fn from(value: LinkError) -> Self {
        let fault = match value {
            LinkError::Cancelled => return WriteError::Cancelled,
            LinkError::Bus(fault) => fault,
        };
        let BusFault {
            device,
            op,
            bank,
            address,
            error,
        } = fault;
        match (op, error) {
            (op, BusError::Timeout) => WriteError::BusTimeout {
                device,
                op,
                bank,
                address,
            },
            (_, BusError::Unavailable) => WriteError::LocationUnavailable {
                device,
                bank,
                address,
            },
            (BusOp::ReadByte, source) => WriteError::BusReadFailure {
                device,
                op: BusOp::ReadByte,
                bank,
                address,
                source,
            },
            (op, source) => WriteError::BusWriteFailure {
                device,
                op,
                bank,
                address,
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{BusFault, Link, LinkError};
    use crate::bus::error::{BusError, BusOp, ReadError, WriteError};
    use crate::bus::state::{DeviceContext, Pointer};
    use crate::bus::{Bus, CancelToken, DeviceAddress};

    /// Answers every read with the current address and counts commands.
    #[derive(Default)]
    struct EchoBus {
        address: u8,
        selects: usize,
        sets: usize,
        fail_reads: bool,
    }

    impl Bus for EchoBus {
        fn select_bank(&mut self, _: DeviceAddress, _: u8) -> Result<(), BusError> {
            self.selects += 1;
            Ok(())
        }

        fn set_address(&mut self, _: DeviceAddress, address: u8) -> Result<(), BusError> {
            self.sets += 1;
            self.address = address;
            Ok(())
        }

        fn read_byte(&mut self, _: DeviceAddress) -> Result<u8, BusError> {
            if self.fail_reads {
                return Err(BusError::NoReply);
            }
            let value = self.address;
            self.address = self.address.wrapping_add(1);
            Ok(value)
        }

        fn write_byte(&mut self, _: DeviceAddress, _: u8) -> Result<(), BusError> {
            self.address = self.address.wrapping_add(1);
            Ok(())
        }
    }

    #[test]
    fn sequential_reads_reuse_pointers() {
        let bus = Mutex::new(EchoBus::default());
        let mut ctx = DeviceContext::default();
        let mut link = Link::new(&bus, DeviceAddress(0), &mut ctx, None);
        for address in 3..=8 {
            assert_eq!(link.read_at(0, address), Ok(address));
        }
        let bus = bus.into_inner().unwrap();
        assert_eq!(bus.selects, 1);
        assert_eq!(bus.sets, 1);
    }

    #[test]
    fn failure_forgets_pointer() {
        let bus = Mutex::new(EchoBus {
            fail_reads: true,
            ..EchoBus::default()
        });
        let mut ctx = DeviceContext::default();
        let mut link = Link::new(&bus, DeviceAddress(2), &mut ctx, None);
        let err = link.read_at(0, 0x10).unwrap_err();
        assert_eq!(
            err,
            LinkError::Bus(BusFault {
                device: DeviceAddress(2),
                op: BusOp::ReadByte,
                bank: 0,
                address: 0x10,
                error: BusError::NoReply,
            })
        );
        assert_eq!(ctx.pointer, Pointer::Unknown);
    }

    #[test]
    fn cancellation_is_observed() {
        let bus = Mutex::new(EchoBus::default());
        let mut ctx = DeviceContext::default();
        let token = CancelToken::new();
        let link = Link::new(&bus, DeviceAddress(0), &mut ctx, Some(&token));
        assert!(link.check_cancelled().is_ok());
        token.cancel();
        assert_eq!(link.check_cancelled(), Err(LinkError::Cancelled));
    }

    #[test]
    fn fault_mapping_by_error_and_op() {
        let fault = |op, error| {
            LinkError::Bus(BusFault {
                device: DeviceAddress(1),
                op,
                bank: 0,
                address: 4,
                error,
            })
        };
        assert!(matches!(
            ReadError::from(fault(BusOp::ReadByte, BusError::Timeout)),
            ReadError::BusTimeout { .. }
        ));
        assert!(matches!(
            ReadError::from(fault(BusOp::ReadByte, BusError::Unavailable)),
            ReadError::LocationUnavailable { .. }
        ));
        assert!(matches!(
            WriteError::from(fault(BusOp::ReadByte, BusError::NoReply)),
            WriteError::BusReadFailure { .. }
        ));
        assert!(matches!(
            WriteError::from(fault(BusOp::SetAddress, BusError::Rejected)),
            WriteError::BusWriteFailure { .. }
        ));
    }
}
