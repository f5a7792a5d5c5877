use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::checksum;
use super::error::{BusError, Corruption, ReadError, WriteError};
use super::link::{Link, LinkError};
use super::options::{ReadOptions, UnlockPolicy, WriteOptions};
use super::state::{ChecksumState, DeviceContext};
use super::{Bus, DeviceAddress};
use crate::location::MemoryBank;
use crate::location::layout::{LOCK_CODE, UNLOCK_CODE};
use crate::value::{Outcome, Reading, ValueDef};

/// Reads and writes value definitions on devices sharing one bus.
///
/// The session owns the bus and one context per device. A device context
/// is held for a whole value read or write, the bus only for a single
/// command, so transactions on different devices interleave byte by byte
/// while transactions on the same device are serialized.
///
/// # Examples
/// ```
/// use dalimem_core::{
///     DeviceAddress, ImageBus, MemoryImage, MemorySession, StandardRevision, catalog,
/// };
///
/// let image = MemoryImage::from_json(
///     r#"{"devices":[{"address":3,"banks":[{"index":207,"bytes":[7,0,0,255,255,85,255,255]}]}]}"#,
/// )?;
/// let session = MemorySession::new(ImageBus::new(image));
/// let def = catalog::find(
///     StandardRevision::Iec62386_102_2014,
///     "InternalControlGearReferenceTemperature",
/// )?;
/// let outcome = session.read(DeviceAddress(3), &def)?;
/// assert_eq!(outcome.to_string(), "25 °C");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct MemorySession<B> {
    bus: Mutex<B>,
    devices: Mutex<HashMap<DeviceAddress, Arc<Mutex<DeviceContext>>>>,
}

impl<B: Bus> MemorySession<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(bus),
            devices: Mutex::new(HashMap::new()),
        }
    }

    pub fn into_bus(self) -> B {
        self.bus.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget cached pointers and verified checksums for `device`.
    ///
    /// Use after another bus participant may have touched the device.
    /// Banks marked corrupt stay corrupt.
    pub fn invalidate(&self, device: DeviceAddress) {
        let ctx = self.context(device);
        lock(&ctx).invalidate();
        debug!("{device}: context invalidated");
    }

    pub fn read(&self, device: DeviceAddress, def: &ValueDef) -> Result<Outcome<Reading>, ReadError> {
        self.read_with(device, def, &ReadOptions::default())
    }

    pub fn read_with(
        &self,
        device: DeviceAddress,
        def: &ValueDef,
        options: &ReadOptions,
    ) -> Result<Outcome<Reading>, ReadError> {
        let raw = self.read_raw_with(device, def, options)?;
        Ok(def.decode_read(&raw))
    }

    /// Raw bytes of `def`, most significant first.
    pub fn read_raw(&self, device: DeviceAddress, def: &ValueDef) -> Result<Vec<u8>, ReadError> {
        self.read_raw_with(device, def, &ReadOptions::default())
    }

    fn read_raw_with(
        &self,
        device: DeviceAddress,
        def: &ValueDef,
        options: &ReadOptions,
    ) -> Result<Vec<u8>, ReadError> {
        let ctx = self.context(device);
        let mut ctx = lock(&ctx);
        let mut link = Link::new(&self.bus, device, &mut *ctx, options.cancel.as_ref());
        let bank = def.bank();
        ensure_checksum(&mut link, &bank)?;

        let mut raw = Vec::with_capacity(def.width());
        for location in def.locations() {
            link.check_cancelled()?;
            raw.push(link.read_at(bank.index(), location.address())?);
        }
        Ok(raw)
    }

    pub fn write(
        &self,
        device: DeviceAddress,
        def: &ValueDef,
        outcome: &Outcome<Reading>,
    ) -> Result<(), WriteError> {
        self.write_with(device, def, outcome, &WriteOptions::default())
    }

    /// Encode and write `outcome`, unlocking per `options.unlock` and
    /// rewriting the checksum of checksummed banks.
    ///
    /// Nothing reaches the bus when the definition is not writable or the
    /// outcome does not encode.
    pub fn write_with(
        &self,
        device: DeviceAddress,
        def: &ValueDef,
        outcome: &Outcome<Reading>,
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        if let Some(location) = def
            .locations()
            .iter()
            .find(|l| !l.memory_type().is_writable())
        {
            return Err(WriteError::NotWritable {
                name: def.name().to_string(),
                address: location.address(),
                memory_type: location.memory_type(),
            });
        }
        let bytes = def.encode(outcome)?;

        let ctx = self.context(device);
        let mut ctx = lock(&ctx);
        let mut link = Link::new(&self.bus, device, &mut *ctx, options.cancel.as_ref());
        let bank = def.bank();
        ensure_checksum(&mut link, &bank)?;

        if def.needs_unlock() {
            with_unlocked(&mut link, &bank, options.unlock, |link| {
                write_data(link, def, &bytes)
            })
        } else {
            write_data(&mut link, def, &bytes)
        }
    }

    /// Re-read a checksummed bank and compare its checksum.
    ///
    /// Banks without a checksum always verify. A bank already marked
    /// corrupt keeps failing until [`Self::repair_checksum`] succeeds.
    pub fn verify_checksum(&self, device: DeviceAddress, bank: &MemoryBank) -> Result<(), ReadError> {
        if !bank.has_checksum() {
            return Ok(());
        }
        let ctx = self.context(device);
        let mut ctx = lock(&ctx);
        let mut link = Link::new(&self.bus, device, &mut *ctx, None);
        if let ChecksumState::Corrupt(reason) = link.checksum(bank.index()) {
            return Err(corrupt(device, bank, reason));
        }
        link.set_checksum(bank.index(), ChecksumState::Unverified);
        ensure_checksum(&mut link, bank)
    }

    /// Recompute and store the checksum of `bank`, clearing any corruption
    /// mark. Returns the checksum written.
    pub fn repair_checksum(&self, device: DeviceAddress, bank: &MemoryBank) -> Result<u8, WriteError> {
        if !bank.has_checksum() {
            return Err(WriteError::NoChecksum { bank: bank.index() });
        }
        let ctx = self.context(device);
        let mut ctx = lock(&ctx);
        let mut link = Link::new(&self.bus, device, &mut *ctx, None);
        let value = checksum::rewrite(&mut link, bank)?;
        link.set_checksum(bank.index(), ChecksumState::Valid);
        debug!("{device}: bank {} repaired", bank.index());
        Ok(value)
    }

    fn context(&self, device: DeviceAddress) -> Arc<Mutex<DeviceContext>> {
        let mut devices = lock(&self.devices);
        Arc::clone(devices.entry(device).or_default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn corrupt(device: DeviceAddress, bank: &MemoryBank, reason: Corruption) -> ReadError {
    ReadError::BankCorrupt {
        device,
        bank: bank.index(),
        reason,
    }
}

/// Verify a checksummed bank once; later calls reuse the cached result.
fn ensure_checksum<B: Bus>(link: &mut Link<'_, B>, bank: &MemoryBank) -> Result<(), ReadError> {
    if !bank.has_checksum() {
        return Ok(());
    }
    match link.checksum(bank.index()) {
        ChecksumState::Valid => Ok(()),
        ChecksumState::Corrupt(reason) => Err(corrupt(link.device(), bank, reason)),
        ChecksumState::Unverified => match checksum::verify(link, bank)? {
            Ok(()) => {
                link.set_checksum(bank.index(), ChecksumState::Valid);
                Ok(())
            }
            Err(reason) => {
                link.set_checksum(bank.index(), ChecksumState::Corrupt(reason));
                Err(corrupt(link.device(), bank, reason))
            }
        },
    }
}

fn write_data<B: Bus>(link: &mut Link<'_, B>, def: &ValueDef, bytes: &[u8]) -> Result<(), WriteError> {
    let bank = def.bank();
    for (i, (location, &byte)) in def.locations().iter().zip(bytes).enumerate() {
        link.check_cancelled()?;
        if i == 0 && bank.has_checksum() {
            link.position(bank.index(), location.address())?;
            link.set_checksum(
                bank.index(),
                ChecksumState::Corrupt(Corruption::IncompleteWrite),
            );
        }
        link.write_at(bank.index(), location.address(), byte)?;
    }
    if bank.has_checksum() {
        checksum::rewrite(link, &bank)?;
        link.set_checksum(bank.index(), ChecksumState::Valid);
    }
    Ok(())
}

/// Run `body` with the bank lock byte open.
///
/// The lock byte is always re-read. Once this call has sent the unlock code
/// under [`UnlockPolicy::Scoped`], the lock code follows on every exit path,
/// even when the unlock itself failed.
fn with_unlocked<'a, B: Bus, T>(
    link: &mut Link<'a, B>,
    bank: &MemoryBank,
    policy: UnlockPolicy,
    body: impl FnOnce(&mut Link<'a, B>) -> Result<T, WriteError>,
) -> Result<T, WriteError> {
    let Some(lock_address) = bank.lock_address() else {
        return body(link);
    };
    let device = link.device();
    let index = bank.index();
    if link.read_at(index, lock_address)? == UNLOCK_CODE {
        return body(link);
    }
    if policy == UnlockPolicy::Never {
        return Err(WriteError::BankLocked {
            device,
            bank: index,
        });
    }

    // Once the unlock code has been sent the bank may be open, whatever
    // the bus reported, so every exit below goes through the relock.
    let result = open_lock(link, bank, lock_address).and_then(|()| body(link));
    if policy != UnlockPolicy::Scoped {
        return result;
    }
    match link.write_at(index, lock_address, LOCK_CODE) {
        Ok(()) => {
            debug!("{device}: bank {index} relocked");
            result
        }
        Err(err) => {
            warn!("{device}: failed to relock bank {index}");
            result.and(Err(err.into()))
        }
    }
}

/// Write the unlock code and confirm it by reading the lock byte back.
fn open_lock<B: Bus>(
    link: &mut Link<'_, B>,
    bank: &MemoryBank,
    lock_address: u8,
) -> Result<(), WriteError> {
    let device = link.device();
    let index = bank.index();
    let locked = WriteError::BankLocked {
        device,
        bank: index,
    };
    match link.write_at(index, lock_address, UNLOCK_CODE) {
        Ok(()) => {}
        Err(LinkError::Bus(fault)) if fault.error == BusError::Rejected => {
            warn!("{device}: bank {index} refused the unlock code");
            return Err(locked);
        }
        Err(err) => return Err(err.into()),
    }
    let readback = link.read_at(index, lock_address)?;
    if readback != UNLOCK_CODE {
        warn!("{device}: bank {index} did not unlock (lock byte {readback:#04x})");
        return Err(locked);
    }
    debug!("{device}: bank {index} unlocked");
    Ok(())
}
