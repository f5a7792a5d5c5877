#![allow(dead_code)]

use std::collections::HashMap;

use dalimem_core::{Bus, BusError, BusOp, DeviceAddress, ImageBus, MemoryImage};

/// One command seen by [`RecordingBus`], with the position it acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Select { device: u8, bank: u8 },
    SetAddress { device: u8, address: u8 },
    Read { device: u8, bank: u8, address: u16 },
    Write { device: u8, bank: u8, address: u16, value: u8 },
}

struct Fault {
    op: BusOp,
    nth: usize,
    error: BusError,
}

/// [`ImageBus`] wrapper that records every command and can fail the nth
/// command of a kind.
pub struct RecordingBus {
    inner: ImageBus,
    pub calls: Vec<Call>,
    positions: HashMap<u8, (u8, u16)>,
    counts: HashMap<&'static str, usize>,
    faults: Vec<Fault>,
    answers: HashMap<usize, u8>,
}

fn key(op: BusOp) -> &'static str {
    match op {
        BusOp::SelectBank => "select",
        BusOp::SetAddress => "address",
        BusOp::ReadByte => "read",
        BusOp::WriteByte => "write",
    }
}

impl RecordingBus {
    pub fn new(image: MemoryImage) -> Self {
        Self {
            inner: ImageBus::new(image),
            calls: Vec::new(),
            positions: HashMap::new(),
            counts: HashMap::new(),
            faults: Vec::new(),
            answers: HashMap::new(),
        }
    }

    /// Fail the `nth` (1-based) command of kind `op` with `error`.
    pub fn fail(mut self, op: BusOp, nth: usize, error: BusError) -> Self {
        self.faults.push(Fault { op, nth, error });
        self
    }

    /// Reply `value` to the `nth` (1-based) read, after the device has
    /// performed it.
    pub fn answer(mut self, nth: usize, value: u8) -> Self {
        self.answers.insert(nth, value);
        self
    }

    pub fn image(&self) -> &MemoryImage {
        self.inner.image()
    }

    pub fn count(&self, op: BusOp) -> usize {
        self.counts.get(key(op)).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                Call::Write { address, value, .. } => Some((address, value)),
                _ => None,
            })
            .collect()
    }

    pub fn selects(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                Call::Select { bank, .. } => Some(bank),
                _ => None,
            })
            .collect()
    }

    fn tick(&mut self, op: BusOp) -> Result<(), BusError> {
        let count = self.counts.entry(key(op)).or_insert(0);
        *count += 1;
        let n = *count;
        match self.faults.iter().find(|f| f.op == op && f.nth == n) {
            Some(fault) => Err(fault.error.clone()),
            None => Ok(()),
        }
    }

    fn position(&self, device: DeviceAddress) -> (u8, u16) {
        self.positions.get(&device.0).copied().unwrap_or((0, 0))
    }

    fn advance(&mut self, device: DeviceAddress) {
        let entry = self.positions.entry(device.0).or_insert((0, 0));
        entry.1 = (entry.1 + 1).min(0x100);
    }
}

impl Bus for RecordingBus {
    fn select_bank(&mut self, device: DeviceAddress, bank: u8) -> Result<(), BusError> {
        self.tick(BusOp::SelectBank)?;
        self.calls.push(Call::Select {
            device: device.0,
            bank,
        });
        self.positions.entry(device.0).or_insert((0, 0)).0 = bank;
        self.inner.select_bank(device, bank)
    }

    fn set_address(&mut self, device: DeviceAddress, address: u8) -> Result<(), BusError> {
        self.tick(BusOp::SetAddress)?;
        self.calls.push(Call::SetAddress {
            device: device.0,
            address,
        });
        self.positions.entry(device.0).or_insert((0, 0)).1 = u16::from(address);
        self.inner.set_address(device, address)
    }

    fn read_byte(&mut self, device: DeviceAddress) -> Result<u8, BusError> {
        self.tick(BusOp::ReadByte)?;
        let (bank, address) = self.position(device);
        self.calls.push(Call::Read {
            device: device.0,
            bank,
            address,
        });
        let value = self.inner.read_byte(device)?;
        self.advance(device);
        let nth = self.count(BusOp::ReadByte);
        Ok(self.answers.get(&nth).copied().unwrap_or(value))
    }

    fn write_byte(&mut self, device: DeviceAddress, value: u8) -> Result<(), BusError> {
        self.tick(BusOp::WriteByte)?;
        let (bank, address) = self.position(device);
        self.calls.push(Call::Write {
            device: device.0,
            bank,
            address,
            value,
        });
        self.inner.write_byte(device, value)?;
        self.advance(device);
        Ok(())
    }
}

/// Device 0 with the 2014 catalog banks.
pub fn current_image() -> MemoryImage {
    MemoryImage::from_json(
        r#"{"devices":[{"address":0,"version_number":8,"banks":[
            {"index":0,"bytes":[26,0,207,0,18,52,86,120,154,2,1,0,0,0,0,0,0,48,57,1,0,8,8,255,0,1,0]},
            {"index":207,"bytes":[7,0,255,1,50,85,0,100]}
        ]}]}"#,
    )
    .expect("current image")
}

/// Device 0 with bank 5: lockable, checksummed, 0x03..=0x07 protected.
pub fn bank5_image() -> MemoryImage {
    bank5_with_protected("[3,4,5,6,7]")
}

/// Like [`bank5_image`], but the lock byte itself is protected, so the
/// device refuses the unlock code.
pub fn sealed_bank5_image() -> MemoryImage {
    bank5_with_protected("[2,3,4,5,6,7]")
}

fn bank5_with_protected(protected: &str) -> MemoryImage {
    MemoryImage::from_json(&format!(
        r#"{{"devices":[{{"address":0,"banks":[
            {{"index":0,"bytes":[2,0,5]}},
            {{"index":5,"bytes":[7,200,255,1,16,32,0,0],"protected":{protected}}}
        ]}}]}}"#
    ))
    .expect("bank 5 image")
}

pub fn bank5_bytes(image: &MemoryImage) -> Vec<u8> {
    image
        .device(0)
        .and_then(|d| d.bank(5))
        .map(|b| b.bytes.clone())
        .expect("bank 5")
}
