use std::collections::HashMap;

use crate::bus::{Bus, BusError, DeviceAddress};
use crate::location::layout;

use super::model::{BankImage, MemoryImage};

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    bank: u8,
    /// Past 0xFF once the pointer has run off the end of the bank.
    address: u16,
}

/// [`Bus`] answered from a [`MemoryImage`].
///
/// Reads from unknown devices get no reply; writes to them are dropped,
/// as unacknowledged frames would be. Address 0x00 never accepts writes,
/// and addresses listed as protected only accept them while the bank's
/// lock byte reads 0x55.
#[derive(Debug, Clone)]
pub struct ImageBus {
    image: MemoryImage,
    cursors: HashMap<u8, Cursor>,
}

impl ImageBus {
    pub fn new(image: MemoryImage) -> Self {
        Self {
            image,
            cursors: HashMap::new(),
        }
    }

    pub fn image(&self) -> &MemoryImage {
        &self.image
    }

    pub fn into_image(self) -> MemoryImage {
        self.image
    }

    fn cursor(&mut self, device: DeviceAddress) -> &mut Cursor {
        self.cursors.entry(device.0).or_default()
    }

    fn target(&self, device: DeviceAddress) -> Option<(u8, u16)> {
        let cursor = self.cursors.get(&device.0).copied().unwrap_or_default();
        self.image
            .device(device.0)
            .map(|_| (cursor.bank, cursor.address))
    }

    fn advance(&mut self, device: DeviceAddress) {
        let cursor = self.cursor(device);
        cursor.address = (cursor.address + 1).min(0x100);
    }
}

fn is_unlocked(bank: &BankImage) -> bool {
    bank.bytes.get(usize::from(layout::LOCK_BYTE_OFFSET)) == Some(&layout::UNLOCK_CODE)
}

impl Bus for ImageBus {
    fn select_bank(&mut self, device: DeviceAddress, bank: u8) -> Result<(), BusError> {
        self.cursor(device).bank = bank;
        Ok(())
    }

    fn set_address(&mut self, device: DeviceAddress, address: u8) -> Result<(), BusError> {
        self.cursor(device).address = u16::from(address);
        Ok(())
    }

    fn read_byte(&mut self, device: DeviceAddress) -> Result<u8, BusError> {
        let (bank, address) = self.target(device).ok_or(BusError::NoReply)?;
        let value = self
            .image
            .device(device.0)
            .and_then(|d| d.bank(bank))
            .and_then(|b| b.bytes.get(usize::from(address)).copied())
            .ok_or(BusError::Unavailable)?;
        self.advance(device);
        Ok(value)
    }

    fn write_byte(&mut self, device: DeviceAddress, value: u8) -> Result<(), BusError> {
        let Some((bank, address)) = self.target(device) else {
            return Ok(());
        };
        let Some(bank) = self
            .image
            .device_mut(device.0)
            .and_then(|d| d.bank_mut(bank))
        else {
            return Err(BusError::Unavailable);
        };
        let index = usize::from(address);
        if index >= bank.bytes.len() {
            return Err(BusError::Unavailable);
        }
        if address == u16::from(layout::LAST_ADDRESS_OFFSET) {
            return Err(BusError::Rejected);
        }
        if bank.protected.iter().any(|&p| u16::from(p) == address) && !is_unlocked(bank) {
            return Err(BusError::Rejected);
        }
        bank.bytes[index] = value;
        self.advance(device);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ImageBus;
    use crate::bus::{Bus, BusError, DeviceAddress};
    use crate::image::model::MemoryImage;

    const DEV: DeviceAddress = DeviceAddress(2);

    fn bus() -> ImageBus {
        ImageBus::new(
            MemoryImage::from_json(
                r#"{"devices":[{"address":2,"banks":[
                    {"index":0,"bytes":[3,0,0,9]},
                    {"index":5,"bytes":[4,0,0,1,2],"protected":[3,4]}
                ]}]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn reads_auto_increment() {
        let mut bus = bus();
        bus.select_bank(DEV, 0).unwrap();
        bus.set_address(DEV, 2).unwrap();
        assert_eq!(bus.read_byte(DEV), Ok(0));
        assert_eq!(bus.read_byte(DEV), Ok(9));
        assert_eq!(bus.read_byte(DEV), Err(BusError::Unavailable));
    }

    #[test]
    fn unknown_device_and_bank() {
        let mut bus = bus();
        assert_eq!(bus.read_byte(DeviceAddress(9)), Err(BusError::NoReply));
        assert_eq!(bus.write_byte(DeviceAddress(9), 1), Ok(()));
        bus.select_bank(DEV, 7).unwrap();
        bus.set_address(DEV, 0).unwrap();
        assert_eq!(bus.read_byte(DEV), Err(BusError::Unavailable));
    }

    #[test]
    fn protected_addresses_need_unlock() {
        let mut bus = bus();
        bus.select_bank(DEV, 5).unwrap();
        bus.set_address(DEV, 3).unwrap();
        assert_eq!(bus.write_byte(DEV, 7), Err(BusError::Rejected));

        bus.set_address(DEV, 2).unwrap();
        bus.write_byte(DEV, 0x55).unwrap();
        bus.write_byte(DEV, 7).unwrap();
        bus.write_byte(DEV, 8).unwrap();
        let image = bus.into_image();
        assert_eq!(image.device(2).unwrap().bank(5).unwrap().bytes, vec![4, 0, 0x55, 7, 8]);
    }

    #[test]
    fn last_address_byte_is_read_only() {
        let mut bus = bus();
        bus.select_bank(DEV, 0).unwrap();
        bus.set_address(DEV, 0).unwrap();
        assert_eq!(bus.write_byte(DEV, 1), Err(BusError::Rejected));
    }

    #[test]
    fn pointer_does_not_wrap() {
        let mut bus = ImageBus::new(
            MemoryImage::from_json(&format!(
                r#"{{"devices":[{{"address":2,"banks":[{{"index":1,"bytes":[{}]}}]}}]}}"#,
                vec!["1"; 256].join(",")
            ))
            .unwrap(),
        );
        bus.select_bank(DEV, 1).unwrap();
        bus.set_address(DEV, 0xff).unwrap();
        assert_eq!(bus.read_byte(DEV), Ok(1));
        assert_eq!(bus.read_byte(DEV), Err(BusError::Unavailable));
    }
}
