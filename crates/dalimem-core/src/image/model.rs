use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ImageError;

/// Largest bank: addresses 0x00..=0xFF.
pub const MAX_BANK_BYTES: usize = 256;

/// Memory contents of a set of devices, as stored in JSON image files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryImage {
    pub devices: Vec<DeviceImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceImage {
    pub address: u8,
    /// Answer to a version-number query, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<u8>,
    pub banks: Vec<BankImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankImage {
    pub index: u8,
    /// Stored bytes from address 0x00; later addresses are not implemented.
    pub bytes: Vec<u8>,
    /// Addresses that only accept writes while the lock byte reads 0x55.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected: Vec<u8>,
}

impl MemoryImage {
    pub fn from_json(text: &str) -> Result<Self, ImageError> {
        let image: MemoryImage = serde_json::from_str(text)?;
        image.validate()?;
        Ok(image)
    }

    pub fn load(path: &Path) -> Result<Self, ImageError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ImageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        let mut text = self.to_json_pretty()?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }

    /// Reject duplicate devices, duplicate banks and oversized banks.
    pub fn validate(&self) -> Result<(), ImageError> {
        let mut addresses = HashSet::new();
        for device in &self.devices {
            if !addresses.insert(device.address) {
                return Err(ImageError::DuplicateDevice {
                    address: device.address,
                });
            }
            let mut banks = HashSet::new();
            for bank in &device.banks {
                if !banks.insert(bank.index) {
                    return Err(ImageError::DuplicateBank {
                        device: device.address,
                        bank: bank.index,
                    });
                }
                if bank.bytes.len() > MAX_BANK_BYTES {
                    return Err(ImageError::BankTooLarge {
                        device: device.address,
                        bank: bank.index,
                        len: bank.bytes.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn device(&self, address: u8) -> Option<&DeviceImage> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut DeviceImage> {
        self.devices.iter_mut().find(|d| d.address == address)
    }
}

impl DeviceImage {
    pub fn bank(&self, index: u8) -> Option<&BankImage> {
        self.banks.iter().find(|b| b.index == index)
    }

    pub fn bank_mut(&mut self, index: u8) -> Option<&mut BankImage> {
        self.banks.iter_mut().find(|b| b.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageError, MemoryImage};

    #[test]
    fn parses_minimal_image() {
        let image = MemoryImage::from_json(
            r#"{"devices":[{"address":1,"banks":[{"index":0,"bytes":[2,0,0]}]}]}"#,
        )
        .unwrap();
        let device = image.device(1).unwrap();
        assert_eq!(device.version_number, None);
        assert_eq!(device.bank(0).unwrap().bytes, vec![2, 0, 0]);
        assert!(device.bank(0).unwrap().protected.is_empty());
    }

    #[test]
    fn rejects_duplicates() {
        let err = MemoryImage::from_json(
            r#"{"devices":[{"address":1,"banks":[]},{"address":1,"banks":[]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ImageError::DuplicateDevice { address: 1 }));

        let err = MemoryImage::from_json(
            r#"{"devices":[{"address":1,"banks":[{"index":3,"bytes":[]},{"index":3,"bytes":[]}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ImageError::DuplicateBank { device: 1, bank: 3 }));
    }

    #[test]
    fn rejects_oversized_bank() {
        let bytes = vec!["0"; 257].join(",");
        let text = format!(r#"{{"devices":[{{"address":0,"banks":[{{"index":0,"bytes":[{bytes}]}}]}}]}}"#);
        let err = MemoryImage::from_json(&text).unwrap_err();
        assert!(matches!(err, ImageError::BankTooLarge { len: 257, .. }));
    }

    #[test]
    fn json_round_trip_omits_empty_fields() {
        let image = MemoryImage::from_json(
            r#"{"devices":[{"address":4,"banks":[{"index":0,"bytes":[1,2]}]}]}"#,
        )
        .unwrap();
        let text = image.to_json_pretty().unwrap();
        assert!(!text.contains("protected"));
        assert!(!text.contains("version_number"));
        assert_eq!(MemoryImage::from_json(&text).unwrap(), image);
    }
}
