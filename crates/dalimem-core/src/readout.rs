use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::bus::{Bus, DeviceAddress, MemorySession};
use crate::catalog::{self, StandardRevision};
use crate::image::{ImageBus, ImageError, MemoryImage};
use crate::location::SchemaError;
use crate::value::ValueDef;
use crate::{InputInfo, Report, ValueSummary, make_stub_report};

#[derive(Debug, Error)]
pub enum ReadoutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Catalog error: {0}")]
    Schema(#[from] SchemaError),
    #[error("device {device} not present in image")]
    UnknownDevice { device: u8 },
}

/// Read every catalog value of `revision` from `device`.
///
/// A value that fails to read is recorded with its error; the remaining
/// values are still read.
pub fn read_report<B: Bus>(
    session: &MemorySession<B>,
    device: DeviceAddress,
    revision: StandardRevision,
    input: InputInfo,
) -> Result<Report, ReadoutError> {
    let mut report = make_stub_report(&input.path, input.bytes, device.0, revision);
    for def in catalog::definitions(revision)? {
        report.values.push(summarize(session, device, &def));
    }
    Ok(report)
}

/// Build a report for one device of a memory image file.
///
/// Without an explicit `revision`, the device's stored version number
/// decides, falling back to the 2014 edition.
pub fn inspect_image_file(
    path: &Path,
    device: u8,
    revision: Option<StandardRevision>,
) -> Result<Report, ReadoutError> {
    let bytes = fs::metadata(path)?.len();
    let image = MemoryImage::load(path)?;
    let stored = image
        .device(device)
        .ok_or(ReadoutError::UnknownDevice { device })?
        .version_number;
    let revision = revision.unwrap_or_else(|| {
        stored
            .map(StandardRevision::from_version_number)
            .unwrap_or(StandardRevision::Iec62386_102_2014)
    });
    debug!("device {device}: reading {revision} catalog from {}", path.display());

    let session = MemorySession::new(ImageBus::new(image));
    let input = InputInfo {
        path: path.display().to_string(),
        bytes,
    };
    read_report(&session, DeviceAddress(device), revision, input)
}

fn summarize<B: Bus>(session: &MemorySession<B>, device: DeviceAddress, def: &ValueDef) -> ValueSummary {
    let mut summary = ValueSummary {
        name: def.name().to_string(),
        bank: def.bank().index(),
        start: def.start(),
        end: def.end(),
        memory_type: def.locations()[0].memory_type(),
        kind: def.kind().name().to_string(),
        outcome: None,
        raw: None,
        error: None,
    };
    match session.read_raw(device, def) {
        Ok(raw) => {
            summary.raw = Some(raw.iter().map(|b| format!("{b:02x}")).collect());
            summary.outcome = Some(def.decode_read(&raw).to_string());
        }
        Err(err) => summary.error = Some(err.to_string()),
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::read_report;
    use crate::bus::{DeviceAddress, MemorySession};
    use crate::catalog::StandardRevision;
    use crate::image::{ImageBus, MemoryImage};
    use crate::InputInfo;

    fn input() -> InputInfo {
        InputInfo {
            path: "test".to_string(),
            bytes: 0,
        }
    }

    #[test]
    fn missing_bank_is_reported_per_value() {
        let image = MemoryImage::from_json(
            r#"{"devices":[{"address":0,"banks":[{"index":207,"bytes":[7,0,0,254,255,85,0,100]}]}]}"#,
        )
        .unwrap();
        let session = MemorySession::new(ImageBus::new(image));
        let report = read_report(
            &session,
            DeviceAddress(0),
            StandardRevision::Iec62386_102_2014,
            input(),
        )
        .unwrap();

        let gtin = report.values.iter().find(|v| v.name == "GTIN").unwrap();
        assert!(gtin.outcome.is_none());
        assert!(gtin.error.as_deref().unwrap().contains("not implemented"));

        let life = report
            .values
            .iter()
            .find(|v| v.name == "RatedMedianUsefulLifeOfLuminaire")
            .unwrap();
        assert_eq!(life.outcome.as_deref(), Some("MASK"));
        assert_eq!(life.raw.as_deref(), Some("ff"));
        let starts = report
            .values
            .iter()
            .find(|v| v.name == "RatedMedianUsefulLightSourceStarts")
            .unwrap();
        assert_eq!(starts.outcome.as_deref(), Some("1 starts"));
        assert_eq!(starts.raw.as_deref(), Some("0064"));
    }
}
