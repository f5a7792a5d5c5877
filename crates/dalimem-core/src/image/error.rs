use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("device {address} appears more than once")]
    DuplicateDevice { address: u8 },
    #[error("device {device}: bank {bank} appears more than once")]
    DuplicateBank { device: u8, bank: u8 },
    #[error("device {device}: bank {bank} holds {len} bytes (at most 256)")]
    BankTooLarge { device: u8, bank: u8, len: usize },
}
