use super::layout;

/// Read-side view over the raw bytes of one value, most significant first.
pub struct RawReader<'a> {
    bytes: &'a [u8],
}

impl<'a> RawReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    pub fn first(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    pub fn is_all(&self, value: u8) -> bool {
        !self.bytes.is_empty() && self.bytes.iter().all(|&b| b == value)
    }

    pub fn is_mask(&self) -> bool {
        self.is_all(layout::MASK)
    }

    pub fn is_tmask(&self) -> bool {
        self.is_all(layout::TMASK)
    }

    pub fn read_u64_be(&self) -> u64 {
        self.bytes
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }
}
