/// Fixed-size packed bit set, least significant bit first within each byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyBitset {
    bits: usize,
    bytes: Vec<u8>,
}

impl OccupancyBitset {
    pub fn new(bits: usize) -> Self {
        OccupancyBitset {
            bits,
            bytes: vec![0; bits.div_ceil(8)],
        }
    }

    /// Wraps bytes read from a file; `bytes` must hold at least `bits` bits.
    pub fn from_bytes(bits: usize, bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() != bits.div_ceil(8) {
            return None;
        }
        Some(OccupancyBitset { bits, bytes })
    }

    /// Sets bit `index`. Out-of-range indices are ignored and reported as false.
    pub fn set(&mut self, index: usize) -> bool {
        if index >= self.bits {
            return false;
        }
        self.bytes[index / 8] |= 1 << (index % 8);
        true
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.bits && self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
