//! Deterministic hash helpers for datasets and model artifacts.

/// 64-bit FNV-1a hasher used to fingerprint training data.
///
/// Not cryptographic; it only has to be stable across runs and platforms.
#[derive(Copy, Clone, Debug)]
pub struct Fingerprint(u64);

impl Fingerprint {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    /// Feed bytes into the hash function.
    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 ^ u64::from(*b)).wrapping_mul(Self::PRIME);
        }
    }

    /// Feed the exact bit pattern of a float.
    pub fn update_f64(&mut self, value: f64) {
        self.update(&value.to_bits().to_le_bytes());
    }

    pub fn finish(&self) -> u64 {
        self.0
    }
}

/// Render a finished fingerprint as 16 lowercase hex digits.
pub fn to_hex(fingerprint: u64) -> String {
    format!("{fingerprint:016x}")
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}
