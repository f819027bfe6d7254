//! Keyed deterministic pseudo-random stream.
//!
//! `unit(index)` is SHA-256 over `key || 0x00 || index_be`, with the first 8
//! digest bytes mapped to `[0, 1)`. The output depends only on `(key, index)`:
//! no hidden state, no call-order dependence, identical across runs and
//! platforms.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedStream {
    key: String,
}

impl KeyedStream {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Uniform draw in `[0, 1)` for `index`.
    pub fn unit(&self, index: u64) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_bytes());
        hasher.update([0u8]);
        hasher.update(index.to_be_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        // 53 high bits -> exact f64 mantissa
        (u64::from_be_bytes(head) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform draw in `[lo, hi)` for `index`.
    pub fn uniform(&self, index: u64, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit(index)
    }
}
