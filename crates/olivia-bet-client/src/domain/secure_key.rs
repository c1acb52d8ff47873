//! # Secure Key Type
//!
//! Symmetric key material derived from an x25519 shared secret.
//! Zeroized on drop and never rendered in logs.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 256-bit symmetric key that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    inner: [u8; 32],
}

impl CipherKey {
    /// Wrap key bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { inner: bytes }
    }

    /// Create from a slice (copies into a fixed array).
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let inner: [u8; 32] = slice.try_into().ok()?;
        Some(Self { inner })
    }

    /// Key bytes. Use immediately; do not keep copies.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.inner
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(***)")
    }
}
