//! # Key Agreement
//!
//! Ephemeral x25519 keypairs and derivation of the symmetric cipher key.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::domain::{BetClientError, CipherKey, NetworkPublicKey, X25519_KEY_LEN};

/// HKDF info string binding derived keys to prediction encryption.
pub const CIPHER_KEY_INFO: &[u8] = b"olivia-bet-prediction-v1";

/// Single-use x25519 keypair.
///
/// [`EncryptionKeypair::agree`] consumes the keypair, so a private key can
/// never serve two encryptions.
pub struct EncryptionKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EncryptionKeypair {
    /// Fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Keypair from fixed secret bytes. Deterministic, for tests and tooling.
    pub fn from_secret_bytes(bytes: [u8; X25519_KEY_LEN]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public half, sent alongside the ciphertext.
    pub fn public_key(&self) -> [u8; X25519_KEY_LEN] {
        self.public.to_bytes()
    }

    /// Agree with the MXE key and derive the cipher key.
    ///
    /// # Errors
    ///
    /// `KeyAgreementFailure` when the peer key is a low-order point.
    pub fn agree(self, peer: &NetworkPublicKey) -> Result<CipherKey, BetClientError> {
        cipher_key_from_agreement(&self.secret, peer.as_bytes())
    }
}

impl std::fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeypair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"***")
            .finish()
    }
}

/// x25519 between `secret` and `peer`, expanded with HKDF-SHA256.
///
/// Both sides of the exchange call this: the client with its ephemeral
/// secret, the MXE with its long-lived one.
///
/// # Errors
///
/// `KeyAgreementFailure` when the result is non-contributory.
pub fn cipher_key_from_agreement(
    secret: &StaticSecret,
    peer: &[u8; X25519_KEY_LEN],
) -> Result<CipherKey, BetClientError> {
    let shared = secret.diffie_hellman(&PublicKey::from(*peer));
    if !shared.was_contributory() {
        return Err(BetClientError::KeyAgreementFailure(
            "peer public key is a low-order point".to_string(),
        ));
    }

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(CIPHER_KEY_INFO, &mut okm)
        .map_err(|e| BetClientError::KeyAgreementFailure(e.to_string()))?;
    Ok(CipherKey::new(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sides_derive_same_key() {
        let mxe_secret = StaticSecret::from([9u8; 32]);
        let mxe_public = NetworkPublicKey::from_bytes(PublicKey::from(&mxe_secret).to_bytes());

        let client = EncryptionKeypair::generate();
        let client_public = client.public_key();
        let client_key = client.agree(&mxe_public).unwrap();
        let mxe_key = cipher_key_from_agreement(&mxe_secret, &client_public).unwrap();

        assert_eq!(client_key.as_bytes(), mxe_key.as_bytes());
    }

    #[test]
    fn test_fresh_keypairs_differ() {
        let a = EncryptionKeypair::generate();
        let b = EncryptionKeypair::generate();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_low_order_peer_rejected() {
        let client = EncryptionKeypair::generate();
        let result = client.agree(&NetworkPublicKey::from_bytes([0u8; 32]));
        assert!(matches!(result, Err(BetClientError::KeyAgreementFailure(_))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = EncryptionKeypair::from_secret_bytes([0x11; 32]);
        let debug_str = format!("{keypair:?}");
        assert!(debug_str.contains("***"));
        assert!(!debug_str.contains(&hex::encode([0x11u8; 32])));
    }
}
