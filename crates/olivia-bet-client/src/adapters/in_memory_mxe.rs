//! In-process MXE holding a static x25519 key.
//!
//! Publishes its public key through [`MxeKeySource`] and can decrypt the
//! predictions addressed to it, standing in for the cluster in local runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use solana_program::pubkey::Pubkey;
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::algorithms::{cipher_key_from_agreement, AesCtrCipher, Cipher};
use crate::domain::{
    invariant_binary_plaintext, BetClientError, EncryptedPrediction, NetworkPublicKey, Prediction,
};
use crate::ports::MxeKeySource;

/// In-memory MXE.
pub struct InMemoryMxe {
    secret: StaticSecret,
    public: NetworkPublicKey,
    cipher: Arc<dyn Cipher>,
    unpublished_fetches: AtomicU32,
    fetches: AtomicU32,
}

impl InMemoryMxe {
    /// MXE with a random key and the default cipher.
    pub fn new() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(rand::rngs::OsRng))
    }

    /// MXE with fixed key bytes.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = NetworkPublicKey::from_bytes(PublicKey::from(&secret).to_bytes());
        Self {
            secret,
            public,
            cipher: Arc::new(AesCtrCipher),
            unpublished_fetches: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
        }
    }

    /// Answer the first `count` key fetches with "not published".
    pub fn with_unpublished_fetches(self, count: u32) -> Self {
        self.unpublished_fetches.store(count, Ordering::SeqCst);
        self
    }

    /// Use a different cipher.
    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Published key.
    pub fn public_key(&self) -> NetworkPublicKey {
        self.public
    }

    /// Key fetches served so far.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Recover a prediction encrypted to this MXE.
    ///
    /// # Errors
    ///
    /// `EncryptionFailed` if the plaintext is not a single binary element.
    pub fn decrypt_prediction(
        &self,
        encrypted: &EncryptedPrediction,
    ) -> Result<Prediction, BetClientError> {
        let key = cipher_key_from_agreement(&self.secret, &encrypted.public_key)?;
        let plain = self
            .cipher
            .decrypt(&key, &encrypted.nonce, &[encrypted.ciphertext])?;
        match plain.as_slice() {
            [value] if invariant_binary_plaintext(*value) => Ok(Prediction::new(*value == 1)),
            _ => Err(BetClientError::EncryptionFailed(
                "plaintext is not a binary prediction".to_string(),
            )),
        }
    }
}

impl Default for InMemoryMxe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryMxe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMxe")
            .field("public", &self.public)
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MxeKeySource for InMemoryMxe {
    async fn fetch_public_key(
        &self,
        program_id: &Pubkey,
    ) -> Result<Option<NetworkPublicKey>, BetClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let withheld = self
            .unpublished_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if withheld {
            debug!(program = %program_id, "[bet-client] MXE key not published yet");
            return Ok(None);
        }
        Ok(Some(self.public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::encrypt_prediction;

    #[tokio::test]
    async fn test_unpublished_then_available() {
        let mxe = InMemoryMxe::new().with_unpublished_fetches(2);
        let program = Pubkey::new_unique();
        assert!(mxe.fetch_public_key(&program).await.unwrap().is_none());
        assert!(mxe.fetch_public_key(&program).await.unwrap().is_none());
        assert_eq!(
            mxe.fetch_public_key(&program).await.unwrap(),
            Some(mxe.public_key())
        );
        assert_eq!(mxe.fetch_count(), 3);
    }

    #[test]
    fn test_decrypts_client_prediction() {
        let mxe = InMemoryMxe::from_secret_bytes([5; 32]);
        for outcome in [true, false] {
            let encrypted =
                encrypt_prediction(&AesCtrCipher, &mxe.public_key(), Prediction::new(outcome))
                    .unwrap();
            assert_eq!(mxe.decrypt_prediction(&encrypted).unwrap().outcome(), outcome);
        }
    }

    #[test]
    fn test_other_mxe_cannot_decrypt() {
        let intended = InMemoryMxe::from_secret_bytes([5; 32]);
        let other = InMemoryMxe::from_secret_bytes([6; 32]);
        let encrypted =
            encrypt_prediction(&AesCtrCipher, &intended.public_key(), Prediction::new(true))
                .unwrap();
        assert!(!matches!(other.decrypt_prediction(&encrypted), Ok(p) if p.outcome()));
    }
}
