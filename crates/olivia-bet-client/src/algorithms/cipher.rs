//! # Prediction Cipher
//!
//! Symmetric encryption of plaintext elements under an agreed key.
//!
//! The MXE decrypts with the same cipher it advertises; [`Cipher`] is the
//! seam where that cipher plugs in. [`AesCtrCipher`] is the default.
//!
//! Each plaintext element is a `u128` written little-endian into a 32-byte
//! block; one block of keystream covers one element.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use ctr::Ctr128BE;

use super::key_agreement::EncryptionKeypair;
use crate::domain::{
    invariant_binary_plaintext, BetClientError, CipherKey, Ciphertext, EncryptedPrediction,
    NetworkPublicKey, Nonce, Prediction, CIPHERTEXT_LEN,
};

type Aes256Ctr = Ctr128BE<Aes256>;

/// Symmetric cipher shared with the MXE.
pub trait Cipher: Send + Sync {
    /// Encrypt each element under `key` and `nonce`.
    fn encrypt(
        &self,
        key: &CipherKey,
        nonce: &Nonce,
        plaintext: &[u128],
    ) -> Result<Vec<Ciphertext>, BetClientError>;

    /// Inverse of [`Cipher::encrypt`].
    fn decrypt(
        &self,
        key: &CipherKey,
        nonce: &Nonce,
        ciphertext: &[Ciphertext],
    ) -> Result<Vec<u128>, BetClientError>;
}

/// AES-256 in CTR mode, nonce as the initial counter block.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesCtrCipher;

impl AesCtrCipher {
    fn keystream(key: &CipherKey, nonce: &Nonce) -> Result<Aes256Ctr, BetClientError> {
        Aes256Ctr::new_from_slices(key.as_bytes(), nonce.as_bytes())
            .map_err(|e| BetClientError::EncryptionFailed(e.to_string()))
    }
}

impl Cipher for AesCtrCipher {
    fn encrypt(
        &self,
        key: &CipherKey,
        nonce: &Nonce,
        plaintext: &[u128],
    ) -> Result<Vec<Ciphertext>, BetClientError> {
        let mut stream = Self::keystream(key, nonce)?;
        Ok(plaintext
            .iter()
            .map(|value| {
                let mut block = [0u8; CIPHERTEXT_LEN];
                block[..16].copy_from_slice(&value.to_le_bytes());
                stream.apply_keystream(&mut block);
                Ciphertext::from_bytes(block)
            })
            .collect())
    }

    fn decrypt(
        &self,
        key: &CipherKey,
        nonce: &Nonce,
        ciphertext: &[Ciphertext],
    ) -> Result<Vec<u128>, BetClientError> {
        let mut stream = Self::keystream(key, nonce)?;
        ciphertext
            .iter()
            .map(|element| {
                let mut block = *element.as_bytes();
                stream.apply_keystream(&mut block);
                if block[16..].iter().any(|b| *b != 0) {
                    return Err(BetClientError::EncryptionFailed(
                        "decrypted element exceeds 128 bits".to_string(),
                    ));
                }
                let mut low = [0u8; 16];
                low.copy_from_slice(&block[..16]);
                Ok(u128::from_le_bytes(low))
            })
            .collect()
    }
}

/// Encrypt a prediction with a fresh keypair and nonce.
///
/// # Errors
///
/// `KeyAgreementFailure` for an unusable network key, `EncryptionFailed`
/// if the cipher fails.
pub fn encrypt_prediction(
    cipher: &dyn Cipher,
    network_key: &NetworkPublicKey,
    prediction: Prediction,
) -> Result<EncryptedPrediction, BetClientError> {
    encrypt_prediction_with(
        cipher,
        EncryptionKeypair::generate(),
        Nonce::generate(),
        network_key,
        prediction,
    )
}

/// Encrypt a prediction with a caller-supplied keypair and nonce.
///
/// The keypair is consumed; its secret is dropped before returning.
pub fn encrypt_prediction_with(
    cipher: &dyn Cipher,
    keypair: EncryptionKeypair,
    nonce: Nonce,
    network_key: &NetworkPublicKey,
    prediction: Prediction,
) -> Result<EncryptedPrediction, BetClientError> {
    let plaintext = prediction.plaintext();
    if !invariant_binary_plaintext(plaintext) {
        return Err(BetClientError::EncryptionFailed(format!(
            "plaintext {plaintext} is not binary"
        )));
    }

    let public_key = keypair.public_key();
    let key = keypair.agree(network_key)?;
    let ciphertext = cipher
        .encrypt(&key, &nonce, &[plaintext])?
        .into_iter()
        .next()
        .ok_or_else(|| BetClientError::EncryptionFailed("cipher returned no output".to_string()))?;

    Ok(EncryptedPrediction {
        ciphertext,
        public_key,
        nonce,
    })
}
