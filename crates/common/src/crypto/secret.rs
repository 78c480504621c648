//! Content encryption using AES-256-GCM
//!
//! Each envelope gets its own `SymmetricKey` and `Nonce`. The key is used for a
//! single seal and dropped right after, which zeroizes it; reusing a (key, nonce)
//! pair is therefore impossible through the envelope API.

use std::fmt;
use std::ops::Deref;

use aes_gcm::aead::{Aead, KeyInit, Nonce as GcmNonce};
use aes_gcm::{Aes256Gcm, Key};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ErrorKind;

/// Size of an AES-GCM nonce in bytes (the GCM standard 96 bits)
pub const NONCE_SIZE: usize = 12;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;
/// Size of the GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("could not gather randomness: {0}")]
    Random(String),
    #[error("invalid {what} size, expected {expected}, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("could not encrypt data")]
    Encrypt,
    #[error("could not decrypt/authenticate data")]
    AuthenticationFailed,
}

impl SecretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecretError::Random(_) => ErrorKind::Resource,
            SecretError::InvalidLength { .. } => ErrorKind::Format,
            SecretError::Encrypt | SecretError::AuthenticationFailed => ErrorKind::Crypto,
        }
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N], SecretError> {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).map_err(|e| SecretError::Random(e.to_string()))?;
    Ok(buff)
}

/// A one-time 256-bit AES key
///
/// Zeroized when dropped. Not `Copy`, not serializable, and its `Debug`
/// output never includes the key bytes.
///
/// # Examples
///
/// ```ignore
/// let key = SymmetricKey::generate()?;
/// let nonce = Nonce::generate()?;
///
/// let sealed = key.encrypt(&nonce, b"sensitive data")?;
/// let opened = key.decrypt(&nonce, &sealed)?;
/// assert_eq!(opened, b"sensitive data");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SECRET_SIZE]);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

impl SymmetricKey {
    /// Generate a new random key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        Ok(Self(random_bytes()?))
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(SecretError::InvalidLength {
                what: "symmetric key",
                expected: SECRET_SIZE,
                got: data.len(),
            });
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(Self(buff))
    }

    /// Get a reference to the key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()))
    }

    /// Seal `plaintext` with AES-256-GCM and no associated data
    ///
    /// The output is `ciphertext || tag (16 bytes)`. Deterministic for a given
    /// key, nonce and plaintext.
    pub fn encrypt(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>, SecretError> {
        self.cipher()
            .encrypt(GcmNonce::<Aes256Gcm>::from_slice(nonce.bytes()), plaintext)
            .map_err(|_| SecretError::Encrypt)
    }

    /// Open `ciphertext || tag` produced by [`SymmetricKey::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if the tag does not verify, whether because
    /// of a wrong key, a wrong nonce or tampered data. No plaintext is returned
    /// in that case.
    pub fn decrypt(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>, SecretError> {
        self.cipher()
            .decrypt(GcmNonce::<Aes256Gcm>::from_slice(nonce.bytes()), ciphertext)
            .map_err(|_| SecretError::AuthenticationFailed)
    }
}

/// A 96-bit AES-GCM nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Deref for Nonce {
    type Target = [u8; NONCE_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; NONCE_SIZE]> for Nonce {
    fn from(bytes: [u8; NONCE_SIZE]) -> Self {
        Nonce(bytes)
    }
}

impl Nonce {
    /// Generate a new random nonce
    pub fn generate() -> Result<Self, SecretError> {
        Ok(Self(random_bytes()?))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != NONCE_SIZE {
            return Err(SecretError::InvalidLength {
                what: "nonce",
                expected: NONCE_SIZE,
                got: data.len(),
            });
        }
        let mut buff = [0; NONCE_SIZE];
        buff.copy_from_slice(data);
        Ok(Self(buff))
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generated_sizes() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = Nonce::generate().unwrap();
        assert_eq!(key.bytes().len(), SECRET_SIZE);
        assert_eq!(nonce.bytes().len(), NONCE_SIZE);

        // two draws from the CSPRNG should never collide
        assert_ne!(key.bytes(), SymmetricKey::generate().unwrap().bytes());
        assert_ne!(nonce, Nonce::generate().unwrap());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = Nonce::generate().unwrap();
        let data = b"secret message";

        let encrypted = key.encrypt(&nonce, data).unwrap();
        assert_eq!(encrypted.len(), data.len() + TAG_SIZE);

        let decrypted = key.decrypt(&nonce, &encrypted).unwrap();
        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_encrypt_is_deterministic() {
        let key = SymmetricKey::from_slice(&[9u8; SECRET_SIZE]).unwrap();
        let nonce = Nonce::from([3u8; NONCE_SIZE]);

        let first = key.encrypt(&nonce, b"same input").unwrap();
        let second = key.encrypt(&nonce, b"same input").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = Nonce::generate().unwrap();

        let encrypted = key.encrypt(&nonce, b"").unwrap();
        assert_eq!(encrypted.len(), TAG_SIZE);
        assert!(key.decrypt(&nonce, &encrypted).unwrap().is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = Nonce::generate().unwrap();
        let mut encrypted = key.encrypt(&nonce, b"test data for integrity check").unwrap();

        encrypted[5] ^= 0x80;
        let err = key.decrypt(&nonce, &encrypted).unwrap_err();
        assert!(matches!(err, SecretError::AuthenticationFailed));
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn test_wrong_key_or_nonce_fails() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = Nonce::generate().unwrap();
        let encrypted = key.encrypt(&nonce, b"payload").unwrap();

        let other_key = SymmetricKey::generate().unwrap();
        assert!(other_key.decrypt(&nonce, &encrypted).is_err());

        let other_nonce = Nonce::generate().unwrap();
        assert!(key.decrypt(&other_nonce, &encrypted).is_err());
    }

    #[test]
    fn test_size_validation() {
        assert!(SymmetricKey::from_slice(&[1u8; 16]).is_err());
        assert!(SymmetricKey::from_slice(&[1u8; 64]).is_err());
        assert!(SymmetricKey::from_slice(&[1u8; SECRET_SIZE]).is_ok());

        let err = Nonce::from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            SecretError::InvalidLength {
                expected: NONCE_SIZE,
                got: 16,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SymmetricKey::from_slice(&[0xab; SECRET_SIZE]).unwrap();
        assert!(!format!("{:?}", key).contains("ab"));
    }
}
