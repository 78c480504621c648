//! The transport payload
//!
//! An [`Envelope`] binds together everything a recipient needs to recover a
//! file: the one-time AES key wrapped under their RSA public key, the GCM nonce,
//! the sealed content and the file's metadata.
//!
//! # Wire Format
//!
//! The envelope is serialized as JSON with every binary field hex encoded, and
//! the JSON bytes are then base64 encoded (standard alphabet, padded):
//!
//! ```text
//! base64({"key":"<hex>","data":"<hex>","nonce":"<hex>",
//!         "metadata":{"name":"<string>","size":<int>,"hash":"<hex>"}})
//! ```
//!
//! For a 2048-bit recipient key, `key` is 512 hex characters, `nonce` is 24 and
//! `data` is `2 * (plaintext length + 16)`.
//!
//! # Opening
//!
//! Opening runs the layers in reverse and stops at the first failing stage, so
//! every error names the stage that rejected the payload. Nothing is returned or
//! written unless the GCM tag verifies.

mod save;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::crypto::{KeyError, Nonce, PrivateKey, PublicKey, SecretError, SymmetricKey, NONCE_SIZE};
use crate::error::ErrorKind;
use crate::metadata::{hash_bytes, FileMetadata};

pub use save::{open_and_save, sanitize_file_name, save_plaintext, SavedFile};

/// Errors raised while building, opening or saving an envelope
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("invalid json payload: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("invalid hex in field `{field}`: {source}")]
    InvalidHexField {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("invalid nonce length, expected 12 bytes, got {0}")]
    InvalidNonceLength(usize),
    #[error("failed to decrypt symmetric key: wrong private key or tampered payload")]
    KeyUnwrapFailed,
    #[error("failed to decrypt data: authentication failed")]
    AuthenticationFailed,
    #[error("decrypted content does not match the {field} in the payload metadata")]
    MetadataMismatch { field: &'static str },
    #[error("invalid file name in payload metadata: {0:?}")]
    InvalidFileName(String),
    #[error("failed to save file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not marshal JSON payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Key(KeyError),
    #[error(transparent)]
    Secret(SecretError),
}

impl From<KeyError> for EnvelopeError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::KeyUnwrapFailed => EnvelopeError::KeyUnwrapFailed,
            other => EnvelopeError::Key(other),
        }
    }
}

impl From<SecretError> for EnvelopeError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::AuthenticationFailed => EnvelopeError::AuthenticationFailed,
            other => EnvelopeError::Secret(other),
        }
    }
}

impl EnvelopeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvelopeError::InvalidBase64(_)
            | EnvelopeError::InvalidJson(_)
            | EnvelopeError::InvalidHexField { .. }
            | EnvelopeError::InvalidNonceLength(_)
            | EnvelopeError::InvalidFileName(_)
            | EnvelopeError::Serialize(_) => ErrorKind::Format,
            EnvelopeError::KeyUnwrapFailed
            | EnvelopeError::AuthenticationFailed
            | EnvelopeError::MetadataMismatch { .. } => ErrorKind::Crypto,
            EnvelopeError::Write { .. } => ErrorKind::Io,
            EnvelopeError::Key(err) => err.kind(),
            EnvelopeError::Secret(err) => err.kind(),
        }
    }
}

fn decode_hex_field(field: &'static str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    hex::decode(value).map_err(|source| EnvelopeError::InvalidHexField { field, source })
}

/// A sealed file, as carried on the wire
///
/// Immutable once built. The binary fields stay hex encoded here so that the
/// struct maps one-to-one onto the JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// RSA-OAEP(SHA-256) wrapped AES-256 key
    pub key: String,
    /// AES-256-GCM ciphertext with the tag appended
    pub data: String,
    /// 12-byte GCM nonce
    pub nonce: String,
    pub metadata: FileMetadata,
}

impl Envelope {
    /// Seal `plaintext` for the holder of `recipient`'s private key
    ///
    /// A fresh symmetric key and nonce are drawn for every call; the key is
    /// zeroized when this function returns.
    pub fn seal(
        metadata: FileMetadata,
        recipient: &PublicKey,
        plaintext: &[u8],
    ) -> Result<Self, EnvelopeError> {
        let secret = SymmetricKey::generate()?;
        let wrapped = recipient.wrap(&secret)?;
        let nonce = Nonce::generate()?;
        let sealed = secret.encrypt(&nonce, plaintext)?;

        Ok(Self {
            key: hex::encode(wrapped),
            data: hex::encode(sealed),
            nonce: hex::encode(nonce.bytes()),
            metadata,
        })
    }

    /// Recover the plaintext with the recipient's private key
    ///
    /// All fields are hex decoded before any cryptography runs, so malformed
    /// input is always reported as a format error.
    pub fn open(&self, private_key: &PrivateKey) -> Result<Vec<u8>, EnvelopeError> {
        let wrapped = decode_hex_field("key", &self.key)?;
        let nonce_bytes = decode_hex_field("nonce", &self.nonce)?;
        let sealed = decode_hex_field("data", &self.data)?;

        let nonce = Nonce::from_slice(&nonce_bytes)
            .map_err(|_| EnvelopeError::InvalidNonceLength(nonce_bytes.len()))?;

        let secret = private_key.unwrap_key(&wrapped)?;
        let plaintext = secret.decrypt(&nonce, &sealed)?;

        if plaintext.len() as u64 != self.metadata.size {
            return Err(EnvelopeError::MetadataMismatch { field: "size" });
        }
        if !hash_bytes(&plaintext).eq_ignore_ascii_case(&self.metadata.hash) {
            return Err(EnvelopeError::MetadataMismatch { field: "hash" });
        }

        Ok(plaintext)
    }

    /// Serialize to the base64 payload string
    pub fn to_payload(&self) -> Result<String, EnvelopeError> {
        let json = serde_json::to_vec(self).map_err(EnvelopeError::Serialize)?;
        Ok(STANDARD.encode(json))
    }

    /// Parse a base64 payload string
    ///
    /// All whitespace is ignored, so payloads that a mail or chat client
    /// wrapped into lines (LF or CRLF) still parse.
    pub fn from_payload(payload: &str) -> Result<Self, EnvelopeError> {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let json = STANDARD
            .decode(compact)
            .map_err(EnvelopeError::InvalidBase64)?;
        serde_json::from_slice(&json).map_err(EnvelopeError::InvalidJson)
    }
}

/// Seal `plaintext` and serialize the result into a payload string
pub fn build_envelope(
    metadata: FileMetadata,
    recipient: &PublicKey,
    plaintext: &[u8],
) -> Result<String, EnvelopeError> {
    Envelope::seal(metadata, recipient, plaintext)?.to_payload()
}

/// Parse a payload string and recover its plaintext and metadata
pub fn open_envelope(
    payload: &str,
    private_key: &PrivateKey,
) -> Result<(Vec<u8>, FileMetadata), EnvelopeError> {
    let envelope = Envelope::from_payload(payload)?;
    let plaintext = envelope.open(private_key)?;
    Ok((plaintext, envelope.metadata))
}
