//! Cryptographic primitives for sealdrop
//!
//! The protocol is classic hybrid encryption:
//!
//! - **Key Wrapping**: a recipient holds an RSA-2048 key pair. Senders wrap a
//!   one-time AES key under the recipient's public key with RSA-OAEP (SHA-256).
//! - **Content Encryption**: the file itself is sealed with AES-256-GCM under that
//!   one-time key and a random 96-bit nonce.
//!
//! # Key Material Hygiene
//!
//! Every envelope gets a freshly generated `SymmetricKey` and `Nonce`, so a
//! (key, nonce) pair is never reused. `SymmetricKey` zeroizes itself on drop, and
//! the `rsa` crate zeroizes private key limbs when a `PrivateKey` is dropped.
//!
//! # Public Key Encoding
//!
//! Public keys travel as base64 of a PEM encoded SubjectPublicKeyInfo so they
//! survive being pasted through chat clients as a single line. Decoding also
//! accepts the raw PEM text.

mod keys;
mod secret;

pub use keys::{KeyError, KeyPair, PrivateKey, PublicKey, RSA_KEY_BITS, WRAPPED_KEY_SIZE};
pub use secret::{Nonce, SecretError, SymmetricKey, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
