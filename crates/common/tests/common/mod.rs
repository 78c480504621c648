//! Shared test utilities for envelope and session integration tests
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;

use ::common::crypto::{KeyPair, PrivateKey};
use ::common::metadata::{hash_bytes, FileMetadata};
use tempfile::TempDir;

/// A recipient key pair shared across a test binary
///
/// RSA generation is slow in debug builds, so every test reuses this one.
pub fn recipient() -> &'static KeyPair {
    static KEY_PAIR: OnceLock<KeyPair> = OnceLock::new();
    KEY_PAIR.get_or_init(|| KeyPair::generate().unwrap())
}

/// A second, unrelated key pair
pub fn stranger() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| PrivateKey::generate().unwrap())
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    getrandom::getrandom(&mut data).unwrap();
    data
}

pub fn metadata_for(name: &str, data: &[u8]) -> FileMetadata {
    FileMetadata {
        name: name.to_string(),
        size: data.len() as u64,
        hash: hash_bytes(data),
    }
}

/// Write `data` to `name` inside a fresh temp dir
pub fn write_temp_file(name: &str, data: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    (dir, path)
}
