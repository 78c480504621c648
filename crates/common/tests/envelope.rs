//! Integration tests for building and opening envelopes

mod common;

use ::common::envelope::{
    build_envelope, open_and_save, open_envelope, Envelope, EnvelopeError,
};
use ::common::metadata::hash_bytes;
use ::common::ErrorKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};

#[test]
fn test_round_trip() {
    let key_pair = common::recipient();
    let data = b"Hello, world!";
    let metadata = common::metadata_for("hello.txt", data);

    let payload = build_envelope(metadata.clone(), &key_pair.public, data).unwrap();
    let (plaintext, recovered) = open_envelope(&payload, &key_pair.private).unwrap();

    assert_eq!(plaintext, data);
    assert_eq!(recovered, metadata);
}

#[test]
fn test_one_mebibyte_round_trip() {
    let key_pair = common::recipient();
    let data = common::random_bytes(1024 * 1024);
    let metadata = common::metadata_for("large.bin", &data);

    let payload = build_envelope(metadata, &key_pair.public, &data).unwrap();
    let (plaintext, recovered) = open_envelope(&payload, &key_pair.private).unwrap();

    assert_eq!(hash_bytes(&plaintext), hash_bytes(&data));
    assert_eq!(recovered.size, 1024 * 1024);
}

#[test]
fn test_fresh_key_and_nonce_per_build() {
    let key_pair = common::recipient();
    let data = b"same input twice";
    let metadata = common::metadata_for("twice.txt", data);

    let first = Envelope::seal(metadata.clone(), &key_pair.public, data).unwrap();
    let second = Envelope::seal(metadata, &key_pair.public, data).unwrap();

    assert_ne!(first.key, second.key);
    assert_ne!(first.nonce, second.nonce);
    assert_ne!(first.data, second.data);
    assert_eq!(first.metadata, second.metadata);
}

#[test]
fn test_tampered_data_fails_authentication() {
    let key_pair = common::recipient();
    let data = b"do not touch";
    let mut envelope =
        Envelope::seal(common::metadata_for("f", data), &key_pair.public, data).unwrap();

    // flip one bit of the first ciphertext byte
    let mut sealed = hex::decode(&envelope.data).unwrap();
    sealed[0] ^= 0x01;
    envelope.data = hex::encode(sealed);

    let err = envelope.open(&key_pair.private).unwrap_err();
    assert!(matches!(err, EnvelopeError::AuthenticationFailed));
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[test]
fn test_tampered_key_fails_unwrap() {
    let key_pair = common::recipient();
    let data = b"do not touch";
    let mut envelope =
        Envelope::seal(common::metadata_for("f", data), &key_pair.public, data).unwrap();

    let mut wrapped = hex::decode(&envelope.key).unwrap();
    wrapped[10] ^= 0xff;
    envelope.key = hex::encode(wrapped);

    let err = envelope.open(&key_pair.private).unwrap_err();
    assert!(matches!(err, EnvelopeError::KeyUnwrapFailed));
}

#[test]
fn test_wrong_private_key() {
    let data = b"for someone else";
    let payload = build_envelope(
        common::metadata_for("f", data),
        &common::recipient().public,
        data,
    )
    .unwrap();

    let err = open_envelope(&payload, common::stranger()).unwrap_err();
    assert!(matches!(err, EnvelopeError::KeyUnwrapFailed));
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[test]
fn test_format_errors_are_distinct() {
    let private = &common::recipient().private;

    let bad_base64 = open_envelope("%%%", private).unwrap_err();
    assert!(matches!(bad_base64, EnvelopeError::InvalidBase64(_)));

    let bad_json = open_envelope(&STANDARD.encode("[1, 2"), private).unwrap_err();
    assert!(matches!(bad_json, EnvelopeError::InvalidJson(_)));

    let odd_hex = STANDARD.encode(
        r#"{"key":"abc","data":"00","nonce":"000000000000000000000000","metadata":{"name":"a","size":1,"hash":""}}"#,
    );
    let odd_hex = open_envelope(&odd_hex, private).unwrap_err();
    assert!(matches!(
        odd_hex,
        EnvelopeError::InvalidHexField { field: "key", .. }
    ));

    for err in [bad_base64, bad_json, odd_hex] {
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}

#[test]
fn test_missing_field_is_invalid_json() {
    let payload = STANDARD.encode(r#"{"key":"00","data":"00","nonce":"00"}"#);
    let err = open_envelope(&payload, &common::recipient().private).unwrap_err();
    assert!(matches!(err, EnvelopeError::InvalidJson(_)));
}

#[test]
fn test_open_and_save_sanitizes_name() {
    let key_pair = common::recipient();
    let data = b"root:x:0:0";
    let payload = build_envelope(
        common::metadata_for("../../etc/passwd", data),
        &key_pair.public,
        data,
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    let saved = open_and_save(&payload, &key_pair.private, out.path()).unwrap();

    assert_eq!(saved.path, out.path().join("passwd"));
    assert_eq!(std::fs::read(&saved.path).unwrap(), data);
    // the original name is still reported as sent
    assert_eq!(saved.metadata.name, "../../etc/passwd");
}

#[test]
fn test_open_and_save_rejects_dot_dot() {
    let key_pair = common::recipient();
    let data = b"x";
    let payload =
        build_envelope(common::metadata_for("..", data), &key_pair.public, data).unwrap();

    let out = tempfile::tempdir().unwrap();
    let err = open_and_save(&payload, &key_pair.private, out.path()).unwrap_err();
    assert!(matches!(err, EnvelopeError::InvalidFileName(_)));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_open_writes_nothing() {
    let data = b"secret";
    let payload = build_envelope(
        common::metadata_for("secret.txt", data),
        &common::recipient().public,
        data,
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    assert!(open_and_save(&payload, common::stranger(), out.path()).is_err());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
