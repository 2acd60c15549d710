use std::fs;

use sha1::{Digest, Sha1};

use crate::utils::hex_encode;

use super::{ClientAuth, SaslStatus, ServerAuth};

#[test]
fn client_external_handshake() {
    let mut auth = ClientAuth::with_identity("1000");
    let mut out = Vec::new();

    auth.start(&mut out).unwrap();
    assert_eq!(out, b"AUTH EXTERNAL 31303030\r\n");

    out.clear();
    let status = auth.parse(b"OK 1234deadbeef\r\n", &mut out).unwrap();
    assert_eq!(out, b"BEGIN\r\n");
    assert_eq!(status, SaslStatus::Finished { consumed: 17 });
    assert!(auth.is_successful());
}

#[test]
fn client_leaves_message_stream_alone() {
    let mut auth = ClientAuth::with_identity("1000");
    let mut out = Vec::new();

    auth.start(&mut out).unwrap();
    out.clear();

    // Message bytes already buffered after the final line must not be
    // consumed.
    let input = b"OK 1234deadbeef\r\nl\x01\x00\x01";
    let status = auth.parse(input, &mut out).unwrap();
    assert_eq!(status, SaslStatus::Finished { consumed: 17 });
    assert_eq!(&input[17..], b"l\x01\x00\x01");
}

#[test]
fn client_split_lines() {
    let mut auth = ClientAuth::with_identity("1000");
    let mut out = Vec::new();

    auth.start(&mut out).unwrap();
    out.clear();

    assert_eq!(
        auth.parse(b"OK 1234", &mut out).unwrap(),
        SaslStatus::NeedMore
    );
    assert_eq!(
        auth.parse(b"deadbeef\r\n", &mut out).unwrap(),
        SaslStatus::Finished { consumed: 10 }
    );
    assert_eq!(out, b"BEGIN\r\n");
}

#[test]
fn client_falls_back_to_cookie() {
    let mut auth = ClientAuth::with_identity("1000");
    let mut out = Vec::new();

    auth.start(&mut out).unwrap();
    out.clear();

    let status = auth.parse(b"REJECTED DBUS_COOKIE_SHA1\r\n", &mut out).unwrap();
    assert_eq!(status, SaslStatus::NeedMore);
    assert_eq!(out, b"AUTH DBUS_COOKIE_SHA1 31303030\r\n");
}

#[test]
fn client_mechanisms_exhausted() {
    let mut auth = ClientAuth::with_identity("1000");
    let mut out = Vec::new();

    auth.start(&mut out).unwrap();
    auth.parse(b"REJECTED\r\n", &mut out).unwrap();
    assert!(auth.parse(b"REJECTED\r\n", &mut out).is_err());
}

#[test]
fn client_disabled_mechanism_is_skipped() {
    let mut auth = ClientAuth::with_identity("1000");
    auth.disable_external();

    let mut out = Vec::new();
    auth.start(&mut out).unwrap();
    assert_eq!(out, b"AUTH DBUS_COOKIE_SHA1 31303030\r\n");

    let mut auth = ClientAuth::with_identity("1000");
    auth.disable_cookie();

    let mut out = Vec::new();
    auth.start(&mut out).unwrap();
    assert!(auth.parse(b"REJECTED\r\n", &mut out).is_err());
}

#[test]
fn cookie_challenge_digest() {
    let dir = tempfile::tempdir().unwrap();
    let keyring_dir = dir.path().join(".dbus-keyrings");
    fs::create_dir_all(&keyring_dir).unwrap();
    fs::write(
        keyring_dir.join("org_freedesktop_general"),
        "42 1200000000 636f6f6b6965\n",
    )
    .unwrap();

    let mut auth = ClientAuth::with_identity("1000");
    auth.set_keyring_dir(keyring_dir);
    auth.set_random(Box::new(|| 0xab));

    let mut out = Vec::new();
    auth.start(&mut out).unwrap();
    out.clear();

    // Reject EXTERNAL so the cookie mechanism engages.
    auth.parse(b"REJECTED\r\n", &mut out).unwrap();
    out.clear();

    // Challenge: keyring id server-challenge, hex-encoded on the wire.
    let mut line = Vec::new();
    line.extend_from_slice(b"DATA ");
    hex_encode(&mut line, b"org_freedesktop_general 42 deadbeef");
    line.extend_from_slice(b"\r\n");

    let status = auth.parse(&line, &mut out).unwrap();
    assert_eq!(status, SaslStatus::NeedMore);
    assert!(out.starts_with(b"DATA "));
    assert!(out.ends_with(b"\r\n"));

    // Reproduce the expected digest with the fixed randomness.
    let local_hex = {
        let mut hex = Vec::new();
        hex_encode(&mut hex, &[0xab; 64]);
        hex
    };

    let mut input = Vec::new();
    input.extend_from_slice(b"deadbeef:");
    input.extend_from_slice(&local_hex);
    input.extend_from_slice(b":636f6f6b6965");

    let mut sha = Sha1::new();
    sha.update(&input);
    let digest = sha.finalize();

    let mut payload = local_hex;
    payload.push(b' ');
    hex_encode(&mut payload, &digest);

    let mut expected = Vec::new();
    expected.extend_from_slice(b"DATA ");
    hex_encode(&mut expected, &payload);
    expected.extend_from_slice(b"\r\n");

    assert_eq!(out, expected);
}

#[test]
fn server_accepts_external() {
    let mut auth = ServerAuth::new(*b"0123456789abcdef");
    let mut out = Vec::new();

    let status = auth.parse(b"AUTH EXTERNAL 31303030\r\n", &mut out).unwrap();
    assert_eq!(status, SaslStatus::NeedMore);

    let mut expected = Vec::new();
    expected.extend_from_slice(b"OK ");
    hex_encode(&mut expected, b"0123456789abcdef");
    expected.extend_from_slice(b"\r\n");
    assert_eq!(out, expected);

    out.clear();
    let status = auth.parse(b"BEGIN\r\n", &mut out).unwrap();
    assert_eq!(status, SaslStatus::Finished { consumed: 7 });
    assert!(auth.is_successful());
}

#[test]
fn server_rejects_validator_failure() {
    let mut auth = ServerAuth::new(*b"0123456789abcdef");
    auth.set_external_validator(Box::new(|id| id == "1000"));

    let mut out = Vec::new();
    auth.parse(b"AUTH EXTERNAL 39<9\r\n", &mut out).unwrap();
    assert_eq!(out, b"REJECTED EXTERNAL\r\n");

    out.clear();
    auth.parse(b"AUTH EXTERNAL 31303031\r\n", &mut out).unwrap();
    assert_eq!(out, b"REJECTED EXTERNAL\r\n");

    out.clear();
    auth.parse(b"AUTH EXTERNAL 31303030\r\n", &mut out).unwrap();
    assert!(out.starts_with(b"OK "));
}

#[test]
fn server_cancel_resets() {
    let mut auth = ServerAuth::new(*b"0123456789abcdef");
    let mut out = Vec::new();

    auth.parse(b"AUTH EXTERNAL 31303030\r\n", &mut out).unwrap();
    out.clear();

    auth.parse(b"CANCEL\r\n", &mut out).unwrap();
    assert_eq!(out, b"REJECTED EXTERNAL\r\n");

    // BEGIN after a cancel is an unknown command, not a success.
    out.clear();
    let status = auth.parse(b"BEGIN\r\n", &mut out).unwrap();
    assert_eq!(status, SaslStatus::NeedMore);
    assert_eq!(out, b"ERROR\r\n");
}

#[test]
fn server_unknown_command_keeps_state() {
    let mut auth = ServerAuth::new(*b"0123456789abcdef");
    let mut out = Vec::new();

    auth.parse(b"STARTTLS\r\n", &mut out).unwrap();
    assert_eq!(out, b"ERROR\r\n");

    out.clear();
    auth.parse(b"AUTH EXTERNAL 31303030\r\n", &mut out).unwrap();
    assert!(out.starts_with(b"OK "));
}
