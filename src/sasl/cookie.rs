use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::error::{Error, ErrorKind, Result};
use crate::utils::{hex_encode, split_once};

/// Locate the keyring directory.
///
/// This is `$HOME/.dbus-keyrings` on POSIX and
/// `%userprofile%\.dbus-keyrings` on Windows; without either variable the
/// current directory is used.
pub(crate) fn default_keyring_dir() -> PathBuf {
    #[cfg(windows)]
    let home = env::var_os("userprofile");
    #[cfg(not(windows))]
    let home = env::var_os("HOME");

    let mut dir = home.map(PathBuf::from).unwrap_or_default();
    dir.push(".dbus-keyrings");
    dir
}

/// Look up the cookie with the given id in a keyring file.
///
/// Each line of the file is `<id> <time> <cookie-hex>`.
fn find_cookie(keyring_dir: &Path, keyring: &str, id: &str) -> Result<String> {
    let path = keyring_dir.join(keyring);
    let contents = fs::read_to_string(path)?;

    for line in contents.lines() {
        let mut columns = line.split_ascii_whitespace();

        if columns.next() != Some(id) {
            continue;
        }

        // Skip the creation time column.
        let (Some(..), Some(cookie)) = (columns.next(), columns.next()) else {
            continue;
        };

        return Ok(cookie.to_owned());
    }

    Err(Error::new(ErrorKind::MissingCookie))
}

/// Compute the response to a `DBUS_COOKIE_SHA1` challenge.
///
/// The decoded challenge is `<keyring> <id> <server-challenge>`. The
/// response payload is `<hex-local-challenge> <hex-sha1-digest>` where the
/// digest covers `<server-challenge>:<hex-local-challenge>:<cookie>`.
pub(crate) fn respond(
    challenge: &[u8],
    keyring_dir: &Path,
    random: &mut dyn FnMut() -> u8,
) -> Result<Vec<u8>> {
    let Some((keyring, rest)) = split_once(challenge, b' ') else {
        return Err(Error::new(ErrorKind::InvalidSasl));
    };

    let Some((id, server_challenge)) = split_once(rest, b' ') else {
        return Err(Error::new(ErrorKind::InvalidSasl));
    };

    let (Ok(keyring), Ok(id)) = (core::str::from_utf8(keyring), core::str::from_utf8(id)) else {
        return Err(Error::new(ErrorKind::InvalidSasl));
    };

    let cookie = find_cookie(keyring_dir, keyring, id)?;

    let mut local = [0u8; 64];

    for b in &mut local {
        *b = random();
    }

    let mut local_hex = Vec::with_capacity(128);
    hex_encode(&mut local_hex, &local);

    let mut input = Vec::new();
    input.extend_from_slice(server_challenge);
    input.push(b':');
    input.extend_from_slice(&local_hex);
    input.push(b':');
    input.extend_from_slice(cookie.as_bytes());

    let mut sha = Sha1::new();
    sha.update(&input);
    let digest = sha.finalize();

    let mut payload = local_hex;
    payload.push(b' ');
    hex_encode(&mut payload, &digest);
    Ok(payload)
}
