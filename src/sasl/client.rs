use std::path::PathBuf;

use crate::error::{Error, ErrorKind, Result};
use crate::utils::{hex_decode, hex_encode, split_once};

use super::{cookie, next_line, Filtered, LineFilter, Mech, SaslStatus};

/// The client side of the SASL handshake.
///
/// Mechanisms are tried in order: `EXTERNAL` first, falling back to
/// `DBUS_COOKIE_SHA1` when rejected.
///
/// # Examples
///
/// ```
/// use corebus::sasl::{ClientAuth, SaslStatus};
///
/// let mut auth = ClientAuth::with_identity("1000");
/// let mut out = Vec::new();
///
/// auth.start(&mut out)?;
/// assert_eq!(out, b"AUTH EXTERNAL 31303030\r\n");
///
/// out.clear();
/// let status = auth.parse(b"OK 1234deadbeef\r\n", &mut out)?;
/// assert_eq!(out, b"BEGIN\r\n");
/// assert_eq!(status, SaslStatus::Finished { consumed: 17 });
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct ClientAuth {
    /// Hex-encoded local identity.
    id_hex: Vec<u8>,
    external: Mech,
    cookie: Mech,
    /// Set while a `DATA` challenge is expected for the cookie mechanism.
    expect_data: bool,
    successful: bool,
    partial: Vec<u8>,
    filter: Option<LineFilter>,
    keyring_dir: PathBuf,
    random: Box<dyn FnMut() -> u8 + Send>,
}

impl ClientAuth {
    /// Construct a client authenticator using the local process identity.
    ///
    /// On POSIX this is the numeric effective UID.
    #[cfg(all(unix, feature = "libc"))]
    pub fn new() -> Self {
        let id = unsafe { libc::geteuid() };
        Self::with_identity(&id.to_string())
    }

    /// Construct a client authenticator for an explicit identity string.
    pub fn with_identity(id: &str) -> Self {
        let mut id_hex = Vec::with_capacity(id.len() * 2);
        hex_encode(&mut id_hex, id.as_bytes());

        Self {
            id_hex,
            external: Mech::NotTried,
            cookie: Mech::NotTried,
            expect_data: false,
            successful: false,
            partial: Vec::new(),
            filter: None,
            keyring_dir: cookie::default_keyring_dir(),
            random: Box::new(|| rand::random()),
        }
    }

    /// Take `EXTERNAL` out of the mechanism sequence.
    pub fn disable_external(&mut self) {
        self.external = Mech::Unsupported;
    }

    /// Take `DBUS_COOKIE_SHA1` out of the mechanism sequence.
    pub fn disable_cookie(&mut self) {
        self.cookie = Mech::Unsupported;
    }

    /// Install a filter which may intercept custom command lines.
    pub fn set_filter(&mut self, filter: LineFilter) {
        self.filter = Some(filter);
    }

    /// Override the directory that keyring files are read from.
    pub fn set_keyring_dir(&mut self, dir: PathBuf) {
        self.keyring_dir = dir;
    }

    /// Override the source of challenge randomness.
    pub fn set_random(&mut self, random: Box<dyn FnMut() -> u8 + Send>) {
        self.random = random;
    }

    /// Test if the exchange has completed successfully.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Begin the exchange by emitting the first `AUTH` line.
    ///
    /// The caller must send the single NUL byte which precedes the stream.
    pub fn start(&mut self, out: &mut Vec<u8>) -> Result<()> {
        self.next_mechanism(out)
    }

    /// Try the next untried mechanism.
    fn next_mechanism(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.external == Mech::NotTried {
            self.external = Mech::Begun;
            self.expect_data = false;
            out.extend_from_slice(b"AUTH EXTERNAL ");
        } else if self.cookie == Mech::NotTried {
            self.cookie = Mech::Begun;
            self.expect_data = true;
            out.extend_from_slice(b"AUTH DBUS_COOKIE_SHA1 ");
        } else {
            return Err(Error::new(ErrorKind::SaslMechanismsExhausted));
        }

        out.extend_from_slice(&self.id_hex);
        out.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Feed received bytes to the exchange, appending any responses to
    /// `out`.
    pub fn parse(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<SaslStatus> {
        if self.successful {
            return Ok(SaslStatus::Finished { consumed: 0 });
        }

        let mut at = 0;

        while let Some((line, next)) = next_line(&mut self.partial, data, at) {
            at = next;
            self.process_line(&line, out)?;

            if self.successful {
                return Ok(SaslStatus::Finished { consumed: at });
            }
        }

        Ok(SaslStatus::NeedMore)
    }

    fn process_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if let Some(filter) = &mut self.filter {
            if filter(line, out) == Filtered::Handled {
                return Ok(());
            }
        }

        let (command, rest) = match split_once(line, b' ') {
            Some((command, rest)) => (command, rest),
            None => (line, &[][..]),
        };

        match command {
            b"OK" => {
                out.extend_from_slice(b"BEGIN\r\n");
                self.successful = true;
                Ok(())
            }
            b"REJECTED" => self.next_mechanism(out),
            b"DATA" if self.expect_data => {
                let Some(challenge) = hex_decode(rest) else {
                    return Err(Error::new(ErrorKind::InvalidSasl));
                };

                let payload =
                    cookie::respond(&challenge, &self.keyring_dir, &mut self.random)?;

                out.extend_from_slice(b"DATA ");
                hex_encode(out, &payload);
                out.extend_from_slice(b"\r\n");
                Ok(())
            }
            b"ERROR" => Err(Error::new(ErrorKind::SaslFailed)),
            _ => {
                log::debug!(
                    "unhandled sasl command: {:?}",
                    String::from_utf8_lossy(command)
                );
                out.extend_from_slice(b"ERROR\r\n");
                Ok(())
            }
        }
    }
}

#[cfg(all(unix, feature = "libc"))]
impl Default for ClientAuth {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
