use crate::error::Result;
use crate::utils::{hex_decode, hex_encode, split_once};

use super::{next_line, Filtered, LineFilter, SaslStatus};

/// The server side of the SASL handshake.
///
/// Only the `EXTERNAL` mechanism is offered; whether a presented identity
/// is acceptable is decided by the host-supplied validator. Without a
/// validator every identity the transport admits is accepted.
///
/// # Examples
///
/// ```
/// use corebus::sasl::{SaslStatus, ServerAuth};
///
/// let mut auth = ServerAuth::new(*b"ca11ab1eca11ab1e");
/// let mut out = Vec::new();
///
/// let status = auth.parse(b"AUTH EXTERNAL 31303030\r\n", &mut out)?;
/// assert_eq!(status, SaslStatus::NeedMore);
/// assert!(out.starts_with(b"OK "));
///
/// out.clear();
/// let status = auth.parse(b"BEGIN\r\n", &mut out)?;
/// assert_eq!(status, SaslStatus::Finished { consumed: 7 });
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct ServerAuth {
    /// The `OK` line including the hex-encoded server uuid.
    ok_line: Vec<u8>,
    validator: Option<Box<dyn Fn(&str) -> bool + Send>>,
    ok_sent: bool,
    successful: bool,
    partial: Vec<u8>,
    filter: Option<LineFilter>,
}

impl ServerAuth {
    /// Construct a server authenticator which reports the given uuid.
    pub fn new(uuid: [u8; 16]) -> Self {
        let mut ok_line = Vec::with_capacity(3 + 32 + 2);
        ok_line.extend_from_slice(b"OK ");
        hex_encode(&mut ok_line, &uuid);
        ok_line.extend_from_slice(b"\r\n");

        Self {
            ok_line,
            validator: None,
            ok_sent: false,
            successful: false,
            partial: Vec::new(),
            filter: None,
        }
    }

    /// Install the callback deciding whether an `EXTERNAL` identity is
    /// acceptable.
    pub fn set_external_validator(&mut self, validator: Box<dyn Fn(&str) -> bool + Send>) {
        self.validator = Some(validator);
    }

    /// Install a filter which may intercept custom command lines.
    pub fn set_filter(&mut self, filter: LineFilter) {
        self.filter = Some(filter);
    }

    /// Test if the exchange has completed successfully.
    pub fn is_successful(&self) -> bool {
        self.successful
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
            self.process_line(&line, out);

            if self.successful {
                return Ok(SaslStatus::Finished { consumed: at });
            }
        }

        Ok(SaslStatus::NeedMore)
    }

    fn process_line(&mut self, line: &[u8], out: &mut Vec<u8>) {
        if let Some(filter) = &mut self.filter {
            if filter(line, out) == Filtered::Handled {
                return;
            }
        }

        let (command, rest) = match split_once(line, b' ') {
            Some((command, rest)) => (command, rest),
            None => (line, &[][..]),
        };

        match command {
            b"AUTH" => {
                let (mechanism, id) = match split_once(rest, b' ') {
                    Some((mechanism, id)) => (mechanism, id),
                    None => (rest, &[][..]),
                };

                if mechanism != b"EXTERNAL" {
                    self.reject(out);
                    return;
                }

                let id = hex_decode(id)
                    .and_then(|id| String::from_utf8(id).ok())
                    .unwrap_or_default();

                let accepted = match &self.validator {
                    Some(validator) => validator(&id),
                    None => true,
                };

                if accepted {
                    self.ok_sent = true;
                    out.extend_from_slice(&self.ok_line);
                } else {
                    log::debug!("rejected external identity {id:?}");
                    self.reject(out);
                }
            }
            b"CANCEL" => {
                self.reject(out);
            }
            b"BEGIN" if self.ok_sent => {
                self.successful = true;
            }
            _ => {
                out.extend_from_slice(b"ERROR\r\n");
            }
        }
    }

    fn reject(&mut self, out: &mut Vec<u8>) {
        self.ok_sent = false;
        out.extend_from_slice(b"REJECTED EXTERNAL\r\n");
    }
}
