//! The SASL handshake which precedes the D-Bus message stream.
//!
//! Both ends are modeled as line-framed state machines which are fed raw
//! bytes and append their responses to an output buffer, leaving the
//! transport to the caller. The leading NUL byte required by the
//! transport is the caller's responsibility.
//!
//! Supported mechanisms are `EXTERNAL` and `DBUS_COOKIE_SHA1` on the
//! client and `EXTERNAL` on the server.

pub use self::client::ClientAuth;
mod client;

pub use self::server::ServerAuth;
mod server;

mod cookie;

#[cfg(test)]
mod tests;

/// The result of feeding bytes to an authentication exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslStatus {
    /// More input is needed to make progress.
    NeedMore,
    /// The exchange finished successfully.
    ///
    /// `consumed` is the number of input bytes belonging to the exchange;
    /// anything after them is the start of the message stream and must be
    /// handed to the message parser.
    Finished {
        /// Bytes of the last input which belonged to the exchange.
        consumed: usize,
    },
}

/// What a host line filter did with a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtered {
    /// The line was handled by the filter; the state machine ignores it.
    Handled,
    /// The line was not recognized by the filter.
    Unhandled,
}

/// A hook which lets host code intercept custom command lines, for
/// example to initiate TLS. It receives the line without its CR-LF
/// terminator and may append response bytes.
pub type LineFilter = Box<dyn FnMut(&[u8], &mut Vec<u8>) -> Filtered + Send>;

/// The progression of a single mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mech {
    Unsupported,
    NotTried,
    Begun,
}

/// Accumulate input into complete CR-LF terminated lines.
///
/// Returns the next complete line (terminator stripped) together with the
/// number of input bytes consumed to complete it.
pub(crate) fn next_line<'a>(
    partial: &'a mut Vec<u8>,
    data: &[u8],
    at: usize,
) -> Option<(Vec<u8>, usize)> {
    let rest = &data[at..];

    let Some(n) = rest.iter().position(|&b| b == b'\n') else {
        partial.extend_from_slice(rest);
        return None;
    };

    let mut line = core::mem::take(partial);
    line.extend_from_slice(&rest[..n]);

    if line.last() == Some(&b'\r') {
        line.pop();
    }

    Some((line, at + n + 1))
}
