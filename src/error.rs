use core::fmt;
use core::str::Utf8Error;
use std::error;
use std::io;

use crate::match_rule::MatchRuleError;
use crate::names::NameError;
use crate::{ObjectPathError, Signature, SignatureError};

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<NameError> for Error {
    #[inline]
    fn from(error: NameError) -> Self {
        Self::new(ErrorKind::Name(error))
    }
}

impl From<MatchRuleError> for Error {
    #[inline]
    fn from(error: MatchRuleError) -> Self {
        Self::new(ErrorKind::MatchRule(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock => Self::new(ErrorKind::WouldBlock),
            _ => Self::new(ErrorKind::Io(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8Error(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(..) => write!(f, "I/O error"),
            ErrorKind::Signature(..) => write!(f, "Signature error"),
            ErrorKind::ObjectPath(..) => write!(f, "ObjectPath error"),
            ErrorKind::Name(..) => write!(f, "Name error"),
            ErrorKind::MatchRule(..) => write!(f, "Match rule error"),
            ErrorKind::Utf8Error(..) => write!(f, "UTF-8 error"),
            ErrorKind::WouldBlock => write!(f, "Would block"),
            ErrorKind::BufferUnderflow => write!(f, "Buffer underflow"),
            ErrorKind::MissingBus => write!(f, "Missing bus to connect to"),
            ErrorKind::InvalidAddress => write!(f, "Invalid D-Bus address"),
            ErrorKind::InvalidSasl => write!(f, "Invalid SASL message"),
            ErrorKind::SaslMechanismsExhausted => {
                write!(f, "Every supported SASL mechanism was rejected")
            }
            ErrorKind::SaslFailed => write!(f, "SASL exchange failed"),
            ErrorKind::MissingCookie => {
                write!(f, "No matching cookie in the keyring file")
            }
            ErrorKind::InvalidProtocol => write!(f, "Invalid protocol"),
            ErrorKind::MissingPath => write!(f, "Missing required PATH header"),
            ErrorKind::MissingInterface => write!(f, "Missing required INTERFACE header"),
            ErrorKind::MissingMember => write!(f, "Missing required MEMBER header"),
            ErrorKind::MissingReplySerial => write!(f, "Missing required REPLY_SERIAL header"),
            ErrorKind::MissingErrorName => write!(f, "Missing required ERROR_NAME header"),
            ErrorKind::ZeroSerial => write!(f, "Zero in header serial"),
            ErrorKind::ZeroReplySerial => write!(f, "Zero REPLY_SERIAL header"),
            ErrorKind::NotNullTerminated => write!(f, "String is not null terminated"),
            ErrorKind::ArrayTooLong(length) => {
                write!(f, "Array of length {length} is too long (max is 67108864)")
            }
            ErrorKind::BodyTooLong(length) => {
                write!(f, "Body of length {length} is too long (max is 134217728)")
            }
            ErrorKind::HeaderTooLong(length) => {
                write!(
                    f,
                    "Header of length {length} is too long (max is 134217728)"
                )
            }
            ErrorKind::MessageTooLong(length) => {
                write!(
                    f,
                    "Message of length {length} is too long (max is 134217728)"
                )
            }
            ErrorKind::UnsupportedVariant(signature) => {
                write!(f, "Unsupported variant signature {signature:?}")
            }
            ErrorKind::Poisoned => {
                write!(f, "Connection poisoned by an earlier parse error")
            }
            ErrorKind::NotConnected => write!(f, "No transport connected"),
            ErrorKind::WrongThread => {
                write!(f, "Call from a thread which does not own the connection")
            }
            ErrorKind::ShortSend => {
                write!(f, "Transport sent fewer bytes than requested")
            }
            ErrorKind::BindExists(path, interface) => {
                write!(f, "Interface {interface} is already bound on {path}")
            }
            ErrorKind::NoSuchBind(path, interface) => {
                write!(f, "Interface {interface} is not bound on {path}")
            }
            ErrorKind::Disconnected => write!(f, "Remote has been disconnected"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::ObjectPath(error) => Some(error),
            ErrorKind::Name(error) => Some(error),
            ErrorKind::MatchRule(error) => Some(error),
            ErrorKind::Utf8Error(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Signature(SignatureError),
    ObjectPath(ObjectPathError),
    Name(NameError),
    MatchRule(MatchRuleError),
    Utf8Error(Utf8Error),
    WouldBlock,
    BufferUnderflow,
    MissingBus,
    InvalidAddress,
    InvalidSasl,
    SaslMechanismsExhausted,
    SaslFailed,
    MissingCookie,
    InvalidProtocol,
    MissingPath,
    MissingInterface,
    MissingMember,
    MissingReplySerial,
    MissingErrorName,
    ZeroSerial,
    ZeroReplySerial,
    NotNullTerminated,
    ArrayTooLong(u32),
    BodyTooLong(u32),
    HeaderTooLong(u32),
    MessageTooLong(usize),
    UnsupportedVariant(Box<Signature>),
    Poisoned,
    NotConnected,
    WrongThread,
    ShortSend,
    BindExists(Box<str>, Box<str>),
    NoSuchBind(Box<str>, Box<str>),
    Disconnected,
}
