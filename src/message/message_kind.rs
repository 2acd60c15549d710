use crate::{ObjectPath, Serial};

/// The kind of a D-Bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageKind<'a> {
    /// Method call. This message type may prompt a reply.
    MethodCall {
        /// The path being called.
        path: &'a ObjectPath,
        /// The member being called.
        member: &'a str,
    },
    /// Method reply with returned data.
    MethodReturn {
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Error reply. If the first argument exists and is a string, it is an
    /// error message.
    Error {
        /// The name of the error.
        error_name: &'a str,
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Signal emission.
    Signal {
        /// The path the signal is emitted from.
        path: &'a ObjectPath,
        /// The member being signalled.
        member: &'a str,
    },
}

impl MessageKind<'_> {
    /// Convert into an owned kind.
    pub(crate) fn to_owned(self) -> crate::message::OwnedMessageKind {
        use crate::message::OwnedMessageKind;

        match self {
            MessageKind::MethodCall { path, member } => OwnedMessageKind::MethodCall {
                path: path.into(),
                member: member.into(),
            },
            MessageKind::MethodReturn { reply_serial } => {
                OwnedMessageKind::MethodReturn { reply_serial }
            }
            MessageKind::Error {
                error_name,
                reply_serial,
            } => OwnedMessageKind::Error {
                error_name: error_name.into(),
                reply_serial,
            },
            MessageKind::Signal { path, member } => OwnedMessageKind::Signal {
                path: path.into(),
                member: member.into(),
            },
        }
    }
}
