use crate::{MessageKind, ObjectPath, Serial};

/// The owned kind of a D-Bus message.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OwnedMessageKind {
    /// Method call. This message type may prompt a reply.
    MethodCall {
        /// The path being called.
        path: Box<ObjectPath>,
        /// The member being called.
        member: Box<str>,
    },
    /// Method reply with returned data.
    MethodReturn {
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Error reply.
    Error {
        /// The name of the error.
        error_name: Box<str>,
        /// The serial this is a reply to.
        reply_serial: Serial,
    },
    /// Signal emission.
    Signal {
        /// The path the signal is emitted from.
        path: Box<ObjectPath>,
        /// The member being signalled.
        member: Box<str>,
    },
}

impl OwnedMessageKind {
    #[inline]
    pub(crate) fn borrow(&self) -> MessageKind<'_> {
        match *self {
            OwnedMessageKind::MethodCall {
                ref path,
                ref member,
            } => MessageKind::MethodCall { path, member },
            OwnedMessageKind::MethodReturn { reply_serial } => {
                MessageKind::MethodReturn { reply_serial }
            }
            OwnedMessageKind::Error {
                ref error_name,
                reply_serial,
            } => MessageKind::Error {
                error_name,
                reply_serial,
            },
            OwnedMessageKind::Signal {
                ref path,
                ref member,
            } => MessageKind::Signal { path, member },
        }
    }
}

impl Clone for OwnedMessageKind {
    #[inline]
    fn clone(&self) -> Self {
        match self {
            OwnedMessageKind::MethodCall { path, member } => OwnedMessageKind::MethodCall {
                path: Box::from(&**path),
                member: member.clone(),
            },
            OwnedMessageKind::MethodReturn { reply_serial } => OwnedMessageKind::MethodReturn {
                reply_serial: *reply_serial,
            },
            OwnedMessageKind::Error {
                error_name,
                reply_serial,
            } => OwnedMessageKind::Error {
                error_name: error_name.clone(),
                reply_serial: *reply_serial,
            },
            OwnedMessageKind::Signal { path, member } => OwnedMessageKind::Signal {
                path: Box::from(&**path),
                member: member.clone(),
            },
        }
    }
}

impl PartialEq<MessageKind<'_>> for OwnedMessageKind {
    #[inline]
    fn eq(&self, other: &MessageKind<'_>) -> bool {
        self.borrow() == *other
    }
}
