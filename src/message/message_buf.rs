use crate::message::OwnedMessageKind;
use crate::proto::Flags;
use crate::{BodyBuf, Message, MessageKind, ObjectPath, Serial};

/// An owned D-Bus message.
///
/// This is the owned variant of a [`Message`]; to convert it back, use
/// [`MessageBuf::borrow`].
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBuf {
    /// The kind of the message.
    pub(crate) kind: OwnedMessageKind,
    /// Serial of the message.
    pub(crate) serial: Serial,
    /// Flags in the message.
    pub(crate) flags: Flags,
    /// The interface of the message.
    pub(crate) interface: Option<Box<str>>,
    /// The destination of the message.
    pub(crate) destination: Option<Box<str>>,
    /// The sender of the message.
    pub(crate) sender: Option<Box<str>>,
    /// The body associated with the message.
    pub(crate) body: BodyBuf,
}

impl MessageBuf {
    /// Construct an owned method call message.
    pub fn method_call(path: Box<ObjectPath>, member: Box<str>, serial: Serial) -> Self {
        Self {
            kind: OwnedMessageKind::MethodCall { path, member },
            serial,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            body: BodyBuf::new(),
        }
    }

    /// Construct an owned signal message.
    pub fn signal(path: Box<ObjectPath>, member: Box<str>, serial: Serial) -> Self {
        Self {
            kind: OwnedMessageKind::Signal { path, member },
            serial,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            body: BodyBuf::new(),
        }
    }

    /// Borrow into a [`Message`].
    pub fn borrow(&self) -> Message<'_> {
        Message {
            kind: self.kind.borrow(),
            serial: self.serial,
            flags: self.flags,
            interface: self.interface.as_deref(),
            destination: self.destination.as_deref(),
            sender: self.sender.as_deref(),
            body: self.body.as_body(),
        }
    }

    /// Get the kind of the message.
    pub fn kind(&self) -> MessageKind<'_> {
        self.kind.borrow()
    }

    /// Get the serial of the message.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Get the flags of the message.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Get the interface of the message.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Get the destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Modify the interface of the message.
    #[must_use]
    pub fn with_interface<T>(self, interface: T) -> Self
    where
        T: Into<Box<str>>,
    {
        Self {
            interface: Some(interface.into()),
            ..self
        }
    }

    /// Modify the destination of the message.
    #[must_use]
    pub fn with_destination<T>(self, destination: T) -> Self
    where
        T: Into<Box<str>>,
    {
        Self {
            destination: Some(destination.into()),
            ..self
        }
    }

    /// Get the sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Modify the sender of the message.
    #[must_use]
    pub fn with_sender<T>(self, sender: T) -> Self
    where
        T: Into<Box<str>>,
    {
        Self {
            sender: Some(sender.into()),
            ..self
        }
    }

    /// Modify the body of the message.
    #[must_use]
    pub fn with_body(self, body: BodyBuf) -> Self {
        Self { body, ..self }
    }

    /// Get a reader over the body of the message.
    pub fn body(&self) -> crate::Body<'_> {
        self.body.as_body()
    }
}

impl PartialEq<Message<'_>> for MessageBuf {
    #[inline]
    fn eq(&self, other: &Message<'_>) -> bool {
        *other == *self
    }
}
