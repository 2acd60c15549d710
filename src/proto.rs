//! Low level details for the D-Bus protocol implementation.

use crate::{Frame, Signature};

/// The fixed sixteen byte header leading every message.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub(crate) struct Header {
    pub(crate) endianness: Endianness,
    pub(crate) message_type: MessageType,
    pub(crate) flags: Flags,
    pub(crate) version: u8,
    pub(crate) body_length: u32,
    pub(crate) serial: u32,
}

impl crate::frame::sealed::Sealed for Header {}

unsafe impl Frame for Header {
    const SIGNATURE: &'static Signature = Signature::new_const(b"yyyyuu");

    fn adjust(&mut self, endianness: Endianness) {
        self.body_length.adjust(endianness);
        self.serial.adjust(endianness);
    }
}

raw_enum! {
    /// The endianness of a message.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian.
        LITTLE = b'l',
        /// Big endian.
        BIG = b'B',
    }
}

impl Endianness {
    /// Native endian.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Native endian.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;
}

raw_enum! {
    /// The type of a message.
    #[repr(u8)]
    pub enum MessageType {
        /// Method call. This message type may prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// This message does not expect method return replies or error
        /// replies, even if it is of a type that can have a reply; the reply
        /// should be omitted.
        NO_REPLY_EXPECTED = 1,
        /// The bus must not launch an owner for the destination name in
        /// response to this message.
        NO_AUTO_START = 2,
        /// The caller is prepared to wait for interactive authorization on
        /// the receiving side.
        ALLOW_INTERACTIVE_AUTHORIZATION = 4,
    }
}

raw_enum! {
    /// The code of a field in the header-field array.
    #[repr(u8)]
    pub(crate) enum HeaderField {
        /// The object to send a call to, or the object a signal is emitted
        /// from. Type `o`.
        PATH = 1,
        /// The interface to invoke a method call on, or that a signal is
        /// emitted from. Type `s`.
        INTERFACE = 2,
        /// The member, either the method name or signal name. Type `s`.
        MEMBER = 3,
        /// The name of the error that occurred, for errors. Type `s`.
        ERROR_NAME = 4,
        /// The serial number of the message this message is a reply to.
        /// Type `u`.
        REPLY_SERIAL = 5,
        /// The name of the connection this message is intended for. Type `s`.
        DESTINATION = 6,
        /// Unique name of the sending connection. On a message bus this
        /// field is controlled by the bus. Type `s`.
        SENDER = 7,
        /// The signature of the message body. If omitted it is assumed to be
        /// empty. Type `g`.
        SIGNATURE = 8,
        /// The number of Unix file descriptors that accompany the message.
        UNIX_FDS = 9,
    }
}

impl crate::frame::sealed::Sealed for HeaderField {}

unsafe impl Frame for HeaderField {
    const SIGNATURE: &'static Signature = Signature::BYTE;

    #[inline]
    fn adjust(&mut self, _: Endianness) {}
}

