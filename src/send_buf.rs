use core::num::NonZeroU32;

use crate::buf::UnalignedBuf;
use crate::error::{Error, ErrorKind, Result};
use crate::proto::{Endianness, HeaderField};
use crate::{Message, MessageKind, ObjectPath, Serial, Signature};

/// Buffer used for sending messages through D-Bus.
///
/// # Examples
///
/// ```
/// use corebus::{ObjectPath, SendBuf};
///
/// const PATH: &ObjectPath = ObjectPath::new_const(b"/org/freedesktop/DBus");
///
/// let mut send = SendBuf::new();
///
/// let m = send.method_call(PATH, "Hello")
///     .with_destination("org.freedesktop.DBus");
///
/// send.write_message(m)?;
/// assert!(!send.is_empty());
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct SendBuf {
    buf: UnalignedBuf,
    serial: u32,
}

impl SendBuf {
    /// Construct a new send buffer.
    pub fn new() -> Self {
        Self {
            buf: UnalignedBuf::new(),
            serial: 0,
        }
    }

    /// Test if the buffer holds no pending data.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Get the bytes pending to be sent.
    pub fn get(&self) -> &[u8] {
        self.buf.get()
    }

    /// Indicate that `n` pending bytes have been sent.
    pub fn advance(&mut self, n: usize) {
        self.buf.advance(n);
    }

    /// Get the next serial for this send buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::SendBuf;
    ///
    /// let mut send = SendBuf::new();
    /// assert_ne!(send.next_serial(), send.next_serial());
    /// ```
    pub fn next_serial(&mut self) -> Serial {
        loop {
            let Some(serial) = NonZeroU32::new(self.serial.wrapping_add(1)) else {
                self.serial = 1;
                continue;
            };

            self.serial = serial.get();
            break Serial::new(serial);
        }
    }

    /// Construct a method call [`Message`].
    pub fn method_call<'a>(&mut self, path: &'a ObjectPath, member: &'a str) -> Message<'a> {
        Message::method_call(path, member, self.next_serial())
    }

    /// Construct a signal [`Message`].
    pub fn signal<'a>(&mut self, path: &'a ObjectPath, member: &'a str) -> Message<'a> {
        Message::signal(path, member, self.next_serial())
    }

    /// Write a message to the buffer.
    ///
    /// Messages are framed in native endianness; required header fields
    /// which are missing, such as the interface of a signal, cause an
    /// error.
    pub fn write_message(&mut self, message: Message<'_>) -> Result<Serial> {
        self.buf.update_base_align();

        let body = message.body();

        let Ok(body_length) = u32::try_from(body.len()) else {
            return Err(Error::new(ErrorKind::BodyTooLong(u32::MAX)));
        };

        // The following section performs manual header mangling, which is
        // easier than making every message-writing abstraction compatible
        // with an unaligned buffer.

        self.buf.store(crate::proto::Header {
            endianness: Endianness::NATIVE,
            message_type: message.message_type(),
            flags: message.flags,
            version: 1,
            body_length,
            serial: message.serial.get(),
        });

        let length = self.buf.alloc::<u32>();
        let start = self.buf.written_pos();

        match message.kind {
            MessageKind::MethodCall { path, member } => {
                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::PATH);
                self.buf.write(Signature::OBJECT_PATH);
                self.buf.write(path);

                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::MEMBER);
                self.buf.write(Signature::STRING);
                self.buf.write(member);
            }
            MessageKind::MethodReturn { reply_serial } => {
                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::REPLY_SERIAL);
                self.buf.write(Signature::UINT32);
                self.buf.store(reply_serial.get());
            }
            MessageKind::Error {
                error_name,
                reply_serial,
            } => {
                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::ERROR_NAME);
                self.buf.write(Signature::STRING);
                self.buf.write(error_name);

                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::REPLY_SERIAL);
                self.buf.write(Signature::UINT32);
                self.buf.store(reply_serial.get());
            }
            MessageKind::Signal { path, member } => {
                if message.interface.is_none() {
                    return Err(Error::new(ErrorKind::MissingInterface));
                }

                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::PATH);
                self.buf.write(Signature::OBJECT_PATH);
                self.buf.write(path);

                self.buf.align_mut::<u64>();
                self.buf.store(HeaderField::MEMBER);
                self.buf.write(Signature::STRING);
                self.buf.write(member);
            }
        }

        if let Some(interface) = message.interface {
            self.buf.align_mut::<u64>();
            self.buf.store(HeaderField::INTERFACE);
            self.buf.write(Signature::STRING);
            self.buf.write(interface);
        }

        if let Some(destination) = message.destination {
            self.buf.align_mut::<u64>();
            self.buf.store(HeaderField::DESTINATION);
            self.buf.write(Signature::STRING);
            self.buf.write(destination);
        }

        if let Some(sender) = message.sender {
            self.buf.align_mut::<u64>();
            self.buf.store(HeaderField::SENDER);
            self.buf.write(Signature::STRING);
            self.buf.write(sender);
        }

        if !body.signature().is_empty() {
            self.buf.align_mut::<u64>();
            self.buf.store(HeaderField::SIGNATURE);
            self.buf.write(Signature::SIGNATURE);
            self.buf.write(body.signature());
        }

        let Ok(header_length) = u32::try_from(self.buf.written_pos().saturating_sub(start)) else {
            return Err(Error::new(ErrorKind::HeaderTooLong(u32::MAX)));
        };

        self.buf.store_at(length, header_length);

        self.buf.align_mut::<u64>();
        self.buf.extend_from_slice(body.get());
        Ok(message.serial)
    }
}

impl Default for SendBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
