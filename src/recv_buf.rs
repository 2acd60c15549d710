use core::mem::size_of;
use core::num::NonZeroU32;

use crate::buf::{padding_to_align, AlignedBuf, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH, MAX_MESSAGE_LENGTH};
use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::proto::{Endianness, Header, HeaderField, MessageType};
use crate::signature;
use crate::{Body, Message, MessageBuf, MessageKind, ObjectPath, Serial, Signature};

/// Buffer used for receiving messages through D-Bus.
///
/// Bytes are pushed in as they arrive; every time a complete message has
/// been accumulated, [`take_message`] splits it off into an owned
/// [`MessageBuf`]. Foreign-endian messages are byte-reversed exactly once
/// on receipt, so everything handed out is in native byte order.
///
/// [`take_message`]: Self::take_message
pub struct RecvBuf {
    /// Raw accumulated bytes.
    buf: AlignedBuf,
}

impl RecvBuf {
    /// Construct a new receive buffer.
    pub fn new() -> Self {
        Self {
            buf: AlignedBuf::new(),
        }
    }

    /// Append raw bytes received from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes which have not yet formed a complete
    /// message.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Test if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Split off the next complete message, if one has been accumulated.
    pub fn take_message(&mut self) -> Result<Option<MessageBuf>> {
        let Some(total) = frame_size(self.buf.get())? else {
            return Ok(None);
        };

        if self.buf.len() < total {
            return Ok(None);
        }

        let mut raw = self.buf.get()[..total].to_vec();
        self.buf.consume(total);

        normalize(&mut raw)?;
        let message = read_message(&raw)?.to_owned();
        Ok(Some(message))
    }
}

impl Default for RecvBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;

/// Determine the total size of the message starting at `data`, from its
/// first sixteen bytes.
///
/// Returns `None` if not even the fixed header is available yet.
pub(crate) fn frame_size(data: &[u8]) -> Result<Option<usize>> {
    if data.len() < size_of::<Header>() + size_of::<u32>() {
        return Ok(None);
    }

    let mut read = crate::buf::Aligned::new(data);
    let mut header = read.load::<Header>()?;
    let mut fields = read.load::<u32>()?;

    if header.endianness != Endianness::LITTLE && header.endianness != Endianness::BIG {
        return Err(Error::new(ErrorKind::InvalidProtocol));
    }

    header.adjust(header.endianness);
    fields.adjust(header.endianness);

    if header.version != 1 {
        return Err(Error::new(ErrorKind::InvalidProtocol));
    }

    if header.body_length > MAX_BODY_LENGTH {
        return Err(Error::new(ErrorKind::BodyTooLong(header.body_length)));
    }

    if fields > MAX_ARRAY_LENGTH {
        return Err(Error::new(ErrorKind::ArrayTooLong(fields)));
    }

    let fields = fields as usize;
    let body_length = header.body_length as usize;

    let total = size_of::<Header>()
        + size_of::<u32>()
        + fields
        + padding_to_align(8, fields)
        + body_length;

    if total > MAX_MESSAGE_LENGTH {
        return Err(Error::new(ErrorKind::MessageTooLong(total)));
    }

    Ok(Some(total))
}

/// The signature covering the fixed header and the header-field array.
const HEAD: &Signature = Signature::new_const(b"yyyyuua(yv)");

/// Byte-reverse a complete foreign-endian message in place so that all
/// downstream code sees native byte order.
///
/// This is a no-op for native-endian messages.
pub(crate) fn normalize(data: &mut [u8]) -> Result<()> {
    let Some(&endianness) = data.first() else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    if Endianness::new(endianness) == Endianness::NATIVE {
        return Ok(());
    }

    // Flip the fixed header and every header field, driven by their
    // signature. The field array length sits at offset 12.
    let at = signature::flip(HEAD, data, 0)?;
    let body_start = at + padding_to_align(8, at);

    // With the fields now native, locate the body signature and flip the
    // arguments.
    let fields_region = &data[size_of::<Header>() + size_of::<u32>()..at];
    let signature = match parse_fields(fields_region)?.signature {
        Some(signature) => signature.to_owned(),
        None => Signature::EMPTY.to_owned(),
    };

    signature::flip(&signature, data, body_start)?;
    data[0] = Endianness::NATIVE.0;
    Ok(())
}

/// The header fields of a message.
#[derive(Default)]
pub(crate) struct Fields<'a> {
    pub(crate) path: Option<&'a ObjectPath>,
    pub(crate) interface: Option<&'a str>,
    pub(crate) member: Option<&'a str>,
    pub(crate) error_name: Option<&'a str>,
    pub(crate) reply_serial: Option<Serial>,
    pub(crate) destination: Option<&'a str>,
    pub(crate) sender: Option<&'a str>,
    pub(crate) signature: Option<&'a Signature>,
}

/// Parse the header-field array of a native-endian message.
///
/// The region must start 8-byte aligned relative to the start of the
/// message. Unknown fields are skipped over by their signature.
pub(crate) fn parse_fields(region: &[u8]) -> Result<Fields<'_>> {
    let mut st = Body::from_raw_parts(
        crate::buf::Aligned::new(region),
        Endianness::NATIVE,
        Signature::EMPTY,
    );

    let mut fields = Fields::default();

    while !st.is_empty() {
        // NB: Field structs are aligned to 8 bytes.
        st.align::<u64>()?;
        let field = st.load::<HeaderField>()?;
        let sig = st.read::<Signature>()?;

        match (field, sig.as_bytes()) {
            (HeaderField::PATH, b"o") => {
                fields.path = Some(st.read::<ObjectPath>()?);
            }
            (HeaderField::INTERFACE, b"s") => {
                fields.interface = Some(st.read::<str>()?);
            }
            (HeaderField::MEMBER, b"s") => {
                fields.member = Some(st.read::<str>()?);
            }
            (HeaderField::ERROR_NAME, b"s") => {
                fields.error_name = Some(st.read::<str>()?);
            }
            (HeaderField::REPLY_SERIAL, b"u") => {
                let number = st.load::<u32>()?;
                let number = NonZeroU32::new(number).ok_or(ErrorKind::ZeroReplySerial)?;
                fields.reply_serial = Some(Serial::new(number));
            }
            (HeaderField::DESTINATION, b"s") => {
                fields.destination = Some(st.read::<str>()?);
            }
            (HeaderField::SENDER, b"s") => {
                fields.sender = Some(st.read::<str>()?);
            }
            (HeaderField::SIGNATURE, b"g") => {
                fields.signature = Some(st.read::<Signature>()?);
            }
            (_, _) => {
                signature::skip(sig, &mut st)?;
            }
        }
    }

    Ok(fields)
}

/// Borrow a complete native-endian message from raw bytes.
///
/// Required header fields are enforced depending on the message kind.
pub(crate) fn read_message(data: &[u8]) -> Result<Message<'_>> {
    let mut read = crate::buf::Aligned::new(data);
    let header = read.load::<Header>()?;
    let fields_len = read.load::<u32>()? as usize;

    let serial = Serial::new(NonZeroU32::new(header.serial).ok_or(ErrorKind::ZeroSerial)?);

    let fields_start = size_of::<Header>() + size_of::<u32>();

    let Some(region) = data.get(fields_start..fields_start + fields_len) else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    let fields = parse_fields(region)?;

    let body_start = fields_start + fields_len + padding_to_align(8, fields_len);
    let body_len = header.body_length as usize;

    let Some(body) = data.get(body_start..body_start + body_len) else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    let signature = fields.signature.unwrap_or(Signature::EMPTY);

    let body = Body::from_raw_parts(
        crate::buf::Aligned::new(body),
        Endianness::NATIVE,
        signature,
    );

    let kind = match header.message_type {
        MessageType::METHOD_CALL => {
            let Some(path) = fields.path else {
                return Err(Error::new(ErrorKind::MissingPath));
            };

            let Some(member) = fields.member else {
                return Err(Error::new(ErrorKind::MissingMember));
            };

            MessageKind::MethodCall { path, member }
        }
        MessageType::METHOD_RETURN => {
            let Some(reply_serial) = fields.reply_serial else {
                return Err(Error::new(ErrorKind::MissingReplySerial));
            };

            MessageKind::MethodReturn { reply_serial }
        }
        MessageType::ERROR => {
            let Some(error_name) = fields.error_name else {
                return Err(Error::new(ErrorKind::MissingErrorName));
            };

            let Some(reply_serial) = fields.reply_serial else {
                return Err(Error::new(ErrorKind::MissingReplySerial));
            };

            MessageKind::Error {
                error_name,
                reply_serial,
            }
        }
        MessageType::SIGNAL => {
            let Some(path) = fields.path else {
                return Err(Error::new(ErrorKind::MissingPath));
            };

            let Some(member) = fields.member else {
                return Err(Error::new(ErrorKind::MissingMember));
            };

            if fields.interface.is_none() {
                return Err(Error::new(ErrorKind::MissingInterface));
            }

            MessageKind::Signal { path, member }
        }
        _ => return Err(Error::new(ErrorKind::InvalidProtocol)),
    };

    Ok(Message {
        kind,
        serial,
        flags: header.flags,
        interface: fields.interface,
        destination: fields.destination,
        sender: fields.sender,
        body,
    })
}
