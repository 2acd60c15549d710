use crate::buf::{MAX_ARRAY_LENGTH, MAX_MESSAGE_LENGTH};
use crate::proto::Endianness;
use crate::{BodyBuf, MessageKind, ObjectPath, RecvBuf, SendBuf, Signature};

use super::frame_size;

#[test]
fn round_trip_method_call() {
    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store(42u32).unwrap();
    body.store("hello").unwrap();

    let path = ObjectPath::new("/com/example").unwrap();
    let m = send
        .method_call(path, "Frobate")
        .with_interface("com.example.Foo")
        .with_destination("com.example")
        .with_sender(":1.2")
        .with_body(&body);
    let serial = m.serial();

    send.write_message(m).unwrap();

    let mut recv = RecvBuf::new();
    recv.push(send.get());

    let message = recv.take_message().unwrap().unwrap();
    assert!(recv.take_message().unwrap().is_none());

    let message = message.borrow();
    assert_eq!(message.serial(), serial);
    assert!(matches!(
        message.kind(),
        MessageKind::MethodCall { path, member } if path == "/com/example" && member == "Frobate"
    ));
    assert_eq!(message.interface(), Some("com.example.Foo"));
    assert_eq!(message.destination(), Some("com.example"));
    assert_eq!(message.sender(), Some(":1.2"));
    assert_eq!(message.signature(), "us");

    let mut body = message.body();
    assert_eq!(body.load::<u32>().unwrap(), 42);
    assert_eq!(body.read::<str>().unwrap(), "hello");
}

#[test]
fn messages_split_from_a_joined_stream() {
    let mut send = SendBuf::new();
    let path = ObjectPath::new("/a").unwrap();

    let first = send.method_call(path, "One");
    send.write_message(first).unwrap();
    let second = send.method_call(path, "Two");
    send.write_message(second).unwrap();

    let bytes = send.get().to_vec();

    // Feed the stream one byte at a time.
    let mut recv = RecvBuf::new();
    let mut members = Vec::new();

    for byte in bytes {
        recv.push(&[byte]);

        while let Some(message) = recv.take_message().unwrap() {
            if let MessageKind::MethodCall { member, .. } = message.kind() {
                members.push(member.to_owned());
            }
        }
    }

    assert_eq!(members, ["One", "Two"]);
}

#[test]
fn signal_requires_interface() {
    let mut send = SendBuf::new();
    let path = ObjectPath::new("/a").unwrap();

    let bare = send.signal(path, "Changed");
    assert!(send.write_message(bare).is_err());

    let full = send.signal(path, "Changed").with_interface("com.example.Foo");
    assert!(send.write_message(full).is_ok());
}

fn push_foreign_u32(out: &mut Vec<u8>, value: u32) {
    let mut bytes = value.to_ne_bytes();
    bytes.reverse();
    out.extend_from_slice(&bytes);
}

#[test]
fn foreign_endian_is_normalized_once() {
    let foreign = match Endianness::NATIVE {
        Endianness::LITTLE => Endianness::BIG,
        _ => Endianness::LITTLE,
    };

    // A method return with reply serial 9, signature "u" and a single
    // u32 argument, in the foreign byte order.
    let mut raw = Vec::new();
    raw.extend_from_slice(&[foreign.0, 2, 0, 1]);
    push_foreign_u32(&mut raw, 4); // body length
    push_foreign_u32(&mut raw, 5); // serial
    push_foreign_u32(&mut raw, 15); // header-field array length

    // REPLY_SERIAL (u) 9
    raw.extend_from_slice(&[5, 1, b'u', 0]);
    push_foreign_u32(&mut raw, 9);
    // SIGNATURE (g) "u"
    raw.extend_from_slice(&[8, 1, b'g', 0, 1, b'u', 0]);
    // Padding to the body.
    raw.push(0);
    // Body.
    push_foreign_u32(&mut raw, 42);

    let mut recv = RecvBuf::new();
    recv.push(&raw);

    let message = recv.take_message().unwrap().unwrap();
    let message = message.borrow();

    assert!(matches!(
        message.kind(),
        MessageKind::MethodReturn { reply_serial } if reply_serial.get() == 9
    ));
    assert_eq!(message.serial().get(), 5);
    assert_eq!(message.signature(), Signature::UINT32);

    let mut body = message.body();
    assert_eq!(body.load::<u32>().unwrap(), 42);
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_ne_bytes());
}

#[test]
fn unknown_header_field_is_skipped() {
    // A method return carrying an unknown header field of type a{sv}
    // before the known fields; the known fields must be read correctly
    // regardless of the order.
    let mut raw = Vec::new();
    raw.extend_from_slice(&[Endianness::NATIVE.0, 2, 0, 1]);
    push_u32(&mut raw, 4); // body length
    push_u32(&mut raw, 5); // serial
    push_u32(&mut raw, 47); // header-field array length

    // Unknown field 200 of type a{sv} with one entry {"k": u32 7}.
    raw.extend_from_slice(&[200, 5, b'a', b'{', b's', b'v', b'}', 0]);
    push_u32(&mut raw, 16); // dict byte length
    raw.extend_from_slice(&[0, 0, 0, 0]); // entry alignment
    push_u32(&mut raw, 1); // key length
    raw.extend_from_slice(&[b'k', 0]);
    raw.extend_from_slice(&[1, b'u', 0]); // variant signature
    raw.extend_from_slice(&[0, 0, 0]); // value alignment
    push_u32(&mut raw, 7);

    // REPLY_SERIAL (u) 9
    raw.extend_from_slice(&[5, 1, b'u', 0]);
    push_u32(&mut raw, 9);
    // SIGNATURE (g) "u"
    raw.extend_from_slice(&[8, 1, b'g', 0, 1, b'u', 0]);
    // Padding to the body.
    raw.push(0);
    // Body.
    push_u32(&mut raw, 42);

    let mut recv = RecvBuf::new();
    recv.push(&raw);

    let message = recv.take_message().unwrap().unwrap();
    let message = message.borrow();

    assert!(matches!(
        message.kind(),
        MessageKind::MethodReturn { reply_serial } if reply_serial.get() == 9
    ));

    let mut body = message.body();
    assert_eq!(body.load::<u32>().unwrap(), 42);
}

#[test]
fn message_size_boundaries() {
    let mut header = Vec::new();
    header.extend_from_slice(&[Endianness::NATIVE.0, 1, 0, 1]);
    push_u32(&mut header, (MAX_MESSAGE_LENGTH - 16) as u32);
    push_u32(&mut header, 1);
    push_u32(&mut header, 0);

    // Exactly the maximum message size frames.
    assert_eq!(frame_size(&header).unwrap(), Some(MAX_MESSAGE_LENGTH));

    // One byte over fails.
    let mut over = header.clone();
    over[4..8].copy_from_slice(&((MAX_MESSAGE_LENGTH - 16 + 1) as u32).to_ne_bytes());
    assert!(frame_size(&over).is_err());

    // An oversize header-field array fails as well.
    let mut fields = header.clone();
    fields[4..8].copy_from_slice(&4u32.to_ne_bytes());
    fields[12..16].copy_from_slice(&(MAX_ARRAY_LENGTH + 1).to_ne_bytes());
    assert!(frame_size(&fields).is_err());

    // Garbage in the endianness byte fails.
    let mut bogus = header;
    bogus[0] = b'x';
    assert!(frame_size(&bogus).is_err());
}

#[test]
fn header_padding_is_zeroed() {
    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store(1u8).unwrap();

    let path = ObjectPath::new("/a").unwrap();
    let m = send.method_call(path, "M").with_body(&body);
    send.write_message(m).unwrap();

    let raw = send.get();
    let fields_len = u32::from_ne_bytes([raw[12], raw[13], raw[14], raw[15]]) as usize;
    let fields_end = 16 + fields_len;
    let body_start = fields_end + crate::buf::padding_to_align(8, fields_end);

    assert!(raw[fields_end..body_start].iter().all(|&b| b == 0));
    assert_eq!(raw[body_start], 1);
}
