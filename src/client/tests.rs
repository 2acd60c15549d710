use std::sync::{Arc, Mutex};

use crate::org_freedesktop_dbus as fdo;
use crate::ObjectPathBuf;
use crate::proto::{Flags, MessageType};
use crate::{
    BodyBuf, Client, Interface, MatchRule, Message, MessageBuf, MessageKind, ObjectPath, RecvBuf,
    ReplyOutcome, SendBuf, Signature,
};

/// Collects everything the client writes to its transport.
fn sink_transport(client: &Client) -> Arc<Mutex<Vec<u8>>> {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&sink);

    client.set_transport(Box::new(move |bytes| {
        out.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }));

    sink
}

/// Split every complete message out of a byte sink.
fn drain_messages(sink: &Arc<Mutex<Vec<u8>>>) -> Vec<MessageBuf> {
    let bytes = core::mem::take(&mut *sink.lock().unwrap());
    let mut recv = RecvBuf::new();
    recv.push(&bytes);

    let mut messages = Vec::new();

    while let Some(message) = recv.take_message().unwrap() {
        messages.push(message);
    }

    messages
}

/// Serialize a message so it can be fed to `Client::parse`.
fn serialize(message: Message<'_>) -> Vec<u8> {
    let mut send = SendBuf::new();
    send.write_message(message).unwrap();
    send.get().to_vec()
}

#[test]
fn connect_latches_unique_name() {
    let client = Client::new();
    let sink = sink_transport(&client);

    client.connect().unwrap();

    let sent = drain_messages(&sink);
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].kind(),
        MessageKind::MethodCall { member, .. } if member == "Hello"
    ));

    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store(":1.1").unwrap();

    let reply = sent[0]
        .borrow()
        .method_return(send.next_serial())
        .with_sender(fdo::DESTINATION)
        .with_body(&body);

    client.parse(&serialize(reply)).unwrap();
    assert!(client.unique_name().is_none());

    client.dispatch().unwrap();
    assert_eq!(client.unique_name().as_deref(), Some(":1.1"));
}

#[test]
fn method_dispatch_replies() {
    let client = Client::new();
    let sink = sink_transport(&client);

    let mut builder = Interface::build("com.example.Calc").unwrap();
    builder
        .method("Add", |call| {
            let a = call.args().load::<u32>().map_err(crate::ErrorReply::from)?;
            let b = call.args().load::<u32>().map_err(crate::ErrorReply::from)?;

            if let Some(reply) = call.reply() {
                reply.store(a + b)?;
            }

            Ok(())
        })
        .unwrap()
        .args(Signature::new_const(b"uu"))
        .returns(Signature::UINT32);

    let path = ObjectPath::new("/com/example").unwrap();
    client.bind(path, Arc::new(builder.finish())).unwrap();

    let mut send = SendBuf::new();
    let mut args = BodyBuf::new();
    args.store(2u32).unwrap();
    args.store(3u32).unwrap();

    let call = send
        .method_call(path, "Add")
        .with_interface("com.example.Calc")
        .with_sender(":1.9")
        .with_body(&args);
    let call_serial = call.serial();

    client.parse(&serialize(call)).unwrap();
    client.dispatch().unwrap();

    let sent = drain_messages(&sink);
    assert_eq!(sent.len(), 1);

    let reply = sent[0].borrow();
    assert!(matches!(
        reply.kind(),
        MessageKind::MethodReturn { reply_serial } if reply_serial == call_serial
    ));
    assert_eq!(reply.destination(), Some(":1.9"));

    let mut body = reply.body();
    assert_eq!(body.load::<u32>().unwrap(), 5);
}

#[test]
fn unknown_method_becomes_error_reply() {
    let client = Client::new();
    let sink = sink_transport(&client);

    let mut builder = Interface::build("com.example.Calc").unwrap();
    builder.method("Add", |_| Ok(())).unwrap();

    let path = ObjectPath::new("/com/example").unwrap();
    client.bind(path, Arc::new(builder.finish())).unwrap();

    let mut send = SendBuf::new();
    let call = send.method_call(path, "Nope").with_sender(":1.9");

    client.parse(&serialize(call)).unwrap();
    client.dispatch().unwrap();

    let sent = drain_messages(&sink);
    assert!(matches!(
        sent[0].kind(),
        MessageKind::Error { error_name, .. } if error_name == fdo::ERR_UNKNOWN_METHOD
    ));
}

#[test]
fn no_reply_expected_suppresses_reply() {
    let client = Client::new();
    let sink = sink_transport(&client);

    let mut builder = Interface::build("com.example.Calc").unwrap();
    builder.method("Add", |_| Ok(())).unwrap();

    let path = ObjectPath::new("/com/example").unwrap();
    client.bind(path, Arc::new(builder.finish())).unwrap();

    let mut send = SendBuf::new();
    let call = send
        .method_call(path, "Add")
        .with_sender(":1.9")
        .with_flags(Flags::NO_REPLY_EXPECTED);

    client.parse(&serialize(call)).unwrap();
    client.dispatch().unwrap();

    assert!(drain_messages(&sink).is_empty());
}

#[test]
fn matches_run_in_insertion_order_and_cancel() {
    let client = Client::new();
    let _sink = sink_transport(&client);

    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&seen);
    client
        .add_match(
            MatchRule::new().with_type(MessageType::SIGNAL),
            Box::new(move |_| {
                first.lock().unwrap().push("first");
                false
            }),
        )
        .unwrap();

    let second = Arc::clone(&seen);
    client
        .add_match(
            MatchRule::new().with_member("Changed"),
            Box::new(move |_| {
                second.lock().unwrap().push("second");
                true
            }),
        )
        .unwrap();

    let third = Arc::clone(&seen);
    client
        .add_match(
            MatchRule::new(),
            Box::new(move |_| {
                third.lock().unwrap().push("third");
                false
            }),
        )
        .unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/com/example").unwrap();
    let signal = send
        .signal(path, "Changed")
        .with_interface("com.example.Foo");

    client.parse(&serialize(signal)).unwrap();
    client.dispatch().unwrap();

    // The second filter cancelled dispatch, so the third never ran.
    assert_eq!(&*seen.lock().unwrap(), &["first", "second"]);
}

#[test]
fn filter_may_answer_method_calls() {
    let client = Client::new();
    let sink = sink_transport(&client);

    client
        .add_match(
            MatchRule::new().with_member("Probe"),
            Box::new(|matched| {
                if let Some(reply) = matched.reply() {
                    reply.store("intercepted").unwrap();
                }

                true
            }),
        )
        .unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/anywhere").unwrap();
    let call = send.method_call(path, "Probe").with_sender(":1.4");
    let call_serial = call.serial();

    client.parse(&serialize(call)).unwrap();
    client.dispatch().unwrap();

    let sent = drain_messages(&sink);
    let reply = sent[0].borrow();

    assert!(matches!(
        reply.kind(),
        MessageKind::MethodReturn { reply_serial } if reply_serial == call_serial
    ));

    let mut body = reply.body();
    assert_eq!(body.read::<str>().unwrap(), "intercepted");
}

#[test]
fn reply_record_wins_over_filters() {
    let client = Client::new();
    let _sink = sink_transport(&client);

    let filtered = Arc::new(Mutex::new(0));
    let observed = Arc::clone(&filtered);

    client
        .add_match(
            MatchRule::new(),
            Box::new(move |_| {
                *observed.lock().unwrap() += 1;
                false
            }),
        )
        .unwrap();

    let fired = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&fired);

    let serial = client.next_serial();
    client
        .expect_reply(serial, None, Box::new(move |_| *flag.lock().unwrap() = true))
        .unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/x").unwrap();
    let call = send.method_call(path, "M").with_serial(serial);
    let reply = call.method_return(send.next_serial());

    client.parse(&serialize(reply)).unwrap();
    client.dispatch().unwrap();

    assert!(*fired.lock().unwrap());
    assert_eq!(*filtered.lock().unwrap(), 0);
}

#[test]
fn reply_fires_at_most_once() {
    let client = Client::new();
    let _sink = sink_transport(&client);

    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    let serial = client.next_serial();
    client
        .expect_reply(
            serial,
            None,
            Box::new(move |_| *seen.lock().unwrap() += 1),
        )
        .unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/x").unwrap();
    let call = send.method_call(path, "M").with_serial(serial);

    let reply = serialize(call.method_return(send.next_serial()));
    client.parse(&reply).unwrap();

    let reply = serialize(call.method_return(send.next_serial()));
    client.parse(&reply).unwrap();

    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn reply_validates_sender() {
    let client = Client::new();
    let _sink = sink_transport(&client);

    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    let serial = client.next_serial();
    client
        .expect_reply(
            serial,
            Some(":1.5"),
            Box::new(move |_| *seen.lock().unwrap() += 1),
        )
        .unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/x").unwrap();
    let call = send.method_call(path, "M").with_serial(serial);

    // A reply from the wrong unique name is ignored and does not consume
    // the record.
    let reply = serialize(call.method_return(send.next_serial()).with_sender(":1.6"));
    client.parse(&reply).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 0);

    let reply = serialize(call.method_return(send.next_serial()).with_sender(":1.5"));
    client.parse(&reply).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn tracked_service_pins_resolution_at_registration() {
    let client = Client::new();
    let sink = sink_transport(&client);

    let outcome = Arc::new(Mutex::new(None::<String>));
    let seen = Arc::clone(&outcome);

    // Call a well-known name; the client subscribes to owner changes and
    // issues GetNameOwner.
    let serial = client.next_serial();
    let path = ObjectPath::new("/x").unwrap();
    let call = Message::method_call(path, "M", serial).with_destination("com.x");

    client
        .call(
            call,
            Box::new(move |outcome| {
                if let ReplyOutcome::Return(mut body) = outcome {
                    *seen.lock().unwrap() = Some(body.read::<str>().unwrap().to_owned());
                }
            }),
        )
        .unwrap();

    let sent = drain_messages(&sink);
    let members = sent
        .iter()
        .filter_map(|m| match m.kind() {
            MessageKind::MethodCall { member, .. } => Some(member.to_owned()),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(members, ["AddMatch", "GetNameOwner", "M"]);

    let get_name_owner = sent
        .iter()
        .find(|m| matches!(m.kind(), MessageKind::MethodCall { member, .. } if member == "GetNameOwner"))
        .unwrap();

    // The owner resolves to :1.A.
    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store(":1.A").unwrap();

    let resolved = get_name_owner
        .borrow()
        .method_return(send.next_serial())
        .with_sender(fdo::DESTINATION)
        .with_body(&body);

    client.parse(&serialize(resolved)).unwrap();
    client.dispatch_all().unwrap();

    // Ownership then moves to :1.B.
    let mut body = BodyBuf::new();
    body.store("com.x").unwrap();
    body.store(":1.A").unwrap();
    body.store(":1.B").unwrap();

    let changed = send
        .signal(fdo::PATH, fdo::NAME_OWNER_CHANGED)
        .with_interface(fdo::INTERFACE)
        .with_sender(fdo::DESTINATION)
        .with_body(&body);

    client.parse(&serialize(changed)).unwrap();
    client.dispatch_all().unwrap();

    // The pending reply still arrives from :1.A, the owner resolved at
    // registration time, and must fire.
    let mut body = BodyBuf::new();
    body.store("answer").unwrap();

    let call = Message::method_call(path, "M", serial);
    let reply = call
        .method_return(send.next_serial())
        .with_sender(":1.A")
        .with_body(&body);

    client.parse(&serialize(reply)).unwrap();
    client.dispatch_all().unwrap();

    assert_eq!(outcome.lock().unwrap().as_deref(), Some("answer"));
}

#[test]
fn match_with_well_known_sender_tracks_owner() {
    let client = Client::new();
    let sink = sink_transport(&client);

    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    client
        .add_match(
            MatchRule::new().with_member("Tick").with_sender("com.x"),
            Box::new(move |_| {
                *seen.lock().unwrap() += 1;
                false
            }),
        )
        .unwrap();

    // Registering the filter tracked the name.
    let sent = drain_messages(&sink);

    let get_name_owner = sent
        .iter()
        .find(|m| matches!(m.kind(), MessageKind::MethodCall { member, .. } if member == "GetNameOwner"))
        .expect("owner lookup");

    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store(":1.A").unwrap();

    let resolved = get_name_owner
        .borrow()
        .method_return(send.next_serial())
        .with_sender(fdo::DESTINATION)
        .with_body(&body);

    client.parse(&serialize(resolved)).unwrap();
    client.dispatch_all().unwrap();

    let path = ObjectPath::new("/x").unwrap();

    // A signal from a different unique name does not fire the filter.
    let signal = send
        .signal(path, "Tick")
        .with_interface("com.example.Foo")
        .with_sender(":1.B");
    client.parse(&serialize(signal)).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 0);

    // One from the resolved owner does.
    let signal = send
        .signal(path, "Tick")
        .with_interface("com.example.Foo")
        .with_sender(":1.A");
    client.parse(&serialize(signal)).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn parse_failure_poisons() {
    let client = Client::new();
    let _sink = sink_transport(&client);

    // An invalid endianness byte in the fixed header.
    let bogus = [b'x'; 16];
    assert!(client.parse(&bogus).is_err());
    assert!(client.parse(&[]).is_err());
    assert!(client.dispatch().is_err());
}

#[test]
fn proxied_send_applies_on_pump() {
    let client = Client::new();
    let sink = sink_transport(&client);
    let proxy = client.proxy();

    let handle = std::thread::spawn(move || {
        assert!(proxy.should_proxy());

        let path = ObjectPathBuf::new("/x").unwrap();
        let message = MessageBuf::signal(
            Box::from(path.as_object_path()),
            Box::from("Changed"),
            proxy.next_serial(),
        );

        proxy.send(message.with_interface("com.example.Foo")).unwrap();
    });

    handle.join().unwrap();

    // Nothing is written until the owner thread pumps.
    assert!(drain_messages(&sink).is_empty());

    client.dispatch().unwrap();

    let sent = drain_messages(&sink);
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].kind(),
        MessageKind::Signal { member, .. } if member == "Changed"
    ));
}

#[test]
fn state_reset_unregisters() {
    let client = Client::new();
    let _sink = sink_transport(&client);
    let proxy = client.proxy();

    let state = crate::State::new();
    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    state.add_match(
        &proxy,
        MatchRule::new(),
        Box::new(move |_| {
            *seen.lock().unwrap() += 1;
            false
        }),
    );

    // Pump to apply the registration.
    client.dispatch().unwrap();

    let mut send = SendBuf::new();
    let path = ObjectPath::new("/x").unwrap();
    let signal = send.signal(path, "S").with_interface("com.example.Foo");

    client.parse(&serialize(signal.clone())).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 1);

    state.reset();
    client.dispatch().unwrap();

    client.parse(&serialize(signal)).unwrap();
    client.dispatch_all().unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}
