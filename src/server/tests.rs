use std::sync::{Arc, Mutex};

use crate::org_freedesktop_dbus as fdo;
use crate::org_freedesktop_dbus::{NameFlag, NameReply};
use crate::proto::MessageType;
use crate::{
    BodyBuf, MatchRule, Message, MessageBuf, MessageKind, ObjectPath, RecvBuf, SendBuf, Serial,
    Server,
};

use super::RemoteId;

/// One fake remote: its id and the sink its transport writes to.
struct TestRemote {
    id: RemoteId,
    sink: Arc<Mutex<Vec<u8>>>,
    send: SendBuf,
}

impl TestRemote {
    /// Connect and authenticate a remote, clearing the SASL chatter from
    /// the sink.
    fn connect(server: &mut Server) -> Self {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&sink);

        let id = server.add_remote(Box::new(move |bytes| {
            out.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }));

        server.recv(id, b"\0AUTH EXTERNAL 31303030\r\n").unwrap();
        assert!(sink.lock().unwrap().starts_with(b"OK "));
        sink.lock().unwrap().clear();

        server.recv(id, b"BEGIN\r\n").unwrap();

        Self {
            id,
            sink,
            send: SendBuf::new(),
        }
    }

    /// Complete the `Hello` exchange, returning the assigned unique name.
    fn hello(&mut self, server: &mut Server) -> String {
        let m = self
            .send
            .method_call(fdo::PATH, "Hello")
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION);
        let serial = m.serial();

        self.write(server, m);

        let replies = self.drain();
        let reply = replies
            .iter()
            .find(|m| {
                matches!(m.kind(), MessageKind::MethodReturn { reply_serial } if reply_serial == serial)
            })
            .expect("hello reply");

        let mut body = reply.body();
        body.read::<str>().unwrap().to_owned()
    }

    /// Serialize a message and feed it to the server as this remote.
    fn write(&mut self, server: &mut Server, message: Message<'_>) {
        self.send.write_message(message).unwrap();
        let bytes = self.send.get().to_vec();
        self.send.advance(bytes.len());
        server.recv(self.id, &bytes).unwrap();
    }

    /// Split every complete message out of the sink.
    fn drain(&self) -> Vec<MessageBuf> {
        let bytes = core::mem::take(&mut *self.sink.lock().unwrap());
        let mut recv = RecvBuf::new();
        recv.push(&bytes);

        let mut messages = Vec::new();

        while let Some(message) = recv.take_message().unwrap() {
            messages.push(message);
        }

        messages
    }

    fn next_serial(&mut self) -> Serial {
        self.send.next_serial()
    }

    /// Request a name, returning the reply code and everything else the
    /// remote received in the same exchange.
    fn request_name(
        &mut self,
        server: &mut Server,
        name: &str,
        flags: NameFlag,
    ) -> (NameReply, Vec<MessageBuf>) {
        let mut body = BodyBuf::new();
        body.store(name).unwrap();
        body.store(flags).unwrap();

        let m = self
            .send
            .method_call(fdo::PATH, "RequestName")
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION)
            .with_body(&body);
        let serial = m.serial();

        self.write(server, m);

        let mut received = self.drain();
        let at = received
            .iter()
            .position(|m| {
                matches!(m.kind(), MessageKind::MethodReturn { reply_serial } if reply_serial == serial)
            })
            .expect("request name reply");

        let reply = received.remove(at);
        let mut body = reply.body();
        (body.load::<NameReply>().unwrap(), received)
    }

    fn add_match(&mut self, server: &mut Server, rule: &MatchRule) {
        let mut body = BodyBuf::new();
        body.store(rule.to_string()).unwrap();

        let m = self
            .send
            .method_call(fdo::PATH, "AddMatch")
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION)
            .with_body(&body);

        self.write(server, m);
        self.drain();
    }
}

#[test]
fn hello_assigns_sequential_unique_names() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    assert_eq!(a.hello(&mut server), ":1.1");
    assert_eq!(server.unique_name(a.id), Some(":1.1"));

    let mut b = TestRemote::connect(&mut server);
    assert_eq!(b.hello(&mut server), ":1.2");
}

#[test]
fn first_call_must_be_hello() {
    let mut server = Server::new();
    let mut remote = TestRemote::connect(&mut server);

    let mut send = SendBuf::new();
    let m = send
        .method_call(fdo::PATH, "ListNames")
        .with_interface(fdo::INTERFACE)
        .with_destination(fdo::DESTINATION);
    send.write_message(m).unwrap();
    let bytes = send.get().to_vec();

    assert!(server.recv(remote.id, &bytes).is_err());

    // The remote is gone.
    assert_eq!(server.unique_name(remote.id), None);
    remote.drain();
}

#[test]
fn name_replacement_signals_in_order() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    let unique_a = a.hello(&mut server);

    let mut b = TestRemote::connect(&mut server);
    let unique_b = b.hello(&mut server);

    let mut observer = TestRemote::connect(&mut server);
    observer.hello(&mut server);
    observer.add_match(
        &mut server,
        &MatchRule::new()
            .with_type(MessageType::SIGNAL)
            .with_member(fdo::NAME_OWNER_CHANGED),
    );

    let (reply, signals) = a.request_name(&mut server, "com.x", NameFlag::ALLOW_REPLACEMENT);
    assert_eq!(reply, NameReply::PRIMARY_OWNER);
    assert!(signals.iter().any(|m| matches!(
        m.kind(),
        MessageKind::Signal { member, .. } if member == fdo::NAME_ACQUIRED
    )));
    observer.drain();

    let (reply, acquired) = b.request_name(&mut server, "com.x", NameFlag::REPLACE_EXISTING);
    assert_eq!(reply, NameReply::PRIMARY_OWNER);

    // A loses the name.
    let lost = a.drain();
    assert_eq!(lost.len(), 1);
    assert!(matches!(
        lost[0].kind(),
        MessageKind::Signal { member, .. } if member == fdo::NAME_LOST
    ));

    let mut body = lost[0].body();
    assert_eq!(body.read::<str>().unwrap(), "com.x");

    // B acquired it.
    assert!(acquired.iter().any(|m| matches!(
        m.kind(),
        MessageKind::Signal { member, .. } if member == fdo::NAME_ACQUIRED
    )));

    // Matchers observe the transition with both unique names.
    let changed = observer.drain();
    assert_eq!(changed.len(), 1);

    let mut body = changed[0].body();
    assert_eq!(body.read::<str>().unwrap(), "com.x");
    assert_eq!(body.read::<str>().unwrap(), unique_a);
    assert_eq!(body.read::<str>().unwrap(), unique_b);
}

#[test]
fn sender_is_rewritten_on_forward() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    let unique_a = a.hello(&mut server);

    let mut observer = TestRemote::connect(&mut server);
    observer.hello(&mut server);
    observer.add_match(
        &mut server,
        &MatchRule::new().with_member("Changed"),
    );

    let path = ObjectPath::new("/com/example").unwrap();
    let mut body = BodyBuf::new();
    body.store("payload").unwrap();

    // The remote lies about its sender; the server overwrites it.
    let serial = a.next_serial();
    let signal = Message::signal(path, "Changed", serial)
        .with_interface("com.example.Foo")
        .with_sender(":1.99")
        .with_body(&body);

    a.write(&mut server, signal);

    let seen = observer.drain();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sender(), Some(&*unique_a));
    assert_eq!(seen[0].interface(), Some("com.example.Foo"));

    let mut body = seen[0].body();
    assert_eq!(body.read::<str>().unwrap(), "payload");
}

#[test]
fn directed_messages_reach_only_the_owner() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    a.hello(&mut server);

    let mut b = TestRemote::connect(&mut server);
    let unique_b = b.hello(&mut server);
    let (reply, _) = b.request_name(&mut server, "com.x", NameFlag::default());
    assert_eq!(reply, NameReply::PRIMARY_OWNER);

    let mut bystander = TestRemote::connect(&mut server);
    bystander.hello(&mut server);

    let path = ObjectPath::new("/svc").unwrap();
    let serial = a.next_serial();
    let call = Message::method_call(path, "Work", serial).with_destination("com.x");
    a.write(&mut server, call);

    let received = b.drain();
    assert_eq!(received.len(), 1);
    assert!(matches!(
        received[0].kind(),
        MessageKind::MethodCall { member, .. } if member == "Work"
    ));

    assert!(bystander.drain().is_empty());
    assert!(a.drain().is_empty());

    // The unique name works as a destination as well.
    let serial = a.next_serial();
    let call = Message::method_call(path, "More", serial).with_destination(&unique_b);
    a.write(&mut server, call);

    assert_eq!(b.drain().len(), 1);
}

#[test]
fn unknown_destination_is_an_error() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    a.hello(&mut server);

    let path = ObjectPath::new("/svc").unwrap();
    let serial = a.next_serial();
    let call = Message::method_call(path, "Work", serial).with_destination("com.nobody");
    a.write(&mut server, call);

    let replies = a.drain();
    assert_eq!(replies.len(), 1);
    assert!(matches!(
        replies[0].kind(),
        MessageKind::Error { error_name, .. } if error_name == fdo::ERR_INVALID_DESTINATION
    ));
}

#[test]
fn disconnect_releases_names() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    a.hello(&mut server);
    a.request_name(&mut server, "com.x", NameFlag::default());

    let mut b = TestRemote::connect(&mut server);
    let unique_b = b.hello(&mut server);
    b.request_name(&mut server, "com.x", NameFlag::default());

    let mut observer = TestRemote::connect(&mut server);
    observer.hello(&mut server);
    observer.add_match(
        &mut server,
        &MatchRule::new()
            .with_type(MessageType::SIGNAL)
            .with_member(fdo::NAME_OWNER_CHANGED),
    );

    server.disconnect(a.id);

    // B is promoted to owner.
    let acquired = b.drain();
    assert!(acquired.iter().any(|m| matches!(
        m.kind(),
        MessageKind::Signal { member, .. } if member == fdo::NAME_ACQUIRED
    )));

    // The observer sees a transition for both the well-known name and
    // the disconnected unique name; pick out the former.
    let drained = observer.drain();
    let changed = drained
        .iter()
        .filter(|m| {
            matches!(
                m.kind(),
                MessageKind::Signal { member, .. } if member == fdo::NAME_OWNER_CHANGED
            )
        })
        .map(|m| {
            let mut body = m.body();
            (
                body.read::<str>().unwrap().to_owned(),
                body.read::<str>().unwrap().to_owned(),
                body.read::<str>().unwrap().to_owned(),
            )
        })
        .collect::<Vec<_>>();

    let com_x = changed
        .iter()
        .find(|(name, _, _)| name == "com.x")
        .expect("transition for com.x");

    assert_eq!(com_x.2, unique_b);
}

#[test]
fn get_name_owner_and_list_names() {
    let mut server = Server::new();

    let mut a = TestRemote::connect(&mut server);
    let unique_a = a.hello(&mut server);
    a.request_name(&mut server, "com.x", NameFlag::default());

    let mut body = BodyBuf::new();
    body.store("com.x").unwrap();

    let m = a
        .send
        .method_call(fdo::PATH, "GetNameOwner")
        .with_interface(fdo::INTERFACE)
        .with_destination(fdo::DESTINATION)
        .with_body(&body);
    let serial = m.serial();
    a.write(&mut server, m);

    let replies = a.drain();
    let reply = replies
        .iter()
        .find(|m| {
            matches!(m.kind(), MessageKind::MethodReturn { reply_serial } if reply_serial == serial)
        })
        .unwrap();

    let mut body = reply.body();
    assert_eq!(body.read::<str>().unwrap(), unique_a);

    let m = a
        .send
        .method_call(fdo::PATH, "ListNames")
        .with_interface(fdo::INTERFACE)
        .with_destination(fdo::DESTINATION);
    let serial = m.serial();
    a.write(&mut server, m);

    let replies = a.drain();
    let reply = replies
        .iter()
        .find(|m| {
            matches!(m.kind(), MessageKind::MethodReturn { reply_serial } if reply_serial == serial)
        })
        .unwrap();

    let mut body = reply.body();
    let mut names = Vec::new();
    let mut array = body.load_array::<crate::ty::Str>().unwrap();

    while let Some(name) = array.read().unwrap() {
        names.push(name.to_owned());
    }

    assert!(names.contains(&String::from(fdo::DESTINATION)));
    assert!(names.contains(&String::from("com.x")));
    assert!(names.contains(&unique_a));
}
