use crate::proto::MessageType;
use crate::{BodyBuf, Message, MessageBuf, MatchRule, ObjectPath, SendBuf};

fn signal<'a>(send: &mut SendBuf, body: &'a BodyBuf) -> MessageBuf {
    const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example");

    send.signal(PATH, "Changed")
        .with_interface("com.example.Foo")
        .with_sender(":1.7")
        .with_body(body)
        .to_owned()
}

#[test]
fn parse_round_trips() {
    let strings = [
        "type='signal'",
        "type='method_call',sender=':1.5'",
        "interface='com.example.Foo',member='Changed',path='/com/example'",
        "destination=':1.9',arg0='x',arg5='y'",
        "arg63='x'",
    ];

    for string in strings {
        let rule = MatchRule::parse(string).unwrap();
        assert_eq!(rule.to_string(), string, "{string}");
        assert_eq!(MatchRule::parse(&rule.to_string()).unwrap(), rule);
    }
}

#[test]
fn parse_is_order_invariant() {
    let a = MatchRule::parse("type='signal',member='Changed'").unwrap();
    let b = MatchRule::parse("member='Changed',type='signal'").unwrap();
    assert_eq!(a, b);
}

#[test]
fn parse_rejections() {
    assert!(MatchRule::parse("unknown='x'").is_err());
    assert!(MatchRule::parse("type=signal").is_err());
    assert!(MatchRule::parse("type='signal").is_err());
    assert!(MatchRule::parse("type='signal'x").is_err());
    assert!(MatchRule::parse("type='oops'").is_err());
    assert!(MatchRule::parse("arg64='x'").is_err());
    assert!(MatchRule::parse("arg='x'").is_err());
    assert!(MatchRule::parse("arg007='x'").is_err());
}

#[test]
fn arg63_parses() {
    let rule = MatchRule::parse("arg63='x'").unwrap();
    assert_eq!(rule.args.len(), 64);
}

#[test]
fn empty_value_allowed() {
    let rule = MatchRule::parse("sender=''").unwrap();
    assert_eq!(rule.sender.as_deref(), Some(""));
}

#[test]
fn matches_fields() {
    let mut send = SendBuf::new();
    let body = BodyBuf::new();
    let message = signal(&mut send, &body);
    let message = message.borrow();

    assert!(MatchRule::new().matches(&message));
    assert!(MatchRule::new()
        .with_type(MessageType::SIGNAL)
        .with_interface("com.example.Foo")
        .with_member("Changed")
        .with_path("/com/example")
        .with_sender(":1.7")
        .matches(&message));

    assert!(!MatchRule::new()
        .with_type(MessageType::METHOD_CALL)
        .matches(&message));
    assert!(!MatchRule::new().with_member("Other").matches(&message));
    assert!(!MatchRule::new().with_destination(":1.2").matches(&message));
}

#[test]
fn matches_string_arguments() {
    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();
    body.store("first").unwrap();
    body.store(42u32).unwrap();
    body.store("third").unwrap();

    let message = signal(&mut send, &body);
    let message = message.borrow();

    assert!(MatchRule::new().with_arg(0, "first").matches(&message));
    assert!(MatchRule::new().with_arg(2, "third").matches(&message));
    assert!(!MatchRule::new().with_arg(0, "other").matches(&message));

    // A non-string argument never matches.
    assert!(!MatchRule::new().with_arg(1, "42").matches(&message));

    // Reading past the end of the argument vector never matches.
    assert!(!MatchRule::new().with_arg(3, "x").matches(&message));
}

#[test]
fn matches_skips_over_compound_arguments() {
    let mut send = SendBuf::new();
    let mut body = BodyBuf::new();

    let mut array = body.store_array::<u32>().unwrap();
    array.store(1);
    array.store(2);
    array.finish();
    body.store("tail").unwrap();

    let message = signal(&mut send, &body);
    let message = message.borrow();

    assert!(MatchRule::new().with_arg(1, "tail").matches(&message));
}
