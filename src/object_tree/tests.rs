use std::sync::Arc;

use crate::{BodyBuf, Interface, ObjectPath, SendBuf, Signature};

use super::ObjectTree;

fn interface(name: &str) -> Arc<Interface> {
    let mut builder = Interface::build(name).unwrap();

    builder
        .method("M", |call| {
            let n = call.args().load::<i32>().map_err(crate::ErrorReply::from)?;

            if let Some(reply) = call.reply() {
                reply.store(format!("got {n}"))?;
            }

            Ok(())
        })
        .unwrap()
        .args(Signature::INT32)
        .arg_names(["n"])
        .returns(Signature::STRING)
        .return_names(["answer"]);

    Arc::new(builder.finish())
}

#[test]
fn bind_creates_ancestors() {
    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a/b").unwrap();

    tree.bind(path, interface("com.example.Foo")).unwrap();

    assert!(tree.contains(ObjectPath::ROOT));
    assert!(tree.contains(ObjectPath::new("/a").unwrap()));
    assert!(tree.contains(path));
}

#[test]
fn unbind_prunes_chain() {
    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a/b").unwrap();

    tree.bind(path, interface("com.example.Foo")).unwrap();
    tree.unbind(path, "com.example.Foo").unwrap();

    assert!(!tree.contains(path));
    assert!(!tree.contains(ObjectPath::new("/a").unwrap()));
    assert!(!tree.contains(ObjectPath::ROOT));
}

#[test]
fn unbind_keeps_pinned_nodes() {
    let tree = ObjectTree::new();
    let a = ObjectPath::new("/a").unwrap();
    let b = ObjectPath::new("/a/b").unwrap();

    tree.bind(a, interface("com.example.Foo")).unwrap();
    tree.bind(b, interface("com.example.Bar")).unwrap();

    tree.unbind(b, "com.example.Bar").unwrap();

    assert!(!tree.contains(b));
    assert!(tree.contains(a));
    assert!(tree.contains(ObjectPath::ROOT));
}

#[test]
fn duplicate_bind_rejected() {
    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();

    tree.bind(path, interface("com.example.Foo")).unwrap();
    assert!(tree.bind(path, interface("com.example.Foo")).is_err());
}

#[test]
fn dispatches_method() {
    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();
    tree.bind(path, interface("com.example.Foo")).unwrap();

    let mut send = SendBuf::new();
    let mut args = BodyBuf::new();
    args.store(42i32).unwrap();

    let message = send.method_call(path, "M").with_body(&args);

    let mut reply = BodyBuf::new();
    let deferred = tree.dispatch(&message, Some(&mut reply)).unwrap();
    assert!(!deferred);

    let mut body = reply.as_body();
    assert_eq!(body.read::<str>().unwrap(), "got 42");
}

#[test]
fn dispatch_interface_less_call() {
    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();
    tree.bind(path, interface("com.example.Foo")).unwrap();

    let mut send = SendBuf::new();
    let mut args = BodyBuf::new();
    args.store(1i32).unwrap();

    // No interface header: the member is searched across every bind.
    let message = send.method_call(path, "M").with_body(&args);

    let mut reply = BodyBuf::new();
    tree.dispatch(&message, Some(&mut reply)).unwrap();

    let mut body = reply.as_body();
    assert_eq!(body.read::<str>().unwrap(), "got 1");
}

#[test]
fn dispatch_unknowns() {
    use crate::org_freedesktop_dbus as fdo;

    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();
    tree.bind(path, interface("com.example.Foo")).unwrap();

    let mut send = SendBuf::new();
    let mut reply = BodyBuf::new();

    let m = send.method_call(ObjectPath::new("/missing").unwrap(), "M");
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_UNKNOWN_OBJECT);

    let m = send.method_call(path, "M").with_interface("com.example.Nope");
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_UNKNOWN_INTERFACE);

    let m = send.method_call(path, "Nope");
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_UNKNOWN_METHOD);
}

#[test]
fn introspect_renders_interfaces_and_children() {
    use crate::org_freedesktop_dbus as fdo;

    let tree = ObjectTree::new();
    let a = ObjectPath::new("/a").unwrap();
    let b = ObjectPath::new("/a/b").unwrap();

    tree.bind(a, interface("com.x")).unwrap();
    tree.bind(b, interface("com.example.Child")).unwrap();

    let mut send = SendBuf::new();
    let message = send
        .method_call(a, "Introspect")
        .with_interface(fdo::INTROSPECTABLE);

    let mut reply = BodyBuf::new();
    tree.dispatch(&message, Some(&mut reply)).unwrap();

    let mut body = reply.as_body();
    let xml = body.read::<str>().unwrap();

    assert_eq!(xml.matches("<interface name=\"com.x\">").count(), 1);
    assert!(xml.contains("<method name=\"M\">"));
    assert!(xml.contains("<arg type=\"i\" name=\"n\"/>"));
    assert!(xml.contains("<arg type=\"s\" name=\"answer\" direction=\"out\"/>"));
    assert!(xml.contains("<node name=\"b\"/>"));
    assert!(xml.contains("<interface name=\"org.freedesktop.DBus.Introspectable\">"));
    assert!(xml.contains("<interface name=\"org.freedesktop.DBus.Properties\">"));
}

#[test]
fn properties_get_set_and_get_all() {
    use crate::org_freedesktop_dbus as fdo;
    use std::sync::atomic::{AtomicU32, Ordering};

    let value = Arc::new(AtomicU32::new(7));

    let mut builder = Interface::build("com.example.Props").unwrap();

    {
        let value = Arc::clone(&value);
        let stored = Arc::clone(&value);

        builder
            .property("Level", Signature::UINT32)
            .unwrap()
            .get(move |body| {
                body.store(value.load(Ordering::SeqCst))?;
                Ok(())
            })
            .set(move |body| {
                let new = body.load::<u32>().map_err(crate::ErrorReply::from)?;
                stored.store(new, Ordering::SeqCst);
                Ok(())
            });
    }

    builder
        .property("Hidden", Signature::STRING)
        .unwrap()
        .set(|_| Ok(()));

    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();
    tree.bind(path, Arc::new(builder.finish())).unwrap();

    let mut send = SendBuf::new();

    // Get wraps the value in a variant.
    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();
    args.store("Level").unwrap();

    let message = send
        .method_call(path, "Get")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);

    let mut reply = BodyBuf::new();
    tree.dispatch(&message, Some(&mut reply)).unwrap();
    assert_eq!(reply.signature(), "v");

    let mut body = reply.as_body();
    let signature = body.read::<Signature>().unwrap();
    assert_eq!(signature, Signature::UINT32);
    assert_eq!(body.load::<u32>().unwrap(), 7);

    // Set drives the setter after checking the declared type.
    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();
    args.store("Level").unwrap();
    args.store(crate::Variant::U32(9)).unwrap();

    let message = send
        .method_call(path, "Set")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);

    let mut reply = BodyBuf::new();
    tree.dispatch(&message, Some(&mut reply)).unwrap();
    assert_eq!(value.load(Ordering::SeqCst), 9);

    // GetAll only includes readable properties.
    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();

    let message = send
        .method_call(path, "GetAll")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);

    let mut reply = BodyBuf::new();
    tree.dispatch(&message, Some(&mut reply)).unwrap();
    assert_eq!(reply.signature(), "a{sv}");

    let mut body = reply.as_body();
    let mut dict = body.load_dict::<crate::ty::Str, crate::ty::Variant>().unwrap();

    let (name, variant) = dict.load_entry().unwrap().unwrap();
    assert_eq!(name, "Level");
    assert_eq!(variant, crate::Variant::U32(9));
    assert!(dict.load_entry().unwrap().is_none());
}

#[test]
fn properties_access_errors() {
    use crate::org_freedesktop_dbus as fdo;

    let mut builder = Interface::build("com.example.Props").unwrap();
    builder
        .property("WriteOnly", Signature::UINT32)
        .unwrap()
        .set(|_| Ok(()));
    builder
        .property("ReadOnly", Signature::UINT32)
        .unwrap()
        .get(|body| {
            body.store(1u32)?;
            Ok(())
        });

    let tree = ObjectTree::new();
    let path = ObjectPath::new("/a").unwrap();
    tree.bind(path, Arc::new(builder.finish())).unwrap();

    let mut send = SendBuf::new();
    let mut reply = BodyBuf::new();

    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();
    args.store("WriteOnly").unwrap();

    let m = send
        .method_call(path, "Get")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_PROPERTY_WRITE_ONLY);

    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();
    args.store("ReadOnly").unwrap();
    args.store(crate::Variant::U32(1)).unwrap();

    let m = send
        .method_call(path, "Set")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_PROPERTY_READ_ONLY);

    let mut args = BodyBuf::new();
    args.store("com.example.Props").unwrap();
    args.store("Missing").unwrap();

    let m = send
        .method_call(path, "Get")
        .with_interface(fdo::PROPERTIES)
        .with_body(&args);
    let err = tree.dispatch(&m, Some(&mut reply)).unwrap_err();
    assert_eq!(&*err.name, fdo::ERR_UNKNOWN_PROPERTY);
}
