use super::ObjectPath;

#[test]
fn valid_paths() {
    assert!(ObjectPath::new("/").is_ok());
    assert!(ObjectPath::new("/a").is_ok());
    assert!(ObjectPath::new("/a/b_c/D9").is_ok());
    assert!(ObjectPath::new("/org/freedesktop/DBus").is_ok());
}

#[test]
fn invalid_paths() {
    assert!(ObjectPath::new("").is_err());
    assert!(ObjectPath::new("a/b").is_err());
    assert!(ObjectPath::new("/a/").is_err());
    assert!(ObjectPath::new("//").is_err());
    assert!(ObjectPath::new("/a//b").is_err());
    assert!(ObjectPath::new("/a-b").is_err());
    assert!(ObjectPath::new("/a b").is_err());
}

#[test]
fn segments() {
    let path = ObjectPath::new("/a/b/c").unwrap();
    let segments = path.iter().collect::<Vec<_>>();
    assert_eq!(segments, ["a", "b", "c"]);

    let mut it = path.iter();
    assert_eq!(it.next_back(), Some("c"));
    assert_eq!(it.next_back(), Some("b"));
    assert_eq!(it.next(), Some("a"));
    assert_eq!(it.next_back(), None);

    assert!(ObjectPath::ROOT.iter().next().is_none());
}

#[test]
fn parents() {
    let path = ObjectPath::new("/a/b/c").unwrap();
    assert_eq!(path.parent().unwrap(), "/a/b");
    assert_eq!(path.tail(), Some("c"));
    assert_eq!(ObjectPath::ROOT.parent(), None);
    assert_eq!(ObjectPath::ROOT.tail(), None);
}
