//! The path-hierarchical registry of bound interfaces.

use core::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::interface::{introspect, Member, MethodCall};
use crate::org_freedesktop_dbus as fdo;
use crate::{Body, BodyBuf, ErrorReply, Interface, Message, MessageKind, ObjectPath, ObjectPathBuf, Signature};

#[cfg(test)]
mod tests;

/// A node in the object tree.
///
/// A node stays alive while it has interface binds or children; the two
/// builtin interfaces exist on every node without pinning it.
#[derive(Default)]
struct Node {
    binds: BTreeMap<Box<str>, Arc<Interface>>,
    children: BTreeSet<Box<str>>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.binds.is_empty() && self.children.is_empty()
    }
}

/// The object tree of a connection: a hierarchy of path nodes, each
/// holding interface binds, with the `Introspectable` and `Properties`
/// builtins dispatched on every node.
pub(crate) struct ObjectTree {
    nodes: RefCell<BTreeMap<ObjectPathBuf, Node>>,
}

impl ObjectTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: RefCell::new(BTreeMap::new()),
        }
    }

    /// Bind an interface at the given path, creating the node and its
    /// ancestors as needed.
    pub(crate) fn bind(&self, path: &ObjectPath, interface: Arc<Interface>) -> Result<()> {
        let mut nodes = self.nodes.borrow_mut();

        let node = nodes.entry(path.to_owned()).or_default();

        if node.binds.contains_key(interface.name()) {
            return Err(Error::new(ErrorKind::BindExists(
                path.as_str().into(),
                interface.name().into(),
            )));
        }

        node.binds.insert(interface.name().into(), interface);

        // Create the ancestor chain, linking each node into its parent.
        let mut current: &ObjectPath = path;

        while let Some(parent) = current.parent() {
            let segment = current.tail().unwrap_or_default();
            let node = nodes.entry(parent.to_owned()).or_default();

            if !node.children.insert(segment.into()) {
                break;
            }

            current = parent;
        }

        Ok(())
    }

    /// Remove the bind of the named interface from the given path.
    ///
    /// Nodes which are left without binds and children are pruned, as are
    /// any ancestors this leaves empty.
    pub(crate) fn unbind(&self, path: &ObjectPath, interface: &str) -> Result<()> {
        let mut nodes = self.nodes.borrow_mut();

        let Some(node) = nodes.get_mut(path) else {
            return Err(Error::new(ErrorKind::NoSuchBind(
                path.as_str().into(),
                interface.into(),
            )));
        };

        if node.binds.remove(interface).is_none() {
            return Err(Error::new(ErrorKind::NoSuchBind(
                path.as_str().into(),
                interface.into(),
            )));
        }

        let mut current = path.to_owned();

        while nodes.get(&current).is_some_and(|node| node.is_empty()) {
            nodes.remove(&current);

            let Some(parent) = current.parent() else {
                break;
            };

            let segment = current.tail().unwrap_or_default();
            let parent = parent.to_owned();

            if let Some(node) = nodes.get_mut(&parent) {
                node.children.remove(segment);
            }

            current = parent;
        }

        Ok(())
    }

    /// Test if a node exists at the given path.
    pub(crate) fn contains(&self, path: &ObjectPath) -> bool {
        self.nodes.borrow().contains_key(path)
    }

    /// Render the introspection document of the node at `path`.
    pub(crate) fn introspect(&self, path: &ObjectPath) -> Option<String> {
        let nodes = self.nodes.borrow();
        let node = nodes.get(path)?;

        let interfaces = node.binds.values().map(|i| Arc::clone(i)).collect::<Vec<_>>();
        let children = node.children.iter().cloned().collect::<Vec<_>>();
        drop(nodes);

        Some(introspect::node_to_xml(
            interfaces.iter().map(|i| &**i),
            children.iter().map(|c| &**c),
        ))
    }

    /// Dispatch a method call to the bound member it addresses.
    ///
    /// On success, returns whether the handler deferred its reply. Lookup
    /// failures and handler errors are reported as error replies for the
    /// caller.
    pub(crate) fn dispatch(
        &self,
        message: &Message<'_>,
        reply: Option<&mut BodyBuf>,
    ) -> core::result::Result<bool, ErrorReply> {
        let MessageKind::MethodCall { path, member } = message.kind() else {
            return Err(ErrorReply::new(fdo::ERR_FAILED));
        };

        if !self.contains(path) {
            return Err(ErrorReply::new(fdo::ERR_UNKNOWN_OBJECT)
                .with_message(&format!("no object on path {path}")));
        }

        match message.interface() {
            Some(fdo::INTROSPECTABLE) => {
                return self.builtin_introspect(path, reply);
            }
            Some(fdo::PROPERTIES) => {
                return self.builtin_properties(message, member, reply);
            }
            _ => {}
        }

        if message.interface().is_none() && member == "Introspect" {
            return self.builtin_introspect(path, reply);
        }

        let interface = {
            let nodes = self.nodes.borrow();
            let node = nodes.get(path).expect("node checked above");

            match message.interface() {
                Some(name) => {
                    let Some(interface) = node.binds.get(name) else {
                        return Err(ErrorReply::new(fdo::ERR_UNKNOWN_INTERFACE)
                            .with_message(&format!("no interface {name} on {path}")));
                    };

                    Arc::clone(interface)
                }
                None => {
                    // No interface header: the first bind carrying the
                    // member wins.
                    let Some(interface) = node
                        .binds
                        .values()
                        .find(|i| matches!(i.member(member), Some(Member::Method(..))))
                    else {
                        return Err(ErrorReply::new(fdo::ERR_UNKNOWN_METHOD)
                            .with_message(&format!("no method {member} on {path}")));
                    };

                    Arc::clone(interface)
                }
            }
        };

        let Some(Member::Method(method)) = interface.member(member) else {
            return Err(ErrorReply::new(fdo::ERR_UNKNOWN_METHOD)
                .with_message(&format!("no method {member} on {path}")));
        };

        let mut call = MethodCall::new(message, reply);
        (method.handler)(&mut call)?;
        Ok(call.deferred)
    }

    fn builtin_introspect(
        &self,
        path: &ObjectPath,
        reply: Option<&mut BodyBuf>,
    ) -> core::result::Result<bool, ErrorReply> {
        let Some(xml) = self.introspect(path) else {
            return Err(ErrorReply::new(fdo::ERR_UNKNOWN_OBJECT));
        };

        if let Some(reply) = reply {
            reply.store(xml)?;
        }

        Ok(false)
    }

    fn builtin_properties(
        &self,
        message: &Message<'_>,
        member: &str,
        reply: Option<&mut BodyBuf>,
    ) -> core::result::Result<bool, ErrorReply> {
        let MessageKind::MethodCall { path, .. } = message.kind() else {
            return Err(ErrorReply::new(fdo::ERR_FAILED));
        };

        let mut args = message.body();

        match member {
            "Get" => {
                let (interface, property) = read_two_strings(&mut args)?;
                let interface = self.lookup_interface(path, interface)?;
                let property = lookup_property(&interface, property)?;

                let Some(get) = &property.get else {
                    return Err(ErrorReply::new(fdo::ERR_PROPERTY_WRITE_ONLY));
                };

                if let Some(reply) = reply {
                    store_variant(reply, &property.signature, get)?;
                }

                Ok(false)
            }
            "GetAll" => {
                let Ok(interface) = args.read::<str>() else {
                    return Err(ErrorReply::new(fdo::ERR_INVALID_ARGS));
                };

                let interface = self.lookup_interface(path, interface)?;

                if let Some(reply) = reply {
                    store_all_properties(reply, &interface)?;
                }

                Ok(false)
            }
            "Set" => {
                let (interface, property) = read_two_strings(&mut args)?;
                let interface = self.lookup_interface(path, interface)?;
                let property = lookup_property(&interface, property)?;

                let Some(set) = &property.set else {
                    return Err(ErrorReply::new(fdo::ERR_PROPERTY_READ_ONLY));
                };

                let Ok(signature) = args.read::<Signature>() else {
                    return Err(ErrorReply::new(fdo::ERR_INVALID_ARGS));
                };

                if signature != &*property.signature {
                    return Err(ErrorReply::new(fdo::ERR_INVALID_ARGS).with_message(&format!(
                        "expected property type {}, got {signature}",
                        property.signature.as_str()
                    )));
                }

                set(&mut args)?;
                Ok(false)
            }
            _ => Err(ErrorReply::new(fdo::ERR_UNKNOWN_METHOD)
                .with_message(&format!("no method {member} on {}", fdo::PROPERTIES))),
        }
    }

    fn lookup_interface(
        &self,
        path: &ObjectPath,
        name: &str,
    ) -> core::result::Result<Arc<Interface>, ErrorReply> {
        let nodes = self.nodes.borrow();

        let Some(interface) = nodes.get(path).and_then(|node| node.binds.get(name)) else {
            return Err(ErrorReply::new(fdo::ERR_UNKNOWN_INTERFACE)
                .with_message(&format!("no interface {name} on {path}")));
        };

        Ok(Arc::clone(interface))
    }
}

fn read_two_strings<'a>(
    args: &mut Body<'a>,
) -> core::result::Result<(&'a str, &'a str), ErrorReply> {
    let (Ok(first), Ok(second)) = (args.read::<str>(), args.read::<str>()) else {
        return Err(ErrorReply::new(fdo::ERR_INVALID_ARGS));
    };

    Ok((first, second))
}

fn lookup_property<'i>(
    interface: &'i Interface,
    name: &str,
) -> core::result::Result<&'i crate::interface::Property, ErrorReply> {
    match interface.member(name) {
        Some(Member::Property(property)) => Ok(property),
        _ => Err(ErrorReply::new(fdo::ERR_UNKNOWN_PROPERTY)
            .with_message(&format!("no property {name} on {}", interface.name()))),
    }
}

/// Write a property value wrapped in a variant, verifying that the getter
/// produced the declared type.
fn store_variant(
    reply: &mut BodyBuf,
    signature: &Signature,
    get: &crate::interface::PropertyGet,
) -> core::result::Result<(), ErrorReply> {
    reply.extend_signature(Signature::VARIANT)?;
    reply.write_only(signature);

    let mark = reply.signature_len();
    get(reply)?;

    if reply.signature().as_bytes()[mark..] != *signature.as_bytes() {
        return Err(ErrorReply::new(fdo::ERR_FAILED)
            .with_message("property getter produced a mismatched type"));
    }

    reply.truncate_signature(mark);
    Ok(())
}

/// Write every readable property of an interface as an `a{sv}` dict.
fn store_all_properties(
    reply: &mut BodyBuf,
    interface: &Interface,
) -> core::result::Result<(), ErrorReply> {
    reply.extend_signature(Signature::new_const(b"a{sv}"))?;

    let len = reply.alloc::<u32>();
    reply.align_mut::<u64>();
    let start = reply.len();

    for (name, member) in interface.members() {
        let Member::Property(property) = member else {
            continue;
        };

        let Some(get) = &property.get else {
            continue;
        };

        reply.align_mut::<u64>();
        reply.write_only(name);
        reply.write_only(&*property.signature);

        let mark = reply.signature_len();
        get(reply)?;

        if reply.signature().as_bytes()[mark..] != *property.signature.as_bytes() {
            return Err(ErrorReply::new(fdo::ERR_FAILED)
                .with_message("property getter produced a mismatched type"));
        }

        reply.truncate_signature(mark);
    }

    let bytes = (reply.len() - start) as u32;
    reply.store_at(len, bytes);
    Ok(())
}
