//! Named interfaces and their members.

use core::fmt;
use std::collections::BTreeMap;

use crate::names::{validate_interface_name, validate_member_name, NameError};
use crate::{Body, BodyBuf, Message, Serial, Signature, SignatureBuf};

pub(crate) mod introspect;

/// A handler for an incoming method call.
pub type MethodHandler =
    Box<dyn Fn(&mut MethodCall<'_>) -> Result<(), ErrorReply> + Send + Sync>;

/// A property getter, writing the property value into the supplied body.
pub type PropertyGet = Box<dyn Fn(&mut BodyBuf) -> Result<(), ErrorReply> + Send + Sync>;

/// A property setter, reading the new value from the supplied body.
pub type PropertySet = Box<dyn Fn(&mut Body<'_>) -> Result<(), ErrorReply> + Send + Sync>;

/// An error a handler reports back to the caller.
///
/// This is converted into a D-Bus error reply carrying the error name and
/// an optional human-readable message as its first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    pub(crate) name: Box<str>,
    pub(crate) message: Option<Box<str>>,
}

impl ErrorReply {
    /// Construct a new error reply with the given D-Bus error name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            message: None,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<crate::Error> for ErrorReply {
    fn from(error: crate::Error) -> Self {
        ErrorReply::new(crate::org_freedesktop_dbus::ERR_FAILED).with_message(&error.to_string())
    }
}

/// The context passed to a [`MethodHandler`].
pub struct MethodCall<'a> {
    pub(crate) message: &'a Message<'a>,
    pub(crate) args: Body<'a>,
    pub(crate) reply: Option<&'a mut BodyBuf>,
    pub(crate) deferred: bool,
}

impl<'a> MethodCall<'a> {
    pub(crate) fn new(
        message: &'a Message<'a>,
        reply: Option<&'a mut BodyBuf>,
    ) -> MethodCall<'a> {
        MethodCall {
            message,
            args: message.body(),
            reply,
            deferred: false,
        }
    }

    /// The message being handled.
    pub fn message(&self) -> &Message<'a> {
        self.message
    }

    /// An iterator over the argument payload.
    pub fn args(&mut self) -> &mut Body<'a> {
        &mut self.args
    }

    /// The builder for the reply body, or `None` when the caller does not
    /// expect a reply.
    pub fn reply(&mut self) -> Option<&mut BodyBuf> {
        self.reply.as_deref_mut()
    }

    /// Suppress the immediate reply and capture what is needed to respond
    /// later.
    ///
    /// Returns `None` when the caller does not expect a reply.
    pub fn defer(&mut self) -> Option<DeferredReply> {
        if self.reply.is_none() {
            return None;
        }

        self.deferred = true;

        Some(DeferredReply {
            destination: self.message.sender().map(Box::from),
            reply_serial: self.message.serial(),
        })
    }
}

/// A captured reply destination for a handler which responds later.
///
/// See [`MethodCall::defer`].
#[derive(Debug, Clone)]
pub struct DeferredReply {
    pub(crate) destination: Option<Box<str>>,
    pub(crate) reply_serial: Serial,
}

impl DeferredReply {
    /// The serial the eventual reply must reference.
    pub fn reply_serial(&self) -> Serial {
        self.reply_serial
    }

    /// The destination the eventual reply goes to.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }
}

/// A named collection of methods, signals and properties.
///
/// Interfaces are immutable once built and are shared between binds
/// through reference counting.
///
/// # Examples
///
/// ```
/// use corebus::{Interface, Signature};
///
/// let mut builder = Interface::build("com.example.Ping")?;
///
/// builder
///     .method("Ping", |call| {
///         if let Some(reply) = call.reply() {
///             reply.store("pong")?;
///         }
///
///         Ok(())
///     })?
///     .returns(Signature::STRING)
///     .return_names(["answer"]);
///
/// let interface = builder.finish();
/// assert_eq!(interface.name(), "com.example.Ping");
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Interface {
    name: Box<str>,
    members: BTreeMap<Box<str>, Member>,
    annotations: Vec<(Box<str>, Box<str>)>,
}

impl Interface {
    /// Start building an interface with the given name.
    pub fn build(name: &str) -> Result<InterfaceBuilder, NameError> {
        validate_interface_name(name)?;

        Ok(InterfaceBuilder {
            interface: Interface {
                name: name.into(),
                members: BTreeMap::new(),
                annotations: Vec::new(),
            },
        })
    }

    /// The name of the interface.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a member by name.
    pub(crate) fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (&**name, member))
    }

    pub(crate) fn annotations(&self) -> &[(Box<str>, Box<str>)] {
        &self.annotations
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A single member of an interface.
pub(crate) enum Member {
    Method(Method),
    Signal(SignalMember),
    Property(Property),
}

pub(crate) struct Method {
    pub(crate) args: SignatureBuf,
    pub(crate) returns: SignatureBuf,
    pub(crate) arg_names: Vec<Box<str>>,
    pub(crate) return_names: Vec<Box<str>>,
    pub(crate) annotations: Vec<(Box<str>, Box<str>)>,
    pub(crate) handler: MethodHandler,
}

pub(crate) struct SignalMember {
    pub(crate) args: SignatureBuf,
    pub(crate) arg_names: Vec<Box<str>>,
    pub(crate) annotations: Vec<(Box<str>, Box<str>)>,
}

pub(crate) struct Property {
    pub(crate) signature: SignatureBuf,
    pub(crate) get: Option<PropertyGet>,
    pub(crate) set: Option<PropertySet>,
    pub(crate) annotations: Vec<(Box<str>, Box<str>)>,
}

/// Builder for an [`Interface`].
pub struct InterfaceBuilder {
    interface: Interface,
}

impl InterfaceBuilder {
    /// Add a method with the given handler.
    pub fn method<F>(&mut self, name: &str, handler: F) -> Result<MethodBuilder<'_>, NameError>
    where
        F: Fn(&mut MethodCall<'_>) -> Result<(), ErrorReply> + Send + Sync + 'static,
    {
        validate_member_name(name)?;

        let member = Member::Method(Method {
            args: SignatureBuf::empty(),
            returns: SignatureBuf::empty(),
            arg_names: Vec::new(),
            return_names: Vec::new(),
            annotations: Vec::new(),
            handler: Box::new(handler),
        });

        let Some(Member::Method(method)) = self.insert(name, member) else {
            unreachable!();
        };

        Ok(MethodBuilder { method })
    }

    /// Add a signal.
    pub fn signal(&mut self, name: &str) -> Result<SignalBuilder<'_>, NameError> {
        validate_member_name(name)?;

        let member = Member::Signal(SignalMember {
            args: SignatureBuf::empty(),
            arg_names: Vec::new(),
            annotations: Vec::new(),
        });

        let Some(Member::Signal(signal)) = self.insert(name, member) else {
            unreachable!();
        };

        Ok(SignalBuilder { signal })
    }

    /// Add a property of the given type.
    pub fn property(
        &mut self,
        name: &str,
        signature: &Signature,
    ) -> Result<PropertyBuilder<'_>, NameError> {
        validate_member_name(name)?;

        let member = Member::Property(Property {
            signature: signature.to_owned(),
            get: None,
            set: None,
            annotations: Vec::new(),
        });

        let Some(Member::Property(property)) = self.insert(name, member) else {
            unreachable!();
        };

        Ok(PropertyBuilder { property })
    }

    /// Annotate the interface itself.
    pub fn annotate(&mut self, name: &str, value: &str) -> &mut Self {
        self.interface
            .annotations
            .push((name.into(), value.into()));
        self
    }

    /// Finish building the interface.
    pub fn finish(self) -> Interface {
        self.interface
    }

    fn insert(&mut self, name: &str, member: Member) -> Option<&mut Member> {
        self.interface.members.insert(name.into(), member);
        self.interface.members.get_mut(name)
    }
}

/// Builder for a method member.
pub struct MethodBuilder<'a> {
    method: &'a mut Method,
}

impl MethodBuilder<'_> {
    /// Set the input signature.
    pub fn args(&mut self, signature: &Signature) -> &mut Self {
        self.method.args = signature.to_owned();
        self
    }

    /// Set the output signature.
    pub fn returns(&mut self, signature: &Signature) -> &mut Self {
        self.method.returns = signature.to_owned();
        self
    }

    /// Name the input arguments, in order.
    pub fn arg_names<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.method.arg_names = names.into_iter().map(|n| n.as_ref().into()).collect();
        self
    }

    /// Name the output arguments, in order.
    pub fn return_names<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.method.return_names = names.into_iter().map(|n| n.as_ref().into()).collect();
        self
    }

    /// Annotate the method.
    pub fn annotate(&mut self, name: &str, value: &str) -> &mut Self {
        self.method.annotations.push((name.into(), value.into()));
        self
    }
}

/// Builder for a signal member.
pub struct SignalBuilder<'a> {
    signal: &'a mut SignalMember,
}

impl SignalBuilder<'_> {
    /// Set the argument signature.
    pub fn args(&mut self, signature: &Signature) -> &mut Self {
        self.signal.args = signature.to_owned();
        self
    }

    /// Name the arguments, in order.
    pub fn arg_names<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.signal.arg_names = names.into_iter().map(|n| n.as_ref().into()).collect();
        self
    }

    /// Annotate the signal.
    pub fn annotate(&mut self, name: &str, value: &str) -> &mut Self {
        self.signal.annotations.push((name.into(), value.into()));
        self
    }
}

/// Builder for a property member.
pub struct PropertyBuilder<'a> {
    property: &'a mut Property,
}

impl PropertyBuilder<'_> {
    /// Install the getter.
    pub fn get<F>(&mut self, get: F) -> &mut Self
    where
        F: Fn(&mut BodyBuf) -> Result<(), ErrorReply> + Send + Sync + 'static,
    {
        self.property.get = Some(Box::new(get));
        self
    }

    /// Install the setter.
    pub fn set<F>(&mut self, set: F) -> &mut Self
    where
        F: Fn(&mut Body<'_>) -> Result<(), ErrorReply> + Send + Sync + 'static,
    {
        self.property.set = Some(Box::new(set));
        self
    }

    /// Annotate the property.
    pub fn annotate(&mut self, name: &str, value: &str) -> &mut Self {
        self.property.annotations.push((name.into(), value.into()));
        self
    }
}
