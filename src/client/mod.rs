//! The per-connection dispatch engine.

pub use self::proxy::Proxy;
pub(crate) use self::proxy::{ProxyRequest, Serials, UniqueName};
mod proxy;

#[cfg(test)]
mod tests;

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::error::{Error, ErrorKind, Result};
use crate::object_tree::ObjectTree;
use crate::org_freedesktop_dbus as fdo;
use crate::proto::Flags;
use crate::reply::{Expected, ReplyHandler, ReplyOutcome, ReplyTable};
use crate::service::{ServiceTracker, TrackedName};
use crate::{
    BodyBuf, Interface, MatchRule, Message, MessageBuf, MessageKind, ObjectPath, RecvBuf, SendBuf,
    Serial,
};

/// The callback invoked by the transport to push outgoing bytes.
///
/// Returns the number of bytes written; writing fewer bytes than offered
/// is reported to the sender as an error.
pub type TransportFn = Box<dyn FnMut(&[u8]) -> io::Result<usize>>;

/// A filter callback registered with [`Client::add_match`].
///
/// Returning `true` cancels further dispatch of the message; a filter
/// which answered a method call this way should have written the reply
/// builder first.
pub type MatchCallback = Box<dyn FnMut(&mut Matched<'_>) -> bool + Send>;

/// The context passed to a [`MatchCallback`].
pub struct Matched<'a> {
    message: &'a Message<'a>,
    reply: Option<&'a mut BodyBuf>,
}

impl<'a> Matched<'a> {
    /// The matched message.
    pub fn message(&self) -> &Message<'a> {
        self.message
    }

    /// The builder for the reply body, present when the message is a
    /// method call whose caller expects a reply.
    pub fn reply(&mut self) -> Option<&mut BodyBuf> {
        self.reply.as_deref_mut()
    }
}

/// A handle identifying a registered match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchHandle(u64);

struct MatchEntry {
    id: u64,
    rule: MatchRule,
    /// Whether the rule was forwarded to the bus with `AddMatch`.
    bus: bool,
    /// Owner tracking for a well-known sender; the filter compares
    /// against the resolved unique name.
    tracked: Option<Arc<TrackedName>>,
    removed: Cell<bool>,
    in_callback: Cell<bool>,
    callback: RefCell<MatchCallback>,
}

/// A D-Bus client connection: the parse loop, match list, reply table,
/// object tree and send path of one connection.
///
/// The client is owned by the thread that created it; other threads
/// interact with it exclusively through its [`Proxy`].
///
/// # Examples
///
/// ```
/// use corebus::{Client, MatchRule};
///
/// let client = Client::new();
///
/// let calls = client.add_match(
///     MatchRule::new().with_member("Ping"),
///     Box::new(|matched| {
///         println!("{:?}", matched.message().kind());
///         false
///     }),
/// )?;
///
/// client.remove_match(calls)?;
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Client {
    owner: ThreadId,
    serials: Arc<Serials>,
    unique_name: Arc<UniqueName>,
    transport: RefCell<Option<TransportFn>>,
    send: RefCell<SendBuf>,
    recv: RefCell<RecvBuf>,
    queue: RefCell<VecDeque<Rc<MessageBuf>>>,
    matches: RefCell<Vec<Rc<MatchEntry>>>,
    next_match: Cell<u64>,
    replies: ReplyTable,
    tree: ObjectTree,
    services: ServiceTracker,
    poisoned: Cell<bool>,
    closed: Cell<bool>,
    proxy_tx: Sender<ProxyRequest>,
    proxy_rx: Receiver<ProxyRequest>,
}

impl Client {
    /// Construct a new client owned by the current thread.
    pub fn new() -> Self {
        let (proxy_tx, proxy_rx) = channel();

        Self {
            owner: thread::current().id(),
            serials: Arc::new(Serials::new()),
            unique_name: Arc::new(UniqueName::new()),
            transport: RefCell::new(None),
            send: RefCell::new(SendBuf::new()),
            recv: RefCell::new(RecvBuf::new()),
            queue: RefCell::new(VecDeque::new()),
            matches: RefCell::new(Vec::new()),
            next_match: Cell::new(0),
            replies: ReplyTable::new(),
            tree: ObjectTree::new(),
            services: ServiceTracker::new(),
            poisoned: Cell::new(false),
            closed: Cell::new(false),
            proxy_tx,
            proxy_rx,
        }
    }

    /// Install the callback which carries outgoing bytes to the
    /// transport.
    pub fn set_transport(&self, transport: TransportFn) {
        *self.transport.borrow_mut() = Some(transport);
    }

    /// Get a `Send` handle for use from other threads.
    pub fn proxy(&self) -> Proxy {
        Proxy {
            tx: self.proxy_tx.clone(),
            owner: self.owner,
            serials: Arc::clone(&self.serials),
            unique_name: Arc::clone(&self.unique_name),
        }
    }

    /// Allocate the next message serial.
    pub fn next_serial(&self) -> Serial {
        self.serials.next()
    }

    /// The unique name assigned by the bus, once the [`connect`] reply
    /// has arrived.
    ///
    /// [`connect`]: Self::connect
    pub fn unique_name(&self) -> Option<String> {
        self.unique_name.get()
    }

    /// Issue the `Hello` call which registers this connection with the
    /// bus. The unique name from its reply is stored and observers
    /// blocked in [`Proxy::wait_unique_name`] are woken.
    pub fn connect(&self) -> Result<Serial> {
        self.assert_owner()?;
        self.check_open()?;

        let serial = self.serials.next();
        let message = Message::method_call(fdo::PATH, "Hello", serial)
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION);

        let unique = Arc::clone(&self.unique_name);

        self.replies.insert(
            serial,
            Expected::Unique(fdo::DESTINATION.into()),
            Box::new(move |outcome| {
                if let ReplyOutcome::Return(mut body) = outcome {
                    if let Ok(name) = body.read::<str>() {
                        log::debug!("connected as {name}");
                        unique.set(name.to_owned());
                    }
                }
            }),
        );

        self.send_message(message)
    }

    /// Push received bytes into the connection.
    ///
    /// Complete messages are split off into the dispatch queue; call
    /// [`dispatch`] to process them. A parse failure poisons the
    /// connection permanently.
    ///
    /// [`dispatch`]: Self::dispatch
    pub fn parse(&self, bytes: &[u8]) -> Result<()> {
        self.assert_owner()?;
        self.check_open()?;
        self.pump();

        let mut recv = self.recv.borrow_mut();
        recv.push(bytes);

        loop {
            match recv.take_message() {
                Ok(Some(message)) => {
                    self.queue.borrow_mut().push_back(Rc::new(message));
                }
                Ok(None) => break,
                Err(error) => {
                    self.poisoned.set(true);
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    /// Dispatch a single queued message.
    ///
    /// Returns `false` when the queue was empty. Messages are dispatched
    /// in receive order: a matching reply record wins over filters, then
    /// the match list runs in insertion order, then method calls resolve
    /// through the object tree.
    pub fn dispatch(&self) -> Result<bool> {
        self.assert_owner()?;
        self.check_open()?;
        self.pump();

        let Some(slot) = self.queue.borrow_mut().pop_front() else {
            return Ok(false);
        };

        // The slot is reference counted; the queue may shrink and grow
        // while handlers run without invalidating it.
        let message = slot.borrow();

        log::trace!(
            "dispatch serial={} kind={:?}",
            message.serial(),
            message.kind()
        );

        if matches!(
            message.kind(),
            MessageKind::MethodReturn { .. } | MessageKind::Error { .. }
        ) && self.replies.would_fire(&message)
        {
            self.replies.fire(&message);
            return Ok(true);
        }

        let expects_reply = matches!(message.kind(), MessageKind::MethodCall { .. })
            && !(message.flags() & Flags::NO_REPLY_EXPECTED);

        let mut reply_body = BodyBuf::new();

        let snapshot = self.matches.borrow().clone();
        let mut cancelled = false;

        for entry in snapshot {
            if entry.removed.get() || entry.in_callback.get() {
                continue;
            }

            if !entry.rule.matches(&message) {
                continue;
            }

            if let Some(tracked) = &entry.tracked {
                // Until the owner resolves, the sender constraint is not
                // enforced.
                if let Some(resolved) = tracked.unique() {
                    if message.sender() != Some(&*resolved) {
                        continue;
                    }
                }
            }

            entry.in_callback.set(true);

            let mut ctx = Matched {
                message: &message,
                reply: if expects_reply {
                    Some(&mut reply_body)
                } else {
                    None
                },
            };

            let cancel = (entry.callback.borrow_mut())(&mut ctx);
            entry.in_callback.set(false);

            if cancel {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            if expects_reply {
                let reply = message
                    .method_return(self.serials.next())
                    .with_body(&reply_body);
                self.send_message(reply)?;
            }

            return Ok(true);
        }

        if let MessageKind::MethodCall { .. } = message.kind() {
            let outcome = self
                .tree
                .dispatch(&message, expects_reply.then_some(&mut reply_body));

            match outcome {
                Ok(deferred) => {
                    if expects_reply && !deferred {
                        let reply = message
                            .method_return(self.serials.next())
                            .with_body(&reply_body);
                        self.send_message(reply)?;
                    }
                }
                Err(error) => {
                    if expects_reply {
                        let mut body = BodyBuf::new();

                        if let Some(text) = &error.message {
                            body.store(&**text)?;
                        }

                        let reply = message
                            .error(&error.name, self.serials.next())
                            .with_body(&body);
                        self.send_message(reply)?;
                    } else {
                        log::debug!("dropped dispatch error: {}", error.name);
                    }
                }
            }
        }

        Ok(true)
    }

    /// Dispatch queued messages until the queue is empty, returning how
    /// many were processed.
    pub fn dispatch_all(&self) -> Result<usize> {
        let mut count = 0;

        while self.dispatch()? {
            count += 1;
        }

        Ok(count)
    }

    /// Send a message over the transport.
    pub fn send(&self, message: Message<'_>) -> Result<Serial> {
        self.assert_owner()?;
        self.check_open()?;
        self.send_message(message)
    }

    /// Send an owned message, used by proxied sends.
    pub(crate) fn send_owned(&self, message: &MessageBuf) -> Result<Serial> {
        self.assert_owner()?;
        self.check_open()?;
        self.send_message(message.borrow())
    }

    /// Emit a signal from a bound path.
    pub fn emit(
        &self,
        path: &ObjectPath,
        interface: &str,
        member: &str,
        body: &BodyBuf,
    ) -> Result<Serial> {
        crate::names::validate_interface_name(interface)?;
        crate::names::validate_member_name(member)?;

        let message = Message::signal(path, member, self.serials.next())
            .with_interface(interface)
            .with_body(body);

        self.send(message)
    }

    /// Send a method call and register a one-shot handler for its reply.
    ///
    /// When the destination is a well-known name, its owner is tracked:
    /// the reply is accepted from the unique name resolved at
    /// registration time even if ownership changes while the call is in
    /// flight.
    pub fn call(&self, message: Message<'_>, handler: ReplyHandler) -> Result<Serial> {
        self.assert_owner()?;
        self.check_open()?;

        let serial = message.serial();
        let expected = self.expected_for(message.destination(), serial)?;
        self.replies.insert(serial, expected, handler);

        match self.send_message(message) {
            Ok(serial) => Ok(serial),
            Err(error) => {
                self.replies.remove(serial);
                Err(error)
            }
        }
    }

    /// Register a one-shot handler for a reply to `serial` from the
    /// given destination, without sending anything.
    pub fn expect_reply(
        &self,
        serial: Serial,
        destination: Option<&str>,
        handler: ReplyHandler,
    ) -> Result<()> {
        self.assert_owner()?;
        self.check_open()?;

        let expected = self.expected_for(destination, serial)?;
        self.replies.insert(serial, expected, handler);
        Ok(())
    }

    /// Cancel an outstanding reply registration. The unfired handler is
    /// dropped.
    pub fn cancel_reply(&self, serial: Serial) -> bool {
        self.replies.remove(serial)
    }

    /// Register a match filter.
    ///
    /// Filters run in insertion order against every dispatched message.
    pub fn add_match(&self, rule: MatchRule, callback: MatchCallback) -> Result<MatchHandle> {
        self.add_match_inner(rule, false, callback)
    }

    /// Register a match filter and forward it to the bus with an
    /// `AddMatch` call, without waiting for the reply.
    pub fn add_match_to_bus(
        &self,
        rule: MatchRule,
        callback: MatchCallback,
    ) -> Result<MatchHandle> {
        self.add_match_inner(rule, true, callback)
    }

    fn add_match_inner(
        &self,
        mut rule: MatchRule,
        bus: bool,
        callback: MatchCallback,
    ) -> Result<MatchHandle> {
        self.assert_owner()?;
        self.check_open()?;

        if bus {
            // The bus resolves well-known sender names itself, so the
            // rule is forwarded as given.
            self.send_bus_match("AddMatch", &rule)?;
        }

        // A well-known sender is matched against its tracked owner, not
        // literally.
        let tracked = match rule.sender.as_deref() {
            Some(sender) if !sender.starts_with(':') && sender != fdo::DESTINATION => {
                let (tracked, created) = self.services.track(sender);

                if created {
                    self.track_owner(&tracked)?;
                }

                rule.sender = None;
                Some(tracked)
            }
            _ => None,
        };

        let id = self.next_match.get();
        self.next_match.set(id + 1);

        self.matches.borrow_mut().push(Rc::new(MatchEntry {
            id,
            rule,
            bus,
            tracked,
            removed: Cell::new(false),
            in_callback: Cell::new(false),
            callback: RefCell::new(callback),
        }));

        Ok(MatchHandle(id))
    }

    /// Remove a previously registered match filter, symmetrically
    /// removing it from the bus when it was forwarded there.
    pub fn remove_match(&self, handle: MatchHandle) -> Result<()> {
        self.assert_owner()?;

        let mut matches = self.matches.borrow_mut();

        let Some(at) = matches.iter().position(|entry| entry.id == handle.0) else {
            return Ok(());
        };

        let entry = matches.remove(at);
        entry.removed.set(true);
        drop(matches);

        if entry.bus && !self.closed.get() {
            if let Err(error) = self.send_bus_match("RemoveMatch", &entry.rule) {
                log::debug!("RemoveMatch failed: {error}");
            }
        }

        Ok(())
    }

    /// Bind an interface at the given path.
    ///
    /// The node and its ancestors are created as needed, and expose the
    /// `Introspectable` and `Properties` builtins.
    pub fn bind(&self, path: &ObjectPath, interface: Arc<Interface>) -> Result<()> {
        self.assert_owner()?;
        self.check_open()?;
        self.tree.bind(path, interface)
    }

    /// Remove the bind of the named interface from the given path,
    /// pruning nodes which are left empty.
    pub fn unbind(&self, path: &ObjectPath, interface: &str) -> Result<()> {
        self.assert_owner()?;
        self.tree.unbind(path, interface)
    }

    /// Tear the connection down.
    ///
    /// All registrations are dropped, which runs their release semantics;
    /// proxied requests which never reached the client release through
    /// the proxy path.
    pub fn close(&self) {
        self.closed.set(true);
        self.transport.borrow_mut().take();
        self.replies.clear();
        self.matches.borrow_mut().clear();
        self.queue.borrow_mut().clear();

        while let Ok(request) = self.proxy_rx.try_recv() {
            drop(request);
        }
    }

    /// Apply requests hopped over from other threads.
    fn pump(&self) {
        while let Ok(request) = self.proxy_rx.try_recv() {
            request.apply(self);
        }
    }

    fn assert_owner(&self) -> Result<()> {
        if thread::current().id() != self.owner {
            return Err(Error::new(ErrorKind::WrongThread));
        }

        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.get() {
            return Err(Error::new(ErrorKind::Disconnected));
        }

        if self.poisoned.get() {
            return Err(Error::new(ErrorKind::Poisoned));
        }

        Ok(())
    }

    fn send_message(&self, message: Message<'_>) -> Result<Serial> {
        let mut send = self.send.borrow_mut();
        let serial = send.write_message(message)?;

        let mut transport = self.transport.borrow_mut();

        let Some(transport) = transport.as_mut() else {
            return Err(Error::new(ErrorKind::NotConnected));
        };

        while !send.is_empty() {
            let data = send.get();
            let n = transport(data)?;

            if n < data.len() {
                return Err(Error::new(ErrorKind::ShortSend));
            }

            send.advance(n);
        }

        Ok(serial)
    }

    /// Determine the expected remote for a reply, tracking well-known
    /// destinations.
    fn expected_for(&self, destination: Option<&str>, serial: Serial) -> Result<Expected> {
        let Some(destination) = destination else {
            return Ok(Expected::Any);
        };

        if destination == fdo::DESTINATION || destination.starts_with(':') {
            return Ok(Expected::Unique(destination.into()));
        }

        let (tracked, created) = self.services.track(destination);

        if created {
            self.track_owner(&tracked)?;
        }

        match tracked.unique() {
            Some(unique) => Ok(Expected::Unique(unique)),
            None => {
                tracked.push_pending(serial.get());
                Ok(Expected::Pending(tracked))
            }
        }
    }

    /// Subscribe to ownership changes of a newly tracked name and issue
    /// one `GetNameOwner` for its current owner.
    fn track_owner(&self, tracked: &Arc<TrackedName>) -> Result<()> {
        let service = tracked.service().to_owned();

        let rule = MatchRule::new()
            .with_type(crate::proto::MessageType::SIGNAL)
            .with_sender(fdo::DESTINATION)
            .with_interface(fdo::INTERFACE)
            .with_member(fdo::NAME_OWNER_CHANGED)
            .with_arg(0, &service);

        let proxy = self.proxy();

        self.add_match_to_bus(
            rule,
            Box::new(move |matched| {
                let mut body = matched.message().body();

                let (Ok(name), Ok(_), Ok(new_owner)) =
                    (body.read::<str>(), body.read::<str>(), body.read::<str>())
                else {
                    return false;
                };

                let name = name.to_owned();
                let new_owner = (!new_owner.is_empty()).then(|| new_owner.to_owned());

                let _ = proxy.run(move |client| {
                    client.service_resolved(&name, new_owner.as_deref());
                });

                false
            }),
        )?;

        let serial = self.serials.next();
        let mut body = BodyBuf::new();
        body.store(tracked.service())?;

        let message = Message::method_call(fdo::PATH, "GetNameOwner", serial)
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION)
            .with_body(&body);

        let proxy = self.proxy();

        self.replies.insert(
            serial,
            Expected::Unique(fdo::DESTINATION.into()),
            Box::new(move |outcome| {
                if let ReplyOutcome::Return(mut body) = outcome {
                    if let Ok(owner) = body.read::<str>() {
                        let owner = owner.to_owned();

                        let _ = proxy.run(move |client| {
                            client.service_resolved(&service, Some(&owner));
                        });
                    }
                }
            }),
        );

        self.send_message(message)?;
        Ok(())
    }

    /// Record the owner of a tracked service and pin any reply records
    /// which were waiting for its resolution.
    fn service_resolved(&self, service: &str, owner: Option<&str>) {
        let Some(tracked) = self.services.get(service) else {
            return;
        };

        log::debug!("service {service} owned by {owner:?}");
        tracked.set_unique(owner);

        if let Some(owner) = owner {
            for serial in tracked.take_pending() {
                self.replies.pin_pending(serial, owner);
            }
        }
    }

    fn send_bus_match(&self, member: &str, rule: &MatchRule) -> Result<Serial> {
        let mut body = BodyBuf::new();
        body.store(rule.to_string())?;

        let message = Message::method_call(fdo::PATH, member, self.serials.next())
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION)
            .with_body(&body);

        self.send_message(message)
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Client {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("unique_name", &self.unique_name.get())
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}
