//! The in-process message broker.

use self::queues::{ServiceQueues, Transition};
mod queues;

mod bus;

#[cfg(test)]
mod tests;

use core::num::NonZeroU32;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use crate::buf::padding_to_align;
use crate::error::{Error, ErrorKind, Result};
use crate::org_freedesktop_dbus as fdo;
use crate::proto::HeaderField;
use crate::recv_buf::{frame_size, normalize, read_message};
use crate::sasl::{SaslStatus, ServerAuth};
use crate::{MatchRule, Message, MessageKind, SendBuf, Serial};

/// Identifies one remote connected to a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteId(u64);

/// The callback carrying outgoing bytes to a remote's transport.
pub type RemoteSendFn = Box<dyn FnMut(&[u8]) -> io::Result<usize> + Send>;

/// The lifecycle of a remote.
enum RemoteState {
    /// The leading NUL byte has not arrived yet.
    AwaitingNul,
    /// The SASL exchange is in progress.
    Authing(ServerAuth),
    /// Authenticated; the first method call must be `Hello`.
    NeedsHello,
    /// Fully registered with a unique name.
    Ready,
}

/// One connection serviced by the broker.
struct Remote {
    state: RemoteState,
    /// The assigned unique name, present once `Hello` completed.
    unique: Option<Box<str>>,
    /// Pre-built `sender=:1.N` header field, padded to 8 bytes.
    sender_field: Vec<u8>,
    /// Trailing padding bytes inside `sender_field`.
    sender_pad: usize,
    /// Raw bytes accumulated towards the next complete message.
    buf: Vec<u8>,
    /// The match rules this remote registered with `AddMatch`.
    matches: Vec<MatchRule>,
    send: RemoteSendFn,
}

impl Remote {
    fn is_ready(&self) -> bool {
        matches!(self.state, RemoteState::Ready)
    }
}

/// An in-process D-Bus broker.
///
/// Each remote is a self-contained parser and output queue; the server's
/// own structures must be driven from a single thread or under one lock,
/// which is left to the embedder.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use corebus::Server;
///
/// let mut server = Server::new();
///
/// let sink = Arc::new(Mutex::new(Vec::new()));
/// let out = Arc::clone(&sink);
///
/// let id = server.add_remote(Box::new(move |bytes| {
///     out.lock().unwrap().extend_from_slice(bytes);
///     Ok(bytes.len())
/// }));
///
/// server.recv(id, b"\0AUTH EXTERNAL 31303030\r\n")?;
/// assert!(sink.lock().unwrap().starts_with(b"OK "));
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Server {
    uuid: [u8; 16],
    remotes: HashMap<u64, Remote>,
    /// Remote ids in connection order, scanned for broadcast fan-out.
    order: Vec<u64>,
    next_id: u64,
    /// Sequence for `:1.N` unique names.
    next_unique: u32,
    /// Serial sequence for messages originated by the bus itself.
    serial: u32,
    queues: ServiceQueues,
    validator: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl Server {
    /// Construct a new broker with a random uuid.
    pub fn new() -> Self {
        Self {
            uuid: rand::random(),
            remotes: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            next_unique: 1,
            serial: 0,
            queues: ServiceQueues::new(),
            validator: None,
        }
    }

    /// Override the uuid reported during authentication.
    pub fn set_uuid(&mut self, uuid: [u8; 16]) {
        self.uuid = uuid;
    }

    /// Install the callback deciding whether an `EXTERNAL` identity is
    /// acceptable. Without one, every identity the transport admits is
    /// accepted.
    pub fn set_external_validator<F>(&mut self, validator: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
    }

    /// Register a new remote, identified by the returned id. Bytes for
    /// the remote's transport are pushed through `send`.
    pub fn add_remote(&mut self, send: RemoteSendFn) -> RemoteId {
        let id = self.next_id;
        self.next_id += 1;

        self.remotes.insert(
            id,
            Remote {
                state: RemoteState::AwaitingNul,
                unique: None,
                sender_field: Vec::new(),
                sender_pad: 0,
                buf: Vec::new(),
                matches: Vec::new(),
                send,
            },
        );

        self.order.push(id);
        RemoteId(id)
    }

    /// The unique name of a remote, if it has completed `Hello`.
    pub fn unique_name(&self, id: RemoteId) -> Option<&str> {
        self.remotes.get(&id.0)?.unique.as_deref()
    }

    /// Disconnect a remote, releasing every service-queue position it
    /// held and announcing the resulting ownership changes.
    pub fn disconnect(&mut self, id: RemoteId) {
        let Some(remote) = self.remotes.remove(&id.0) else {
            return;
        };

        self.order.retain(|&other| other != id.0);

        log::debug!("disconnected remote {:?}", remote.unique);

        for (name, transition) in self.queues.remove_remote(id.0) {
            self.announce(&name, transition, remote.unique.as_deref());
        }
    }

    /// Feed bytes received from a remote's transport.
    ///
    /// Protocol violations disconnect the remote and are returned as
    /// errors.
    pub fn recv(&mut self, id: RemoteId, bytes: &[u8]) -> Result<()> {
        match self.recv_inner(id, bytes) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.disconnect(id);
                Err(error)
            }
        }
    }

    fn recv_inner(&mut self, id: RemoteId, mut bytes: &[u8]) -> Result<()> {
        let uuid = self.uuid;
        let validator = self.validator.clone();

        {
            let Some(remote) = self.remotes.get_mut(&id.0) else {
                return Err(Error::new(ErrorKind::Disconnected));
            };

            if let RemoteState::AwaitingNul = remote.state {
                let Some((&0, rest)) = bytes.split_first() else {
                    if bytes.is_empty() {
                        return Ok(());
                    }

                    return Err(Error::new(ErrorKind::InvalidProtocol));
                };

                bytes = rest;

                let mut auth = ServerAuth::new(uuid);

                if let Some(validator) = validator {
                    auth.set_external_validator(Box::new(move |auth_id| validator(auth_id)));
                }

                remote.state = RemoteState::Authing(auth);
            }

            if let RemoteState::Authing(auth) = &mut remote.state {
                let mut out = Vec::new();
                let status = auth.parse(bytes, &mut out);

                if !out.is_empty() {
                    send_all(&mut remote.send, &out)?;
                }

                match status? {
                    SaslStatus::NeedMore => return Ok(()),
                    SaslStatus::Finished { consumed } => {
                        log::debug!("remote authenticated");
                        remote.state = RemoteState::NeedsHello;
                        bytes = &bytes[consumed..];
                    }
                }
            }

            remote.buf.extend_from_slice(bytes);
        }

        // Split and process every complete message that has accumulated.
        loop {
            let raw = {
                let Some(remote) = self.remotes.get_mut(&id.0) else {
                    return Ok(());
                };

                match frame_size(&remote.buf)? {
                    Some(total) if remote.buf.len() >= total => {
                        remote.buf.drain(..total).collect::<Vec<u8>>()
                    }
                    _ => break,
                }
            };

            self.process_message(id, raw)?;
        }

        Ok(())
    }

    fn process_message(&mut self, id: RemoteId, mut raw: Vec<u8>) -> Result<()> {
        normalize(&mut raw)?;

        let needs_hello = {
            let Some(remote) = self.remotes.get(&id.0) else {
                return Ok(());
            };

            matches!(remote.state, RemoteState::NeedsHello)
        };

        if needs_hello {
            let message = read_message(&raw)?;

            let hello = matches!(message.kind(), MessageKind::MethodCall { member, .. } if member == "Hello")
                && message.destination() == Some(fdo::DESTINATION);

            if !hello {
                return Err(Error::new(ErrorKind::InvalidProtocol));
            }

            let serial = message.serial();
            drop(message);
            self.remote_hello(id, serial)?;
            return Ok(());
        }

        let raw = self.rewrite_sender(id, &raw)?;

        {
            let message = read_message(&raw)?;

            let to_bus = message.destination() == Some(fdo::DESTINATION)
                || (message.destination().is_none()
                    && matches!(message.kind(), MessageKind::MethodCall { .. }));

            if to_bus {
                bus::dispatch(self, id, &message)?;
            } else if let Some(destination) = message.destination() {
                if self.queues.owner(destination).is_none() {
                    log::debug!("no owner for destination {destination}");

                    if matches!(message.kind(), MessageKind::MethodCall { .. }) {
                        let text = format!("no owner of {destination}");
                        bus::error_reply(self, id, &message, fdo::ERR_INVALID_DESTINATION, &text)?;
                    }
                }
            }
        }

        self.route(&raw)
    }

    /// Deliver a native-endian message image: once to the owner of its
    /// destination, and once to every other remote with a matching match
    /// rule. The direct recipient is excluded from the match scan so it
    /// never sees a duplicate.
    fn route(&mut self, raw: &[u8]) -> Result<()> {
        let message = read_message(raw)?;

        let direct = match message.destination() {
            Some(fdo::DESTINATION) => None,
            Some(destination) => self.queues.owner(destination),
            None => None,
        };

        let mut dead = Vec::new();

        for id in self.order.clone() {
            if Some(id) == direct {
                continue;
            }

            let Some(remote) = self.remotes.get_mut(&id) else {
                continue;
            };

            if !remote.is_ready() {
                continue;
            }

            if remote.matches.iter().any(|rule| rule.matches(&message)) {
                if let Err(error) = send_all(&mut remote.send, raw) {
                    log::warn!("dropping remote on send failure: {error}");
                    dead.push(id);
                }
            }
        }

        if let Some(direct) = direct {
            if let Some(remote) = self.remotes.get_mut(&direct) {
                if let Err(error) = send_all(&mut remote.send, raw) {
                    log::warn!("dropping remote on send failure: {error}");
                    dead.push(direct);
                }
            }
        }

        drop(message);

        for id in dead {
            self.disconnect(RemoteId(id));
        }

        Ok(())
    }

    /// Complete the `Hello` call: allocate the unique name, pre-build the
    /// sender rewrite blob, take implicit ownership of the unique name
    /// and reply with it.
    fn remote_hello(&mut self, id: RemoteId, serial: Serial) -> Result<()> {
        let unique = format!(":1.{}", self.next_unique);
        self.next_unique += 1;

        {
            let Some(remote) = self.remotes.get_mut(&id.0) else {
                return Ok(());
            };

            let (field, pad) = build_sender_field(&unique);
            remote.sender_field = field;
            remote.sender_pad = pad;
            remote.unique = Some(unique.clone().into_boxed_str());
            remote.state = RemoteState::Ready;
        }

        log::debug!("remote registered as {unique}");

        let (_, transition) = self.queues.request(id.0, &unique, Default::default());

        let mut body = crate::BodyBuf::new();
        body.store(unique.as_str())?;

        let reply = Message {
            kind: MessageKind::MethodReturn {
                reply_serial: serial,
            },
            serial: self.next_serial(),
            flags: Default::default(),
            interface: None,
            destination: Some(unique.as_str()),
            sender: Some(fdo::DESTINATION),
            body: body.as_body(),
        };

        self.send_to(id.0, reply)?;

        if let Some(transition) = transition {
            self.announce(&unique, transition, None);
        }

        Ok(())
    }

    /// Emit the ownership-change signals for one transition, in order:
    /// `NameLost` to the old owner, `NameAcquired` to the new owner,
    /// `NameOwnerChanged` to every interested remote.
    fn announce(&mut self, name: &str, transition: Transition, lost_unique: Option<&str>) {
        let old = transition
            .old
            .and_then(|id| self.remotes.get(&id).and_then(|r| r.unique.clone()))
            .or_else(|| lost_unique.map(Box::from));

        let new = transition
            .new
            .and_then(|id| self.remotes.get(&id).and_then(|r| r.unique.clone()));

        if let (Some(old), Some(id)) = (&old, transition.old) {
            let mut body = crate::BodyBuf::new();

            if body.store(name).is_ok() {
                let message = self
                    .bus_signal(fdo::NAME_LOST, &body)
                    .with_destination(old);

                if let Err(error) = self.send_to_checked(id, message) {
                    log::debug!("NameLost not delivered: {error}");
                }
            }
        }

        if let (Some(new), Some(id)) = (&new, transition.new) {
            let mut body = crate::BodyBuf::new();

            if body.store(name).is_ok() {
                let message = self
                    .bus_signal(fdo::NAME_ACQUIRED, &body)
                    .with_destination(new);

                if let Err(error) = self.send_to_checked(id, message) {
                    log::debug!("NameAcquired not delivered: {error}");
                }
            }
        }

        let mut body = crate::BodyBuf::new();

        let stored = body.store(name).is_ok()
            && body.store(old.as_deref().unwrap_or("")).is_ok()
            && body.store(new.as_deref().unwrap_or("")).is_ok();

        if stored {
            let message = self.bus_signal(fdo::NAME_OWNER_CHANGED, &body);
            let mut send = SendBuf::new();

            if send.write_message(message).is_ok() {
                let raw = send.get().to_vec();

                if let Err(error) = self.route(&raw) {
                    log::debug!("NameOwnerChanged not routed: {error}");
                }
            }
        }
    }

    fn bus_signal<'a>(&mut self, member: &'a str, body: &'a crate::BodyBuf) -> Message<'a> {
        Message::signal(fdo::PATH, member, self.next_serial())
            .with_interface(fdo::INTERFACE)
            .with_sender(fdo::DESTINATION)
            .with_body(body)
    }

    pub(super) fn next_serial(&mut self) -> Serial {
        loop {
            self.serial = self.serial.wrapping_add(1);

            if let Some(serial) = NonZeroU32::new(self.serial) {
                break Serial::new(serial);
            }
        }
    }

    /// Serialize and send a message to one remote.
    pub(super) fn send_to(&mut self, id: u64, message: Message<'_>) -> Result<()> {
        let mut send = SendBuf::new();
        send.write_message(message)?;

        let Some(remote) = self.remotes.get_mut(&id) else {
            return Err(Error::new(ErrorKind::Disconnected));
        };

        send_all(&mut remote.send, send.get())
    }

    fn send_to_checked(&mut self, id: u64, message: Message<'_>) -> Result<()> {
        if !self.remotes.contains_key(&id) {
            return Err(Error::new(ErrorKind::Disconnected));
        }

        self.send_to(id, message)
    }

    pub(super) fn queues(&mut self) -> &mut ServiceQueues {
        &mut self.queues
    }

    pub(super) fn queues_ref(&self) -> &ServiceQueues {
        &self.queues
    }

    pub(super) fn remote_matches(&mut self, id: u64) -> Option<&mut Vec<MatchRule>> {
        Some(&mut self.remotes.get_mut(&id)?.matches)
    }

    pub(super) fn remote_unique(&self, id: u64) -> Option<&str> {
        self.remotes.get(&id)?.unique.as_deref()
    }

    pub(super) fn announce_transition(
        &mut self,
        name: &str,
        transition: Transition,
    ) {
        self.announce(name, transition, None);
    }

    /// Strip any sender fields of an incoming message and splice in the
    /// pre-built `sender=:1.N` blob of its remote, fixing up the recorded
    /// header-field length.
    fn rewrite_sender(&self, id: RemoteId, raw: &[u8]) -> Result<Vec<u8>> {
        let Some(remote) = self.remotes.get(&id.0) else {
            return Err(Error::new(ErrorKind::Disconnected));
        };

        let fields_len = read_u32_at(raw, 12)? as usize;
        let fields_start = 16usize;
        let fields_end = fields_start + fields_len;
        let padded_end = fields_end + padding_to_align(8, fields_end);

        if raw.len() < padded_end {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let mut out = Vec::with_capacity(raw.len() + remote.sender_field.len());
        out.extend_from_slice(&raw[..fields_start]);

        // Walk the field entries, copying every span that is not a sender
        // field. Entry spans are 8-aligned, so removal keeps the rest
        // aligned.
        let mut at = fields_start;

        while at < fields_end {
            let end = field_entry_end(raw, at, fields_end)?;
            let padded = (end + padding_to_align(8, end)).min(padded_end);

            if raw[at] != HeaderField::SENDER.0 {
                out.extend_from_slice(&raw[at..padded]);
            }

            at = padded;
        }

        let kept = out.len() - fields_start;
        out.extend_from_slice(&remote.sender_field);

        let new_fields_len = kept + remote.sender_field.len() - remote.sender_pad;
        out[12..16].copy_from_slice(&(new_fields_len as u32).to_ne_bytes());

        out.extend_from_slice(&raw[padded_end..]);
        Ok(out)
    }
}

impl Default for Server {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the end offset (excluding padding) of the header-field entry
/// starting at `at`.
fn field_entry_end(raw: &[u8], at: usize, fields_end: usize) -> Result<usize> {
    use crate::buf::Aligned;
    use crate::proto::Endianness;
    use crate::{Body, Signature};

    let region = &raw[at..fields_end];
    let mut body = Body::from_raw_parts(Aligned::new(region), Endianness::NATIVE, Signature::EMPTY);

    let before = body.len();
    body.load::<u8>()?;
    let signature = body.read::<Signature>()?.to_owned();
    crate::signature::skip(&signature, &mut body)?;
    let used = before - body.len();

    Ok(at + used)
}

fn read_u32_at(raw: &[u8], at: usize) -> Result<u32> {
    let Some(bytes) = raw.get(at..at + 4) else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Pre-build the complete `sender=:1.N` header field, 8-byte padded.
fn build_sender_field(unique: &str) -> (Vec<u8>, usize) {
    let mut field = Vec::with_capacity(16 + unique.len());
    field.push(HeaderField::SENDER.0);
    field.extend_from_slice(&[1, b's', 0]);
    field.extend_from_slice(&(unique.len() as u32).to_ne_bytes());
    field.extend_from_slice(unique.as_bytes());
    field.push(0);

    let pad = padding_to_align(8, field.len());
    field.resize(field.len() + pad, 0);
    (field, pad)
}

/// Push bytes through a remote's send callback, treating a short write as
/// an error.
fn send_all(send: &mut RemoteSendFn, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        let n = send(bytes)?;

        if n == 0 || n > bytes.len() {
            return Err(Error::new(ErrorKind::ShortSend));
        }

        bytes = &bytes[n..];
    }

    Ok(())
}
