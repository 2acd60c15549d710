//! The table of outstanding method-call replies.

use core::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::org_freedesktop_dbus as fdo;
use crate::service::TrackedName;
use crate::{Body, Message, MessageKind, Serial};

/// The outcome a reply handler is invoked with.
#[derive(Debug)]
pub enum ReplyOutcome<'a> {
    /// The call returned successfully.
    Return(Body<'a>),
    /// The call failed with an error.
    Error {
        /// The D-Bus error name.
        name: &'a str,
        /// The error payload, typically leading with a message string.
        body: Body<'a>,
    },
}

/// A one-shot handler for a method reply.
pub type ReplyHandler = Box<dyn FnOnce(ReplyOutcome<'_>) + Send>;

/// The remote a reply is expected from.
pub(crate) enum Expected {
    /// Any remote; used for replies on point-to-point connections.
    Any,
    /// A resolved unique name, or the bus itself.
    Unique(Box<str>),
    /// A tracked well-known name whose owner is not yet resolved.
    Pending(Arc<TrackedName>),
}

struct ReplyEntry {
    expected: Expected,
    handler: Option<ReplyHandler>,
}

/// Serial-keyed table of reply records.
///
/// A record fires at most once, only for messages whose sender is the
/// expected remote's unique name, the bus, or unset, and is removed
/// atomically when it does.
pub(crate) struct ReplyTable {
    entries: RefCell<HashMap<u32, ReplyEntry>>,
}

impl ReplyTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Register a reply record for the given serial.
    pub(crate) fn insert(&self, serial: Serial, expected: Expected, handler: ReplyHandler) {
        self.entries.borrow_mut().insert(
            serial.get(),
            ReplyEntry {
                expected,
                handler: Some(handler),
            },
        );
    }

    /// Remove a reply record without firing it. The handler is dropped,
    /// which releases anything it owns.
    pub(crate) fn remove(&self, serial: Serial) -> bool {
        self.entries.borrow_mut().remove(&serial.get()).is_some()
    }

    /// Remove every record. Handlers are dropped unfired.
    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Pin the expected remote of a still-pending record to a resolved
    /// unique name.
    pub(crate) fn pin_pending(&self, serial: u32, unique: &str) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(&serial) {
            if matches!(entry.expected, Expected::Pending(..)) {
                entry.expected = Expected::Unique(unique.into());
            }
        }
    }

    /// Test whether a record would fire for the given message.
    pub(crate) fn would_fire(&self, message: &Message<'_>) -> bool {
        let Some(serial) = reply_serial(message) else {
            return false;
        };

        let entries = self.entries.borrow();

        let Some(entry) = entries.get(&serial.get()) else {
            return false;
        };

        sender_allowed(&entry.expected, message.sender())
    }

    /// Fire the record matching the message, if any.
    ///
    /// The record is removed before its handler runs, so a handler which
    /// provokes another lookup for the same serial cannot re-enter it.
    pub(crate) fn fire(&self, message: &Message<'_>) -> bool {
        let Some(serial) = reply_serial(message) else {
            return false;
        };

        let handler = {
            let mut entries = self.entries.borrow_mut();

            let Some(entry) = entries.get(&serial.get()) else {
                return false;
            };

            if !sender_allowed(&entry.expected, message.sender()) {
                return false;
            }

            let Some(entry) = entries.remove(&serial.get()) else {
                return false;
            };

            entry.handler
        };

        let Some(handler) = handler else {
            return false;
        };

        match message.kind() {
            MessageKind::MethodReturn { .. } => {
                handler(ReplyOutcome::Return(message.body()));
            }
            MessageKind::Error { error_name, .. } => {
                handler(ReplyOutcome::Error {
                    name: error_name,
                    body: message.body(),
                });
            }
            _ => return false,
        }

        true
    }
}

fn reply_serial(message: &Message<'_>) -> Option<Serial> {
    match message.kind() {
        MessageKind::MethodReturn { reply_serial } => Some(reply_serial),
        MessageKind::Error { reply_serial, .. } => Some(reply_serial),
        _ => None,
    }
}

/// Replies are only accepted from the expected remote, the bus server, or
/// with no sender at all.
fn sender_allowed(expected: &Expected, sender: Option<&str>) -> bool {
    let Some(sender) = sender else {
        return true;
    };

    if sender == fdo::DESTINATION {
        return true;
    }

    match expected {
        Expected::Any => true,
        Expected::Unique(unique) => &**unique == sender,
        Expected::Pending(tracked) => tracked.unique().is_some_and(|unique| &*unique == sender),
    }
}
