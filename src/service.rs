//! Tracking of well-known service names and their owners.

use core::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A tracked well-known name and the unique name currently owning it.
///
/// Shared with internal callbacks, which funnel every mutation back to
/// the owning thread.
pub(crate) struct TrackedName {
    service: Box<str>,
    unique: Mutex<Option<Box<str>>>,
    /// Serials of reply records awaiting the first owner resolution.
    pending: Mutex<Vec<u32>>,
}

impl TrackedName {
    fn new(service: &str) -> Self {
        Self {
            service: service.into(),
            unique: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The tracked well-known name.
    pub(crate) fn service(&self) -> &str {
        &self.service
    }

    /// The currently resolved owner, if any.
    pub(crate) fn unique(&self) -> Option<Box<str>> {
        self.unique.lock().unwrap().clone()
    }

    /// Record the current owner, or `None` when the name is unowned.
    pub(crate) fn set_unique(&self, unique: Option<&str>) {
        *self.unique.lock().unwrap() = unique.map(Box::from);
    }

    /// Queue a reply serial to be pinned once the owner resolves.
    pub(crate) fn push_pending(&self, serial: u32) {
        self.pending.lock().unwrap().push(serial);
    }

    /// Take the reply serials waiting for resolution.
    pub(crate) fn take_pending(&self) -> Vec<u32> {
        core::mem::take(&mut *self.pending.lock().unwrap())
    }
}

/// The per-connection set of tracked service names.
pub(crate) struct ServiceTracker {
    names: RefCell<HashMap<Box<str>, Arc<TrackedName>>>,
}

impl ServiceTracker {
    pub(crate) fn new() -> Self {
        Self {
            names: RefCell::new(HashMap::new()),
        }
    }

    /// Get the tracking record for a service, creating it on first use.
    ///
    /// Returns the record and whether it was just created; a new record
    /// requires the caller to subscribe to `NameOwnerChanged` and issue
    /// `GetNameOwner` once.
    pub(crate) fn track(&self, service: &str) -> (Arc<TrackedName>, bool) {
        let mut names = self.names.borrow_mut();

        if let Some(tracked) = names.get(service) {
            return (Arc::clone(tracked), false);
        }

        let tracked = Arc::new(TrackedName::new(service));
        names.insert(service.into(), Arc::clone(&tracked));
        (tracked, true)
    }

    /// Look up a tracking record without creating it.
    pub(crate) fn get(&self, service: &str) -> Option<Arc<TrackedName>> {
        self.names.borrow().get(service).cloned()
    }
}
