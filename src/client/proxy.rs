use core::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};

use crate::error::{Error, ErrorKind, Result};
use crate::{Client, MessageBuf, Serial};

/// The process-wide serial counter of a connection.
///
/// Serials are allocated with an atomic increment so that any thread
/// holding a [`Proxy`] can build messages.
pub(crate) struct Serials(AtomicU32);

impl Serials {
    pub(crate) fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub(crate) fn next(&self) -> Serial {
        loop {
            let serial = self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1);

            if let Some(serial) = NonZeroU32::new(serial) {
                break Serial::new(serial);
            }
        }
    }
}

/// The unique name assigned by the bus, shared so that observers on other
/// threads can wait for it.
pub(crate) struct UniqueName {
    name: Mutex<Option<String>>,
    cond: Condvar,
}

impl UniqueName {
    pub(crate) fn new() -> Self {
        Self {
            name: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.name.lock().unwrap().clone()
    }

    pub(crate) fn set(&self, name: String) {
        *self.name.lock().unwrap() = Some(name);
        self.cond.notify_all();
    }

    pub(crate) fn wait(&self) -> String {
        let mut name = self.name.lock().unwrap();

        loop {
            if let Some(name) = &*name {
                return name.clone();
            }

            name = self.cond.wait(name).unwrap();
        }
    }
}

/// A request hopped over to the connection's owner thread.
///
/// The apply hook runs on the owner thread; the release hook runs exactly
/// once, either after apply or when the request is dropped unapplied.
pub(crate) struct ProxyRequest {
    apply: Option<Box<dyn FnOnce(&Client) + Send>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ProxyRequest {
    pub(crate) fn apply(mut self, client: &Client) {
        if let Some(apply) = self.apply.take() {
            apply(client);
        }

        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ProxyRequest {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// A `Send` handle to a [`Client`] living on another thread.
///
/// Registrations and sends made through the proxy are applied by the
/// owner thread the next time it parses or dispatches.
///
/// [`Client`]: crate::Client
#[derive(Clone)]
pub struct Proxy {
    pub(crate) tx: Sender<ProxyRequest>,
    pub(crate) owner: ThreadId,
    pub(crate) serials: Arc<Serials>,
    pub(crate) unique_name: Arc<UniqueName>,
}

impl Proxy {
    /// Test if calls from the current thread need to be proxied.
    ///
    /// This is `false` on the thread owning the connection.
    pub fn should_proxy(&self) -> bool {
        thread::current().id() != self.owner
    }

    /// Allocate the next message serial.
    pub fn next_serial(&self) -> Serial {
        self.serials.next()
    }

    /// The unique name of the connection, if the bus has assigned one.
    pub fn unique_name(&self) -> Option<String> {
        self.unique_name.get()
    }

    /// Block until the bus has assigned a unique name.
    ///
    /// Must not be called from the owner thread, which is needed to make
    /// progress.
    pub fn wait_unique_name(&self) -> String {
        self.unique_name.wait()
    }

    /// Run a closure against the client on its owner thread.
    pub fn run<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&Client) + Send + 'static,
    {
        self.run_with_release(apply, || ())
    }

    /// Run a closure against the client on its owner thread, with a
    /// release hook which runs exactly once after apply, or on drop when
    /// the request never reaches the client.
    pub fn run_with_release<F, R>(&self, apply: F, release: R) -> Result<()>
    where
        F: FnOnce(&Client) + Send + 'static,
        R: FnOnce() + Send + 'static,
    {
        let request = ProxyRequest {
            apply: Some(Box::new(apply)),
            release: Some(Box::new(release)),
        };

        self.tx
            .send(request)
            .map_err(|_| Error::new(ErrorKind::Disconnected))
    }

    /// Queue an owned message for sending from the owner thread.
    pub fn send(&self, message: MessageBuf) -> Result<()> {
        self.run(move |client| {
            if let Err(error) = client.send_owned(&message) {
                log::warn!("proxied send failed: {error}");
            }
        })
    }
}
