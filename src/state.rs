//! The registration book which undoes asynchronous registrations.

use std::sync::{Arc, Mutex};

use crate::client::{MatchCallback, MatchHandle, Proxy};
use crate::reply::ReplyHandler;
use crate::{Interface, MatchRule, MessageBuf, ObjectPathBuf, Serial};

enum Shadow {
    Match { proxy: Proxy, handle: MatchHandle },
    Bind {
        proxy: Proxy,
        path: ObjectPathBuf,
        interface: Box<str>,
    },
    Reply { proxy: Proxy, serial: Serial },
}

/// A per-caller book which shadows every registration made through it and
/// undoes them all on [`reset`] or drop.
///
/// This is the supported way to guarantee that asynchronous registrations
/// are removed before their callbacks' captured context goes away. All
/// methods may be called from any thread; registrations and removals hop
/// to the connection's owner thread through its [`Proxy`].
///
/// [`reset`]: State::reset
///
/// # Examples
///
/// ```no_run
/// use corebus::{Client, MatchRule, State};
///
/// let client = Client::new();
/// let state = State::new();
///
/// state.add_match(
///     &client.proxy(),
///     MatchRule::new().with_member("Changed"),
///     Box::new(|_| false),
/// );
///
/// // All registrations made through `state` are undone here.
/// state.reset();
/// ```
pub struct State {
    shadows: Mutex<Vec<Shadow>>,
}

impl State {
    /// Construct a new empty registration book.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shadows: Mutex::new(Vec::new()),
        })
    }

    /// Register a match filter, shadowing it for removal on reset.
    pub fn add_match(self: &Arc<Self>, proxy: &Proxy, rule: MatchRule, callback: MatchCallback) {
        self.add_match_inner(proxy, rule, false, callback);
    }

    /// Register a match filter forwarded to the bus, shadowing it for
    /// removal on reset.
    pub fn add_match_to_bus(
        self: &Arc<Self>,
        proxy: &Proxy,
        rule: MatchRule,
        callback: MatchCallback,
    ) {
        self.add_match_inner(proxy, rule, true, callback);
    }

    fn add_match_inner(
        self: &Arc<Self>,
        proxy: &Proxy,
        rule: MatchRule,
        bus: bool,
        callback: MatchCallback,
    ) {
        let state = Arc::clone(self);
        let shadow_proxy = proxy.clone();

        let result = proxy.run(move |client| {
            let result = if bus {
                client.add_match_to_bus(rule, callback)
            } else {
                client.add_match(rule, callback)
            };

            match result {
                Ok(handle) => {
                    state.shadows.lock().unwrap().push(Shadow::Match {
                        proxy: shadow_proxy,
                        handle,
                    });
                }
                Err(error) => {
                    log::warn!("match registration failed: {error}");
                }
            }
        });

        if let Err(error) = result {
            log::warn!("match registration dropped: {error}");
        }
    }

    /// Bind an interface at a path, shadowing the bind for removal on
    /// reset.
    pub fn bind(self: &Arc<Self>, proxy: &Proxy, path: ObjectPathBuf, interface: Arc<Interface>) {
        let state = Arc::clone(self);
        let shadow_proxy = proxy.clone();

        let result = proxy.run(move |client| {
            let name: Box<str> = interface.name().into();

            match client.bind(&path, interface) {
                Ok(()) => {
                    state.shadows.lock().unwrap().push(Shadow::Bind {
                        proxy: shadow_proxy,
                        path,
                        interface: name,
                    });
                }
                Err(error) => {
                    log::warn!("bind failed: {error}");
                }
            }
        });

        if let Err(error) = result {
            log::warn!("bind dropped: {error}");
        }
    }

    /// Send a method call with a reply handler, shadowing the reply
    /// record for cancellation on reset.
    ///
    /// The message must already carry its serial, typically from
    /// [`Proxy::next_serial`].
    pub fn call(self: &Arc<Self>, proxy: &Proxy, message: MessageBuf, handler: ReplyHandler) {
        let state = Arc::clone(self);
        let shadow_proxy = proxy.clone();

        let result = proxy.run(move |client| {
            let serial = message.serial();

            match client.call(message.borrow(), handler) {
                Ok(..) => {
                    state.shadows.lock().unwrap().push(Shadow::Reply {
                        proxy: shadow_proxy,
                        serial,
                    });
                }
                Err(error) => {
                    log::warn!("call failed: {error}");
                }
            }
        });

        if let Err(error) = result {
            log::warn!("call dropped: {error}");
        }
    }

    /// Undo every shadowed registration.
    ///
    /// Removals are proxied back to each connection's owner thread; a
    /// registration which raced with this reset is removed when the
    /// owner thread next pumps its proxy queue.
    pub fn reset(&self) {
        let shadows = core::mem::take(&mut *self.shadows.lock().unwrap());

        for shadow in shadows {
            let result = match shadow {
                Shadow::Match { proxy, handle } => proxy.run(move |client| {
                    if let Err(error) = client.remove_match(handle) {
                        log::debug!("match removal failed: {error}");
                    }
                }),
                Shadow::Bind {
                    proxy,
                    path,
                    interface,
                } => proxy.run(move |client| {
                    if let Err(error) = client.unbind(&path, &interface) {
                        log::debug!("unbind failed: {error}");
                    }
                }),
                Shadow::Reply { proxy, serial } => proxy.run(move |client| {
                    client.cancel_reply(serial);
                }),
            };

            if let Err(error) = result {
                log::debug!("reset removal dropped: {error}");
            }
        }
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.reset();
    }
}
