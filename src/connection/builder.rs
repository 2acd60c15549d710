use crate::error::Result;

use super::{Connection, Transport};

enum BusKind {
    Session,
    System,
    Address(Vec<u8>),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum AuthKind {
    /// No authentication.
    None,
    /// Authenticate as the current user, trying `EXTERNAL` first and
    /// falling back to `DBUS_COOKIE_SHA1`.
    Uid,
}

/// Builder of a [`Connection`].
pub struct ConnectionBuilder {
    bus: BusKind,
    auth: AuthKind,
}

impl ConnectionBuilder {
    /// Construct a new [`ConnectionBuilder`] with the default
    /// configuration.
    pub fn new() -> Self {
        Self {
            bus: BusKind::Session,
            auth: AuthKind::Uid,
        }
    }

    /// Explicitly disable authentication for this connection.
    pub fn no_auth(&mut self) -> &mut Self {
        self.auth = AuthKind::None;
        self
    }

    /// Connect to the session bus (default).
    pub fn session_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Session;
        self
    }

    /// Connect to the system bus.
    pub fn system_bus(&mut self) -> &mut Self {
        self.bus = BusKind::System;
        self
    }

    /// Connect to an explicit address such as
    /// `unix:path=/run/user/1000/bus` or `tcp:host=localhost,port=12345`.
    pub fn address(&mut self, address: &str) -> &mut Self {
        self.bus = BusKind::Address(address.as_bytes().to_vec());
        self
    }

    /// Construct and connect a [`Connection`] with the current
    /// configuration.
    pub fn build(&self) -> Result<Connection> {
        let transport = match &self.bus {
            BusKind::Session => Transport::session_bus()?,
            BusKind::System => Transport::system_bus()?,
            BusKind::Address(address) => Transport::from_address(address)?,
        };

        Ok(Connection::new(self.auth, transport)?)
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
