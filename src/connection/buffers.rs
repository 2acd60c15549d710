use crate::error::Result;
use crate::org_freedesktop_dbus::{self as fdo, NameFlag};
use crate::{BodyBuf, RecvBuf, SendBuf, Serial};

/// The heap-allocated buffers of a connection.
///
/// Keeping them separate from the [`Connection`] permits using every part
/// of the connection without running into borrowing issues.
///
/// [`Connection`]: crate::Connection
#[non_exhaustive]
pub struct Buffers {
    /// The receive buffer.
    pub recv: RecvBuf,
    /// The send buffer.
    pub send: SendBuf,
    /// A scratch buffer for constructing message bodies.
    pub body: BodyBuf,
}

impl Buffers {
    /// Construct a new set of buffers.
    pub fn new() -> Self {
        Self {
            recv: RecvBuf::new(),
            send: SendBuf::new(),
            body: BodyBuf::new(),
        }
    }

    /// Serialize a `Hello` message.
    ///
    /// This is the first message a client must send after connecting to
    /// the bus.
    pub fn hello(&mut self) -> Result<Serial> {
        let m = self
            .send
            .method_call(fdo::PATH, "Hello")
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION);

        self.send.write_message(m)
    }

    /// Serialize a `RequestName` call for the given name.
    ///
    /// This is used by servers to make themselves addressable.
    pub fn request_name(&mut self, name: &str, flags: NameFlag) -> Result<Serial> {
        self.body.clear();
        self.body.store(name)?;
        self.body.store(flags)?;

        let m = self
            .send
            .method_call(fdo::PATH, "RequestName")
            .with_interface(fdo::INTERFACE)
            .with_destination(fdo::DESTINATION)
            .with_body(&self.body);

        self.send.write_message(m)
    }
}

impl Default for Buffers {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
