use std::io::{self, Read, Write};

use tokio::io::unix::AsyncFd;

use crate::error::Result;
use crate::sasl::{ClientAuth, SaslStatus};
use crate::MessageBuf;

use super::builder::AuthKind;
use super::{Buffers, ConnectionBuilder, Transport};

enum ConnectionState {
    /// SASL negotiation has not started.
    Start,
    /// SASL negotiation is in progress.
    Sasl(Box<ClientAuth>),
    /// The message stream is established.
    Idle,
}

/// An asynchronous D-Bus connection.
///
/// # Examples
///
/// ```no_run
/// use corebus::{Buffers, Connection};
///
/// # #[tokio::main] async fn main() -> corebus::Result<()> {
/// let mut c = Connection::session_bus()?;
/// let mut buf = Buffers::new();
///
/// c.connect(&mut buf).await?;
/// buf.hello()?;
///
/// let message = c.wait(&mut buf).await?;
/// # Ok(()) }
/// ```
pub struct Connection {
    state: ConnectionState,
    /// Bytes produced by the SASL exchange, pending write.
    auth_out: Vec<u8>,
    /// Poller for the underlying stream.
    transport: AsyncFd<Transport>,
}

impl Connection {
    pub(crate) fn new(auth: AuthKind, transport: Transport) -> io::Result<Self> {
        transport.set_nonblocking(true)?;

        Ok(Self {
            state: match auth {
                AuthKind::Uid => ConnectionState::Start,
                AuthKind::None => ConnectionState::Idle,
            },
            auth_out: match auth {
                // Without authentication, only the leading NUL and BEGIN
                // are sent.
                AuthKind::None => b"\0BEGIN\r\n".to_vec(),
                AuthKind::Uid => Vec::new(),
            },
            transport: AsyncFd::new(transport)?,
        })
    }

    /// Shorthand for connecting to the session bus with the default
    /// configuration.
    #[inline]
    pub fn session_bus() -> Result<Self> {
        ConnectionBuilder::new().session_bus().build()
    }

    /// Shorthand for connecting to the system bus with the default
    /// configuration.
    #[inline]
    pub fn system_bus() -> Result<Self> {
        ConnectionBuilder::new().system_bus().build()
    }

    /// Test if the SASL exchange has completed.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Idle)
    }

    /// Drive the SASL exchange to completion.
    ///
    /// This must be awaited before messages can be sent or received.
    pub async fn connect(&mut self, buf: &mut Buffers) -> Result<()> {
        loop {
            if matches!(self.state, ConnectionState::Start) {
                #[cfg(all(unix, feature = "libc"))]
                let mut auth = ClientAuth::new();
                #[cfg(not(all(unix, feature = "libc")))]
                let mut auth = ClientAuth::with_identity("");

                self.auth_out.push(0);
                auth.start(&mut self.auth_out)?;
                self.state = ConnectionState::Sasl(Box::new(auth));
            }

            if matches!(self.state, ConnectionState::Idle) {
                self.write_auth().await?;
                return Ok(());
            }

            self.write_auth().await?;

            let mut chunk = [0u8; 1024];
            let n = self.read_chunk(&mut chunk).await?;

            let ConnectionState::Sasl(auth) = &mut self.state else {
                continue;
            };

            match auth.parse(&chunk[..n], &mut self.auth_out)? {
                SaslStatus::NeedMore => {}
                SaslStatus::Finished { consumed } => {
                    // Anything after the final line already belongs to
                    // the message stream.
                    buf.recv.push(&chunk[consumed..n]);
                    self.state = ConnectionState::Idle;
                }
            }
        }
    }

    /// Write out every message pending in the send buffer.
    pub async fn flush(&mut self, buf: &mut Buffers) -> Result<()> {
        while !buf.send.is_empty() {
            let mut guard = self.transport.writable_mut().await?;

            match guard.get_inner_mut().write(buf.send.get()) {
                Ok(n) => buf.send.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    guard.clear_ready();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Wait for the next complete message, flushing pending sends while
    /// doing so.
    pub async fn wait(&mut self, buf: &mut Buffers) -> Result<MessageBuf> {
        loop {
            if let Some(message) = buf.recv.take_message()? {
                return Ok(message);
            }

            self.flush(buf).await?;

            let mut chunk = [0u8; 4096];
            let n = self.read_chunk(&mut chunk).await?;
            buf.recv.push(&chunk[..n]);
        }
    }

    async fn write_auth(&mut self) -> Result<()> {
        while !self.auth_out.is_empty() {
            let mut guard = self.transport.writable_mut().await?;

            match guard.get_inner_mut().write(&self.auth_out) {
                Ok(n) => {
                    self.auth_out.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    guard.clear_ready();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    async fn read_chunk(&mut self, chunk: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.transport.readable_mut().await?;

            match guard.get_inner_mut().read(chunk) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    guard.clear_ready();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
