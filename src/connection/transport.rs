use std::env;
use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;

use crate::error::{Error, ErrorKind, Result};

const ENV_STARTER_ADDRESS: &str = "DBUS_STARTER_ADDRESS";
const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:file=/var/run/dbus/system_bus_socket";

/// The stream of a connection.
pub(crate) enum Transport {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Transport {
    /// Connect to the session bus.
    ///
    /// The address is resolved from `DBUS_STARTER_ADDRESS` and
    /// `DBUS_SESSION_BUS_ADDRESS`, in that order.
    pub(crate) fn session_bus() -> Result<Self> {
        Self::from_env([ENV_STARTER_ADDRESS, ENV_SESSION_BUS], None)
    }

    /// Connect to the system bus.
    ///
    /// The address is resolved from `DBUS_SYSTEM_BUS_ADDRESS` with a
    /// fallback to the well-known system socket.
    pub(crate) fn system_bus() -> Result<Self> {
        Self::from_env(
            [ENV_STARTER_ADDRESS, ENV_SYSTEM_BUS],
            Some(DEFAULT_SYSTEM_BUS),
        )
    }

    fn from_env<I>(envs: I, default: Option<&str>) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let address_storage;

        let address = 'address: {
            for env in envs {
                let Some(address) = env::var_os(env) else {
                    continue;
                };

                address_storage = address;
                break 'address address_storage.as_os_str();
            }

            if let Some(address) = default {
                break 'address OsStr::new(address);
            }

            return Err(Error::new(ErrorKind::MissingBus));
        };

        Self::from_address(address.as_bytes())
    }

    /// Connect to an explicit address of the form
    /// `<proto>:<key>=<value>,...`.
    pub(crate) fn from_address(address: &[u8]) -> Result<Self> {
        match parse_address(address)? {
            Address::Unix(path) => {
                let stream = UnixStream::connect(path)?;
                Ok(Transport::Unix(stream))
            }
            #[cfg(target_os = "linux")]
            Address::Abstract(name) => {
                use std::os::linux::net::SocketAddrExt;
                let address = std::os::unix::net::SocketAddr::from_abstract_name(name)?;
                let stream = UnixStream::connect_addr(&address)?;
                Ok(Transport::Unix(stream))
            }
            Address::Tcp(host, port) => {
                let stream = TcpStream::connect((host, port))?;
                Ok(Transport::Tcp(stream))
            }
        }
    }

    /// Set the stream as non-blocking.
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Transport::Unix(stream) => stream.set_nonblocking(nonblocking),
            Transport::Tcp(stream) => stream.set_nonblocking(nonblocking),
        }
    }
}

impl Read for Transport {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Unix(stream) => stream.read(buf),
            Transport::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Unix(stream) => stream.write(buf),
            Transport::Tcp(stream) => stream.write(buf),
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Unix(stream) => stream.flush(),
            Transport::Tcp(stream) => stream.flush(),
        }
    }
}

impl AsRawFd for Transport {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Transport::Unix(stream) => stream.as_raw_fd(),
            Transport::Tcp(stream) => stream.as_raw_fd(),
        }
    }
}

enum Address<'a> {
    Unix(&'a OsStr),
    #[cfg(target_os = "linux")]
    Abstract(&'a [u8]),
    Tcp(&'a str, u16),
}

fn parse_address(bytes: &[u8]) -> Result<Address<'_>> {
    let Some(colon) = bytes.iter().position(|&b| b == b':') else {
        return Err(Error::new(ErrorKind::InvalidAddress));
    };

    let (proto, mut rest) = bytes.split_at(colon);
    rest = &rest[1..];

    let mut path = None;
    #[cfg(target_os = "linux")]
    let mut abstract_name = None;
    let mut host = None;
    let mut port = None;

    for pair in rest.split(|&b| b == b',') {
        let Some(eq) = pair.iter().position(|&b| b == b'=') else {
            return Err(Error::new(ErrorKind::InvalidAddress));
        };

        let (key, value) = pair.split_at(eq);
        let value = &value[1..];

        match key {
            b"path" | b"file" => path = Some(value),
            #[cfg(target_os = "linux")]
            b"abstract" => abstract_name = Some(value),
            b"host" => host = Some(value),
            b"port" => port = Some(value),
            _ => return Err(Error::new(ErrorKind::InvalidAddress)),
        }
    }

    match proto {
        b"unix" => {
            #[cfg(target_os = "linux")]
            if let Some(name) = abstract_name {
                return Ok(Address::Abstract(name));
            }

            let Some(path) = path else {
                return Err(Error::new(ErrorKind::InvalidAddress));
            };

            Ok(Address::Unix(OsStr::from_bytes(path)))
        }
        b"tcp" => {
            let (Some(host), Some(port)) = (host, port) else {
                return Err(Error::new(ErrorKind::InvalidAddress));
            };

            let Ok(host) = core::str::from_utf8(host) else {
                return Err(Error::new(ErrorKind::InvalidAddress));
            };

            let Ok(port) = core::str::from_utf8(port).unwrap_or_default().parse() else {
                return Err(Error::new(ErrorKind::InvalidAddress));
            };

            Ok(Address::Tcp(host, port))
        }
        _ => Err(Error::new(ErrorKind::InvalidAddress)),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_address, Address};

    #[test]
    fn parse_addresses() {
        assert!(matches!(
            parse_address(b"unix:path=/run/user/1000/bus"),
            Ok(Address::Unix(..))
        ));
        assert!(matches!(
            parse_address(b"unix:file=/var/run/dbus/system_bus_socket"),
            Ok(Address::Unix(..))
        ));
        assert!(matches!(
            parse_address(b"tcp:host=localhost,port=12345"),
            Ok(Address::Tcp("localhost", 12345))
        ));
        assert!(parse_address(b"unix:").is_err());
        assert!(parse_address(b"tcp:host=x").is_err());
        assert!(parse_address(b"serial:device=ttyS0").is_err());
        assert!(parse_address(b"nocolon").is_err());
    }
}
