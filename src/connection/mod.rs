pub(crate) use self::transport::Transport;
mod transport;

pub use self::builder::ConnectionBuilder;
mod builder;

pub use self::connection::Connection;
mod connection;

pub use self::buffers::Buffers;
mod buffers;
