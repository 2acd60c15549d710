//! A pure Rust D-Bus client library and in-process message broker.
//!
//! The crate covers the hard parts of speaking D-Bus: the binary wire
//! format with its strict alignment rules, the SASL handshake, the
//! per-connection dispatch engine with binds, matches and reply tracking,
//! and an in-process broker with service-name queues and match-based
//! routing. Sockets, threads and time are the embedder's business: bytes
//! are pushed in and pulled out through callbacks, with an optional
//! Tokio-backed [`Connection`] for the common case.
//!
//! * [`Client`] is the per-connection engine: feed it bytes with
//!   [`Client::parse`], process them with [`Client::dispatch`].
//! * [`Server`] is the broker: register remotes and feed each one's
//!   bytes with [`Server::recv`].
//! * [`BodyBuf`] and [`Body`] encode and decode argument payloads.

#![allow(clippy::module_inception)]

#[macro_use]
mod macros;

#[doc(inline)]
pub use self::proto::{Endianness, Flags, MessageType};
pub(crate) mod proto;

pub mod org_freedesktop_dbus;

#[doc(inline)]
pub use self::write::Write;
mod write;

#[doc(inline)]
pub use self::read::Read;
mod read;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

pub(crate) mod buf;

#[doc(inline)]
pub use self::body_buf::{BodyBuf, StoreArray, StoreDict, StoreStruct};
mod body_buf;

#[doc(inline)]
pub use self::body::{Body, LoadArray, LoadDict};
mod body;

#[doc(inline)]
pub use self::send_buf::SendBuf;
mod send_buf;

#[doc(inline)]
pub use self::recv_buf::RecvBuf;
mod recv_buf;

pub mod sasl;

#[doc(inline)]
pub use self::signature::{Signature, SignatureBuf, SignatureError};
pub(crate) mod signature;

#[doc(inline)]
pub use self::frame::Frame;
mod frame;

#[doc(inline)]
pub use self::storable::Storable;
mod storable;

#[doc(inline)]
pub use self::message::{Message, MessageBuf, MessageKind, Serial};
mod message;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathBuf, ObjectPathError};
mod object_path;

pub mod names;

#[doc(inline)]
pub use self::match_rule::{MatchRule, MatchRuleError};
mod match_rule;

#[doc(inline)]
pub use self::variant::Variant;
mod variant;

pub mod ty;

#[doc(inline)]
pub use self::arguments::Arguments;
mod arguments;

#[doc(inline)]
pub use self::interface::{
    DeferredReply, ErrorReply, Interface, InterfaceBuilder, MethodBuilder, MethodCall,
    PropertyBuilder, SignalBuilder,
};
mod interface;

pub(crate) mod object_tree;

#[doc(inline)]
pub use self::reply::{ReplyHandler, ReplyOutcome};
mod reply;

pub(crate) mod service;

#[doc(inline)]
pub use self::client::{Client, MatchCallback, MatchHandle, Matched, Proxy, TransportFn};
mod client;

#[doc(inline)]
pub use self::state::State;
mod state;

#[doc(inline)]
pub use self::server::{RemoteId, RemoteSendFn, Server};
mod server;

#[cfg(feature = "tokio")]
#[doc(inline)]
pub use self::connection::{Buffers, Connection, ConnectionBuilder};
#[cfg(feature = "tokio")]
mod connection;

mod utils;
