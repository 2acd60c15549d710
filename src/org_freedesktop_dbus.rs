//! Names and constants of the `org.freedesktop.DBus` interface.

use crate::proto::Endianness;
use crate::{Frame, Signature};

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: &crate::ObjectPath = crate::ObjectPath::new_const(b"/org/freedesktop/DBus");

/// The interface of the introspection builtin.
pub const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";

/// The interface of the properties builtin.
pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";

/// Signal emitted when the owner of a name changes.
pub const NAME_OWNER_CHANGED: &str = "NameOwnerChanged";

/// Signal sent to the connection which acquired a name.
pub const NAME_ACQUIRED: &str = "NameAcquired";

/// Signal sent to the connection which lost a name.
pub const NAME_LOST: &str = "NameLost";

/// Standard error raised for an unknown object path.
pub const ERR_UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";

/// Standard error raised for an unknown interface.
pub const ERR_UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";

/// Standard error raised for an unknown method.
pub const ERR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";

/// Standard error raised for an unknown property.
pub const ERR_UNKNOWN_PROPERTY: &str = "org.freedesktop.DBus.Error.UnknownProperty";

/// Standard error raised when writing a read-only property.
pub const ERR_PROPERTY_READ_ONLY: &str = "org.freedesktop.DBus.Error.PropertyReadOnly";

/// Standard error raised when reading a write-only property.
pub const ERR_PROPERTY_WRITE_ONLY: &str = "org.freedesktop.DBus.Error.PropertyWriteOnly";

/// Standard error raised for malformed arguments.
pub const ERR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

/// Standard error raised when a destination has no owner.
pub const ERR_INVALID_DESTINATION: &str = "org.freedesktop.DBus.Error.InvalidDestination";

/// Standard error raised when a name has no owner.
pub const ERR_NAME_HAS_NO_OWNER: &str = "org.freedesktop.DBus.Error.NameHasNoOwner";

/// Standard error raised for a malformed match rule.
pub const ERR_MATCH_RULE_INVALID: &str = "org.freedesktop.DBus.Error.MatchRuleInvalid";

/// Standard error raised when a match rule to remove is unknown.
pub const ERR_MATCH_RULE_NOT_FOUND: &str = "org.freedesktop.DBus.Error.MatchRuleNotFound";

/// Catch-all standard error.
pub const ERR_FAILED: &str = "org.freedesktop.DBus.Error.Failed";

raw_set! {
    /// The flags to a `RequestName` call.
    #[repr(u32)]
    pub enum NameFlag {
        /// Allow a later `RequestName` with [`NameFlag::REPLACE_EXISTING`]
        /// to take the name over; losing it is announced through a
        /// `NameLost` signal.
        ALLOW_REPLACEMENT = 1,
        /// Try to replace the current owner, which only succeeds when the
        /// owner specified [`NameFlag::ALLOW_REPLACEMENT`].
        REPLACE_EXISTING = 2,
        /// Fail instead of waiting in the ownership queue when the name is
        /// taken; also removes any prior queue entry.
        DO_NOT_QUEUE = 4,
    }
}

impl crate::frame::sealed::Sealed for NameFlag {}

unsafe impl Frame for NameFlag {
    const SIGNATURE: &'static Signature = Signature::UINT32;

    #[inline]
    fn adjust(&mut self, endianness: Endianness) {
        self.0.adjust(endianness);
    }
}

impl_traits_for_frame!(NameFlag);

raw_enum! {
    /// The reply to a `RequestName` call.
    #[repr(u32)]
    pub enum NameReply {
        /// The caller is now the primary owner of the name.
        PRIMARY_OWNER = 1,
        /// The name already has an owner and the caller was appended to
        /// its ownership queue.
        IN_QUEUE = 2,
        /// The name already has an owner and [`NameFlag::DO_NOT_QUEUE`]
        /// was specified.
        EXISTS = 3,
        /// The caller already owns the name.
        ALREADY_OWNER = 4,
    }
}

impl crate::frame::sealed::Sealed for NameReply {}

unsafe impl Frame for NameReply {
    const SIGNATURE: &'static Signature = Signature::UINT32;

    #[inline]
    fn adjust(&mut self, endianness: Endianness) {
        self.0.adjust(endianness);
    }
}

impl_traits_for_frame!(NameReply);

raw_enum! {
    /// The reply to a `ReleaseName` call.
    #[repr(u32)]
    pub enum ReleaseNameReply {
        /// The caller released the name.
        RELEASED = 1,
        /// The name does not exist.
        NON_EXISTENT = 2,
        /// The caller was neither owner nor queued for the name.
        NOT_OWNER = 3,
    }
}

impl crate::frame::sealed::Sealed for ReleaseNameReply {}

unsafe impl Frame for ReleaseNameReply {
    const SIGNATURE: &'static Signature = Signature::UINT32;

    #[inline]
    fn adjust(&mut self, endianness: Endianness) {
        self.0.adjust(endianness);
    }
}

impl_traits_for_frame!(ReleaseNameReply);
