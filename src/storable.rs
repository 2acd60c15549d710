use crate::signature::SignatureBuilder;
use crate::BodyBuf;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Trait used for types which can be stored in a body with a `store()`
/// call.
///
/// # Examples
///
/// ```
/// use corebus::BodyBuf;
///
/// let mut body = BodyBuf::new();
///
/// body.store(10u16)?;
/// body.store("Hello World")?;
///
/// assert_eq!(body.signature(), "qs");
/// # Ok::<_, corebus::Error>(())
/// ```
pub trait Storable: self::sealed::Sealed {
    /// Store `self` into the buffer.
    #[doc(hidden)]
    fn store_to(self, buf: &mut BodyBuf);

    /// Write the signature of the stored value.
    #[doc(hidden)]
    fn write_signature(builder: &mut SignatureBuilder) -> bool;
}

impl self::sealed::Sealed for String {}

impl Storable for String {
    #[inline]
    fn store_to(self, buf: &mut BodyBuf) {
        self.as_str().store_to(buf);
    }

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> bool {
        <&str as Storable>::write_signature(builder)
    }
}

impl self::sealed::Sealed for bool {}

/// A boolean is stored as a 32-bit 0 or 1.
///
/// # Examples
///
/// ```
/// use corebus::{BodyBuf, Signature};
///
/// let mut body = BodyBuf::new();
/// body.store(true)?;
///
/// assert_eq!(body.signature(), Signature::BOOL);
/// assert_eq!(body.get(), &[1, 0, 0, 0]);
/// # Ok::<_, corebus::Error>(())
/// ```
impl Storable for bool {
    #[inline]
    fn store_to(self, buf: &mut BodyBuf) {
        buf.store_frame(u32::from(self));
    }

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> bool {
        builder.extend_from_signature(crate::Signature::BOOL)
    }
}
