use crate::signature::SignatureBuilder;
use crate::{BodyBuf, ObjectPath, Signature, Storable};

/// A dynamically typed value prefixed by its inline signature.
///
/// # Examples
///
/// ```
/// use corebus::{BodyBuf, Signature, Variant};
///
/// let mut body = BodyBuf::new();
/// body.store(Variant::U32(42))?;
///
/// assert_eq!(body.signature(), Signature::VARIANT);
/// # Ok::<_, corebus::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Variant<'de> {
    /// A single byte.
    Byte(u8),
    /// A boolean value.
    Bool(bool),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 16-bit unsigned integer.
    U16(u16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A double-precision floating point number.
    Double(f64),
    /// A string.
    String(&'de str),
    /// An object path.
    ObjectPath(&'de ObjectPath),
    /// A signature.
    Signature(&'de Signature),
}

impl Variant<'_> {
    /// The signature of the value carried by the variant.
    pub fn signature(&self) -> &'static Signature {
        match self {
            Variant::Byte(..) => Signature::BYTE,
            Variant::Bool(..) => Signature::BOOL,
            Variant::I16(..) => Signature::INT16,
            Variant::U16(..) => Signature::UINT16,
            Variant::I32(..) => Signature::INT32,
            Variant::U32(..) => Signature::UINT32,
            Variant::I64(..) => Signature::INT64,
            Variant::U64(..) => Signature::UINT64,
            Variant::Double(..) => Signature::DOUBLE,
            Variant::String(..) => Signature::STRING,
            Variant::ObjectPath(..) => Signature::OBJECT_PATH,
            Variant::Signature(..) => Signature::SIGNATURE,
        }
    }
}

impl crate::storable::sealed::Sealed for Variant<'_> {}

impl Storable for Variant<'_> {
    #[inline]
    fn store_to(self, buf: &mut BodyBuf) {
        buf.write_only(self.signature());

        match self {
            Variant::Byte(value) => buf.store_frame(value),
            Variant::Bool(value) => buf.store_frame(u32::from(value)),
            Variant::I16(value) => buf.store_frame(value),
            Variant::U16(value) => buf.store_frame(value),
            Variant::I32(value) => buf.store_frame(value),
            Variant::U32(value) => buf.store_frame(value),
            Variant::I64(value) => buf.store_frame(value),
            Variant::U64(value) => buf.store_frame(value),
            Variant::Double(value) => buf.store_frame(value),
            Variant::String(value) => buf.write_only(value),
            Variant::ObjectPath(value) => buf.write_only(value),
            Variant::Signature(value) => buf.write_only(value),
        }
    }

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> bool {
        builder.extend_from_signature(Signature::VARIANT)
    }
}
