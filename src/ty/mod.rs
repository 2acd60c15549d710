//! Type [`Marker`]s for writing to and reading from type-checked D-Bus
//! bodies.
//!
//! # Examples
//!
//! ```
//! use corebus::{BodyBuf, Endianness};
//! use corebus::ty;
//!
//! let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
//! buf.store(10u8)?;
//!
//! buf.store_struct::<(u16, u32, ty::Array<u8>, ty::Str)>()?
//!     .store(10u16)
//!     .store(10u32)
//!     .store_array(|w| {
//!         w.store(1u8);
//!         w.store(2u8);
//!         w.store(3u8);
//!     })
//!     .store("Hello World")
//!     .finish();
//!
//! assert_eq!(buf.signature(), b"y(quays)");
//! # Ok::<_, corebus::Error>(())
//! ```

pub use self::fields::Fields;
mod fields;

pub use self::r#unsized::Unsized;
pub(crate) mod r#unsized;

pub use self::marker::Marker;
pub(crate) mod marker;

pub use self::aligned::Aligned;
pub(crate) mod aligned;

use core::marker::PhantomData;

use crate::error::ErrorKind;
use crate::signature::SignatureBuilder;
use crate::{Body, Error, LoadArray, LoadDict, Result, SignatureError};

/// The [`Marker`] for the [`str`] type.
#[non_exhaustive]
pub struct Str;

impl_trait_unsized_marker!(Str, u32, str, STRING);

/// The [`Marker`] for the [`Signature`] type.
///
/// [`Signature`]: crate::Signature
#[non_exhaustive]
pub struct Signature;

impl_trait_unsized_marker!(Signature, u8, crate::Signature, SIGNATURE);

/// The [`Marker`] for the [`ObjectPath`] type.
///
/// [`ObjectPath`]: crate::ObjectPath
#[non_exhaustive]
pub struct ObjectPath;

impl_trait_unsized_marker!(ObjectPath, u32, crate::ObjectPath, OBJECT_PATH);

/// The [`Marker`] for booleans, which are stored as a 32-bit 0 or 1.
///
/// # Examples
///
/// ```
/// use corebus::{BodyBuf, Endianness};
/// use corebus::ty;
///
/// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
///
/// buf.store_struct::<(ty::Bool, u32)>()?
///     .store(true)
///     .store(42u32)
///     .finish();
///
/// assert_eq!(buf.signature(), b"(bu)");
///
/// let mut b = buf.as_body();
/// let (on, n) = b.load_struct::<(ty::Bool, u32)>()?;
/// assert!(on);
/// assert_eq!(n, 42);
/// # Ok::<_, corebus::Error>(())
/// ```
#[non_exhaustive]
pub struct Bool;

impl self::aligned::sealed::Sealed for Bool {}

impl Aligned for Bool {
    type Alignment = u32;
}

impl self::marker::sealed::Sealed for Bool {}

impl Marker for Bool {
    type Return<'de> = bool;

    #[inline]
    fn load_from<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>> {
        Ok(buf.load::<u32>()? != 0)
    }

    #[inline]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !signature.extend_from_signature(crate::Signature::BOOL) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }
}

/// The [`Marker`] for an array type with elements of type `T`.
///
/// # Examples
///
/// ```
/// use corebus::{BodyBuf, Signature};
/// use corebus::ty;
///
/// let mut buf = BodyBuf::new();
///
/// buf.store_struct::<(u8, ty::Array<ty::Str>)>()?
///     .store(42u8)
///     .store_array(|w| {
///         w.store("Hello");
///         w.store("World");
///     })
///     .finish();
///
/// assert_eq!(buf.signature(), b"(yas)");
///
/// let mut b = buf.as_body();
///
/// let (n, mut array) = b.load_struct::<(u8, ty::Array<ty::Str>)>()?;
///
/// assert_eq!(n, 42u8);
/// assert_eq!(array.read()?, Some("Hello"));
/// assert_eq!(array.read()?, Some("World"));
/// assert_eq!(array.read()?, None);
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Array<T>(PhantomData<T>);

impl<T> self::aligned::sealed::Sealed for Array<T> where T: Aligned {}

impl<T> Aligned for Array<T>
where
    T: Aligned,
{
    type Alignment = u32;
}

impl<T> self::marker::sealed::Sealed for Array<T> where T: Marker {}

impl<T> Marker for Array<T>
where
    T: Marker,
{
    type Return<'de> = LoadArray<'de, T>;

    #[inline]
    fn load_from<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>> {
        buf.load_array::<T>()
    }

    #[inline]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError> {
        signature.open_array()?;
        T::write_signature(signature)?;
        signature.close_array();
        Ok(())
    }
}

/// The [`Marker`] for a dict, an array of key-value entries.
///
/// # Examples
///
/// ```
/// use corebus::BodyBuf;
/// use corebus::ty;
///
/// let mut buf = BodyBuf::new();
///
/// let mut dict = buf.store_dict::<ty::Str, u32>()?;
/// dict.store_entry("a", 1u32);
/// dict.store_entry("b", 2u32);
/// dict.finish();
///
/// assert_eq!(buf.signature(), b"a{su}");
///
/// let mut b = buf.as_body();
/// let mut dict = b.load_dict::<ty::Str, u32>()?;
/// assert_eq!(dict.load_entry()?, Some(("a", 1)));
/// assert_eq!(dict.load_entry()?, Some(("b", 2)));
/// assert_eq!(dict.load_entry()?, None);
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Dict<K, V>(PhantomData<(K, V)>);

impl<K, V> self::aligned::sealed::Sealed for Dict<K, V>
where
    K: Aligned,
    V: Aligned,
{
}

impl<K, V> Aligned for Dict<K, V>
where
    K: Aligned,
    V: Aligned,
{
    type Alignment = u32;
}

impl<K, V> self::marker::sealed::Sealed for Dict<K, V>
where
    K: Marker,
    V: Marker,
{
}

impl<K, V> Marker for Dict<K, V>
where
    K: Marker,
    V: Marker,
{
    type Return<'de> = LoadDict<'de, K, V>;

    #[inline]
    fn load_from<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>> {
        buf.load_dict::<K, V>()
    }

    #[inline]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError> {
        signature.open_array()?;
        signature.open_dict_entry()?;
        K::write_signature(signature)?;
        V::write_signature(signature)?;
        signature.close_dict_entry()?;
        signature.close_array();
        Ok(())
    }
}

/// The [`Marker`] for the [`Variant`] type.
///
/// [`Variant`]: crate::Variant
#[non_exhaustive]
pub struct Variant;

impl self::aligned::sealed::Sealed for Variant {}

impl Aligned for Variant {
    type Alignment = u8;
}

impl self::marker::sealed::Sealed for Variant {}

impl Marker for Variant {
    type Return<'de> = crate::Variant<'de>;

    #[inline]
    fn load_from<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>> {
        let signature: &crate::Signature = buf.read()?;

        let variant = match signature.as_bytes() {
            b"y" => crate::Variant::Byte(buf.load()?),
            b"b" => crate::Variant::Bool(buf.load::<u32>()? != 0),
            b"n" => crate::Variant::I16(buf.load()?),
            b"q" => crate::Variant::U16(buf.load()?),
            b"i" => crate::Variant::I32(buf.load()?),
            b"u" => crate::Variant::U32(buf.load()?),
            b"x" => crate::Variant::I64(buf.load()?),
            b"t" => crate::Variant::U64(buf.load()?),
            b"d" => crate::Variant::Double(buf.load()?),
            b"s" => crate::Variant::String(buf.read()?),
            b"o" => crate::Variant::ObjectPath(buf.read()?),
            b"g" => crate::Variant::Signature(buf.read()?),
            _ => {
                return Err(Error::new(ErrorKind::UnsupportedVariant(signature.into())));
            }
        };

        Ok(variant)
    }

    #[inline]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !signature.extend_from_signature(crate::Signature::VARIANT) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }
}
