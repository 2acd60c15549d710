pub use self::load_array::LoadArray;
mod load_array;

pub use self::load_dict::LoadDict;
mod load_dict;

use core::fmt;

use crate::buf::Aligned;
use crate::error::Result;
use crate::proto::Endianness;
use crate::ty;
use crate::{BodyBuf, Frame, Read, Signature};

/// A read-only view into the body of a [`Message`].
///
/// [`Message`]: crate::Message
///
/// # Examples
///
/// ```
/// use corebus::{BodyBuf, Endianness};
///
/// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
/// buf.store(42u32)?;
/// buf.store("foo")?;
///
/// let mut body = buf.as_body();
/// assert_eq!(body.load::<u32>()?, 42);
/// assert_eq!(body.read::<str>()?, "foo");
/// assert!(body.is_empty());
/// # Ok::<_, corebus::Error>(())
/// ```
pub struct Body<'a> {
    data: Aligned<'a>,
    endianness: Endianness,
    signature: &'a Signature,
}

impl<'a> Body<'a> {
    /// Construct an empty body.
    pub(crate) const fn empty() -> Self {
        Self::from_raw_parts(Aligned::empty(), Endianness::NATIVE, Signature::EMPTY)
    }

    /// Construct a new body wrapping the given data.
    #[inline]
    pub(crate) const fn from_raw_parts(
        data: Aligned<'a>,
        endianness: Endianness,
        signature: &'a Signature,
    ) -> Self {
        Self {
            data,
            endianness,
            signature,
        }
    }

    /// Deconstruct into raw parts.
    #[inline]
    pub(crate) fn into_raw_parts(self) -> (Aligned<'a>, Endianness, &'a Signature) {
        (self.data, self.endianness, self.signature)
    }

    /// Get the endianness of the body.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Adjust the endianness of the body.
    pub fn with_endianness(self, endianness: Endianness) -> Self {
        Self { endianness, ..self }
    }

    /// Get the signature of the body.
    pub fn signature(&self) -> &'a Signature {
        self.signature
    }

    /// Adjust the signature of the body.
    pub(crate) fn with_signature(self, signature: &'a Signature) -> Self {
        Self { signature, ..self }
    }

    /// Get the slice of the body that remains to be read.
    pub fn get(&self) -> &'a [u8] {
        self.data.get()
    }

    /// Test if the body is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remaining data to be read from the body.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Read a length-prefixed reference from the body.
    ///
    /// This is possible for unaligned types such as `str` and `[u8]` which
    /// implement [`Read`].
    pub fn read<T>(&mut self) -> Result<&'a T>
    where
        T: ?Sized + Read,
    {
        T::read_from(self)
    }

    /// Read `len` bytes from the body and make them accessible through
    /// another [`Body`] instance constituting that sub-slice.
    ///
    /// # Panics
    ///
    /// This panics if `len` is larger than [`len()`].
    ///
    /// [`len()`]: Self::len
    pub fn read_until(&mut self, len: usize) -> Body<'a> {
        Body::from_raw_parts(self.data.read_until(len), self.endianness, self.signature)
    }

    /// Read an array from the body.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// let mut array = buf.store_array::<u32>()?;
    /// array.store(10u32);
    /// array.store(20u32);
    /// array.store(30u32);
    /// array.finish();
    ///
    /// let mut buf = buf.as_body();
    /// let mut array = buf.load_array::<u32>()?;
    /// assert_eq!(array.load()?, Some(10));
    /// assert_eq!(array.load()?, Some(20));
    /// assert_eq!(array.load()?, Some(30));
    /// assert_eq!(array.load()?, None);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn load_array<E>(&mut self) -> Result<LoadArray<'a, E>>
    where
        E: ty::Marker,
    {
        LoadArray::from_mut(self)
    }

    /// Read a dict from the body.
    pub fn load_dict<K, V>(&mut self) -> Result<LoadDict<'a, K, V>>
    where
        K: ty::Marker,
        V: ty::Marker,
    {
        LoadDict::from_mut(self)
    }

    /// Read a struct from the body.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    /// use corebus::ty;
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// buf.store(10u8)?;
    ///
    /// buf.store_struct::<(u16, u32, ty::Str)>()?
    ///     .store(20u16)
    ///     .store(30u32)
    ///     .store("Hello World")
    ///     .finish();
    ///
    /// assert_eq!(buf.signature(), "y(qus)");
    ///
    /// let mut buf = buf.as_body();
    /// assert_eq!(buf.load::<u8>()?, 10u8);
    ///
    /// let (a, b, string) = buf.load_struct::<(u16, u32, ty::Str)>()?;
    /// assert_eq!(a, 20u16);
    /// assert_eq!(b, 30u32);
    /// assert_eq!(string, "Hello World");
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn load_struct<E>(&mut self) -> Result<E::Return<'a>>
    where
        E: ty::Fields,
    {
        self.align::<u64>()?;
        E::load_struct(self)
    }

    /// Load a frame of the given type.
    ///
    /// This advances the read cursor of the body by the alignment and size
    /// of the type. The return value has been endian-adjusted as per
    /// [`endianness()`].
    ///
    /// [`endianness()`]: Self::endianness
    pub fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        let mut frame = self.data.load::<T>()?;
        frame.adjust(self.endianness);
        Ok(frame)
    }

    /// Advance the read cursor by `n`.
    #[inline]
    pub(crate) fn advance(&mut self, n: usize) -> Result<()> {
        self.data.advance(n)
    }

    /// Align the read side of the body to the alignment of `T`.
    #[inline]
    pub(crate) fn align<T>(&mut self) -> Result<()> {
        self.data.align::<T>()
    }

    /// Align the read side of the body to a runtime alignment.
    #[inline]
    pub(crate) fn align_to(&mut self, align: usize) -> Result<()> {
        self.data.align_to(align)
    }

    /// Load a slice.
    #[inline]
    pub(crate) fn load_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.data.load_slice(len)
    }

    /// Load a slice ending with a NUL byte, excluding the NUL byte.
    #[inline]
    pub(crate) fn load_slice_nul(&mut self, len: usize) -> Result<&'a [u8]> {
        self.data.load_slice_nul(len)
    }
}

impl Clone for Body<'_> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            endianness: self.endianness,
            signature: self.signature,
        }
    }
}

impl fmt::Debug for Body<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("data", &self.data)
            .field("endianness", &self.endianness)
            .field("signature", &self.signature)
            .finish()
    }
}

impl<'a> PartialEq<Body<'a>> for Body<'_> {
    #[inline]
    fn eq(&self, other: &Body<'a>) -> bool {
        self.get() == other.get() && self.endianness == other.endianness
    }
}

impl PartialEq<BodyBuf> for Body<'_> {
    #[inline]
    fn eq(&self, other: &BodyBuf) -> bool {
        self.get() == other.get() && self.endianness == other.endianness()
    }
}

impl Eq for Body<'_> {}
