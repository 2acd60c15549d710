pub use self::store_array::StoreArray;
mod store_array;

pub use self::store_struct::StoreStruct;
mod store_struct;

pub use self::store_dict::StoreDict;
mod store_dict;

use core::fmt;

use crate::arguments::Arguments;
use crate::buf::{AlignedBuf, Alloc};
use crate::error::Result;
use crate::proto::Endianness;
use crate::signature::{SignatureBuilder, SignatureError};
use crate::ty;
use crate::{Body, Frame, Signature, SignatureBuf, Storable, Write};

/// A buffer that can be used to write the body of a message.
///
/// # Examples
///
/// ```
/// use corebus::BodyBuf;
///
/// let mut body = BodyBuf::new();
///
/// body.store(10u16)?;
/// body.store(10u32)?;
///
/// assert_eq!(body.signature(), "qu");
/// # Ok::<_, corebus::Error>(())
/// ```
#[derive(Clone)]
pub struct BodyBuf {
    buf: AlignedBuf,
    endianness: Endianness,
    signature: SignatureBuilder,
}

impl BodyBuf {
    /// Construct a new empty body buffer in native endianness.
    pub fn new() -> Self {
        Self::with_endianness(Endianness::NATIVE)
    }

    /// Construct a new body buffer with the specified endianness.
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self {
            signature: SignatureBuilder::new(),
            endianness,
            buf: AlignedBuf::new(),
        }
    }

    /// Construct a body buffer from its raw parts.
    pub(crate) fn from_raw_parts(
        buf: AlignedBuf,
        endianness: Endianness,
        signature: SignatureBuf,
    ) -> Self {
        Self {
            buf,
            endianness,
            signature: SignatureBuilder::from_owned_signature(signature),
        }
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.signature.clear();
        self.buf.clear();
    }

    /// Get the signature of the buffer.
    pub fn signature(&self) -> &Signature {
        self.signature.to_signature()
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Test if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of bytes written to the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Align the buffer to the alignment of the given type `T`.
    #[inline]
    pub(crate) fn align_mut<T>(&mut self) {
        self.buf.align_mut::<T>();
    }

    /// Get the slice of the buffer that has been written to.
    #[inline]
    pub fn get(&self) -> &[u8] {
        self.buf.get()
    }

    /// Access a [`Body`] over the entire contents of the buffer.
    ///
    /// This is a reader with its own cursor, which is also used in
    /// combination with [`Message::with_body`] to set the body of a
    /// message.
    ///
    /// [`Message::with_body`]: crate::Message::with_body
    #[inline]
    pub fn as_body(&self) -> Body<'_> {
        let data = self.buf.as_aligned();
        Body::from_raw_parts(data, self.endianness, self.signature.to_signature())
    }

    /// Allocate zeroed and aligned space for a `T` to be written later.
    #[inline]
    pub(crate) fn alloc<T>(&mut self) -> Alloc<T>
    where
        T: Frame,
    {
        self.buf.alloc()
    }

    /// Write the given value at the previously [`Alloc<T>`] position.
    #[inline]
    pub(crate) fn store_at<T>(&mut self, at: Alloc<T>, mut frame: T)
    where
        T: Frame,
    {
        frame.adjust(self.endianness);
        self.buf.store_at(at, frame);
    }

    /// Store a value in the buffer and record its signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::BodyBuf;
    ///
    /// let mut body = BodyBuf::new();
    ///
    /// body.store(10f64)?;
    /// body.store("Hello World!")?;
    ///
    /// assert_eq!(body.signature(), "ds");
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn store<T>(&mut self, frame: T) -> Result<()>
    where
        T: Storable,
    {
        if !T::write_signature(&mut self.signature) {
            return Err(SignatureError::too_long().into());
        }

        frame.store_to(self);
        Ok(())
    }

    /// Store the specified frame without recording its signature.
    pub(crate) fn store_frame<T>(&mut self, mut frame: T)
    where
        T: Frame,
    {
        frame.adjust(self.endianness);
        self.buf.store(frame);
    }

    /// Extend the buffer with a slice.
    pub(crate) fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extend the buffer with a slice ending with a NUL byte.
    pub(crate) fn extend_from_slice_nul(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice_nul(bytes);
    }

    /// Only write to the buffer without recording a signature.
    pub(crate) fn write_only<T>(&mut self, value: &T)
    where
        T: ?Sized + Write,
    {
        value.write_to(self);
    }

    /// Append raw signature text without writing any value bytes.
    pub(crate) fn extend_signature(&mut self, signature: &Signature) -> Result<()> {
        if !self.signature.extend_from_signature(signature) {
            return Err(SignatureError::too_long().into());
        }

        Ok(())
    }

    /// The current length of the recorded signature.
    pub(crate) fn signature_len(&self) -> usize {
        self.signature.len()
    }

    /// Drop recorded signature text back to a previously observed length.
    pub(crate) fn truncate_signature(&mut self, len: usize) {
        self.signature.truncate(len);
    }

    /// Extend the body with multiple arguments.
    ///
    /// This can be more convenient than subsequent calls to
    /// [`BodyBuf::store`].
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, ObjectPath};
    ///
    /// const PATH: &ObjectPath = ObjectPath::new_const(b"/org/freedesktop/DBus");
    ///
    /// let mut body = BodyBuf::new();
    /// body.arguments(("Hello World!", PATH, 10u32))?;
    ///
    /// assert_eq!(body.signature(), "sou");
    /// # Ok::<_, corebus::Error>(())
    /// ```
    #[inline]
    pub fn arguments<T>(&mut self, value: T) -> Result<()>
    where
        T: Arguments,
    {
        value.extend_to(self)
    }

    /// Write an array into the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// let mut array = buf.store_array::<u32>()?;
    /// array.store(1u32);
    /// array.finish();
    ///
    /// assert_eq!(buf.signature(), b"au");
    /// assert_eq!(buf.get(), &[4, 0, 0, 0, 1, 0, 0, 0]);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    ///
    /// Writing an empty array still enforces element alignment:
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// let mut array = buf.store_array::<u64>()?;
    /// array.finish();
    ///
    /// assert_eq!(buf.signature(), b"at");
    /// assert_eq!(buf.get(), &[0, 0, 0, 0, 0, 0, 0, 0]);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn store_array<E>(&mut self) -> Result<StoreArray<'_, E>>
    where
        E: ty::Marker,
    {
        <ty::Array<E> as ty::Marker>::write_signature(&mut self.signature)?;
        // NB: We write directly onto the underlying buffer, because the
        // correct signature has already been applied.
        Ok(StoreArray::new(self))
    }

    /// Write a slice as a byte array.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// buf.write_slice(&[1, 2, 3, 4])?;
    ///
    /// assert_eq!(buf.signature(), "ay");
    /// assert_eq!(buf.get(), &[4, 0, 0, 0, 1, 2, 3, 4]);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn write_slice(&mut self, data: &[u8]) -> Result<()> {
        self.store_array::<u8>()?.write_slice(data);
        Ok(())
    }

    /// Write a dict into the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    /// use corebus::ty;
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    /// let mut dict = buf.store_dict::<ty::Str, u32>()?;
    /// dict.store_entry("a", 1u32);
    /// dict.finish();
    ///
    /// assert_eq!(buf.signature(), b"a{su}");
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn store_dict<K, V>(&mut self) -> Result<StoreDict<'_, K, V>>
    where
        K: ty::Marker,
        V: ty::Marker,
    {
        <ty::Dict<K, V> as ty::Marker>::write_signature(&mut self.signature)?;
        Ok(StoreDict::new(self))
    }

    /// Write a struct into the buffer.
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
    /// buf.store_struct::<(u16, u32)>()?
    ///     .store(20u16)
    ///     .store(30u32)
    ///     .finish();
    ///
    /// assert_eq!(buf.signature(), b"y(qu)");
    /// assert_eq!(buf.get(), &[10, 0, 0, 0, 0, 0, 0, 0, 20, 0, 0, 0, 30, 0, 0, 0]);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    pub fn store_struct<E>(&mut self) -> Result<StoreStruct<'_, E>>
    where
        E: ty::Fields,
    {
        E::write_signature(&mut self.signature)?;
        // NB: We write directly onto the underlying buffer, because the
        // correct signature has already been applied.
        Ok(StoreStruct::new(self))
    }
}

impl fmt::Debug for BodyBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyBuf")
            .field("buf", &self.buf)
            .field("endianness", &self.endianness)
            .field("signature", &self.signature.to_signature())
            .finish()
    }
}

impl Default for BodyBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BodyBuf {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.endianness == other.endianness
            && self.get() == other.get()
            && self.signature() == other.signature()
    }
}

impl Eq for BodyBuf {}

/// Construct an owned body from a read-only view.
impl From<Body<'_>> for BodyBuf {
    #[inline]
    fn from(buf: Body<'_>) -> Self {
        let (buf, endianness, signature) = buf.into_raw_parts();
        let mut data = AlignedBuf::new();
        data.extend_from_slice(buf.get());
        Self::from_raw_parts(data, endianness, signature.to_owned())
    }
}
