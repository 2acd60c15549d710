use core::marker::PhantomData;

use crate::ty;
use crate::{BodyBuf, Storable};

use super::StoreArray;

/// Write a struct.
///
/// See [`BodyBuf::store_struct`].
///
/// [`BodyBuf::store_struct`]: crate::BodyBuf::store_struct
#[must_use = "Must call `finish` after writing all related fields"]
pub struct StoreStruct<'a, T> {
    buf: &'a mut BodyBuf,
    _marker: PhantomData<T>,
}

impl<'a, T> StoreStruct<'a, T> {
    pub(crate) fn new(buf: &'a mut BodyBuf) -> Self {
        buf.align_mut::<u64>();
        Self::inner(buf)
    }

    pub(crate) fn inner(buf: &'a mut BodyBuf) -> Self {
        Self {
            buf,
            _marker: PhantomData,
        }
    }

    /// Store a value and return the builder for the next field to store.
    ///
    /// # Examples
    ///
    /// ```
    /// use corebus::{BodyBuf, Endianness};
    /// use corebus::ty;
    ///
    /// let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
    ///
    /// buf.store_struct::<(u16, u32)>()?
    ///     .store(10u16)
    ///     .store(10u32)
    ///     .finish();
    ///
    /// assert_eq!(buf.signature(), b"(qu)");
    /// assert_eq!(buf.get(), &[10, 0, 0, 0, 10, 0, 0, 0]);
    /// # Ok::<_, corebus::Error>(())
    /// ```
    #[inline]
    pub fn store(self, value: <T::First as ty::Marker>::Return<'_>) -> StoreStruct<'a, T::Remaining>
    where
        T: ty::Fields,
        T::First: ty::Marker,
        for<'b> <T::First as ty::Marker>::Return<'b>: Storable,
    {
        value.store_to(self.buf);
        StoreStruct::inner(self.buf)
    }

    /// Write an array field and return the builder for the next field to
    /// store.
    #[inline]
    pub fn store_array<W, U>(self, writer: W) -> StoreStruct<'a, T::Remaining>
    where
        W: FnOnce(&mut StoreArray<'_, U>),
        T: ty::Fields<First = ty::Array<U>>,
        U: ty::Aligned,
    {
        let mut w = StoreArray::new(self.buf);
        writer(&mut w);
        w.finish();
        StoreStruct::inner(self.buf)
    }

}

impl StoreStruct<'_, ()> {
    /// Finish writing the struct.
    pub fn finish(self) {}
}
