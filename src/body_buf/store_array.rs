use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use crate::buf::Alloc;
use crate::ty;
use crate::{BodyBuf, Storable};

use super::StoreStruct;

/// Write a typed array.
///
/// See [`BodyBuf::store_array`].
///
/// [`BodyBuf::store_array`]: crate::BodyBuf::store_array
pub struct StoreArray<'a, T>
where
    T: ty::Aligned,
{
    buf: &'a mut BodyBuf,
    len: Alloc<u32>,
    start: usize,
    _marker: PhantomData<T>,
}

impl<'a, T> StoreArray<'a, T>
where
    T: ty::Aligned,
{
    pub(crate) fn new(buf: &'a mut BodyBuf) -> Self {
        let len = buf.alloc();
        // Elements are padded to their alignment even when the array stays
        // empty; the padding is not counted in the length.
        buf.align_mut::<T::Alignment>();
        let start = buf.len();

        Self {
            buf,
            start,
            len,
            _marker: PhantomData,
        }
    }

    /// Finish writing the array, patching up the recorded byte length.
    ///
    /// This will also be done implicitly once this is dropped.
    #[inline]
    pub fn finish(self) {
        ManuallyDrop::new(self).finalize();
    }

    #[inline(always)]
    fn finalize(&mut self) {
        let end = self.buf.len();
        let len = (end - self.start) as u32;
        self.buf.store_at(self.len, len);
    }
}

impl<T> StoreArray<'_, T>
where
    T: ty::Aligned,
{
    /// Store a value as the next element of the array.
    pub fn store(&mut self, value: T::Return<'_>)
    where
        T: ty::Marker,
        for<'b> T::Return<'b>: Storable,
    {
        value.store_to(self.buf);
    }

    /// Write a struct as the next element of the array.
    #[inline]
    pub fn store_struct(&mut self) -> StoreStruct<'_, T>
    where
        T: ty::Fields,
    {
        StoreStruct::new(self.buf)
    }
}

impl<T> StoreArray<'_, ty::Array<T>>
where
    T: ty::Aligned,
{
    /// Write an array as the next element of the array.
    #[inline]
    pub fn store_array(&mut self) -> StoreArray<'_, T> {
        StoreArray::new(self.buf)
    }
}

impl StoreArray<'_, u8> {
    /// Write a complete byte array.
    #[inline]
    pub fn write_slice(self, bytes: &[u8]) {
        let mut this = ManuallyDrop::new(self);
        this.buf.extend_from_slice(bytes);
        this.finalize();
    }
}

impl<T> Drop for StoreArray<'_, T>
where
    T: ty::Aligned,
{
    #[inline]
    fn drop(&mut self) {
        self.finalize();
    }
}
