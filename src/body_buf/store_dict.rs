use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use crate::buf::Alloc;
use crate::ty;
use crate::{BodyBuf, Storable};

/// Write a typed dict.
///
/// See [`BodyBuf::store_dict`].
///
/// [`BodyBuf::store_dict`]: crate::BodyBuf::store_dict
pub struct StoreDict<'a, K, V> {
    buf: &'a mut BodyBuf,
    len: Alloc<u32>,
    start: usize,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V> StoreDict<'a, K, V>
where
    K: ty::Marker,
    V: ty::Marker,
{
    pub(crate) fn new(buf: &'a mut BodyBuf) -> Self {
        let len = buf.alloc();
        // Entries are aligned like structs, even in an empty dict; the
        // padding is not counted in the length.
        buf.align_mut::<u64>();
        let start = buf.len();

        Self {
            buf,
            len,
            start,
            _marker: PhantomData,
        }
    }

    /// Store a key-value entry.
    pub fn store_entry(&mut self, key: K::Return<'_>, value: V::Return<'_>)
    where
        for<'b> K::Return<'b>: Storable,
        for<'b> V::Return<'b>: Storable,
    {
        self.buf.align_mut::<u64>();
        key.store_to(self.buf);
        value.store_to(self.buf);
    }

    /// Finish writing the dict, patching up the recorded byte length.
    ///
    /// This will also be done implicitly once this is dropped.
    #[inline]
    pub fn finish(self) {
        ManuallyDrop::new(self).finalize();
    }
}

impl<K, V> StoreDict<'_, K, V> {
    #[inline(always)]
    fn finalize(&mut self) {
        let end = self.buf.len();
        let len = (end - self.start) as u32;
        self.buf.store_at(self.len, len);
    }
}

impl<K, V> Drop for StoreDict<'_, K, V> {
    #[inline]
    fn drop(&mut self) {
        self.finalize();
    }
}
