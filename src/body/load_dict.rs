use core::marker::PhantomData;

use crate::buf::MAX_ARRAY_LENGTH;
use crate::error::ErrorKind;
use crate::{ty, Body, Error, Result};

/// Read a dict from a body.
///
/// See [`Body::load_dict`].
///
/// [`Body::load_dict`]: crate::Body::load_dict
pub struct LoadDict<'de, K, V> {
    buf: Body<'de>,
    _marker: PhantomData<(K, V)>,
}

impl<'de, K, V> LoadDict<'de, K, V>
where
    K: ty::Marker,
    V: ty::Marker,
{
    #[inline]
    pub(crate) fn from_mut(buf: &mut Body<'de>) -> Result<LoadDict<'de, K, V>> {
        let bytes = buf.load::<u32>()?;

        if bytes > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::ArrayTooLong(bytes)));
        }

        // Dict entries are aligned like structs, even in an empty dict.
        buf.align::<u64>()?;

        if bytes as usize > buf.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let buf = buf.read_until(bytes as usize);
        Ok(LoadDict {
            buf,
            _marker: PhantomData,
        })
    }

    /// Load the next key-value entry from the dict.
    pub fn load_entry(&mut self) -> Result<Option<(K::Return<'de>, V::Return<'de>)>> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        self.buf.align::<u64>()?;
        let key = K::load_from(&mut self.buf)?;
        let value = V::load_from(&mut self.buf)?;
        Ok(Some((key, value)))
    }
}
