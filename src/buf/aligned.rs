use core::fmt;
use core::mem::size_of;
use core::ptr;

use crate::buf::{padding_to, padding_to_align};
use crate::error::{Error, ErrorKind, Result};
use crate::Frame;

/// A read-only view into a buffer of message data.
///
/// The read cursor tracks offsets from the start of the view, which is
/// assumed to coincide with the alignment base of the encoded values.
pub(crate) struct Aligned<'a> {
    data: &'a [u8],
    read: usize,
}

impl<'a> Aligned<'a> {
    /// Construct an empty read buffer.
    pub(crate) const fn empty() -> Self {
        Self::new(&[])
    }

    /// Construct a new read buffer wrapping the given data.
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, read: 0 }
    }

    /// Get the slice of the buffer that remains to be read.
    pub(crate) fn get(&self) -> &'a [u8] {
        &self.data[self.read..]
    }

    /// Test if the buffer is empty.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.read == self.data.len()
    }

    /// Get the number of unread bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.data.len() - self.read
    }

    /// Read `n` bytes from the buffer and make them accessible through
    /// another [`Aligned`] instance constituting that sub-slice.
    pub(crate) fn read_until(&mut self, n: usize) -> Aligned<'a> {
        assert!(n <= self.len(), "requested: {n} > length: {}", self.len());
        let data = &self.data[self.read..self.read + n];
        self.read += n;
        Aligned::new(data)
    }

    /// Load a frame of the given type.
    pub(crate) fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        let padding = padding_to::<T>(self.read);

        if self.read + padding + size_of::<T>() > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        self.read += padding;

        // SAFETY: Bounds were just checked, and `Frame` asserts that any bit
        // pattern inhabits `T`.
        let frame =
            unsafe { ptr::read_unaligned(self.data.as_ptr().add(self.read).cast::<T>()) };
        self.read += size_of::<T>();
        Ok(frame)
    }

    /// Advance the read cursor by `n`.
    pub(crate) fn advance(&mut self, n: usize) -> Result<()> {
        if self.read + n > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        self.read += n;
        Ok(())
    }

    /// Align the read side of the buffer to the alignment of `T`.
    pub(crate) fn align<T>(&mut self) -> Result<()> {
        self.align_to(core::mem::align_of::<T>())
    }

    /// Align the read side of the buffer to a runtime alignment.
    pub(crate) fn align_to(&mut self, align: usize) -> Result<()> {
        let padding = padding_to_align(align, self.read);

        if self.read + padding > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        self.read += padding;
        Ok(())
    }

    /// Load a slice.
    pub(crate) fn load_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.read + len > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let slice = &self.data[self.read..self.read + len];
        self.read += len;
        Ok(slice)
    }

    /// Load a slice ending with a NUL byte, excluding the NUL byte.
    pub(crate) fn load_slice_nul(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.read + len + 1 > self.data.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        if self.data[self.read + len] != 0 {
            return Err(Error::new(ErrorKind::NotNullTerminated));
        }

        let slice = &self.data[self.read..self.read + len];
        self.read += len + 1;
        Ok(slice)
    }
}

impl Clone for Aligned<'_> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            read: self.read,
        }
    }
}

impl fmt::Debug for Aligned<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aligned").field("len", &self.len()).finish()
    }
}

impl<'a> PartialEq<Aligned<'a>> for Aligned<'_> {
    #[inline]
    fn eq(&self, other: &Aligned<'a>) -> bool {
        self.get() == other.get()
    }
}

impl Eq for Aligned<'_> {}
