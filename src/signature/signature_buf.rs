use core::borrow::Borrow;
use core::fmt;
use core::ops::Deref;

use super::{validate, Signature, SignatureError, MAX_SIGNATURE};

/// An owned D-Bus signature stored inline.
///
/// Dereferences to [`Signature`].
#[derive(Clone)]
pub struct SignatureBuf {
    data: [u8; MAX_SIGNATURE],
    len: usize,
}

impl SignatureBuf {
    /// Construct a new empty signature.
    pub const fn empty() -> Self {
        Self {
            data: [0; MAX_SIGNATURE],
            len: 0,
        }
    }

    /// Try to construct a new signature with validation.
    #[inline]
    pub fn new<S>(signature: &S) -> Result<Self, SignatureError>
    where
        S: ?Sized + AsRef<[u8]>,
    {
        let signature = signature.as_ref();
        validate(signature)?;
        // SAFETY: Just validated above.
        Ok(unsafe { Self::from_slice_unchecked(signature) })
    }

    /// Construct from a slice which is known to be a valid signature.
    ///
    /// # Safety
    ///
    /// The slice must be a valid signature no longer than [`MAX_SIGNATURE`].
    pub(crate) unsafe fn from_slice_unchecked(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= MAX_SIGNATURE);
        let mut data = [0; MAX_SIGNATURE];
        data[..bytes.len()].copy_from_slice(bytes);

        Self {
            data,
            len: bytes.len(),
        }
    }

    /// Coerce into a borrowed [`Signature`].
    #[inline]
    pub fn as_signature(&self) -> &Signature {
        // SAFETY: Construction ensures that the stored bytes are valid.
        unsafe { Signature::new_unchecked(&self.data[..self.len]) }
    }

    pub(crate) fn into_raw_parts(self) -> ([u8; MAX_SIGNATURE], usize) {
        (self.data, self.len)
    }
}

impl Deref for SignatureBuf {
    type Target = Signature;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_signature()
    }
}

impl Borrow<Signature> for SignatureBuf {
    #[inline]
    fn borrow(&self) -> &Signature {
        self.as_signature()
    }
}

impl AsRef<Signature> for SignatureBuf {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self.as_signature()
    }
}

impl fmt::Debug for SignatureBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_signature().fmt(f)
    }
}

impl PartialEq for SignatureBuf {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SignatureBuf {}

impl PartialEq<Signature> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &Signature) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&Signature> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &&Signature) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl From<&Signature> for SignatureBuf {
    #[inline]
    fn from(signature: &Signature) -> Self {
        signature.to_owned()
    }
}
