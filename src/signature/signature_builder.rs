use core::ops::Deref;

use super::{
    Signature, SignatureBuf, SignatureError, SignatureErrorKind, MAX_CONTAINER_DEPTH, MAX_DEPTH,
    MAX_SIGNATURE,
};

/// A D-Bus signature builder.
///
/// This ensures that the constructed signature doesn't violate the maximum
/// requirements imposed by the D-Bus specification.
#[derive(Clone)]
pub struct SignatureBuilder {
    data: [u8; MAX_SIGNATURE],
    len: usize,
    structs: usize,
    arrays: usize,
}

impl SignatureBuilder {
    /// Construct a new empty signature builder.
    pub(crate) const fn new() -> Self {
        Self {
            data: [0; MAX_SIGNATURE],
            len: 0,
            structs: 0,
            arrays: 0,
        }
    }

    /// Construct from an owned signature.
    pub(crate) fn from_owned_signature(signature: SignatureBuf) -> Self {
        let (data, len) = signature.into_raw_parts();

        Self {
            data,
            len,
            structs: 0,
            arrays: 0,
        }
    }

    /// Coerce into a signature.
    pub(crate) fn to_signature(&self) -> &Signature {
        // SAFETY: The builder only ever assembles valid signatures.
        unsafe { Signature::new_unchecked(&self.data[..self.len]) }
    }

    /// Open an array in the signature.
    pub(crate) fn open_array(&mut self) -> Result<(), SignatureError> {
        if self.arrays == MAX_CONTAINER_DEPTH || self.structs + self.arrays == MAX_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumArrayRecursion,
            ));
        }

        if !self.push(b'a') {
            return Err(SignatureError::new(SignatureErrorKind::SignatureTooLong));
        }

        self.arrays += 1;
        Ok(())
    }

    /// Close an array in the signature.
    pub(crate) fn close_array(&mut self) {
        self.arrays -= 1;
    }

    /// Open a struct in the signature.
    pub(crate) fn open_struct(&mut self) -> Result<(), SignatureError> {
        if self.structs == MAX_CONTAINER_DEPTH || self.structs + self.arrays == MAX_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumStructRecursion,
            ));
        }

        if !self.push(b'(') {
            return Err(SignatureError::new(SignatureErrorKind::SignatureTooLong));
        }

        self.structs += 1;
        Ok(())
    }

    /// Close a struct in the signature.
    pub(crate) fn close_struct(&mut self) -> Result<(), SignatureError> {
        if !self.push(b')') {
            return Err(SignatureError::new(SignatureErrorKind::SignatureTooLong));
        }

        self.structs -= 1;
        Ok(())
    }

    /// Open a dict entry in the signature.
    pub(crate) fn open_dict_entry(&mut self) -> Result<(), SignatureError> {
        if self.structs == MAX_CONTAINER_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumDictRecursion,
            ));
        }

        if !self.push(b'{') {
            return Err(SignatureError::new(SignatureErrorKind::SignatureTooLong));
        }

        self.structs += 1;
        Ok(())
    }

    /// Close a dict entry in the signature.
    pub(crate) fn close_dict_entry(&mut self) -> Result<(), SignatureError> {
        if !self.push(b'}') {
            return Err(SignatureError::new(SignatureErrorKind::SignatureTooLong));
        }

        self.structs -= 1;
        Ok(())
    }

    fn push(&mut self, byte: u8) -> bool {
        if self.len == MAX_SIGNATURE {
            return false;
        }

        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    /// Clear the current signature.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.structs = 0;
        self.arrays = 0;
    }

    /// The current length of the assembled signature.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Truncate the assembled signature back to a previously observed
    /// length.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Extend this signature with another.
    #[must_use = "Return value must be observed to indicate an error"]
    pub(crate) fn extend_from_signature<S>(&mut self, other: S) -> bool
    where
        S: AsRef<Signature>,
    {
        let bytes = other.as_ref().as_bytes();

        if self.len + bytes.len() > MAX_SIGNATURE {
            return false;
        }

        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        true
    }
}

impl Deref for SignatureBuilder {
    type Target = Signature;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.to_signature()
    }
}

impl PartialEq for SignatureBuilder {
    #[inline]
    fn eq(&self, other: &SignatureBuilder) -> bool {
        self.to_signature() == other.to_signature()
    }
}

impl Eq for SignatureBuilder {}
