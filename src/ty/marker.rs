use crate::signature::SignatureBuilder;
use crate::ty::Aligned;
use crate::{Body, Result, SignatureError};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// The trait implementation for a type marker.
pub trait Marker: self::sealed::Sealed + Aligned {
    /// Return type used for the marker.
    #[doc(hidden)]
    type Return<'de>;

    /// Load the value from a body.
    #[doc(hidden)]
    fn load_from<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>>;

    /// Write the signature of the marked type.
    #[doc(hidden)]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError>;
}
