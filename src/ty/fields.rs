use crate::signature::SignatureBuilder;
use crate::{Body, Result, SignatureError};

use super::{Aligned, Marker};

mod sealed {
    pub trait Sealed {}
    impl Sealed for () {}
}

/// The [`Marker`] for the empty type.
#[non_exhaustive]
pub enum Empty {}

/// Trait indicating the fields of a struct.
///
/// This is implemented by tuples of [`Marker`] types.
pub trait Fields: self::sealed::Sealed {
    /// The first field to write.
    #[doc(hidden)]
    type First;

    /// The remaining struct fields to write.
    #[doc(hidden)]
    type Remaining;

    /// The loaded representation of the struct.
    #[doc(hidden)]
    type Return<'de>;

    /// Load every field in order.
    #[doc(hidden)]
    fn load_struct<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>>;

    /// Write the signature of the struct.
    #[doc(hidden)]
    fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError>;
}

impl Fields for () {
    type First = Empty;
    type Remaining = ();
    type Return<'de> = ();

    #[inline]
    fn load_struct<'de>(_: &mut Body<'de>) -> Result<Self::Return<'de>> {
        Ok(())
    }

    #[inline]
    fn write_signature(_: &mut SignatureBuilder) -> Result<(), SignatureError> {
        Ok(())
    }
}

macro_rules! struct_fields {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first $(, $rest)*> self::sealed::Sealed for ($first, $($rest,)*)
        where
            $first: Marker,
            $($rest: Marker,)*
        {
        }

        impl<$first $(, $rest)*> super::aligned::sealed::Sealed for ($first, $($rest,)*)
        where
            $first: Marker,
            $($rest: Marker,)*
        {
        }

        impl<$first $(, $rest)*> Aligned for ($first, $($rest,)*)
        where
            $first: Marker,
            $($rest: Marker,)*
        {
            type Alignment = u64;
        }

        impl<$first $(, $rest)*> Fields for ($first, $($rest,)*)
        where
            $first: Marker,
            $($rest: Marker,)*
        {
            type First = $first;
            type Remaining = ($($rest,)*);
            type Return<'de> = ($first::Return<'de>, $($rest::Return<'de>,)*);

            #[inline]
            #[allow(non_snake_case)]
            fn load_struct<'de>(buf: &mut Body<'de>) -> Result<Self::Return<'de>> {
                let $first = <$first>::load_from(buf)?;
                $(let $rest = <$rest>::load_from(buf)?;)*
                Ok(($first, $($rest,)*))
            }

            #[inline]
            fn write_signature(signature: &mut SignatureBuilder) -> Result<(), SignatureError> {
                signature.open_struct()?;
                <$first>::write_signature(signature)?;
                $(<$rest>::write_signature(signature)?;)*
                signature.close_struct()?;
                Ok(())
            }
        }
    }
}

repeat!(struct_fields);
