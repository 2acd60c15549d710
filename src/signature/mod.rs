pub use self::iter::{Iter, Type};
mod iter;

use self::validation::validate;
mod validation;

pub use self::signature::Signature;
mod signature;

pub use self::signature_builder::SignatureBuilder;
mod signature_builder;

pub use self::signature_buf::SignatureBuf;
mod signature_buf;

pub use self::signature_error::SignatureError;
use self::signature_error::SignatureErrorKind;
mod signature_error;

pub(crate) use self::walk::{alignment_of, flip, next_type, skip};
mod walk;

#[cfg(test)]
mod tests;

/// The maximum size of a signature.
pub(crate) const MAX_SIGNATURE: usize = 255;

/// The maximum individual container depth.
pub(crate) const MAX_CONTAINER_DEPTH: usize = 32;

/// The maximum total depth of any containers.
pub(crate) const MAX_DEPTH: usize = MAX_CONTAINER_DEPTH * 2;
