use core::slice;

use super::{next_type, Signature};

/// The item yielded by the [`Iter`] iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type<'a> {
    /// A primitive type or variant.
    Signature(&'a Signature),
    /// An array with the given element type.
    Array(&'a Signature),
    /// A struct with the given field types.
    Struct(&'a Signature),
    /// A dict entry with the given key and value types.
    Dict(&'a Signature, &'a Signature),
}

/// An iterator over a signature which yields one [`Type`] at a time.
pub struct Iter<'a> {
    iter: slice::Iter<'a, u8>,
}

impl<'a> Iter<'a> {
    #[inline]
    pub(super) fn new(s: &'a Signature) -> Iter<'a> {
        Iter {
            iter: s.as_bytes().iter(),
        }
    }

    fn next_complete(&mut self) -> Option<&'a Signature> {
        let slice = self.iter.as_slice();
        let n = next_type(slice)?;

        for _ in 0..n {
            self.iter.next()?;
        }

        // SAFETY: A sub-slice spanning one complete type of a valid
        // signature is itself a valid signature.
        Some(unsafe { Signature::new_unchecked(&slice[..n]) })
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Type<'a>;

    #[inline]
    fn next(&mut self) -> Option<Type<'a>> {
        let slice = self.iter.as_slice();
        let b = *slice.first()?;

        Some(match b {
            b'a' => {
                self.iter.next()?;
                let sig = self.next_complete()?;
                Type::Array(sig)
            }
            b'(' => {
                let full = self.next_complete()?;
                let inner = &full.as_bytes()[1..full.len() - 1];
                // SAFETY: The fields of a valid struct form a valid
                // signature.
                Type::Struct(unsafe { Signature::new_unchecked(inner) })
            }
            b'{' => {
                self.iter.next()?;
                let key = self.next_complete()?;
                let value = self.next_complete()?;

                if self.iter.next().copied() != Some(b'}') {
                    return None;
                }

                Type::Dict(key, value)
            }
            _ => {
                self.iter.next()?;
                // SAFETY: A single primitive code of a valid signature is a
                // valid signature.
                Type::Signature(unsafe { Signature::new_unchecked(&slice[..1]) })
            }
        })
    }
}
