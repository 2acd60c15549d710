use core::fmt;
use std::error;

/// Detailed errors raised when validation of a [`Signature`] fails.
///
/// [`Signature`]: crate::Signature
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureError {
    pub(super) kind: SignatureErrorKind,
}

impl SignatureError {
    pub(crate) const fn new(kind: SignatureErrorKind) -> Self {
        Self { kind }
    }

    /// Indicate that a signature is too long.
    #[inline]
    pub(crate) const fn too_long() -> Self {
        Self::new(SignatureErrorKind::SignatureTooLong)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SignatureErrorKind {
    UnknownTypeCode(u8),
    SignatureTooLong,
    MissingArrayElementType,
    StructEndedButNotStarted,
    DictEndedButNotStarted,
    StructStartedButNotEnded,
    DictStartedButNotEnded,
    StructHasNoFields,
    DictKeyMustBeBasicType,
    DictEntryHasNoFields,
    DictEntryHasOnlyOneField,
    DictEntryNotInsideArray,
    DictEntryHasTooManyFields,
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
    ExceededMaximumDictRecursion,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SignatureErrorKind::*;

        match self.kind {
            UnknownTypeCode(code) => {
                write!(f, "Unknown type code: {:?}", char::from(code))
            }
            SignatureTooLong => write!(f, "Signature too long"),
            MissingArrayElementType => write!(f, "Missing array element type"),
            StructEndedButNotStarted => write!(f, "Struct ended but not started"),
            DictEndedButNotStarted => write!(f, "Dict ended but not started"),
            StructStartedButNotEnded => write!(f, "Struct started but not ended"),
            DictStartedButNotEnded => write!(f, "Dict started but not ended"),
            StructHasNoFields => write!(f, "Struct has no fields"),
            DictKeyMustBeBasicType => write!(f, "Dict key must be basic type"),
            DictEntryHasNoFields => write!(f, "Dict entry has no fields"),
            DictEntryHasOnlyOneField => write!(f, "Dict entry has only one field"),
            DictEntryNotInsideArray => write!(f, "Dict entry not inside array"),
            DictEntryHasTooManyFields => write!(f, "Dict entry has too many fields"),
            ExceededMaximumArrayRecursion => write!(f, "Exceeded maximum array recursion"),
            ExceededMaximumStructRecursion => write!(f, "Exceeded maximum struct recursion"),
            ExceededMaximumDictRecursion => write!(f, "Exceeded maximum dict recursion"),
        }
    }
}

impl error::Error for SignatureError {}
