use super::{SignatureError, SignatureErrorKind, MAX_CONTAINER_DEPTH, MAX_DEPTH, MAX_SIGNATURE};

const KIND_ARRAY: u8 = 1;
const KIND_STRUCT: u8 = 2;
const KIND_DICT: u8 = 3;

/// Validate a signature against the D-Bus type grammar.
///
/// Containers are tracked on a fixed stack so that this can run in constant
/// contexts.
pub(super) const fn validate(bytes: &[u8]) -> Result<(), SignatureError> {
    use SignatureErrorKind::*;

    if bytes.len() > MAX_SIGNATURE {
        return Err(SignatureError::new(SignatureTooLong));
    }

    let mut kind = [0u8; MAX_DEPTH];
    let mut count = [0u8; MAX_DEPTH];
    let mut depth = 0usize;
    let mut arrays = 0usize;
    let mut structs = 0usize;

    let mut n = 0;

    while n < bytes.len() {
        let b = bytes[n];
        n += 1;

        let mut is_basic = match b {
            b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o' | b'g'
            | b'h' => true,
            // A variant is a single complete type but not a basic one, so it
            // cannot serve as a dict-entry key.
            b'v' => false,
            b'a' => {
                if depth == MAX_DEPTH || arrays == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumArrayRecursion));
                }

                kind[depth] = KIND_ARRAY;
                count[depth] = 0;
                depth += 1;
                arrays += 1;
                continue;
            }
            b'(' => {
                if depth == MAX_DEPTH || structs == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumStructRecursion));
                }

                kind[depth] = KIND_STRUCT;
                count[depth] = 0;
                depth += 1;
                structs += 1;
                continue;
            }
            b')' => {
                if depth == 0 {
                    return Err(SignatureError::new(StructEndedButNotStarted));
                }

                if kind[depth - 1] == KIND_ARRAY {
                    return Err(SignatureError::new(MissingArrayElementType));
                }

                if kind[depth - 1] != KIND_STRUCT {
                    return Err(SignatureError::new(StructEndedButNotStarted));
                }

                depth -= 1;
                structs -= 1;

                if count[depth] == 0 {
                    return Err(SignatureError::new(StructHasNoFields));
                }

                false
            }
            b'{' => {
                if depth == MAX_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumDictRecursion));
                }

                kind[depth] = KIND_DICT;
                count[depth] = 0;
                depth += 1;
                continue;
            }
            b'}' => {
                if depth == 0 {
                    return Err(SignatureError::new(DictEndedButNotStarted));
                }

                if kind[depth - 1] == KIND_ARRAY {
                    return Err(SignatureError::new(MissingArrayElementType));
                }

                if kind[depth - 1] != KIND_DICT {
                    return Err(SignatureError::new(DictEndedButNotStarted));
                }

                depth -= 1;

                match count[depth] {
                    0 => return Err(SignatureError::new(DictEntryHasNoFields)),
                    1 => return Err(SignatureError::new(DictEntryHasOnlyOneField)),
                    2 => {}
                    _ => return Err(SignatureError::new(DictEntryHasTooManyFields)),
                }

                if depth == 0 || kind[depth - 1] != KIND_ARRAY {
                    return Err(SignatureError::new(DictEntryNotInsideArray));
                }

                false
            }
            b => return Err(SignatureError::new(UnknownTypeCode(b))),
        };

        // A complete type also completes every array immediately enclosing
        // it.
        while depth > 0 && kind[depth - 1] == KIND_ARRAY {
            depth -= 1;
            arrays -= 1;
            is_basic = false;
        }

        if depth > 0 && kind[depth - 1] == KIND_DICT && count[depth - 1] == 0 && !is_basic {
            return Err(SignatureError::new(DictKeyMustBeBasicType));
        }

        if depth > 0 {
            count[depth - 1] = count[depth - 1].saturating_add(1);
        }
    }

    if depth > 0 {
        return match kind[depth - 1] {
            KIND_ARRAY => Err(SignatureError::new(MissingArrayElementType)),
            KIND_STRUCT => Err(SignatureError::new(StructStartedButNotEnded)),
            _ => Err(SignatureError::new(DictStartedButNotEnded)),
        };
    }

    Ok(())
}
