use crate::buf::MAX_ARRAY_LENGTH;
use crate::error::{Error, ErrorKind, Result};
use crate::{Body, Signature};

/// Alignment of a value with the given type code.
pub(crate) fn alignment_of(code: u8) -> usize {
    match code {
        b'y' | b'g' | b'v' => 1,
        b'n' | b'q' => 2,
        b'b' | b'i' | b'u' | b's' | b'o' | b'a' | b'h' => 4,
        _ => 8,
    }
}

/// Advance past exactly one complete type in a signature, returning its
/// length in bytes.
///
/// Returns `None` on an empty or unbalanced signature.
pub(crate) fn next_type(sig: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut n = 0;

    loop {
        let &b = sig.get(n)?;
        n += 1;

        let term = match b {
            b'a' => false,
            b'(' | b'{' => {
                depth += 1;
                false
            }
            b')' | b'}' => {
                depth = depth.checked_sub(1)?;
                true
            }
            _ => true,
        };

        if term && depth == 0 {
            return Some(n);
        }
    }
}

/// Skip one value per complete type of `signature`, advancing the read
/// cursor of `buf`.
///
/// This is the polymorphic skip used for unknown header fields and for
/// variants whose concrete type is not interesting.
pub(crate) fn skip(signature: &Signature, buf: &mut Body<'_>) -> Result<()> {
    let mut sig = signature.as_bytes();

    while !sig.is_empty() {
        let n = next_type(sig).ok_or(ErrorKind::InvalidProtocol)?;
        skip_one(&sig[..n], buf)?;
        sig = &sig[n..];
    }

    Ok(())
}

fn skip_one(ty: &[u8], buf: &mut Body<'_>) -> Result<()> {
    match ty[0] {
        b'y' => {
            buf.load::<u8>()?;
        }
        b'n' | b'q' => {
            buf.load::<u16>()?;
        }
        b'b' | b'i' | b'u' | b'h' => {
            buf.load::<u32>()?;
        }
        b'x' | b't' | b'd' => {
            buf.load::<u64>()?;
        }
        b's' | b'o' => {
            let len = buf.load::<u32>()? as usize;
            buf.advance(len.wrapping_add(1))?;
        }
        b'g' => {
            let len = buf.load::<u8>()? as usize;
            buf.advance(len.wrapping_add(1))?;
        }
        b'v' => {
            let signature = buf.read::<Signature>()?;
            skip(signature, buf)?;
        }
        b'a' => {
            let bytes = buf.load::<u32>()?;

            if bytes > MAX_ARRAY_LENGTH {
                return Err(Error::new(ErrorKind::ArrayTooLong(bytes)));
            }

            buf.align_to(alignment_of(ty[1]))?;
            buf.advance(bytes as usize)?;
        }
        b'(' | b'{' => {
            buf.align_to(8)?;

            let mut fields = &ty[1..ty.len() - 1];

            while !fields.is_empty() {
                let n = next_type(fields).ok_or(ErrorKind::InvalidProtocol)?;
                skip_one(&fields[..n], buf)?;
                fields = &fields[n..];
            }
        }
        _ => return Err(Error::new(ErrorKind::InvalidProtocol)),
    }

    Ok(())
}

/// Byte-reverse every primitive in `data` starting at offset `at`, driven
/// by `signature`, recursing into containers. Returns the offset past the
/// last flipped value.
///
/// Offsets are interpreted relative to the start of `data`, which must
/// coincide with the alignment base of the encoded values.
pub(crate) fn flip(signature: &Signature, data: &mut [u8], mut at: usize) -> Result<usize> {
    let mut sig = signature.as_bytes();

    while !sig.is_empty() {
        let n = next_type(sig).ok_or(ErrorKind::InvalidProtocol)?;
        at = flip_one(&sig[..n], data, at)?;
        sig = &sig[n..];
    }

    Ok(at)
}

fn flip_scalar(data: &mut [u8], at: usize, width: usize) -> Result<usize> {
    let at = align_up(at, width);

    let Some(scalar) = data.get_mut(at..at + width) else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    scalar.reverse();
    Ok(at + width)
}

fn read_u32(data: &[u8], at: usize) -> Result<u32> {
    let Some(bytes) = data.get(at..at + 4) else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn align_up(at: usize, align: usize) -> usize {
    (at + align - 1) & !(align - 1)
}

fn check_end(data: &[u8], at: usize) -> Result<usize> {
    if at > data.len() {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    }

    Ok(at)
}

fn flip_one(ty: &[u8], data: &mut [u8], at: usize) -> Result<usize> {
    match ty[0] {
        b'y' => check_end(data, at + 1),
        b'n' | b'q' => flip_scalar(data, at, 2),
        b'b' | b'i' | b'u' | b'h' => flip_scalar(data, at, 4),
        b'x' | b't' | b'd' => flip_scalar(data, at, 8),
        b's' | b'o' => {
            let end = flip_scalar(data, at, 4)?;
            let len = read_u32(data, end - 4)? as usize;
            check_end(data, end + len + 1)
        }
        b'g' => {
            let Some(&len) = data.get(at) else {
                return Err(Error::new(ErrorKind::BufferUnderflow));
            };

            check_end(data, at + 1 + usize::from(len) + 1)
        }
        b'v' => {
            let Some(&len) = data.get(at) else {
                return Err(Error::new(ErrorKind::BufferUnderflow));
            };

            let start = at + 1;
            let end = check_end(data, start + usize::from(len) + 1)?;

            let signature = {
                let Ok(signature) = Signature::new(&data[start..end - 1]) else {
                    return Err(Error::new(ErrorKind::InvalidProtocol));
                };

                signature.to_owned()
            };

            flip(&signature, data, end)
        }
        b'a' => {
            let end = flip_scalar(data, at, 4)?;
            let bytes = read_u32(data, end - 4)?;

            if bytes > MAX_ARRAY_LENGTH {
                return Err(Error::new(ErrorKind::ArrayTooLong(bytes)));
            }

            let mut at = align_up(end, alignment_of(ty[1]));
            let end = check_end(data, at + bytes as usize)?;

            while at < end {
                at = flip_one(&ty[1..], data, at)?;
            }

            if at != end {
                return Err(Error::new(ErrorKind::InvalidProtocol));
            }

            Ok(at)
        }
        b'(' | b'{' => {
            let mut at = align_up(at, 8);
            let mut fields = &ty[1..ty.len() - 1];

            while !fields.is_empty() {
                let n = next_type(fields).ok_or(ErrorKind::InvalidProtocol)?;
                at = flip_one(&fields[..n], data, at)?;
                fields = &fields[n..];
            }

            Ok(at)
        }
        _ => Err(Error::new(ErrorKind::InvalidProtocol)),
    }
}
