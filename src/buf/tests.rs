use super::{padding_to_align, Aligned, AlignedBuf, UnalignedBuf};

#[test]
fn padding() {
    assert_eq!(padding_to_align(4, 0), 0);
    assert_eq!(padding_to_align(4, 1), 3);
    assert_eq!(padding_to_align(4, 4), 0);
    assert_eq!(padding_to_align(8, 12), 4);
    assert_eq!(padding_to_align(1, 7), 0);
}

#[test]
fn store_aligns_and_zeroes() {
    let mut buf = AlignedBuf::new();
    buf.store(1u8);
    buf.store(2u32);
    assert_eq!(buf.get(), &[1, 0, 0, 0, 2, 0, 0, 0]);

    buf.store(3u64);
    assert_eq!(buf.get(), &[1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn alloc_and_store_at() {
    let mut buf = AlignedBuf::new();
    buf.store(1u8);
    let at = buf.alloc::<u32>();
    buf.extend_from_slice(b"xy");
    buf.store_at(at, 7u32);
    assert_eq!(buf.get(), &[1, 0, 0, 0, 7, 0, 0, 0, b'x', b'y']);
}

#[test]
fn consume_shifts_content() {
    let mut buf = AlignedBuf::new();
    buf.extend_from_slice(b"abcdef");
    buf.consume(4);
    assert_eq!(buf.get(), b"ef");
    buf.consume(2);
    assert!(buf.is_empty());
}

#[test]
fn aligned_load() {
    let mut buf = AlignedBuf::new();
    buf.store(1u8);
    buf.store(2u32);

    let mut read = buf.as_aligned();
    assert_eq!(read.load::<u8>().unwrap(), 1);
    assert_eq!(read.load::<u32>().unwrap(), 2);
    assert!(read.load::<u8>().is_err());
}

#[test]
fn aligned_slice_nul() {
    let mut read = Aligned::new(b"abc\0d");
    assert_eq!(read.load_slice_nul(3).unwrap(), b"abc");
    assert_eq!(read.get(), b"d");

    let mut read = Aligned::new(b"abcd");
    assert!(read.load_slice_nul(3).is_err());
}

#[test]
fn unaligned_base_offset() {
    let mut buf = UnalignedBuf::new();
    buf.extend_from_slice(b"abc");
    buf.update_base_align();

    // Aligned relative to the basis, not the buffer.
    buf.store(1u32);
    assert_eq!(buf.get(), &[b'a', b'b', b'c', 1, 0, 0, 0]);

    buf.store(2u64);
    assert_eq!(
        buf.get(),
        &[b'a', b'b', b'c', 1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]
    );
}
