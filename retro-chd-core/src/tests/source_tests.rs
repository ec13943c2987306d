use std::io::Write;

use super::*;

#[test]
fn slice_reads_are_clipped_at_end() {
    let data: Vec<u8> = (0u8..8).collect();
    let mut buf = [0u8; 4];
    assert_eq!(data.read_at(&mut buf, 6).unwrap(), 2);
    assert_eq!(&buf[..2], &[6, 7]);
    assert_eq!(data.read_at(&mut buf, 8).unwrap(), 0);
    assert_eq!(data.read_at(&mut buf, u64::MAX).unwrap(), 0);
}

#[test]
fn read_exact_at_fails_past_end() {
    let data: Vec<u8> = (0u8..8).collect();
    let mut buf = [0u8; 4];
    data.read_exact_at(&mut buf, 2).unwrap();
    assert_eq!(buf, [2, 3, 4, 5]);
    let err = data.read_exact_at(&mut buf, 6).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn read_array_at_reads_fixed_size() {
    let data: Vec<u8> = (0u8..32).collect();
    let arr: [u8; 3] = read_array_at(&data, 10).unwrap();
    assert_eq!(arr, [10, 11, 12]);
}

#[test]
fn file_positioned_reads() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"MComprHD tail").unwrap();
    tmp.flush().unwrap();
    let file = File::open(tmp.path()).unwrap();
    let magic: [u8; 8] = read_array_at(&file, 0).unwrap();
    assert_eq!(&magic, b"MComprHD");
    let shared = Arc::new(file);
    let mut buf = [0u8; 4];
    shared.read_exact_at(&mut buf, 9).unwrap();
    assert_eq!(&buf, b"tail");
}
