use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

use super::*;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

#[test]
fn split_narrow_length() {
    // 3 frames: 1 bitmap byte, 2-byte length of 4, then 4 sector bytes.
    let src = [0b101, 0x00, 0x04, 1, 2, 3, 4, 9, 9];
    let payload = split_ecc_payload(&src, 3 * 2448, 3, "test").unwrap();
    assert_eq!(payload.ecc_bitmap, &[0b101]);
    assert_eq!(payload.sectors, &[1, 2, 3, 4]);
    assert_eq!(payload.subcode, &[9, 9]);
}

#[test]
fn split_wide_length() {
    // 27 frames span 66096 bytes, so the length field is 3 bytes.
    let frames = 27;
    let mut src = vec![0u8; 4];
    src.extend_from_slice(&[0x00, 0x00, 0x02, 0xAA, 0xBB]);
    let payload = split_ecc_payload(&src, frames * 2448, frames, "test").unwrap();
    assert_eq!(payload.ecc_bitmap.len(), 4);
    assert_eq!(payload.sectors, &[0xAA, 0xBB]);
    assert!(payload.subcode.is_empty());
}

#[test]
fn split_rejects_short_header() {
    let err = split_ecc_payload(&[0], 2448, 1, "cdzl").unwrap_err();
    assert!(err.to_string().contains("cdzl: source too small"));
}

#[test]
fn split_rejects_oversized_length() {
    let err = split_ecc_payload(&[0, 0x01, 0x00, 1, 2], 2448, 1, "cdlz").unwrap_err();
    assert!(err.to_string().contains("invalid base length 256"));
}

#[test]
fn interleave_restores_sync_for_flagged_frames() {
    let frames = 3;
    let sectors = vec![0u8; frames * CD_SECTOR_SIZE];
    let subcode = vec![0x55u8; frames * CD_SUBCODE_SIZE];
    let mut dst = vec![0xEEu8; frames * 2448];

    let n = interleave(&mut dst, &sectors, &subcode, frames, Some(&[0b010]));
    assert_eq!(n, frames * 2448);

    assert_eq!(&dst[..12], &[0u8; 12]);
    assert_eq!(&dst[2448..2448 + 12], &CD_SYNC_PATTERN);
    assert_eq!(&dst[2 * 2448..2 * 2448 + 12], &[0u8; 12]);
    assert!(dst[2352..2448].iter().all(|&b| b == 0x55));
}

#[test]
fn interleave_zero_fills_missing_sector_data() {
    let sectors = vec![0x11u8; CD_SECTOR_SIZE + 100];
    let mut dst = vec![0xEEu8; 2 * 2448];
    let n = interleave(&mut dst, &sectors, &[], 2, None);
    assert_eq!(n, 2 * 2448);
    assert!(dst[..CD_SECTOR_SIZE].iter().all(|&b| b == 0x11));
    assert!(dst[CD_SECTOR_SIZE..].iter().all(|&b| b == 0));
}

#[test]
fn interleave_stops_at_short_destination() {
    let sectors = vec![0x22u8; 2 * CD_SECTOR_SIZE];
    let mut dst = vec![0u8; 2448 + 10];
    assert_eq!(interleave(&mut dst, &sectors, &[], 2, None), 2448);
}

#[test]
fn subcode_inflates() {
    let raw: Vec<u8> = (0..2 * CD_SUBCODE_SIZE).map(|i| i as u8).collect();
    let mut inflater = Decompress::new(false);
    assert_eq!(inflate_subcode(&mut inflater, &deflate(&raw), 2), raw);
}

#[test]
fn subcode_failure_is_zero_filled() {
    let mut inflater = Decompress::new(false);
    let subcode = inflate_subcode(&mut inflater, &[0xFF; 8], 2);
    assert_eq!(subcode, vec![0u8; 2 * CD_SUBCODE_SIZE]);
    assert_eq!(inflate_subcode(&mut inflater, &[], 1), vec![0u8; CD_SUBCODE_SIZE]);
}
