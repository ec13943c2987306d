use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

use retro_chd_core::cd::{CD_SUBCODE_SIZE, CD_SYNC_PATTERN};

use super::*;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn sector(fill: u8) -> Vec<u8> {
    let mut s = vec![fill; CD_SECTOR_SIZE];
    s[..12].copy_from_slice(&CD_SYNC_PATTERN);
    s[15] = 1;
    s
}

#[test]
fn plain_round_trip() {
    let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
    let mut dst = vec![0u8; 4096];
    let n = ZlibCodec::new().decompress(&mut dst, &deflate(&data)).unwrap();
    assert_eq!(n, 4096);
    assert_eq!(dst, data);
}

#[test]
fn short_stream_is_not_an_error() {
    let mut dst = vec![0u8; 4096];
    let n = ZlibCodec::new().decompress(&mut dst, &deflate(&[7u8; 100])).unwrap();
    assert_eq!(n, 100);
    assert!(dst[100..].iter().all(|&b| b == 0));
}

#[test]
fn codec_state_is_reset_between_calls() {
    let mut codec = ZlibCodec::new();
    let mut dst = vec![0u8; 512];
    codec.decompress(&mut dst, &deflate(&[1u8; 512])).unwrap();
    codec.decompress(&mut dst, &deflate(&[2u8; 512])).unwrap();
    assert!(dst.iter().all(|&b| b == 2));
}

#[test]
fn invalid_stream_fails() {
    let mut dst = vec![0u8; 64];
    let err = ZlibCodec::new().decompress(&mut dst, &[0xFF; 16]).unwrap_err();
    assert!(matches!(err, ChdError::DecompressFailed(_)));
}

#[test]
fn cd_one_byte_source_too_small() {
    let mut dst = vec![0u8; 2448];
    let err = CdZlibCodec::new()
        .decompress_cd(&mut dst, &[0], 2448, 1)
        .unwrap_err();
    match err {
        ChdError::DecompressFailed(msg) => assert!(msg.contains("source too small"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cd_base_length_past_end() {
    let mut dst = vec![0u8; 2448];
    let err = CdZlibCodec::new()
        .decompress_cd(&mut dst, &[0x00, 0x00, 0x40, 0x01], 2448, 1)
        .unwrap_err();
    match err {
        ChdError::DecompressFailed(msg) => assert!(msg.contains("invalid base length"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cd_round_trip_restores_sync() {
    let frames = 2;
    let original = [sector(0x41), sector(0x42)];

    // The encoder blanks the sync of frames whose ECC bit it sets.
    let mut stored = original.concat();
    stored[..12].fill(0);
    let subcode: Vec<u8> = (0..frames * CD_SUBCODE_SIZE).map(|i| (i % 96) as u8).collect();

    let compressed_sectors = deflate(&stored);
    let mut src = vec![0b01];
    src.extend_from_slice(&(compressed_sectors.len() as u16).to_be_bytes());
    src.extend_from_slice(&compressed_sectors);
    src.extend_from_slice(&deflate(&subcode));

    let mut dst = vec![0u8; frames * CD_FRAME_SIZE];
    let mut codec = CdZlibCodec::new();
    let n = codec.decompress(&mut dst, &src).unwrap();
    assert_eq!(n, frames * CD_FRAME_SIZE);

    for (frame, expected) in original.iter().enumerate() {
        let base = frame * CD_FRAME_SIZE;
        assert_eq!(&dst[base..base + CD_SECTOR_SIZE], expected.as_slice());
        assert_eq!(
            &dst[base + CD_SECTOR_SIZE..base + CD_FRAME_SIZE],
            &subcode[frame * CD_SUBCODE_SIZE..(frame + 1) * CD_SUBCODE_SIZE]
        );
    }
}

#[test]
fn cd_bad_subcode_is_zero_filled() {
    let stored = sector(0x33);
    let compressed_sectors = deflate(&stored);
    let mut src = vec![0];
    src.extend_from_slice(&(compressed_sectors.len() as u16).to_be_bytes());
    src.extend_from_slice(&compressed_sectors);
    src.extend_from_slice(&[0xFF; 10]);

    let mut dst = vec![0xEEu8; CD_FRAME_SIZE];
    CdZlibCodec::new().decompress(&mut dst, &src).unwrap();
    assert_eq!(&dst[..CD_SECTOR_SIZE], stored.as_slice());
    assert!(dst[CD_SECTOR_SIZE..].iter().all(|&b| b == 0));
}
