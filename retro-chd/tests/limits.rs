mod common;

use retro_chd::{Chd, ChdError, ErrorKind};

use common::*;

fn small_v5() -> Vec<u8> {
    ImageBuilder::v5(4096, 512)
        .hunk(Hunk::Raw(vec![1; 4096]))
        .hunk(Hunk::Raw(vec![2; 4096]))
        .build()
}

fn map_offset(image: &[u8]) -> usize {
    u64::from_be_bytes(image[40..48].try_into().unwrap()) as usize
}

#[test]
fn baseline_image_opens() {
    let chd = Chd::from_source(small_v5()).unwrap();
    assert_eq!(chd.read_hunk(1).unwrap()[0], 2);
}

#[test]
fn bad_magic() {
    let mut image = small_v5();
    image[..8].copy_from_slice(b"NotAChd!");
    assert!(matches!(Chd::from_source(image), Err(ChdError::InvalidMagic)));
}

#[test]
fn unsupported_version() {
    let mut image = small_v5();
    image[12..16].copy_from_slice(&7u32.to_be_bytes());
    assert!(matches!(
        Chd::from_source(image),
        Err(ChdError::UnsupportedVersion(7))
    ));
}

#[test]
fn empty_and_tiny_sources() {
    for len in [0, 7, 16, 64] {
        let image = small_v5()[..len].to_vec();
        let err = Chd::from_source(image).unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::InvalidHeader | ErrorKind::InvalidMagic),
            "len {len}: {err}"
        );
    }
}

#[test]
fn oversized_compressed_map_fails_fast() {
    let mut image = small_v5();
    let at = map_offset(&image);
    image[at..at + 4].copy_from_slice(&(100 * 1024 * 1024 + 1u32).to_be_bytes());
    let err = Chd::from_source(image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    assert!(err.to_string().contains("compressed map too large"), "{err}");
}

#[test]
fn truncated_compressed_map() {
    let mut image = small_v5();
    let at = map_offset(&image);
    image[at..at + 4].copy_from_slice(&4096u32.to_be_bytes());
    let err = Chd::from_source(image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHeader);
}

#[test]
fn too_many_hunks_fails_fast() {
    let mut image = small_v5();
    // 10,000,001 hunks of 4096 bytes.
    image[32..40].copy_from_slice(&(10_000_001u64 * 4096).to_be_bytes());
    let err = Chd::from_source(image).unwrap_err();
    assert!(err.to_string().contains("too many hunks"), "{err}");

    let mut image = ImageBuilder::v4(CD_HUNK)
        .hunk(Hunk::Raw(vec![0; CD_HUNK as usize]))
        .build();
    image[24..28].copy_from_slice(&10_000_001u32.to_be_bytes());
    assert_eq!(
        Chd::from_source(image).unwrap_err().kind(),
        ErrorKind::InvalidHeader
    );
}

#[test]
fn v4_map_past_end_of_file() {
    let mut image = ImageBuilder::v4(CD_HUNK)
        .hunk(Hunk::Raw(vec![0; CD_HUNK as usize]))
        .build();
    image[24..28].copy_from_slice(&1000u32.to_be_bytes());
    let err = Chd::from_source(image).unwrap_err();
    assert!(err.to_string().contains("hunk map truncated"), "{err}");
}

#[test]
fn zero_unit_size() {
    let mut image = small_v5();
    image[60..64].copy_from_slice(&0u32.to_be_bytes());
    assert_eq!(
        Chd::from_source(image).unwrap_err().kind(),
        ErrorKind::InvalidHeader
    );
}

#[test]
fn hunk_data_past_end_of_file() {
    let mut image = ImageBuilder::v4(4096)
        .hunk(Hunk::Raw(vec![1; 4096]))
        .hunk(Hunk::Raw(vec![2; 4096]))
        .build();
    // The v4 map sits in front of the data, so cutting the tail only
    // loses hunk bytes.
    image.truncate(image.len() - 100);

    let chd = Chd::from_source(image).unwrap();
    assert_eq!(chd.read_hunk(0).unwrap()[0], 1);
    assert!(chd.read_hunk(1).is_err());
}

#[test]
fn metadata_entry_past_end_of_file() {
    let mut image = ImageBuilder::v5(4096, 512)
        .hunk(Hunk::Raw(vec![0; 4096]))
        .metadata(b"CHT2", &track_text(1, "MODE1_RAW", 2, 0))
        .build();
    image[48..56].copy_from_slice(&(1u64 << 40).to_be_bytes());

    let chd = Chd::from_source(image).unwrap();
    assert!(chd.tracks().is_empty());
    assert_eq!(chd.metadata().unwrap_err().kind(), ErrorKind::InvalidMetadata);
}
