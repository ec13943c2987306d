//! Checksums of a container's first data track.

use serde::Serialize;
use sha1::Digest;

use retro_chd_core::cd::ISO_SECTOR_SIZE;
use retro_chd_core::{ChdError, SectorSource};

use crate::chd::Chd;

/// Sectors hashed per read (64 KB).
const CHUNK_SECTORS: usize = 32;

/// Hashes of the first data track's user data, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTrackHashes {
    pub crc32: String,
    pub sha1: String,
    pub md5: String,
    /// Bytes hashed.
    pub data_size: u64,
}

/// Hash the 2048-byte sectors of the first data track.
///
/// The callback receives (bytes_processed, total_bytes).
pub fn hash_data_track(
    chd: &Chd,
    progress: &dyn Fn(u64, u64),
) -> Result<DataTrackHashes, ChdError> {
    hash_source(&chd.data_track_sector_reader(), progress)
}

/// Hash every byte of a sector source.
pub fn hash_source(
    source: &dyn SectorSource,
    progress: &dyn Fn(u64, u64),
) -> Result<DataTrackHashes, ChdError> {
    let total = source.len();
    let mut crc = crc32fast::Hasher::new();
    let mut sha = sha1::Sha1::new();
    let mut md5 = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SECTORS * ISO_SECTOR_SIZE];
    let mut processed: u64 = 0;

    while processed < total {
        let n = source.read_at(&mut buf, processed)?;
        if n == 0 {
            return Err(ChdError::corrupt_data(format!(
                "data track ended at byte {processed} of {total}"
            )));
        }
        crc.update(&buf[..n]);
        sha.update(&buf[..n]);
        md5.consume(&buf[..n]);
        processed += n as u64;
        progress(processed, total);
    }

    Ok(DataTrackHashes {
        crc32: format!("{:08x}", crc.finalize()),
        sha1: format!("{:x}", sha.finalize()),
        md5: format!("{:x}", md5.compute()),
        data_size: processed,
    })
}

#[cfg(test)]
#[path = "tests/hash_tests.rs"]
mod tests;
