//! CD sector framing shared by the codecs and the sector readers.

use serde::Serialize;

use crate::ChdError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// CD sync pattern at the start of every raw (2352-byte) data sector.
pub const CD_SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Raw CD sector size (sync + header + subheader + data + EDC + ECC).
pub const CD_SECTOR_SIZE: usize = 2352;

/// Subchannel bytes stored after each raw sector.
pub const CD_SUBCODE_SIZE: usize = 96;

/// One CHD CD unit: raw sector followed by its subchannel.
pub const CD_FRAME_SIZE: usize = CD_SECTOR_SIZE + CD_SUBCODE_SIZE;

/// User data bytes per ISO 9660 sector.
pub const ISO_SECTOR_SIZE: usize = 2048;

/// Offset to user data within a Mode 1 raw sector (12 sync + 4 header).
pub const MODE1_DATA_OFFSET: usize = 16;

/// Offset to user data within a Mode 2 Form 1 raw sector.
/// 12 (sync) + 4 (header) + 8 (subheader) = 24.
pub const MODE2_FORM1_DATA_OFFSET: usize = 24;

/// ISO 9660 Primary Volume Descriptor is always at sector 16.
pub const PVD_SECTOR: u64 = 16;

/// Type byte plus standard identifier at the start of a PVD.
pub const PVD_SIGNATURE: [u8; 6] = [0x01, b'C', b'D', b'0', b'0', b'1'];

// ---------------------------------------------------------------------------
// Sector helpers
// ---------------------------------------------------------------------------

/// True if `unit` starts with the 12-byte CD sync pattern.
pub fn has_sync_header(unit: &[u8]) -> bool {
    unit.len() >= CD_SYNC_PATTERN.len() && unit[..CD_SYNC_PATTERN.len()] == CD_SYNC_PATTERN
}

/// Offset of the 2048-byte user data within a unit.
///
/// Raw sectors carry a sync header: user data follows at 16 for Mode 1 and
/// at 24 when the mode byte (offset 15) is 2. Units without a sync header
/// already hold bare user data.
pub fn user_data_offset(unit: &[u8]) -> usize {
    if !has_sync_header(unit) {
        return 0;
    }
    match unit.get(15) {
        Some(2) => MODE2_FORM1_DATA_OFFSET,
        _ => MODE1_DATA_OFFSET,
    }
}

/// True if `unit` starts with an ISO 9660 Primary Volume Descriptor.
pub fn is_pvd(unit: &[u8]) -> bool {
    unit.len() > PVD_SIGNATURE.len() && unit[..PVD_SIGNATURE.len()] == PVD_SIGNATURE
}

// ---------------------------------------------------------------------------
// Downstream contract
// ---------------------------------------------------------------------------

/// Where the first data track of a CD-framed container lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataTrackLayout {
    /// Sector index (unit index) at which the data track's user data begins.
    pub first_sector: u64,
    /// Byte offset of the track in the logical address space.
    pub byte_offset: u64,
    /// User-data size of the track (frames x 2048).
    pub size: u64,
}

/// A positioned-read view over decompressed container data.
///
/// Implemented by the sector readers of an open container; consumed by
/// file-system walkers that only know about logical offsets.
pub trait SectorSource: Send + Sync {
    /// Bytes per addressable sector of this view.
    fn sector_size(&self) -> usize;

    /// Total bytes addressable through this view, if known.
    fn len(&self) -> u64;

    /// True when the view exposes no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read into `buf` starting at logical byte `offset`. Returns the number
    /// of bytes copied; a short count means the view ended or a later hunk
    /// failed after some bytes were already read.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, ChdError>;

    /// Read one whole sector.
    fn read_sector(&self, index: u64) -> Result<Vec<u8>, ChdError> {
        let size = self.sector_size();
        let mut buf = vec![0u8; size];
        let n = self.read_at(&mut buf, index * size as u64)?;
        if n < size {
            return Err(ChdError::corrupt_data(format!(
                "sector {index} truncated: {n} of {size} bytes"
            )));
        }
        Ok(buf)
    }
}

#[cfg(test)]
#[path = "tests/cd_tests.rs"]
mod tests;
