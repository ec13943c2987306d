//! Flat (v3/v4) hunk map: one 16-byte record per hunk.
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 8 | file offset (or inline data / hunk index, by type) |
//! | 8 | 4 | CRC-32 of the decompressed hunk |
//! | 12 | 2 | compressed length, low 16 bits |
//! | 14 | 1 | compressed length, high 8 bits |
//! | 15 | 1 | flags: type in the low nibble, 0x10 = no CRC |

use retro_chd_core::util::{be_u16, be_u32, be_u64};
use retro_chd_core::{ChdError, ReadAt};

use super::{HunkKind, HunkMapEntry};
use crate::header::Header;

pub const ENTRY_SIZE: usize = 16;

const TYPE_MASK: u8 = 0x0F;
const FLAG_NO_CRC: u8 = 0x10;

// Record types.
const TYPE_COMPRESSED: u8 = 1;
const TYPE_UNCOMPRESSED: u8 = 2;
const TYPE_MINI: u8 = 3;
const TYPE_SELF_HUNK: u8 = 4;
const TYPE_PARENT_HUNK: u8 = 5;

/// Read the flat map that follows the header.
pub fn read_map(source: &dyn ReadAt, header: &Header) -> Result<Vec<HunkMapEntry>, ChdError> {
    let num_hunks = super::checked_hunk_count(header)?;
    let mut raw = vec![0u8; num_hunks as usize * ENTRY_SIZE];
    source
        .read_exact_at(&mut raw, header.map_offset)
        .map_err(|e| ChdError::invalid_header(format!("hunk map truncated: {e}")))?;
    let entries = decode_map(&raw);
    log::debug!("Decoded v{} map: {} hunks", header.version, entries.len());
    Ok(entries)
}

/// Decode consecutive 16-byte records.
pub fn decode_map(raw: &[u8]) -> Vec<HunkMapEntry> {
    raw.chunks_exact(ENTRY_SIZE).map(decode_entry).collect()
}

fn decode_entry(record: &[u8]) -> HunkMapEntry {
    let flags = record[15];
    let kind = match flags & TYPE_MASK {
        TYPE_COMPRESSED => HunkKind::Codec(0),
        TYPE_UNCOMPRESSED => HunkKind::Uncompressed,
        TYPE_MINI => HunkKind::Mini,
        TYPE_SELF_HUNK => HunkKind::SelfRef,
        TYPE_PARENT_HUNK => HunkKind::ParentRef,
        // Unknown types fall back on bit 0: set means compressed.
        _ if flags & 1 != 0 => HunkKind::Codec(0),
        _ => HunkKind::Uncompressed,
    };

    let mut entry = HunkMapEntry::new(kind);
    entry.offset = be_u64(record, 0);
    entry.length = be_u16(record, 12) as u32 | (record[14] as u32) << 16;
    if flags & FLAG_NO_CRC == 0 {
        entry.crc32 = Some(be_u32(record, 8));
    }
    entry
}

#[cfg(test)]
#[path = "tests/flat_tests.rs"]
mod tests;
