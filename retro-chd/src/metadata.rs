//! Metadata chain parsing.
//!
//! Metadata is a singly linked list of records starting at the header's
//! metadata offset. Each record is a 16-byte prefix followed by its payload:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | tag |
//! | 4 | 1 | flags |
//! | 5 | 3 | payload length (big-endian) |
//! | 8 | 8 | offset of the next record, 0 = end |

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use retro_chd_core::source::read_array_at;
use retro_chd_core::util::{be_u24, be_u32, be_u64};
use retro_chd_core::{ChdError, ReadAt};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const METADATA_HEADER_SIZE: usize = 16;

/// Largest payload accepted for one record.
pub const MAX_METADATA_LEN: u32 = 16 * 1024 * 1024;

/// Longest chain followed before giving up.
pub const MAX_METADATA_ENTRIES: usize = 1000;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// A four-character metadata tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MetadataTag(pub u32);

impl MetadataTag {
    /// Text CD track, first revision.
    pub const CD_TRACK: MetadataTag = MetadataTag::from_bytes(b"CHTR");
    /// Text CD track, second revision (adds pregap/postgap keys).
    pub const CD_TRACK_V2: MetadataTag = MetadataTag::from_bytes(b"CHT2");
    /// Text GD-ROM track.
    pub const GD_TRACK: MetadataTag = MetadataTag::from_bytes(b"CHGD");
    /// Binary table of all CD tracks.
    pub const CD_TABLE: MetadataTag = MetadataTag::from_bytes(b"CHCD");

    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        MetadataTag(u32::from_be_bytes(*bytes))
    }

    /// True for the tags that describe tracks.
    pub fn is_track(self) -> bool {
        matches!(
            self,
            Self::CD_TRACK | Self::CD_TRACK_V2 | Self::GD_TRACK | Self::CD_TABLE
        )
    }
}

impl fmt::Display for MetadataTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            bytes.iter().try_for_each(|&b| write!(f, "{}", b as char))
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

impl fmt::Debug for MetadataTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataTag({})", self)
    }
}

impl Serialize for MetadataTag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One record of the metadata chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    /// File offset of this record's prefix.
    pub offset: u64,
    pub tag: MetadataTag,
    pub flags: u8,
    #[serde(skip)]
    pub data: Vec<u8>,
    /// File offset of the next record, 0 at the end of the chain.
    pub next: u64,
}

impl MetadataEntry {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The payload as text with trailing NULs and whitespace removed, if it
    /// is printable ASCII.
    pub fn text(&self) -> Option<&str> {
        let s = std::str::from_utf8(&self.data).ok()?;
        let s = s.trim_end_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
        s.chars()
            .all(|c| c.is_ascii_graphic() || c == ' ')
            .then_some(s)
    }
}

/// Read the whole chain starting at `offset`, in link order. An offset of 0
/// is an empty chain.
pub fn read_metadata(source: &dyn ReadAt, mut offset: u64) -> Result<Vec<MetadataEntry>, ChdError> {
    let mut entries = Vec::new();
    let mut visited = HashSet::new();

    while offset != 0 {
        if !visited.insert(offset) {
            return Err(ChdError::CircularChain { offset });
        }
        if entries.len() >= MAX_METADATA_ENTRIES {
            return Err(ChdError::invalid_metadata(format!(
                "more than {MAX_METADATA_ENTRIES} metadata entries"
            )));
        }
        let entry = read_entry(source, offset)?;
        offset = entry.next;
        entries.push(entry);
    }

    log::debug!("Read {} metadata entries", entries.len());
    Ok(entries)
}

fn truncated(offset: u64, e: std::io::Error) -> ChdError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ChdError::invalid_metadata(format!("metadata entry at {offset} truncated"))
    } else {
        ChdError::Io(e)
    }
}

fn read_entry(source: &dyn ReadAt, offset: u64) -> Result<MetadataEntry, ChdError> {
    let prefix: [u8; METADATA_HEADER_SIZE] =
        read_array_at(source, offset).map_err(|e| truncated(offset, e))?;

    let length = be_u24(&prefix, 5);
    if length > MAX_METADATA_LEN {
        return Err(ChdError::invalid_metadata(format!(
            "metadata entry too large ({length} > {MAX_METADATA_LEN})"
        )));
    }

    let mut data = vec![0u8; length as usize];
    source
        .read_exact_at(&mut data, offset + METADATA_HEADER_SIZE as u64)
        .map_err(|e| truncated(offset, e))?;

    Ok(MetadataEntry {
        offset,
        tag: MetadataTag(be_u32(&prefix, 0)),
        flags: prefix[4],
        data,
        next: be_u64(&prefix, 8),
    })
}

#[cfg(test)]
#[path = "tests/metadata_tests.rs"]
mod tests;
