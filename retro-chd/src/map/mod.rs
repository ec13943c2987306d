//! Hunk map: where each hunk lives and how to turn it back into bytes.
//!
//! The map is decoded once at open. Reads go through [`HunkMap::read_hunk`],
//! which consults the cache, resolves self-references, and drives the codec
//! assigned to the hunk's compressor slot.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use retro_chd_core::{ChdError, ReadAt};

use crate::cache::HunkCache;
use crate::codec::{Codec, CodecRegistry, CodecTag};
use crate::header::{Header, MAX_NUM_HUNKS};
use crate::options::ChdOptions;

pub mod flat;
pub mod v5;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// How a hunk is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HunkKind {
    /// Compressed with the codec in compressor slot 0-3.
    Codec(u8),
    /// Stored as-is at the entry offset.
    Uncompressed,
    /// An 8-byte pattern (held in the offset field) repeated over the hunk.
    Mini,
    /// Same data as the hunk whose index is the entry offset.
    SelfRef,
    /// Data lives in a parent image at the entry offset (in units).
    ParentRef,
    /// A type symbol with no defined meaning.
    Other(u8),
}

/// One decoded map record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HunkMapEntry {
    pub kind: HunkKind,
    /// File offset, hunk index or parent unit offset, by kind.
    pub offset: u64,
    /// Stored length in bytes for compressed and uncompressed hunks.
    pub length: u32,
    /// CRC-32 of the decompressed hunk (v3/v4).
    pub crc32: Option<u32>,
    /// CRC-16 of the decompressed hunk (v5, not verified).
    pub crc16: Option<u16>,
}

impl HunkMapEntry {
    pub fn new(kind: HunkKind) -> Self {
        Self {
            kind,
            offset: 0,
            length: 0,
            crc32: None,
            crc16: None,
        }
    }
}

/// Hunk count of `header`, rejected before anything is sized from it.
pub(crate) fn checked_hunk_count(header: &Header) -> Result<u32, ChdError> {
    let hunks = header.num_hunks();
    if hunks > MAX_NUM_HUNKS {
        return Err(ChdError::invalid_header(format!(
            "too many hunks ({hunks} > {MAX_NUM_HUNKS})"
        )));
    }
    u32::try_from(hunks)
        .map_err(|_| ChdError::invalid_header(format!("hunk count {hunks} out of range")))
}

// ---------------------------------------------------------------------------
// Hunk map
// ---------------------------------------------------------------------------

/// A compressor slot and the codec instance serving it.
struct CodecSlot {
    tag: CodecTag,
    codec: Option<Mutex<Box<dyn Codec>>>,
}

/// Decoded hunk map plus the state needed to read hunks.
pub struct HunkMap {
    source: Arc<dyn ReadAt>,
    entries: Vec<HunkMapEntry>,
    slots: Vec<CodecSlot>,
    cache: HunkCache,
    hunk_bytes: u32,
    unit_bytes: u32,
    self_ref_limit: usize,
}

impl std::fmt::Debug for HunkMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HunkMap")
            .field("hunks", &self.entries.len())
            .field("hunk_bytes", &self.hunk_bytes)
            .field("unit_bytes", &self.unit_bytes)
            .field("codecs", &self.codec_tags())
            .finish()
    }
}

impl HunkMap {
    /// Decode the map described by `header` and create one codec instance
    /// per non-empty compressor slot.
    ///
    /// A slot whose codec is not registered is logged and left empty; only
    /// hunks that actually use it fail.
    pub fn new(
        source: Arc<dyn ReadAt>,
        header: &Header,
        registry: &CodecRegistry,
        options: &ChdOptions,
    ) -> Result<Self, ChdError> {
        let entries = match header.version {
            5 => v5::read_map(source.as_ref(), header)?,
            3 | 4 => flat::read_map(source.as_ref(), header)?,
            other => return Err(ChdError::UnsupportedVersion(other)),
        };

        let slots = header
            .compressors
            .iter()
            .map(|&tag| {
                let codec = if tag.is_none() {
                    None
                } else {
                    match registry.create(tag) {
                        Ok(codec) => {
                            log::debug!("Codec {} ready", tag);
                            Some(Mutex::new(codec))
                        }
                        Err(e) => {
                            log::warn!("No codec for compressor {}: {}", tag, e);
                            None
                        }
                    }
                };
                CodecSlot { tag, codec }
            })
            .collect();

        let hunk_count = entries.len() as u32;
        Ok(Self {
            source,
            entries,
            slots,
            cache: HunkCache::new(options.cache_hunks),
            hunk_bytes: header.hunk_bytes,
            unit_bytes: header.unit_bytes,
            self_ref_limit: options.self_ref_limit(hunk_count),
        })
    }

    pub fn num_hunks(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn hunk_bytes(&self) -> u32 {
        self.hunk_bytes
    }

    pub fn unit_bytes(&self) -> u32 {
        self.unit_bytes
    }

    pub fn entry(&self, index: u32) -> Option<&HunkMapEntry> {
        self.entries.get(index as usize)
    }

    pub fn entries(&self) -> &[HunkMapEntry] {
        &self.entries
    }

    /// Tags of the four compressor slots.
    pub fn codec_tags(&self) -> Vec<CodecTag> {
        self.slots.iter().map(|slot| slot.tag).collect()
    }

    pub fn cache(&self) -> &HunkCache {
        &self.cache
    }

    fn check_index(&self, index: u64) -> Result<usize, ChdError> {
        if index >= self.entries.len() as u64 {
            return Err(ChdError::InvalidHunk {
                index,
                count: self.num_hunks(),
            });
        }
        Ok(index as usize)
    }

    /// Read hunk `index`, fully decompressed.
    ///
    /// The result is always `hunk_bytes` long; a codec that produces less
    /// leaves the tail zeroed.
    pub fn read_hunk(&self, index: u32) -> Result<Arc<[u8]>, ChdError> {
        self.check_index(index as u64)?;
        if let Some(hit) = self.cache.get(index) {
            return Ok(hit);
        }

        let target = self.resolve_self_refs(index)?;
        let data: Arc<[u8]> = match self.cache.get(target) {
            Some(hit) => hit,
            None => Arc::from(self.decode_hunk(target)?),
        };
        Ok(self.cache.insert(index, data))
    }

    /// Follow self-references from `index` to the hunk that holds data.
    fn resolve_self_refs(&self, index: u32) -> Result<u32, ChdError> {
        let mut current = index;
        let mut visited = HashSet::new();
        loop {
            let entry = &self.entries[current as usize];
            if entry.kind != HunkKind::SelfRef {
                return Ok(current);
            }
            if !visited.insert(current) {
                return Err(ChdError::corrupt_data(format!(
                    "self-reference cycle through hunk {current} (from hunk {index})"
                )));
            }
            if visited.len() > self.self_ref_limit {
                return Err(ChdError::corrupt_data(format!(
                    "self-reference chain from hunk {index} longer than {}",
                    self.self_ref_limit
                )));
            }
            current = self.check_index(entry.offset)? as u32;
        }
    }

    /// Decode a hunk that is not a self-reference.
    fn decode_hunk(&self, index: u32) -> Result<Vec<u8>, ChdError> {
        let entry = self.entries[index as usize];
        let hunk_bytes = self.hunk_bytes as usize;

        match entry.kind {
            HunkKind::Uncompressed => {
                let mut dst = vec![0u8; hunk_bytes];
                self.source.read_exact_at(&mut dst, entry.offset)?;
                Ok(dst)
            }
            HunkKind::Mini => {
                let pattern = entry.offset.to_be_bytes();
                Ok(pattern.iter().copied().cycle().take(hunk_bytes).collect())
            }
            HunkKind::Codec(slot) => self.decode_with_codec(index, slot, &entry),
            HunkKind::ParentRef => Err(ChdError::unsupported_codec(format!(
                "hunk {index} references a parent image"
            ))),
            HunkKind::SelfRef | HunkKind::Other(_) => Err(ChdError::unsupported_codec(format!(
                "hunk {index} has unsupported type {:?}",
                entry.kind
            ))),
        }
    }

    fn decode_with_codec(
        &self,
        index: u32,
        slot: u8,
        entry: &HunkMapEntry,
    ) -> Result<Vec<u8>, ChdError> {
        let codec_slot = self.slots.get(slot as usize).ok_or_else(|| {
            ChdError::unsupported_codec(format!("hunk {index} uses compressor slot {slot}"))
        })?;
        let codec = codec_slot.codec.as_ref().ok_or_else(|| {
            ChdError::unsupported_codec(format!(
                "hunk {index} needs codec {} (slot {slot})",
                codec_slot.tag
            ))
        })?;

        let hunk_bytes = self.hunk_bytes as usize;
        if entry.length as usize > hunk_bytes.saturating_mul(2) {
            return Err(ChdError::corrupt_data(format!(
                "hunk {index} claims {} compressed bytes for a {hunk_bytes}-byte hunk",
                entry.length
            )));
        }
        let mut src = vec![0u8; entry.length as usize];
        self.source.read_exact_at(&mut src, entry.offset)?;

        let mut dst = vec![0u8; hunk_bytes];
        let mut codec = codec.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match codec.as_cd() {
            Some(cd) => {
                let frames = if self.unit_bytes == 0 {
                    0
                } else {
                    hunk_bytes / self.unit_bytes as usize
                };
                cd.decompress_cd(&mut dst, &src, hunk_bytes, frames)
            }
            None => codec.decompress(&mut dst, &src),
        };
        let produced = result.map_err(|e| match e {
            ChdError::DecompressFailed(msg) => {
                ChdError::DecompressFailed(format!("hunk {index}: {msg}"))
            }
            other => other,
        })?;
        if produced < hunk_bytes {
            log::debug!("Hunk {} decoded to {} of {} bytes", index, produced, hunk_bytes);
        }
        Ok(dst)
    }

    /// Decode hunk `index` and check it against the CRC-32 stored in the
    /// map. Hunks without a stored CRC-32 only have to decode.
    pub fn verify_hunk(&self, index: u32) -> Result<(), ChdError> {
        let data = self.read_hunk(index)?;
        let entry = &self.entries[index as usize];
        if let Some(expected) = entry.crc32 {
            let actual = crc32fast::hash(&data);
            if actual != expected {
                return Err(ChdError::corrupt_data(format!(
                    "hunk {index} CRC-32 mismatch: expected {expected:08x}, got {actual:08x}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/map_tests.rs"]
mod tests;
