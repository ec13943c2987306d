//! Compressed (v5) hunk map.
//!
//! The map is a 16-byte header followed by a bit-packed body. The body
//! holds a Huffman tree, one Huffman-coded type symbol per hunk (with two
//! run-length escapes), and then per-hunk fields whose widths depend on the
//! type. Decoding runs in two passes over one bit cursor: first the type
//! stream is expanded into one type per hunk, then the fields are read.

use retro_chd_core::util::{be_u16, be_u32, be_u48};
use retro_chd_core::{ChdError, ReadAt};

use super::{HunkKind, HunkMapEntry};
use crate::bitstream::BitReader;
use crate::header::Header;
use crate::huffman::HuffmanDecoder;

/// Hard ceiling on the compressed map body.
pub const MAX_COMPRESSED_MAP_BYTES: u32 = 100 * 1024 * 1024;

pub const MAP_HEADER_SIZE: usize = 16;

// Type symbols of the compressed map.
pub const COMPRESSION_TYPE_0: u8 = 0;
pub const COMPRESSION_TYPE_3: u8 = 3;
pub const COMPRESSION_NONE: u8 = 4;
pub const COMPRESSION_SELF: u8 = 5;
pub const COMPRESSION_PARENT: u8 = 6;
pub const COMPRESSION_RLE_SMALL: u8 = 7;
pub const COMPRESSION_RLE_LARGE: u8 = 8;
pub const COMPRESSION_SELF_0: u8 = 9;
pub const COMPRESSION_SELF_1: u8 = 10;
pub const COMPRESSION_PARENT_SELF: u8 = 11;
pub const COMPRESSION_PARENT_0: u8 = 12;
pub const COMPRESSION_PARENT_1: u8 = 13;

const HUFFMAN_CODES: usize = 16;
const HUFFMAN_MAX_BITS: u32 = 8;

/// The fixed 16-byte map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    /// Bytes of compressed map body following the header.
    pub compressed_len: u32,
    /// File offset of the first stored hunk.
    pub first_offset: u64,
    /// CRC-16 of the decoded map (not verified).
    pub crc: u16,
    pub length_bits: u8,
    pub self_bits: u8,
    pub parent_bits: u8,
}

impl MapHeader {
    pub fn parse(buf: &[u8; MAP_HEADER_SIZE]) -> Self {
        Self {
            compressed_len: be_u32(buf, 0),
            first_offset: be_u48(buf, 4),
            crc: be_u16(buf, 10),
            length_bits: buf[12],
            self_bits: buf[13],
            parent_bits: buf[14],
        }
    }
}

/// Geometry the field pass needs from the container header.
#[derive(Debug, Clone, Copy)]
pub struct MapGeometry {
    pub num_hunks: u32,
    pub hunk_bytes: u32,
    pub unit_bytes: u32,
}

/// Read and decode the v5 map at the header's map offset.
pub fn read_map(source: &dyn ReadAt, header: &Header) -> Result<Vec<HunkMapEntry>, ChdError> {
    let num_hunks = super::checked_hunk_count(header)?;

    let mut raw = [0u8; MAP_HEADER_SIZE];
    source
        .read_exact_at(&mut raw, header.map_offset)
        .map_err(|e| ChdError::invalid_header(format!("map header unreadable: {e}")))?;
    let map_header = MapHeader::parse(&raw);

    if map_header.compressed_len > MAX_COMPRESSED_MAP_BYTES {
        return Err(ChdError::invalid_header(format!(
            "compressed map too large ({} > {MAX_COMPRESSED_MAP_BYTES})",
            map_header.compressed_len
        )));
    }

    let mut body = vec![0u8; map_header.compressed_len as usize];
    source
        .read_exact_at(&mut body, header.map_offset + MAP_HEADER_SIZE as u64)
        .map_err(|e| ChdError::invalid_header(format!("compressed map truncated: {e}")))?;

    let geometry = MapGeometry {
        num_hunks,
        hunk_bytes: header.hunk_bytes,
        unit_bytes: header.unit_bytes,
    };
    decode_map(&body, &map_header, geometry)
}

/// Decode a compressed map body.
pub fn decode_map(
    body: &[u8],
    map_header: &MapHeader,
    geometry: MapGeometry,
) -> Result<Vec<HunkMapEntry>, ChdError> {
    for (name, bits) in [
        ("length", map_header.length_bits),
        ("self-reference", map_header.self_bits),
        ("parent-reference", map_header.parent_bits),
    ] {
        if bits > 32 {
            return Err(ChdError::invalid_header(format!(
                "map {name} field is {bits} bits wide"
            )));
        }
    }

    let mut reader = BitReader::new(body);
    let mut decoder = HuffmanDecoder::new(HUFFMAN_CODES, HUFFMAN_MAX_BITS);
    decoder.import_tree_rle(&mut reader)?;

    let types = decode_types(&mut reader, &decoder, geometry.num_hunks as usize)?;
    let entries = decode_fields(&mut reader, &types, map_header, geometry);

    if reader.overflowed() {
        log::debug!(
            "Hunk map read {} bits past a {}-byte body",
            reader.position().saturating_sub(body.len() as u64 * 8),
            body.len()
        );
    }
    log::debug!(
        "Decoded v5 map: {} hunks, first offset {:#x}",
        entries.len(),
        map_header.first_offset
    );
    Ok(entries)
}

/// First pass: one type symbol per hunk, run-length escapes expanded.
fn decode_types(
    reader: &mut BitReader<'_>,
    decoder: &HuffmanDecoder,
    num_hunks: usize,
) -> Result<Vec<u8>, ChdError> {
    let mut types = vec![0u8; num_hunks];
    let mut last = 0u8;
    let mut repeat = 0usize;

    for slot in types.iter_mut() {
        if repeat > 0 {
            *slot = last;
            repeat -= 1;
            continue;
        }
        match decoder.decode(reader)? {
            COMPRESSION_RLE_SMALL => {
                *slot = last;
                repeat = 2 + decoder.decode(reader)? as usize;
            }
            COMPRESSION_RLE_LARGE => {
                *slot = last;
                let high = decoder.decode(reader)? as usize;
                let low = decoder.decode(reader)? as usize;
                repeat = 2 + 16 + (high << 4) + low;
            }
            symbol => {
                *slot = symbol;
                last = symbol;
            }
        }
    }
    Ok(types)
}

/// Parent offset, in units, of the first byte of hunk `hunk`.
fn parent_units(hunk: u64, geometry: MapGeometry) -> u64 {
    if geometry.unit_bytes == 0 {
        return 0;
    }
    hunk * geometry.hunk_bytes as u64 / geometry.unit_bytes as u64
}

/// Second pass: offsets, lengths and references per hunk.
fn decode_fields(
    reader: &mut BitReader<'_>,
    types: &[u8],
    map_header: &MapHeader,
    geometry: MapGeometry,
) -> Vec<HunkMapEntry> {
    let mut offset = map_header.first_offset;
    let mut last_self: u64 = 0;
    let mut last_parent: u64 = 0;

    types
        .iter()
        .enumerate()
        .map(|(hunk, &symbol)| {
            let mut entry = HunkMapEntry::new(HunkKind::Other(symbol));
            match symbol {
                COMPRESSION_TYPE_0..=COMPRESSION_TYPE_3 => {
                    entry.kind = HunkKind::Codec(symbol);
                    entry.length = reader.read(map_header.length_bits as u32);
                    entry.offset = offset;
                    offset += entry.length as u64;
                    entry.crc16 = Some(reader.read(16) as u16);
                }
                COMPRESSION_NONE => {
                    entry.kind = HunkKind::Uncompressed;
                    entry.length = geometry.hunk_bytes;
                    entry.offset = offset;
                    offset += entry.length as u64;
                    entry.crc16 = Some(reader.read(16) as u16);
                }
                COMPRESSION_SELF => {
                    last_self = reader.read(map_header.self_bits as u32) as u64;
                    entry.kind = HunkKind::SelfRef;
                    entry.offset = last_self;
                }
                COMPRESSION_PARENT => {
                    last_parent = reader.read(map_header.parent_bits as u32) as u64;
                    entry.kind = HunkKind::ParentRef;
                    entry.offset = last_parent;
                }
                COMPRESSION_SELF_0 => {
                    entry.kind = HunkKind::SelfRef;
                    entry.offset = last_self;
                }
                COMPRESSION_SELF_1 => {
                    last_self += 1;
                    entry.kind = HunkKind::SelfRef;
                    entry.offset = last_self;
                }
                COMPRESSION_PARENT_SELF => {
                    last_parent = parent_units(hunk as u64, geometry);
                    entry.kind = HunkKind::ParentRef;
                    entry.offset = last_parent;
                }
                COMPRESSION_PARENT_0 => {
                    entry.kind = HunkKind::ParentRef;
                    entry.offset = last_parent;
                }
                COMPRESSION_PARENT_1 => {
                    last_parent += parent_units(1, geometry);
                    entry.kind = HunkKind::ParentRef;
                    entry.offset = last_parent;
                }
                // Escapes never survive the first pass; anything else is
                // carried through and rejected when the hunk is read.
                _ => {}
            }
            entry
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/v5_tests.rs"]
mod tests;
