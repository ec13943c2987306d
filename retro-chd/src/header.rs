//! CHD header parsing (versions 3, 4 and 5).
//!
//! Every header starts with the 8-byte magic, a 4-byte header length and a
//! 4-byte version; the rest is a fixed big-endian layout per version.

use serde::Serialize;

use retro_chd_core::cd::CD_FRAME_SIZE;
use retro_chd_core::source::read_array_at;
use retro_chd_core::util::{be_u32, be_u64};
use retro_chd_core::{ChdError, ReadAt};

use crate::codec::CodecTag;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// CHD file magic bytes.
pub const CHD_MAGIC: &[u8; 8] = b"MComprHD";

pub const HEADER_SIZE_V3: u32 = 120;
pub const HEADER_SIZE_V4: u32 = 108;
pub const HEADER_SIZE_V5: u32 = 124;

/// Hard ceiling on the hunk count of any container.
pub const MAX_NUM_HUNKS: u64 = 10_000_000;

/// Legacy (v3/v4) compression method values.
pub const LEGACY_COMPRESSION_NONE: u32 = 0;
pub const LEGACY_COMPRESSION_ZLIB: u32 = 1;
pub const LEGACY_COMPRESSION_ZLIB_PLUS: u32 = 2;

/// Bytes of magic + length + version that precede every layout.
const PREAMBLE_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Normalized CHD header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Declared header length in bytes.
    pub length: u32,
    pub version: u32,
    /// v3/v4 flags (0 for v5).
    pub flags: u32,
    /// v3/v4 compression method (0 for v5).
    pub compression: u32,
    /// Compressor tags for hunk codec slots 0-3. v3/v4 headers get a
    /// synthesized slot 0 for their legacy zlib method.
    pub compressors: [CodecTag; 4],
    /// Hunk count as stored (0 in v5, where it is derived).
    pub total_hunks: u32,
    pub logical_bytes: u64,
    pub map_offset: u64,
    pub meta_offset: u64,
    pub hunk_bytes: u32,
    pub unit_bytes: u32,
    #[serde(serialize_with = "serialize_digest")]
    pub sha1: [u8; 20],
    #[serde(serialize_with = "serialize_digest")]
    pub raw_sha1: [u8; 20],
    #[serde(serialize_with = "serialize_digest")]
    pub parent_sha1: [u8; 20],
    /// v3 only.
    #[serde(serialize_with = "serialize_digest")]
    pub md5: [u8; 16],
    /// v3 only.
    #[serde(serialize_with = "serialize_digest")]
    pub parent_md5: [u8; 16],
}

fn serialize_digest<S: serde::Serializer, const N: usize>(
    digest: &[u8; N],
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(&retro_chd_core::util::hex_string(digest))
}

impl Header {
    pub(crate) fn empty(length: u32, version: u32) -> Self {
        Self {
            length,
            version,
            flags: 0,
            compression: 0,
            compressors: [CodecTag::NONE; 4],
            total_hunks: 0,
            logical_bytes: 0,
            map_offset: 0,
            meta_offset: 0,
            hunk_bytes: 0,
            unit_bytes: 0,
            sha1: [0; 20],
            raw_sha1: [0; 20],
            parent_sha1: [0; 20],
            md5: [0; 16],
            parent_md5: [0; 16],
        }
    }

    /// Read and validate the header at the start of `source`.
    pub fn read(source: &dyn ReadAt) -> Result<Self, ChdError> {
        let preamble: [u8; PREAMBLE_SIZE] = read_array_at(source, 0).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ChdError::invalid_header("file too small for a CHD header")
            } else {
                ChdError::Io(e)
            }
        })?;
        if &preamble[..8] != CHD_MAGIC {
            return Err(ChdError::InvalidMagic);
        }

        let length = be_u32(&preamble, 8);
        let version = be_u32(&preamble, 12);
        if (length as usize) < PREAMBLE_SIZE {
            return Err(ChdError::invalid_header(format!(
                "header length {length} too small"
            )));
        }

        let required = match version {
            3 => HEADER_SIZE_V3,
            4 => HEADER_SIZE_V4,
            5 => HEADER_SIZE_V5,
            other => return Err(ChdError::UnsupportedVersion(other)),
        };
        if length < required {
            return Err(ChdError::invalid_header(format!(
                "v{version} header needs {required} bytes, declared {length}"
            )));
        }

        // Fields past the fixed layout are ignored, so never read more than it.
        let mut buf = vec![0u8; required as usize];
        source.read_exact_at(&mut buf, 0).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ChdError::invalid_header(format!("v{version} header truncated"))
            } else {
                ChdError::Io(e)
            }
        })?;

        Self::parse(&buf)
    }

    /// Parse a header from an in-memory buffer that starts at the magic.
    pub fn parse(buf: &[u8]) -> Result<Self, ChdError> {
        if buf.len() < PREAMBLE_SIZE {
            return Err(ChdError::invalid_header("buffer too small for a CHD header"));
        }
        if &buf[..8] != CHD_MAGIC {
            return Err(ChdError::InvalidMagic);
        }
        let length = be_u32(buf, 8);
        let version = be_u32(buf, 12);

        let header = match version {
            5 => Self::parse_v5(buf, length)?,
            4 => Self::parse_v4(buf, length)?,
            3 => Self::parse_v3(buf, length)?,
            other => return Err(ChdError::UnsupportedVersion(other)),
        };
        header.validate()?;

        log::debug!(
            "CHD v{}: {} hunks of {} bytes, unit {} bytes, logical {} bytes",
            header.version,
            header.num_hunks(),
            header.hunk_bytes,
            header.unit_bytes,
            header.logical_bytes,
        );
        Ok(header)
    }

    fn parse_v5(buf: &[u8], length: u32) -> Result<Self, ChdError> {
        if buf.len() < HEADER_SIZE_V5 as usize {
            return Err(ChdError::invalid_header("buffer too small for V5"));
        }
        let mut h = Self::empty(length, 5);
        for (slot, tag) in h.compressors.iter_mut().enumerate() {
            *tag = CodecTag(be_u32(buf, 16 + slot * 4));
        }
        h.logical_bytes = be_u64(buf, 32);
        h.map_offset = be_u64(buf, 40);
        h.meta_offset = be_u64(buf, 48);
        h.hunk_bytes = be_u32(buf, 56);
        h.unit_bytes = be_u32(buf, 60);
        h.raw_sha1.copy_from_slice(&buf[64..84]);
        h.sha1.copy_from_slice(&buf[84..104]);
        h.parent_sha1.copy_from_slice(&buf[104..124]);
        Ok(h)
    }

    fn parse_v4(buf: &[u8], length: u32) -> Result<Self, ChdError> {
        if buf.len() < HEADER_SIZE_V4 as usize {
            return Err(ChdError::invalid_header("buffer too small for V4"));
        }
        let mut h = Self::parse_legacy_common(buf, length, 4);
        h.hunk_bytes = be_u32(buf, 44);
        h.sha1.copy_from_slice(&buf[48..68]);
        h.parent_sha1.copy_from_slice(&buf[68..88]);
        h.raw_sha1.copy_from_slice(&buf[88..108]);
        Ok(h)
    }

    fn parse_v3(buf: &[u8], length: u32) -> Result<Self, ChdError> {
        if buf.len() < HEADER_SIZE_V3 as usize {
            return Err(ChdError::invalid_header("buffer too small for V3"));
        }
        let mut h = Self::parse_legacy_common(buf, length, 3);
        h.md5.copy_from_slice(&buf[44..60]);
        h.parent_md5.copy_from_slice(&buf[60..76]);
        h.hunk_bytes = be_u32(buf, 76);
        h.sha1.copy_from_slice(&buf[80..100]);
        h.parent_sha1.copy_from_slice(&buf[100..120]);
        Ok(h)
    }

    /// Fields shared by v3 and v4, up to the metadata offset.
    fn parse_legacy_common(buf: &[u8], length: u32, version: u32) -> Self {
        let mut h = Self::empty(length, version);
        h.flags = be_u32(buf, 16);
        h.compression = be_u32(buf, 20);
        h.total_hunks = be_u32(buf, 24);
        h.logical_bytes = be_u64(buf, 28);
        h.meta_offset = be_u64(buf, 36);
        h.map_offset = length as u64;
        h.unit_bytes = CD_FRAME_SIZE as u32;
        if matches!(
            h.compression,
            LEGACY_COMPRESSION_ZLIB | LEGACY_COMPRESSION_ZLIB_PLUS
        ) {
            h.compressors[0] = CodecTag::ZLIB;
        }
        h
    }

    fn validate(&self) -> Result<(), ChdError> {
        if self.hunk_bytes == 0 {
            return Err(ChdError::invalid_header("hunk size is 0"));
        }
        if self.unit_bytes == 0 {
            return Err(ChdError::invalid_header("unit size is 0"));
        }
        let hunks = self.num_hunks();
        if hunks > MAX_NUM_HUNKS {
            return Err(ChdError::invalid_header(format!(
                "too many hunks ({hunks} > {MAX_NUM_HUNKS})"
            )));
        }
        Ok(())
    }

    /// Number of hunks: the stored count, or `ceil(logical / hunk)` when the
    /// header leaves it at 0. A zero hunk size yields 0.
    pub fn num_hunks(&self) -> u64 {
        if self.total_hunks != 0 {
            return self.total_hunks as u64;
        }
        if self.hunk_bytes == 0 {
            return 0;
        }
        self.logical_bytes.div_ceil(self.hunk_bytes as u64)
    }

    /// True if any hunk may be stored compressed.
    pub fn is_compressed(&self) -> bool {
        if self.version == 5 {
            !self.compressors[0].is_none()
        } else {
            self.compression != LEGACY_COMPRESSION_NONE
        }
    }

    /// True if the header names a parent container.
    pub fn has_parent(&self) -> bool {
        self.parent_sha1.iter().any(|&b| b != 0) || self.parent_md5.iter().any(|&b| b != 0)
    }

    /// Units (frames) per hunk; 0 if the unit is larger than the hunk.
    pub fn units_per_hunk(&self) -> u32 {
        if self.unit_bytes == 0 {
            0
        } else {
            self.hunk_bytes / self.unit_bytes
        }
    }
}

#[cfg(test)]
#[path = "tests/header_tests.rs"]
mod tests;
