//! LZMA codecs (`lzma`, `cdlz`).
//!
//! Hunks hold a headerless LZMA stream. The properties are fixed (lc=3,
//! lp=0, pb=2) and the dictionary size is derived from the hunk size the
//! same way the encoder normalizes it, so a standard 13-byte header can be
//! rebuilt and handed to the decoder.

use std::io::{self, Cursor, Read};

use flate2::Decompress;
use lzma_rust2::LzmaReader;

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_FRAME_SIZE, CD_SECTOR_SIZE};

use super::cd::{inflate_subcode, interleave, split_ecc_payload};
use super::{CdCodec, Codec, CodecTag};

/// lc + lp * 9 + pb * 45 for lc=3, lp=0, pb=2.
const LZMA_PROPERTIES: u8 = 0x5D;

/// Dictionary size used when no normalized size fits.
const LZMA_DEFAULT_DICT_SIZE: u32 = 1 << 26;

/// Smallest `2 << i` or `3 << i` (11 <= i <= 30) that holds `hunk_bytes`.
pub fn lzma_dict_size(hunk_bytes: u32) -> u32 {
    for i in 11..=30u32 {
        if hunk_bytes <= 2 << i {
            return 2 << i;
        }
        if hunk_bytes <= 3 << i {
            return 3 << i;
        }
    }
    LZMA_DEFAULT_DICT_SIZE
}

/// The 13-byte stream header: properties, dictionary size, unpacked size.
fn stream_header(dict_size: u32, unpacked: u64) -> [u8; 13] {
    let mut header = [0u8; 13];
    header[0] = LZMA_PROPERTIES;
    header[1..5].copy_from_slice(&dict_size.to_le_bytes());
    header[5..13].copy_from_slice(&unpacked.to_le_bytes());
    header
}

/// Decode `src` into `dst` with a dictionary sized for `size_basis` bytes.
fn lzma_decompress(dst: &mut [u8], src: &[u8], size_basis: u32, codec: &str) -> Result<usize, ChdError> {
    if src.is_empty() {
        return Err(ChdError::decompress_failed(format!("{codec}: empty source")));
    }

    let header = stream_header(lzma_dict_size(size_basis), dst.len() as u64);
    let stream = Cursor::new(header).chain(src);
    let mut reader = LzmaReader::new_mem_limit(stream, u32::MAX, None)
        .map_err(|e| ChdError::decompress_failed(format!("{codec} init: {e}")))?;

    let mut filled = 0;
    while filled < dst.len() {
        match reader.read(&mut dst[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            // Truncated input is a short read.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(ChdError::decompress_failed(format!("{codec} read: {e}")));
            }
        }
    }
    Ok(filled)
}

/// Plain LZMA hunks.
#[derive(Debug, Default)]
pub struct LzmaCodec;

impl LzmaCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for LzmaCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::LZMA
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        // The output buffer is always one hunk.
        let hunk_bytes = u32::try_from(dst.len()).unwrap_or(u32::MAX);
        lzma_decompress(dst, src, hunk_bytes, "lzma")
    }
}

/// CD hunks with LZMA sectors and deflate subchannel.
pub struct CdLzmaCodec {
    inflater: Decompress,
}

impl CdLzmaCodec {
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
        }
    }
}

impl Default for CdLzmaCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for CdLzmaCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::CD_LZMA
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        let len = dst.len();
        self.decompress_cd(dst, src, len, len / CD_FRAME_SIZE)
    }

    fn as_cd(&mut self) -> Option<&mut dyn CdCodec> {
        Some(self)
    }
}

impl CdCodec for CdLzmaCodec {
    fn decompress_cd(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        dest_len: usize,
        frames: usize,
    ) -> Result<usize, ChdError> {
        let payload = split_ecc_payload(src, dest_len, frames, "cdlz")?;

        // The sector stream was encoded on its own, so its dictionary is
        // sized from the sector bytes rather than the whole hunk.
        let sector_bytes = frames * CD_SECTOR_SIZE;
        let mut sectors = vec![0u8; sector_bytes];
        let basis = u32::try_from(sector_bytes).unwrap_or(u32::MAX);
        let produced = lzma_decompress(&mut sectors, payload.sectors, basis, "cdlz sector")?;
        sectors.truncate(produced);

        let subcode = inflate_subcode(&mut self.inflater, payload.subcode, frames);
        Ok(interleave(
            dst,
            &sectors,
            &subcode,
            frames,
            Some(payload.ecc_bitmap),
        ))
    }
}

#[cfg(test)]
#[path = "tests/lzma_tests.rs"]
mod tests;
