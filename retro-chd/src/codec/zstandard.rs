//! Zstandard codecs (`zstd`, `cdzs`).
//!
//! The CD variant differs from `cdzl`/`cdlz`: its payload starts with a
//! 4-byte big-endian length of the sector stream and carries no ECC bitmap.

use flate2::Decompress;
use zstd::bulk::Decompressor;

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_FRAME_SIZE, CD_SECTOR_SIZE};
use retro_chd_core::util::be_u32;

use super::cd::{inflate_subcode, interleave};
use super::{CdCodec, Codec, CodecTag};

/// Decompress one zstd frame into `dst`. `decompressor` is created lazily
/// and reused across calls.
fn zstd_decompress(
    decompressor: &mut Option<Decompressor<'static>>,
    dst: &mut [u8],
    src: &[u8],
    codec: &str,
) -> Result<usize, ChdError> {
    if let Ok(Some(size)) = zstd::zstd_safe::get_frame_content_size(src) {
        if size > dst.len() as u64 {
            return Err(ChdError::decompress_failed(format!(
                "{codec}: output too large ({size} > {})",
                dst.len()
            )));
        }
    }

    if decompressor.is_none() {
        let created = Decompressor::new()
            .map_err(|e| ChdError::decompress_failed(format!("{codec} init: {e}")))?;
        *decompressor = Some(created);
    }
    match decompressor.as_mut() {
        Some(d) => d
            .decompress_to_buffer(src, dst)
            .map_err(|e| ChdError::decompress_failed(format!("{codec}: {e}"))),
        None => Err(ChdError::decompress_failed(format!("{codec}: no decoder"))),
    }
}

/// Plain Zstandard hunks.
#[derive(Default)]
pub struct ZstdCodec {
    decompressor: Option<Decompressor<'static>>,
}

impl ZstdCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Codec for ZstdCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::ZSTD
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        zstd_decompress(&mut self.decompressor, dst, src, "zstd")
    }
}

/// CD hunks with Zstandard sectors and deflate subchannel.
pub struct CdZstdCodec {
    decompressor: Option<Decompressor<'static>>,
    inflater: Decompress,
}

impl CdZstdCodec {
    pub fn new() -> Self {
        Self {
            decompressor: None,
            inflater: Decompress::new(false),
        }
    }
}

impl Default for CdZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for CdZstdCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::CD_ZSTD
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        let len = dst.len();
        self.decompress_cd(dst, src, len, len / CD_FRAME_SIZE)
    }

    fn as_cd(&mut self) -> Option<&mut dyn CdCodec> {
        Some(self)
    }
}

impl CdCodec for CdZstdCodec {
    fn decompress_cd(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        _dest_len: usize,
        frames: usize,
    ) -> Result<usize, ChdError> {
        if src.len() < 4 {
            return Err(ChdError::decompress_failed("cdzs: source too small"));
        }
        let sector_len = be_u32(src, 0) as usize;
        if 4 + sector_len > src.len() {
            return Err(ChdError::decompress_failed(format!(
                "cdzs: invalid sector length {sector_len}"
            )));
        }

        let mut sectors = vec![0u8; frames * CD_SECTOR_SIZE];
        let produced = zstd_decompress(
            &mut self.decompressor,
            &mut sectors,
            &src[4..4 + sector_len],
            "cdzs sector",
        )?;
        sectors.truncate(produced);

        let subcode = inflate_subcode(&mut self.inflater, &src[4 + sector_len..], frames);
        Ok(interleave(dst, &sectors, &subcode, frames, None))
    }
}

#[cfg(test)]
#[path = "tests/zstd_tests.rs"]
mod tests;
