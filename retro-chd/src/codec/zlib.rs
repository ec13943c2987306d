//! Raw deflate codecs (`zlib`, `cdzl`).

use flate2::{Decompress, FlushDecompress, Status};

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_FRAME_SIZE, CD_SECTOR_SIZE};

use super::cd::{inflate_subcode, interleave, split_ecc_payload};
use super::{CdCodec, Codec, CodecTag};

/// Inflate a raw deflate stream into `dst`, reusing `inflater`.
///
/// Stops when `dst` is full or the stream ends; a stream that ends early is
/// a short read, not an error. Returns the bytes written.
pub(crate) fn inflate_into(
    inflater: &mut Decompress,
    dst: &mut [u8],
    src: &[u8],
) -> Result<usize, flate2::DecompressError> {
    inflater.reset(false);
    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out() as usize;
        if produced >= dst.len() {
            break;
        }
        let status = inflater.decompress(
            &src[consumed.min(src.len())..],
            &mut dst[produced..],
            FlushDecompress::Finish,
        )?;
        let progressed = inflater.total_in() as usize != consumed
            || inflater.total_out() as usize != produced;
        if status == Status::StreamEnd || !progressed {
            break;
        }
    }
    Ok(inflater.total_out() as usize)
}

/// Plain deflate hunks.
pub struct ZlibCodec {
    inflater: Decompress,
}

impl ZlibCodec {
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
        }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ZlibCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::ZLIB
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        inflate_into(&mut self.inflater, dst, src)
            .map_err(|e| ChdError::decompress_failed(format!("zlib: {e}")))
    }
}

/// CD hunks with deflate-compressed sectors and subchannel.
pub struct CdZlibCodec {
    inflater: Decompress,
}

impl CdZlibCodec {
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
        }
    }
}

impl Default for CdZlibCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for CdZlibCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::CD_ZLIB
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        let len = dst.len();
        self.decompress_cd(dst, src, len, len / CD_FRAME_SIZE)
    }

    fn as_cd(&mut self) -> Option<&mut dyn CdCodec> {
        Some(self)
    }
}

impl CdCodec for CdZlibCodec {
    fn decompress_cd(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        dest_len: usize,
        frames: usize,
    ) -> Result<usize, ChdError> {
        let payload = split_ecc_payload(src, dest_len, frames, "cdzl")?;

        let mut sectors = vec![0u8; frames * CD_SECTOR_SIZE];
        let produced = inflate_into(&mut self.inflater, &mut sectors, payload.sectors)
            .map_err(|e| ChdError::decompress_failed(format!("cdzl sector: {e}")))?;
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
#[path = "tests/zlib_tests.rs"]
mod tests;
