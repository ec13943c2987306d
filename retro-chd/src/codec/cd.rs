//! Framing shared by the CD codecs.
//!
//! The zlib and LZMA variants prefix their payload with an ECC bitmap (one
//! bit per frame) and a 2- or 3-byte length of the compressed sector stream.
//! The subchannel stream that follows is always raw deflate.

use flate2::Decompress;

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_SECTOR_SIZE, CD_SUBCODE_SIZE, CD_SYNC_PATTERN};

use super::zlib::inflate_into;

/// Hunk sizes at or above this use a 3-byte compressed-length field.
const WIDE_LENGTH_THRESHOLD: usize = 65536;

/// A CD payload split into its parts.
#[derive(Debug)]
pub(crate) struct CdPayload<'a> {
    pub ecc_bitmap: &'a [u8],
    pub sectors: &'a [u8],
    pub subcode: &'a [u8],
}

/// Split an ECC-bitmap-prefixed payload. `codec` names the codec in errors.
pub(crate) fn split_ecc_payload<'a>(
    src: &'a [u8],
    dest_len: usize,
    frames: usize,
    codec: &str,
) -> Result<CdPayload<'a>, ChdError> {
    let length_bytes = if dest_len >= WIDE_LENGTH_THRESHOLD { 3 } else { 2 };
    let ecc_bytes = frames.div_ceil(8);
    let header_bytes = ecc_bytes + length_bytes;

    if src.len() < header_bytes {
        return Err(ChdError::decompress_failed(format!(
            "{codec}: source too small for header"
        )));
    }

    let base_length = src[ecc_bytes..header_bytes]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if header_bytes + base_length > src.len() {
        return Err(ChdError::decompress_failed(format!(
            "{codec}: invalid base length {base_length}"
        )));
    }

    Ok(CdPayload {
        ecc_bitmap: &src[..ecc_bytes],
        sectors: &src[header_bytes..header_bytes + base_length],
        subcode: &src[header_bytes + base_length..],
    })
}

/// Inflate the subchannel stream. Any failure yields zeros: subchannel data
/// never decides whether a hunk read succeeds.
pub(crate) fn inflate_subcode(inflater: &mut Decompress, src: &[u8], frames: usize) -> Vec<u8> {
    let mut subcode = vec![0u8; frames * CD_SUBCODE_SIZE];
    if src.is_empty() || subcode.is_empty() {
        return subcode;
    }
    if let Err(e) = inflate_into(inflater, &mut subcode, src) {
        log::debug!("Subchannel inflate failed, zero-filling: {}", e);
        subcode.fill(0);
    }
    subcode
}

/// Interleave per-frame sector and subchannel data into `dst`.
///
/// Frames whose ECC bit is set get the sync pattern written over their
/// first 12 bytes. Sector data shorter than a whole frame leaves that frame
/// zeroed. Returns the number of bytes laid out.
pub(crate) fn interleave(
    dst: &mut [u8],
    sectors: &[u8],
    subcode: &[u8],
    frames: usize,
    ecc_bitmap: Option<&[u8]>,
) -> usize {
    let mut out = 0;
    for frame in 0..frames {
        if out + CD_SECTOR_SIZE + CD_SUBCODE_SIZE > dst.len() {
            break;
        }

        let sector_dst = &mut dst[out..out + CD_SECTOR_SIZE];
        let start = frame * CD_SECTOR_SIZE;
        match sectors.get(start..start + CD_SECTOR_SIZE) {
            Some(sector) => sector_dst.copy_from_slice(sector),
            None => sector_dst.fill(0),
        }
        let restore_sync = ecc_bitmap
            .and_then(|bitmap| bitmap.get(frame / 8))
            .is_some_and(|byte| byte & (1 << (frame % 8)) != 0);
        if restore_sync {
            sector_dst[..CD_SYNC_PATTERN.len()].copy_from_slice(&CD_SYNC_PATTERN);
        }
        out += CD_SECTOR_SIZE;

        let subcode_dst = &mut dst[out..out + CD_SUBCODE_SIZE];
        let start = frame * CD_SUBCODE_SIZE;
        match subcode.get(start..start + CD_SUBCODE_SIZE) {
            Some(sub) => subcode_dst.copy_from_slice(sub),
            None => subcode_dst.fill(0),
        }
        out += CD_SUBCODE_SIZE;
    }
    out
}

#[cfg(test)]
#[path = "tests/cd_tests.rs"]
mod tests;
