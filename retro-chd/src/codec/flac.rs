//! FLAC codecs (`flac`, `cdfl`).
//!
//! CHD stores FLAC frames without a stream header. A minimal header with a
//! single STREAMINFO block is synthesized in front of the frames so a stock
//! decoder can read them. Samples are 16-bit stereo at 44.1 kHz.

use std::io::Cursor;

use flate2::Decompress;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_FRAME_SIZE, CD_SECTOR_SIZE};

use super::cd::{inflate_subcode, interleave};
use super::{CdCodec, Codec, CodecTag};

const FLAC_MAGIC: &[u8; 4] = b"fLaC";
const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u32 = 2;

/// Largest block size for plain FLAC hunks.
const MAX_BLOCK_SIZE: usize = 2048;

/// Stream header with one STREAMINFO block. Block sizes and the
/// rate/channel field are filled in by [`flac_header`].
const HEADER_TEMPLATE: [u8; 42] = [
    b'f', b'L', b'a', b'C', // magic
    0x80, 0x00, 0x00, 0x22, // last block, STREAMINFO, 34 bytes
    0x00, 0x00, // min block size
    0x00, 0x00, // max block size
    0x00, 0x00, 0x00, // min frame size
    0x00, 0x00, 0x00, // max frame size
    0x0A, 0xC4, 0x42, 0xF0, // rate, channels, bits per sample
    0x00, 0x00, 0x00, 0x00, // total samples
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // md5
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Build the synthetic stream header for `block_size`-sample blocks.
pub fn flac_header(block_size: u16) -> [u8; 42] {
    let mut header = HEADER_TEMPLATE;
    header[0x08..0x0A].copy_from_slice(&block_size.to_be_bytes());
    header[0x0A..0x0C].copy_from_slice(&block_size.to_be_bytes());
    let rate_channels = (SAMPLE_RATE << 4) | ((CHANNELS - 1) << 1);
    header[0x12..0x15].copy_from_slice(&rate_channels.to_be_bytes()[1..]);
    header
}

/// Block size the encoder used for `bytes` of 16-bit stereo audio: a
/// quarter of the byte count, halved until it is at most `limit`.
pub fn block_size(bytes: usize, limit: usize) -> u16 {
    let mut size = bytes / 4;
    while size > limit {
        size /= 2;
    }
    size.min(u16::MAX as usize) as u16
}

fn flac_error(context: &str, e: SymphoniaError) -> ChdError {
    ChdError::decompress_failed(format!("{context}: {e}"))
}

/// Decode a complete FLAC stream into 16-bit PCM.
///
/// Decoding stops when `dst` is full or the stream runs out of frames.
/// Returns the number of PCM bytes written.
pub(crate) fn decode_stream(
    dst: &mut [u8],
    stream: Vec<u8>,
    big_endian: bool,
    context: &str,
) -> Result<usize, ChdError> {
    let media_source = MediaSourceStream::new(Box::new(Cursor::new(stream)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("flac");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            media_source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| flac_error(context, e))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .default_track()
        .ok_or_else(|| ChdError::decompress_failed(format!("{context}: no audio track")))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| flac_error(context, e))?;

    let mut written = 0;

    while written < dst.len() {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(flac_error(context, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(|e| flac_error(context, e))?;
        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);

        for &sample in buffer.samples() {
            if written + 2 > dst.len() {
                break;
            }
            let bytes = if big_endian {
                sample.to_be_bytes()
            } else {
                sample.to_le_bytes()
            };
            dst[written..written + 2].copy_from_slice(&bytes);
            written += 2;
        }
    }

    Ok(written)
}

/// Decode headerless frames behind a synthetic header.
fn decode_headerless(
    dst: &mut [u8],
    frames: &[u8],
    block_size: u16,
    big_endian: bool,
    context: &str,
) -> Result<usize, ChdError> {
    let header = flac_header(block_size);
    let mut stream = Vec::with_capacity(header.len() + frames.len());
    stream.extend_from_slice(&header);
    stream.extend_from_slice(frames);
    decode_stream(dst, stream, big_endian, context)
}

/// Decode the FLAC frames at the start of `src` that fill `dst` and return
/// how many bytes of `src` they occupy.
///
/// Every frame but the last is delimited by its CRC-16 footer followed by
/// another valid frame header. The last frame may be followed by anything,
/// so each footer candidate is tried until one decodes to a full `dst`.
fn decode_leading_frames(
    dst: &mut [u8],
    src: &[u8],
    block_size: u16,
    big_endian: bool,
    context: &str,
) -> Result<usize, ChdError> {
    let samples = (dst.len() / 4) as u64;
    let ends = frame_end_candidates(src, samples);
    if ends.is_empty() {
        return Err(ChdError::decompress_failed(format!(
            "{context}: no complete FLAC frames"
        )));
    }

    let mut last_error = None;
    for end in ends {
        match decode_headerless(dst, &src[..end], block_size, big_endian, context) {
            Ok(written) if written == dst.len() => return Ok(end),
            Ok(written) => {
                last_error = Some(ChdError::decompress_failed(format!(
                    "{context}: frames ending at {end} decoded to {written} of {} bytes",
                    dst.len()
                )));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| ChdError::decompress_failed(context.to_string())))
}

// ---------------------------------------------------------------------------
// Frame boundaries
// ---------------------------------------------------------------------------

/// Most end positions tried for the final frame.
const MAX_LAST_FRAME_CANDIDATES: usize = 16;

/// Smallest frame: 6 header bytes, two 3-byte constant subframes, CRC-16.
const MIN_FRAME_SIZE: usize = 14;

/// Parse a FLAC frame header at the start of `data`.
///
/// Returns the header length (CRC-8 included) and the block size in
/// samples, or `None` if the bytes are not a valid header.
pub(crate) fn parse_frame_header(data: &[u8]) -> Option<(usize, u32)> {
    if data.len() < 6 || data[0] != 0xFF || data[1] & 0xFE != 0xF8 {
        return None;
    }
    let block_code = data[2] >> 4;
    let rate_code = data[2] & 0x0F;
    let channels = data[3] >> 4;
    let sample_size = (data[3] >> 1) & 0x07;
    if block_code == 0 || rate_code == 0x0F || channels > 10 || sample_size == 3 || data[3] & 1 != 0
    {
        return None;
    }

    // Frame or sample number, UTF-8 style.
    let lead = data[4].leading_ones() as usize;
    let number_len = match lead {
        0 => 1,
        2..=7 => lead,
        _ => return None,
    };
    let mut pos = 4 + number_len;
    if pos > data.len() || !data[5..pos].iter().all(|&b| b & 0xC0 == 0x80) {
        return None;
    }

    let block_size = match block_code {
        1 => 192,
        2..=5 => 576 << (block_code - 2),
        6 => {
            let size = *data.get(pos)? as u32 + 1;
            pos += 1;
            size
        }
        7 => {
            let size = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as u32 + 1;
            pos += 2;
            size
        }
        _ => 256 << (block_code - 8),
    };
    pos += match rate_code {
        12 => 1,
        13 | 14 => 2,
        _ => 0,
    };

    if *data.get(pos)? != crc8(&data[..pos]) {
        return None;
    }
    Some((pos + 1, block_size))
}

/// Possible end offsets of the FLAC frames holding `samples` samples at the
/// start of `data`, in increasing order. Empty if the frames cannot be
/// delimited.
pub(crate) fn frame_end_candidates(data: &[u8], samples: u64) -> Vec<usize> {
    let mut start = 0;
    let mut decoded: u64 = 0;

    loop {
        let Some((header_len, block)) = parse_frame_header(&data[start..]) else {
            return Vec::new();
        };
        let last = decoded + block as u64 >= samples;
        let mut ends = Vec::new();
        let mut crc = crc16(0, &data[start..start + header_len]);

        for (i, &byte) in data[start + header_len..].iter().enumerate() {
            crc = crc16(crc, &[byte]);
            let end = start + header_len + i + 1;
            if crc != 0 || end - start < MIN_FRAME_SIZE {
                continue;
            }
            if last {
                ends.push(end);
                if ends.len() == MAX_LAST_FRAME_CANDIDATES {
                    break;
                }
            } else if parse_frame_header(&data[end..]).is_some() {
                ends.push(end);
                break;
            }
        }

        if last {
            return ends;
        }
        match ends.first() {
            Some(&end) => start = end,
            None => return Vec::new(),
        }
        decoded += block as u64;
    }
}

/// CRC-8 (polynomial 0x07) over a frame header.
pub(crate) fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |mut crc, &byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
        crc
    })
}

/// CRC-16 (polynomial 0x8005) continued from `crc` over `data`. Running it
/// over a whole frame, footer included, yields 0.
pub(crate) fn crc16(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |mut crc, &byte| {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x8005 } else { crc << 1 };
        }
        crc
    })
}

/// Plain FLAC hunks.
///
/// Accepts either a complete FLAC stream or the headerless form whose first
/// byte selects the output byte order (`L` little-endian, `B` big-endian).
#[derive(Debug, Default)]
pub struct FlacCodec;

impl FlacCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for FlacCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::FLAC
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        if src.is_empty() {
            return Err(ChdError::decompress_failed("flac: empty source"));
        }
        let written = if src.starts_with(FLAC_MAGIC) {
            decode_stream(dst, src.to_vec(), true, "flac")?
        } else {
            let big_endian = match src[0] {
                b'L' => false,
                b'B' => true,
                other => {
                    return Err(ChdError::decompress_failed(format!(
                        "flac: unknown stream marker {other:#04x}"
                    )));
                }
            };
            let block = block_size(dst.len(), MAX_BLOCK_SIZE);
            decode_headerless(dst, &src[1..], block, big_endian, "flac")?
        };
        Ok(written)
    }
}

/// CD hunks with FLAC sectors followed by a deflate subchannel stream.
///
/// There is no length field: the subchannel starts right after the last
/// FLAC frame, which is found by walking the frame headers and CRCs.
/// Undecodable audio is zero-filled rather than failing the hunk.
pub struct CdFlacCodec {
    inflater: Decompress,
}

impl CdFlacCodec {
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
        }
    }
}

impl Default for CdFlacCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for CdFlacCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::CD_FLAC
    }

    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError> {
        let len = dst.len();
        self.decompress_cd(dst, src, len, len / CD_FRAME_SIZE)
    }

    fn as_cd(&mut self) -> Option<&mut dyn CdCodec> {
        Some(self)
    }
}

impl CdCodec for CdFlacCodec {
    fn decompress_cd(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        _dest_len: usize,
        frames: usize,
    ) -> Result<usize, ChdError> {
        if src.is_empty() {
            return Err(ChdError::decompress_failed("cdfl: empty source"));
        }

        let sector_bytes = frames * CD_SECTOR_SIZE;
        let mut sectors = vec![0u8; sector_bytes];
        let block = block_size(sector_bytes, CD_SECTOR_SIZE);
        let consumed = match decode_leading_frames(&mut sectors, src, block, true, "cdfl") {
            Ok(consumed) => consumed,
            Err(e) => {
                log::debug!("CD FLAC decode failed, zero-filling audio: {}", e);
                sectors.fill(0);
                src.len()
            }
        };

        let subcode = inflate_subcode(&mut self.inflater, &src[consumed..], frames);
        Ok(interleave(dst, &sectors, &subcode, frames, None))
    }
}

#[cfg(test)]
#[path = "tests/flac_tests.rs"]
mod tests;
