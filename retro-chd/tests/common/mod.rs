//! Synthetic CHD images for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

pub const FRAME: usize = 2448;
pub const SECTOR: usize = 2352;
pub const USER: usize = 2048;
pub const FRAMES_PER_HUNK: usize = 8;
pub const CD_HUNK: u32 = (FRAME * FRAMES_PER_HUNK) as u32;

const SYNC: [u8; 12] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// How one hunk is stored.
#[derive(Debug, Clone)]
pub enum Hunk {
    Raw(Vec<u8>),
    /// Compressed payload for codec slot `slot`.
    Codec { slot: u8, payload: Vec<u8> },
    SelfRef(u32),
    /// v4 only: 8-byte pattern repeated.
    Mini(u64),
}

pub struct ImageBuilder {
    version: u32,
    hunk_bytes: u32,
    unit_bytes: u32,
    compressors: [[u8; 4]; 4],
    hunks: Vec<Hunk>,
    metadata: Vec<([u8; 4], Vec<u8>)>,
    circular_metadata: bool,
    logical_bytes: Option<u64>,
    parent_sha1: [u8; 20],
}

impl ImageBuilder {
    pub fn v5(hunk_bytes: u32, unit_bytes: u32) -> Self {
        Self::new(5, hunk_bytes, unit_bytes)
    }

    /// v4 images always have 2448-byte units; codec hunks use legacy zlib.
    pub fn v4(hunk_bytes: u32) -> Self {
        Self::new(4, hunk_bytes, FRAME as u32)
    }

    fn new(version: u32, hunk_bytes: u32, unit_bytes: u32) -> Self {
        Self {
            version,
            hunk_bytes,
            unit_bytes,
            compressors: [[0; 4]; 4],
            hunks: Vec::new(),
            metadata: Vec::new(),
            circular_metadata: false,
            logical_bytes: None,
            parent_sha1: [0; 20],
        }
    }

    pub fn compressor(mut self, slot: usize, tag: &[u8; 4]) -> Self {
        self.compressors[slot] = *tag;
        self
    }

    pub fn hunk(mut self, hunk: Hunk) -> Self {
        self.hunks.push(hunk);
        self
    }

    pub fn raw_hunks(mut self, data: &[u8]) -> Self {
        for chunk in data.chunks(self.hunk_bytes as usize) {
            let mut hunk = chunk.to_vec();
            hunk.resize(self.hunk_bytes as usize, 0);
            self.hunks.push(Hunk::Raw(hunk));
        }
        self
    }

    pub fn metadata(mut self, tag: &[u8; 4], data: &[u8]) -> Self {
        self.metadata.push((*tag, data.to_vec()));
        self
    }

    pub fn circular_metadata(mut self) -> Self {
        self.circular_metadata = true;
        self
    }

    pub fn logical_bytes(mut self, bytes: u64) -> Self {
        self.logical_bytes = Some(bytes);
        self
    }

    pub fn parent(mut self) -> Self {
        self.parent_sha1 = [0x5A; 20];
        self
    }

    fn header_len(&self) -> usize {
        if self.version == 5 { 124 } else { 108 }
    }

    fn logical(&self) -> u64 {
        self.logical_bytes
            .unwrap_or(self.hunks.len() as u64 * self.hunk_bytes as u64)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.header_len()];
        if self.version == 4 {
            buf.resize(buf.len() + self.hunks.len() * 16, 0);
        }

        let meta_offset = self.write_metadata(&mut buf);

        match self.version {
            5 => {
                let map_offset = self.write_v5_body(&mut buf);
                self.write_v5_header(&mut buf, map_offset, meta_offset);
            }
            _ => {
                self.write_v4_body(&mut buf);
                self.write_v4_header(&mut buf, meta_offset);
            }
        }
        buf
    }

    fn write_metadata(&self, buf: &mut Vec<u8>) -> u64 {
        if self.metadata.is_empty() {
            return 0;
        }
        let first = buf.len() as u64;
        let mut previous: Option<usize> = None;
        for (tag, data) in &self.metadata {
            let offset = buf.len();
            if let Some(prev) = previous {
                buf[prev + 8..prev + 16].copy_from_slice(&(offset as u64).to_be_bytes());
            }
            buf.extend_from_slice(tag);
            buf.push(0);
            buf.extend_from_slice(&(data.len() as u32).to_be_bytes()[1..]);
            buf.extend_from_slice(&0u64.to_be_bytes());
            buf.extend_from_slice(data);
            previous = Some(offset);
        }
        if let (true, Some(last)) = (self.circular_metadata, previous) {
            buf[last + 8..last + 16].copy_from_slice(&first.to_be_bytes());
        }
        first
    }

    fn write_v5_body(&self, buf: &mut Vec<u8>) -> u64 {
        let first_offset = buf.len() as u64;
        let mut fields: Vec<(u32, u32)> = vec![(1, 4), (4, 4), (13, 4)];
        let mut types = Vec::new();
        let mut values = Vec::new();
        for hunk in &self.hunks {
            match hunk {
                Hunk::Raw(data) => {
                    buf.extend_from_slice(data);
                    types.push((4, 4));
                    values.push((0, 16));
                }
                Hunk::Codec { slot, payload } => {
                    buf.extend_from_slice(payload);
                    types.push((*slot as u32, 4));
                    values.extend([(payload.len() as u32, 24), (0, 16)]);
                }
                Hunk::SelfRef(target) => {
                    types.push((5, 4));
                    values.push((*target, 24));
                }
                Hunk::Mini(_) => panic!("v5 maps have no mini hunks"),
            }
        }
        fields.extend(types);
        fields.extend(values);
        let body = pack_bits(&fields);

        let map_offset = buf.len() as u64;
        buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
        buf.extend_from_slice(&first_offset.to_be_bytes()[2..]);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&[24, 24, 0, 0]);
        buf.extend_from_slice(&body);
        map_offset
    }

    fn write_v5_header(&self, buf: &mut [u8], map_offset: u64, meta_offset: u64) {
        write_preamble(buf, 124, 5);
        for (slot, tag) in self.compressors.iter().enumerate() {
            buf[16 + slot * 4..20 + slot * 4].copy_from_slice(tag);
        }
        buf[32..40].copy_from_slice(&self.logical().to_be_bytes());
        buf[40..48].copy_from_slice(&map_offset.to_be_bytes());
        buf[48..56].copy_from_slice(&meta_offset.to_be_bytes());
        buf[56..60].copy_from_slice(&self.hunk_bytes.to_be_bytes());
        buf[60..64].copy_from_slice(&self.unit_bytes.to_be_bytes());
        buf[104..124].copy_from_slice(&self.parent_sha1);
    }

    fn write_v4_body(&self, buf: &mut Vec<u8>) {
        for (index, hunk) in self.hunks.iter().enumerate() {
            let mut record = [0u8; 16];
            match hunk {
                Hunk::Raw(data) => {
                    record[..8].copy_from_slice(&(buf.len() as u64).to_be_bytes());
                    record[8..12].copy_from_slice(&crc32fast::hash(data).to_be_bytes());
                    record[12..14].copy_from_slice(&(data.len() as u16).to_be_bytes());
                    record[14] = (data.len() >> 16) as u8;
                    record[15] = 2;
                    buf.extend_from_slice(data);
                }
                Hunk::Codec { payload, .. } => {
                    record[..8].copy_from_slice(&(buf.len() as u64).to_be_bytes());
                    record[12..14].copy_from_slice(&(payload.len() as u16).to_be_bytes());
                    record[14] = (payload.len() >> 16) as u8;
                    record[15] = 0x10 | 1;
                    buf.extend_from_slice(payload);
                }
                Hunk::SelfRef(target) => {
                    record[..8].copy_from_slice(&(*target as u64).to_be_bytes());
                    record[15] = 0x10 | 4;
                }
                Hunk::Mini(pattern) => {
                    record[..8].copy_from_slice(&pattern.to_be_bytes());
                    record[15] = 0x10 | 3;
                }
            }
            let at = 108 + index * 16;
            buf[at..at + 16].copy_from_slice(&record);
        }
    }

    fn write_v4_header(&self, buf: &mut [u8], meta_offset: u64) {
        write_preamble(buf, 108, 4);
        let compressed = self.hunks.iter().any(|h| matches!(h, Hunk::Codec { .. }));
        buf[20..24].copy_from_slice(&(compressed as u32).to_be_bytes());
        buf[24..28].copy_from_slice(&(self.hunks.len() as u32).to_be_bytes());
        buf[28..36].copy_from_slice(&self.logical().to_be_bytes());
        buf[36..44].copy_from_slice(&meta_offset.to_be_bytes());
        buf[44..48].copy_from_slice(&self.hunk_bytes.to_be_bytes());
        buf[68..88].copy_from_slice(&self.parent_sha1);
    }
}

fn write_preamble(buf: &mut [u8], length: u32, version: u32) {
    buf[..8].copy_from_slice(b"MComprHD");
    buf[8..12].copy_from_slice(&length.to_be_bytes());
    buf[12..16].copy_from_slice(&version.to_be_bytes());
}

/// Pack (value, width) fields MSB-first.
pub fn pack_bits(fields: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc: u64 = 0;
    let mut nbits = 0;
    for &(value, width) in fields {
        for i in (0..width).rev() {
            acc = (acc << 1) | ((value >> i) & 1) as u64;
            nbits += 1;
            if nbits == 8 {
                out.push(acc as u8);
                acc = 0;
                nbits = 0;
            }
        }
    }
    if nbits > 0 {
        out.push((acc << (8 - nbits)) as u8);
    }
    out
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

// ---------------------------------------------------------------------------
// CD content
// ---------------------------------------------------------------------------

/// 2048 bytes of user data tagged with `lba`.
pub fn user_data(lba: u32) -> Vec<u8> {
    let mut data = vec![(lba % 251) as u8; USER];
    data[..4].copy_from_slice(&lba.to_be_bytes());
    data
}

/// ISO 9660 primary volume descriptor user data.
pub fn pvd_user_data() -> Vec<u8> {
    let mut data = vec![0u8; USER];
    data[0] = 1;
    data[1..6].copy_from_slice(b"CD001");
    data[6] = 1;
    data
}

/// A Mode 1 frame (sync, header, user data, empty EDC/ECC, empty subcode).
pub fn mode1_frame(user: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME];
    frame[..12].copy_from_slice(&SYNC);
    frame[15] = 1;
    frame[16..16 + USER].copy_from_slice(user);
    frame
}

/// A Mode 2 Form 1 frame: user data after the 8-byte subheader.
pub fn mode2_frame(user: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME];
    frame[..12].copy_from_slice(&SYNC);
    frame[15] = 2;
    frame[24..24 + USER].copy_from_slice(user);
    frame
}

pub fn audio_frame(fill: u8) -> Vec<u8> {
    let mut frame = vec![fill; SECTOR];
    frame.resize(FRAME, 0);
    frame
}

/// `audio` audio frames followed by a Mode 1 data track of `data` frames.
/// Data-track sector 16 holds the volume descriptor; other data sectors
/// hold `user_data(lba)` with `lba` counted from the data track start.
pub fn cd_disc(audio: usize, data: usize) -> Vec<u8> {
    let mut disc = Vec::new();
    for _ in 0..audio {
        disc.extend_from_slice(&audio_frame(0xAA));
    }
    for lba in 0..data as u32 {
        let user = if lba == 16 { pvd_user_data() } else { user_data(lba) };
        disc.extend_from_slice(&mode1_frame(&user));
    }
    disc
}

pub fn track_text(number: u32, kind: &str, frames: u32, pregap: u32) -> Vec<u8> {
    format!("TRACK:{number} TYPE:{kind} SUBTYPE:NONE FRAMES:{frames} PREGAP:{pregap} POSTGAP:0\0")
        .into_bytes()
}
