//! CD track descriptors parsed from metadata.
//!
//! Three text encodings (`CHTR`, `CHT2`, `CHGD`) hold one track each as
//! space-separated `KEY:VALUE` tokens, e.g.
//! `TRACK:1 TYPE:MODE2_RAW SUBTYPE:NONE FRAMES:1234 PREGAP:150 PGTYPE:MODE2_RAW PGSUB:RW POSTGAP:0`.
//! The binary `CHCD` encoding holds every track in one table.

use serde::Serialize;

use retro_chd_core::ChdError;
use retro_chd_core::cd::{CD_SECTOR_SIZE, CD_SUBCODE_SIZE};
use retro_chd_core::util::be_u32;

use crate::metadata::{MetadataEntry, MetadataTag};

/// Upper bound on the track count of a binary table.
pub const MAX_NUM_TRACKS: u32 = 200;

/// Bytes per track record in a binary table.
const BINARY_RECORD_SIZE: usize = 24;

/// One CD track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Track {
    /// 1-based track number.
    pub number: u32,
    /// Track type, e.g. `MODE1/2048`, `MODE2_RAW`, `AUDIO`.
    #[serde(rename = "type")]
    pub track_type: String,
    /// Subchannel type, e.g. `NONE`, `RW`, `RW_RAW`.
    pub subtype: String,
    /// Bytes of sector data per frame.
    pub data_size: u32,
    /// Bytes of subchannel data per frame.
    pub sub_size: u32,
    pub frames: u32,
    pub pregap: u32,
    pub postgap: u32,
    /// Padding frames (binary tables and GD-ROM tracks).
    pub pad_frames: u32,
    /// Pregap type and subtype (second-revision text tracks).
    pub pregap_type: Option<String>,
    pub pregap_subtype: Option<String>,
    /// First frame of this track, counted from the start of the disc.
    pub start_frame: u64,
}

impl Track {
    /// True unless this is an audio track.
    pub fn is_data_track(&self) -> bool {
        !self.track_type.eq_ignore_ascii_case("AUDIO")
    }

    /// Bytes per frame including subchannel. A zero data size counts as a
    /// raw sector.
    pub fn sector_size(&self) -> u32 {
        let data = if self.data_size == 0 {
            CD_SECTOR_SIZE as u32
        } else {
            self.data_size
        };
        data + self.sub_size
    }

    /// Frames this track spans, gaps included.
    pub fn total_frames(&self) -> u64 {
        self.pregap as u64 + self.frames as u64 + self.postgap as u64
    }
}

/// Sector data size for a track type name.
pub fn data_size_for_type(track_type: &str) -> u32 {
    match track_type.to_ascii_uppercase().as_str() {
        "MODE1/2048" | "MODE1" | "MODE2_FORM1" | "MODE2/2048" => 2048,
        "MODE2/2336" | "MODE2_FORM_MIX" => 2336,
        _ => CD_SECTOR_SIZE as u32,
    }
}

/// Subchannel size for a subtype name.
pub fn subchannel_size_for_type(subtype: &str) -> u32 {
    match subtype.to_ascii_uppercase().as_str() {
        "RW" | "RW_RAW" => CD_SUBCODE_SIZE as u32,
        _ => 0,
    }
}

fn binary_type_name(value: u32) -> &'static str {
    match value {
        0 => "MODE1/2048",
        1 => "MODE1/2352",
        2 => "MODE2/2048",
        3 => "MODE2/2336",
        4 => "MODE2/2352",
        5 => "AUDIO",
        _ => "UNKNOWN",
    }
}

fn binary_subtype_name(value: u32) -> &'static str {
    match value {
        0 => "RW",
        1 => "RW_RAW",
        _ => "NONE",
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_number(key: &str, value: &str) -> Result<u32, ChdError> {
    value
        .parse()
        .map_err(|_| ChdError::invalid_metadata(format!("invalid {key} value {value:?}")))
}

/// Parse one text track record.
pub fn parse_text_track(data: &[u8]) -> Result<Track, ChdError> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());

    let mut track = Track::default();
    for token in text.split_whitespace() {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        match key.to_ascii_uppercase().as_str() {
            "TRACK" => track.number = parse_number("TRACK", value)?,
            "TYPE" => {
                track.data_size = data_size_for_type(value);
                track.track_type = value.to_string();
            }
            "SUBTYPE" => {
                track.sub_size = subchannel_size_for_type(value);
                track.subtype = value.to_string();
            }
            "FRAMES" => track.frames = parse_number("FRAMES", value)?,
            "PREGAP" => track.pregap = parse_number("PREGAP", value)?,
            "POSTGAP" => track.postgap = parse_number("POSTGAP", value)?,
            "PAD" => track.pad_frames = parse_number("PAD", value)?,
            "PGTYPE" => track.pregap_type = Some(value.to_string()),
            "PGSUB" => track.pregap_subtype = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(track)
}

/// Parse a binary track table.
///
/// | Offset | Size | Field |
/// |---|---|---|
/// | 0 | 4 | track count |
/// | 4 + 24n | 4 | type |
/// | 8 + 24n | 4 | subtype |
/// | 12 + 24n | 4 | data size |
/// | 16 + 24n | 4 | subchannel size |
/// | 20 + 24n | 4 | frames |
/// | 24 + 24n | 4 | pad frames |
pub fn parse_binary_tracks(data: &[u8]) -> Result<Vec<Track>, ChdError> {
    if data.len() < 4 {
        return Err(ChdError::invalid_metadata("binary track table too short"));
    }
    let count = be_u32(data, 0);
    if count > MAX_NUM_TRACKS {
        return Err(ChdError::invalid_metadata(format!(
            "too many tracks ({count} > {MAX_NUM_TRACKS})"
        )));
    }
    let required = 4 + count as usize * BINARY_RECORD_SIZE;
    if data.len() < required {
        return Err(ChdError::invalid_metadata(format!(
            "binary track table needs {required} bytes, got {}",
            data.len()
        )));
    }

    let tracks = data[4..required]
        .chunks_exact(BINARY_RECORD_SIZE)
        .zip(1..)
        .map(|(record, number)| Track {
            number,
            track_type: binary_type_name(be_u32(record, 0)).to_string(),
            subtype: binary_subtype_name(be_u32(record, 4)).to_string(),
            data_size: be_u32(record, 8),
            sub_size: be_u32(record, 12),
            frames: be_u32(record, 16),
            pad_frames: be_u32(record, 20),
            ..Track::default()
        })
        .collect();
    Ok(tracks)
}

/// Collect the tracks described by `entries`, in chain order, and assign
/// each its start frame.
///
/// Entries with other tags are skipped. An empty result is not an error.
pub fn parse_tracks(entries: &[MetadataEntry]) -> Result<Vec<Track>, ChdError> {
    let mut tracks = Vec::new();
    for entry in entries {
        let with_context = |e: ChdError| match e {
            ChdError::InvalidMetadata(msg) => ChdError::InvalidMetadata(format!(
                "{} at offset {}: {msg}",
                entry.tag, entry.offset
            )),
            other => other,
        };
        match entry.tag {
            MetadataTag::CD_TRACK | MetadataTag::CD_TRACK_V2 | MetadataTag::GD_TRACK => {
                tracks.push(parse_text_track(&entry.data).map_err(with_context)?);
            }
            MetadataTag::CD_TABLE => {
                tracks.extend(parse_binary_tracks(&entry.data).map_err(with_context)?);
            }
            _ => {}
        }
    }

    let mut start_frame = 0u64;
    for track in &mut tracks {
        track.start_frame = start_frame;
        start_frame += track.total_frames();
    }
    Ok(tracks)
}

#[cfg(test)]
#[path = "tests/track_tests.rs"]
mod tests;
