use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use serde::Serialize;

use retro_chd::{Chd, ChdOptions, Track};
use retro_chd_core::util::{format_bytes_approx, hex_string};

use crate::CliError;
use crate::commands::{display_name, open_chd};

/// Machine-readable summary printed by `info --json`.
#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    file: String,
    version: u32,
    header_length: u32,
    logical_bytes: u64,
    hunk_bytes: u32,
    unit_bytes: u32,
    hunks: u32,
    compressed: bool,
    compressors: Vec<String>,
    sha1: String,
    raw_sha1: Option<String>,
    parent_sha1: Option<String>,
    is_cd: bool,
    tracks: &'a [Track],
}

impl<'a> InfoReport<'a> {
    fn new(path: &Path, chd: &'a Chd) -> Self {
        let header = chd.header();
        let nonzero_hex = |digest: &[u8]| {
            digest
                .iter()
                .any(|&b| b != 0)
                .then(|| hex_string(digest))
        };
        Self {
            file: display_name(path),
            version: header.version,
            header_length: header.length,
            logical_bytes: header.logical_bytes,
            hunk_bytes: header.hunk_bytes,
            unit_bytes: header.unit_bytes,
            hunks: chd.num_hunks(),
            compressed: chd.is_compressed(),
            compressors: header
                .compressors
                .iter()
                .filter(|tag| !tag.is_none())
                .map(|tag| tag.to_string())
                .collect(),
            sha1: hex_string(&header.sha1),
            raw_sha1: nonzero_hex(&header.raw_sha1),
            parent_sha1: nonzero_hex(&header.parent_sha1),
            is_cd: chd.is_cd(),
            tracks: chd.tracks(),
        }
    }
}

/// Run the info command.
pub(crate) fn run_info(path: &Path, options: &ChdOptions, json: bool) -> Result<(), CliError> {
    let chd = open_chd(path, options)?;
    let report = InfoReport::new(path, &chd);

    if json {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    log::info!("{}", report.file.if_supports_color(Stdout, |t| t.bold()));
    field("Version", report.version);
    field(
        "Logical size",
        format!(
            "{} ({} bytes)",
            format_bytes_approx(report.logical_bytes),
            report.logical_bytes
        ),
    );
    field(
        "Hunks",
        format!(
            "{} x {} bytes, {}-byte units",
            report.hunks, report.hunk_bytes, report.unit_bytes
        ),
    );
    field(
        "Compression",
        if report.compressors.is_empty() {
            "none".to_string()
        } else {
            report.compressors.join(", ")
        },
    );
    field("SHA1", &report.sha1);
    if let Some(raw) = &report.raw_sha1 {
        field("Raw SHA1", raw);
    }
    if let Some(parent) = &report.parent_sha1 {
        field("Parent SHA1", parent);
    }

    if report.is_cd {
        field("Tracks", report.tracks.len());
        if let Some(track) = chd.first_data_track() {
            field(
                "Data track",
                format!(
                    "{} ({}), sector {}",
                    track.number,
                    track.track_type,
                    chd.first_data_track_sector()
                ),
            );
        }
    }
    Ok(())
}

fn field(label: &str, value: impl std::fmt::Display) {
    log::info!(
        "  {} {}",
        format!("{label}:").if_supports_color(Stdout, |t| t.cyan()),
        value
    );
}
