use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_chd::{ChdOptions, hash_data_track};
use retro_chd_core::util::format_bytes_approx;

use crate::commands::{display_name, open_chd};
use crate::{CliError, progress};

/// Run the hash command.
pub(crate) fn run_hash(path: &Path, options: &ChdOptions) -> Result<(), CliError> {
    let chd = open_chd(path, options)?;
    if chd.first_data_track().is_none() {
        log::warn!(
            "No data track in metadata; hashing from sector {}",
            chd.first_data_track_sector()
        );
    }

    let pb = progress::byte_bar(0, "Hashing");
    let hashes = hash_data_track(&chd, &|done, total| {
        pb.set_length(total);
        pb.set_position(done);
    })
    .map_err(|e| CliError::chd(path, e));
    pb.finish_and_clear();
    let hashes = hashes?;

    log::info!("{}", display_name(path).if_supports_color(Stdout, |t| t.bold()));
    for (label, value) in [
        ("Size", format_bytes_approx(hashes.data_size)),
        ("CRC32", hashes.crc32),
        ("SHA1", hashes.sha1),
        ("MD5", hashes.md5),
    ] {
        log::info!(
            "  {} {}",
            format!("{label}:").if_supports_color(Stdout, |t| t.cyan()),
            value
        );
    }
    Ok(())
}
