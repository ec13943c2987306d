use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_chd::ChdOptions;

use crate::CliError;
use crate::commands::open_chd;

/// Run the tracks command.
pub(crate) fn run_tracks(path: &Path, options: &ChdOptions) -> Result<(), CliError> {
    let chd = open_chd(path, options)?;
    let tracks = chd.tracks();

    if tracks.is_empty() {
        log::info!(
            "{}",
            "No track metadata".if_supports_color(Stdout, |t| t.dimmed())
        );
        return Ok(());
    }

    log::info!(
        "{}",
        format!(
            "{:>3}  {:<14} {:<7} {:>7} {:>6} {:>8} {:>6}",
            "#", "Type", "Sub", "Frames", "Pregap", "Start", "Sector"
        )
        .if_supports_color(Stdout, |t| t.bold()),
    );
    for track in tracks {
        let row = format!(
            "{:>3}  {:<14} {:<7} {:>7} {:>6} {:>8} {:>6}",
            track.number,
            track.track_type,
            track.subtype,
            track.frames,
            track.pregap,
            track.start_frame,
            track.sector_size()
        );
        if track.is_data_track() {
            log::info!("{}", row.if_supports_color(Stdout, |t| t.green()));
        } else {
            log::info!("{row}");
        }
    }
    Ok(())
}
