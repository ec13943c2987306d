use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_chd::{Chd, ChdError, ChdOptions};

use crate::commands::{display_name, open_chd};
use crate::{CliError, progress};

/// Most failures listed individually before summarizing.
const MAX_LISTED_FAILURES: usize = 20;

/// Run the verify command.
pub(crate) fn run_verify(path: &Path, options: &ChdOptions) -> Result<(), CliError> {
    // Every hunk is read once; caching them would only churn.
    let chd = open_chd(path, &options.clone().cache_hunks(0))?;
    let total = chd.num_hunks();
    let checks_crc = chd.header().version < 5;

    log::info!(
        "Verifying {} ({} hunks{})",
        display_name(path).if_supports_color(Stdout, |t| t.bold()),
        total,
        if checks_crc { ", CRC32" } else { "" }
    );

    let pb = progress::hunk_bar(total as u64);
    let failures = verify_hunks(&chd, checks_crc, |done| pb.set_position(done as u64));
    pb.finish_and_clear();

    if failures.is_empty() {
        log::info!(
            "  {} All {} hunks OK",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            total
        );
        return Ok(());
    }

    for (index, e) in failures.iter().take(MAX_LISTED_FAILURES) {
        log::info!(
            "  {} hunk {}: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            index,
            e
        );
    }
    if failures.len() > MAX_LISTED_FAILURES {
        log::info!(
            "  {}",
            format!("... and {} more", failures.len() - MAX_LISTED_FAILURES)
                .if_supports_color(Stdout, |t| t.dimmed())
        );
    }
    Err(CliError::VerifyFailed {
        failed: failures.len(),
        total,
    })
}

/// Decode every hunk, returning the ones that failed.
fn verify_hunks(
    chd: &Chd,
    checks_crc: bool,
    progress: impl Fn(u32),
) -> Vec<(u32, ChdError)> {
    let mut failures = Vec::new();
    for index in 0..chd.num_hunks() {
        let result = if checks_crc {
            chd.verify_hunk(index)
        } else {
            chd.read_hunk(index).map(|_| ())
        };
        if let Err(e) = result {
            log::debug!("hunk {index} failed: {e}");
            failures.push((index, e));
        }
        progress(index + 1);
    }
    failures
}
