use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_chd::ChdOptions;

use crate::CliError;
use crate::commands::open_chd;

/// Longest text payload shown inline.
const MAX_TEXT_PREVIEW: usize = 120;

/// Run the meta command.
pub(crate) fn run_meta(path: &Path, options: &ChdOptions) -> Result<(), CliError> {
    let chd = open_chd(path, options)?;
    let entries = chd.metadata().map_err(|e| CliError::chd(path, e))?;

    if entries.is_empty() {
        log::info!(
            "{}",
            "No metadata".if_supports_color(Stdout, |t| t.dimmed())
        );
        return Ok(());
    }

    for entry in &entries {
        log::info!(
            "{} {} flags={:#04x} len={} next={:#x}",
            format!("@{:#x}", entry.offset).if_supports_color(Stdout, |t| t.dimmed()),
            entry.tag.if_supports_color(Stdout, |t| t.cyan()),
            entry.flags,
            entry.len(),
            entry.next
        );
        if let Some(text) = entry.text() {
            let text = text.trim_end_matches(['\0', ' ', '\n', '\r']);
            if text.chars().count() > MAX_TEXT_PREVIEW {
                let preview: String = text.chars().take(MAX_TEXT_PREVIEW).collect();
                log::info!("    {preview}...");
            } else {
                log::info!("    {text}");
            }
        }
    }
    Ok(())
}
