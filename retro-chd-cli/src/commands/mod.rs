pub(crate) mod extract;
pub(crate) mod hash;
pub(crate) mod info;
pub(crate) mod meta;
pub(crate) mod tracks;
pub(crate) mod verify;

use std::path::Path;

use retro_chd::{Chd, ChdOptions, CodecRegistry};

use crate::CliError;

/// Open a container with the built-in codecs, tagging errors with the path.
pub(crate) fn open_chd(path: &Path, options: &ChdOptions) -> Result<Chd, CliError> {
    Chd::open_with_options(path, options, CodecRegistry::shared())
        .map_err(|e| CliError::chd(path, e))
}

/// File name for display, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
