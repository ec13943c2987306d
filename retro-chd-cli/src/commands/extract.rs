use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use retro_chd::{ChdError, ChdOptions, SectorSource};
use retro_chd_core::cd::ISO_SECTOR_SIZE;
use retro_chd_core::util::format_bytes_approx;

use crate::commands::{display_name, open_chd};
use crate::{CliError, progress};

/// Sectors copied per read.
const CHUNK_SECTORS: usize = 64;

/// Run the extract command.
pub(crate) fn run_extract(
    path: &Path,
    output: &Path,
    options: &ChdOptions,
    force: bool,
) -> Result<(), CliError> {
    if output.exists() && !force {
        return Err(CliError::other(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )));
    }

    let chd = open_chd(path, options)?;
    let reader = chd.data_track_sector_reader();
    if chd.first_data_track().is_none() {
        log::warn!(
            "No data track in metadata; extracting from sector {}",
            reader.start_sector()
        );
    }

    log::info!(
        "Extracting {} -> {}",
        display_name(path).if_supports_color(Stdout, |t| t.bold()),
        output.display()
    );

    // Written beside the target and renamed on success.
    let partial = partial_path(output);
    let pb = progress::byte_bar(reader.len(), "Extracting");
    let result = copy_sectors(&reader, &partial, |done| pb.set_position(done));
    pb.finish_and_clear();

    let written = match result {
        Ok(written) => written,
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            return Err(match e {
                CopyError::Io(e) => CliError::Io(e),
                CopyError::Chd(e) => CliError::chd(path, e),
            });
        }
    };
    std::fs::rename(&partial, output)?;

    log::info!(
        "  {} Wrote {} ({} sectors)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        format_bytes_approx(written),
        written / ISO_SECTOR_SIZE as u64
    );
    Ok(())
}

#[derive(Debug)]
enum CopyError {
    Io(std::io::Error),
    Chd(ChdError),
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Copy every byte of `source` into a new file at `dest`.
fn copy_sectors(
    source: &dyn SectorSource,
    dest: &Path,
    progress: impl Fn(u64),
) -> Result<u64, CopyError> {
    let mut out = BufWriter::new(File::create(dest).map_err(CopyError::Io)?);
    let mut buf = vec![0u8; CHUNK_SECTORS * source.sector_size()];
    let total = source.len();
    let mut done = 0u64;

    while done < total {
        let n = source.read_at(&mut buf, done).map_err(CopyError::Chd)?;
        if n == 0 {
            return Err(CopyError::Chd(ChdError::corrupt_data(format!(
                "data track ended at byte {done} of {total}"
            ))));
        }
        out.write_all(&buf[..n]).map_err(CopyError::Io)?;
        done += n as u64;
        progress(done);
    }
    out.flush().map_err(CopyError::Io)?;
    Ok(done)
}

#[cfg(test)]
#[path = "tests/extract_tests.rs"]
mod tests;
