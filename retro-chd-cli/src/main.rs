//! retro-chd CLI
//!
//! Command-line interface for inspecting, verifying and extracting CHD
//! disc and hard-disk images.

mod commands;
mod error;
mod progress;
mod settings;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use owo_colors::Stream::{Stderr, Stdout};

pub(crate) use error::CliError;

#[derive(Parser)]
#[command(name = "retro-chd")]
#[command(about = "Inspect and extract MAME CHD images", long_about = None)]
struct Cli {
    /// Show debug output from the reader
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Decompressed hunks kept in memory (overrides settings.toml)
    #[arg(long, global = true)]
    cache_hunks: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields, codecs and tracks
    Info {
        file: PathBuf,

        /// Print the header and tracks as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the CD track layout
    Tracks { file: PathBuf },

    /// List the metadata chain
    Meta { file: PathBuf },

    /// Decode every hunk and report failures
    Verify { file: PathBuf },

    /// CRC32, SHA1 and MD5 of the first data track
    Hash { file: PathBuf },

    /// Write the first data track as 2048-byte sectors
    Extract {
        file: PathBuf,

        /// Output file (e.g. game.iso)
        output: PathBuf,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = settings::load_settings();
    let options = settings.chd_options(cli.cache_hunks);

    let result = match cli.command {
        Commands::Info { file, json } => commands::info::run_info(&file, &options, json),
        Commands::Tracks { file } => commands::tracks::run_tracks(&file, &options),
        Commands::Meta { file } => commands::meta::run_meta(&file, &options),
        Commands::Verify { file } => commands::verify::run_verify(&file, &options),
        Commands::Hash { file } => commands::hash::run_hash(&file, &options),
        Commands::Extract {
            file,
            output,
            force,
        } => commands::extract::run_extract(&file, &output, &options, force),
    };

    if let Err(e) = result {
        eprintln!(
            "{} {}",
            "Error:".if_supports_color(Stderr, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}

/// Install the logger: `info` by default, `debug` with `-v`, `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| match record.level() {
            log::Level::Warn => writeln!(
                buf,
                "{} {}",
                "warning:".if_supports_color(Stdout, |t| t.yellow()),
                record.args()
            ),
            log::Level::Error => writeln!(
                buf,
                "{} {}",
                "error:".if_supports_color(Stdout, |t| t.red()),
                record.args()
            ),
            _ => writeln!(buf, "{}", record.args()),
        })
        .init();
}
