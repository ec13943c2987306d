use retro_chd::ChdError;
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The container could not be opened or read
    #[error("{path}: {source}")]
    Chd {
        path: String,
        #[source]
        source: ChdError,
    },

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more hunks failed to decode or verify
    #[error("{failed} of {total} hunks failed verification")]
    VerifyFailed { failed: usize, total: u32 },

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn chd(path: &std::path::Path, source: ChdError) -> Self {
        Self::Chd {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
