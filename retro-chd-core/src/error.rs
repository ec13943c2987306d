use thiserror::Error;

/// Errors that can occur while reading a CHD container.
#[derive(Debug, Error)]
pub enum ChdError {
    /// I/O error from the underlying byte source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The first eight bytes are not the CHD signature
    #[error("Invalid magic: not a CHD file")]
    InvalidMagic,

    /// The header (or the hunk map header) is truncated or inconsistent
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The header declares a format version this reader does not handle
    #[error("Unsupported CHD version: {0}")]
    UnsupportedVersion(u32),

    /// A hunk needs a codec that is not registered, or a reference type
    /// that cannot be resolved (parent hunks)
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Hunk index outside the map
    #[error("Invalid hunk: {index} >= {count}")]
    InvalidHunk { index: u64, count: u32 },

    /// A codec rejected its input
    #[error("Decompression failed: {0}")]
    DecompressFailed(String),

    /// Decoded data does not match what the map promised (CRC mismatch,
    /// self-reference cycle)
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// An operation needed a track layout and none was parsed
    #[error("No tracks found")]
    NoTracks,

    /// The metadata chain or a track record is malformed
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The metadata chain loops back on an offset it already visited
    #[error("Invalid metadata: circular metadata chain at offset {offset}")]
    CircularChain { offset: u64 },
}

/// Coarse classification of a [`ChdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    InvalidMagic,
    InvalidHeader,
    UnsupportedVersion,
    UnsupportedCodec,
    InvalidHunk,
    DecompressFailed,
    CorruptData,
    NoTracks,
    InvalidMetadata,
}

impl ChdError {
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    pub fn unsupported_codec(msg: impl Into<String>) -> Self {
        Self::UnsupportedCodec(msg.into())
    }

    pub fn decompress_failed(msg: impl Into<String>) -> Self {
        Self::DecompressFailed(msg.into())
    }

    pub fn corrupt_data(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }

    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// The error kind. A circular chain is reported as invalid metadata.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidMagic => ErrorKind::InvalidMagic,
            Self::InvalidHeader(_) => ErrorKind::InvalidHeader,
            Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Self::UnsupportedCodec(_) => ErrorKind::UnsupportedCodec,
            Self::InvalidHunk { .. } => ErrorKind::InvalidHunk,
            Self::DecompressFailed(_) => ErrorKind::DecompressFailed,
            Self::CorruptData(_) => ErrorKind::CorruptData,
            Self::NoTracks => ErrorKind::NoTracks,
            Self::InvalidMetadata(_) | Self::CircularChain { .. } => ErrorKind::InvalidMetadata,
        }
    }

    /// True for a metadata chain that loops.
    pub fn is_circular_chain(&self) -> bool {
        matches!(self, Self::CircularChain { .. })
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
