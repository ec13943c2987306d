//! Shared types for the retro-chd crates: the error type, the positioned-read
//! source contract, and CD sector framing.

pub mod cd;
pub mod error;
pub mod source;
pub mod util;

pub use cd::{DataTrackLayout, SectorSource};
pub use error::{ChdError, ErrorKind};
pub use source::ReadAt;

/// Result alias used throughout the CHD crates.
pub type Result<T, E = ChdError> = std::result::Result<T, E>;
