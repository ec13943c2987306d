//! Reader for MAME CHD (Compressed Hunks of Data) containers.
//!
//! Opening a container parses the header, decodes the hunk map and reads
//! the CD track layout from metadata. Hunks are decompressed on demand and
//! kept in a small cache; the sector readers turn them into raw or 2048-byte
//! user-data sectors for file-system walkers.

pub mod bitstream;
pub mod cache;
pub mod chd;
pub mod codec;
pub mod hash;
pub mod header;
pub mod huffman;
pub mod map;
pub mod metadata;
pub mod options;
pub mod sector;
pub mod track;

pub use chd::Chd;
pub use codec::{CdCodec, Codec, CodecRegistry, CodecTag};
pub use hash::{DataTrackHashes, hash_data_track};
pub use header::Header;
pub use map::{HunkKind, HunkMap, HunkMapEntry};
pub use metadata::{MetadataEntry, MetadataTag};
pub use options::ChdOptions;
pub use sector::{SectorMode, SectorReader};
pub use track::Track;

pub use retro_chd_core::{ChdError, DataTrackLayout, ErrorKind, ReadAt, Result, SectorSource};
