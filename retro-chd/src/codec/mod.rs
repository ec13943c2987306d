//! Hunk codecs and the registry that constructs them.
//!
//! Every codec implements [`Codec`]. The CD variants additionally implement
//! [`CdCodec`] and expose it through [`Codec::as_cd`]; the hunk map calls the
//! CD entry point whenever a codec offers it.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

use retro_chd_core::ChdError;

pub(crate) mod cd;
pub mod flac;
pub mod lzma;
pub mod zlib;
pub mod zstandard;

pub use flac::{CdFlacCodec, FlacCodec};
pub use lzma::{CdLzmaCodec, LzmaCodec, lzma_dict_size};
pub use zlib::{CdZlibCodec, ZlibCodec};
pub use zstandard::{CdZstdCodec, ZstdCodec};

// ---------------------------------------------------------------------------
// Codec tags
// ---------------------------------------------------------------------------

/// A four-character codec identifier stored big-endian in the header.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CodecTag(pub u32);

impl CodecTag {
    pub const NONE: CodecTag = CodecTag(0);
    pub const ZLIB: CodecTag = CodecTag::from_bytes(b"zlib");
    pub const LZMA: CodecTag = CodecTag::from_bytes(b"lzma");
    pub const HUFF: CodecTag = CodecTag::from_bytes(b"huff");
    pub const FLAC: CodecTag = CodecTag::from_bytes(b"flac");
    pub const ZSTD: CodecTag = CodecTag::from_bytes(b"zstd");
    pub const CD_ZLIB: CodecTag = CodecTag::from_bytes(b"cdzl");
    pub const CD_LZMA: CodecTag = CodecTag::from_bytes(b"cdlz");
    pub const CD_FLAC: CodecTag = CodecTag::from_bytes(b"cdfl");
    pub const CD_ZSTD: CodecTag = CodecTag::from_bytes(b"cdzs");

    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        CodecTag(u32::from_be_bytes(*bytes))
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True for the CD-interleaved codec family.
    pub fn is_cd(self) -> bool {
        matches!(
            self,
            Self::CD_ZLIB | Self::CD_LZMA | Self::CD_FLAC | Self::CD_ZSTD
        )
    }
}

impl fmt::Display for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            bytes.iter().try_for_each(|&b| write!(f, "{}", b as char))
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

impl fmt::Debug for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodecTag({})", self)
    }
}

impl Serialize for CodecTag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Codec traits
// ---------------------------------------------------------------------------

/// A stateful hunk decompressor.
///
/// Instances may keep decoder state between calls and belong to exactly one
/// open container.
pub trait Codec: Send {
    /// The tag this codec was registered under.
    fn tag(&self) -> CodecTag;

    /// Decompress `src` into `dst`, returning the number of bytes produced.
    fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> Result<usize, ChdError>;

    /// The CD-interleaved capability, if this codec has one.
    fn as_cd(&mut self) -> Option<&mut dyn CdCodec> {
        None
    }
}

/// Codecs whose payload holds separately compressed sector and subchannel
/// streams that are interleaved into 2448-byte frames on output.
pub trait CdCodec: Codec {
    /// Decompress `frames` CD frames into `dst`. `dest_len` is the hunk size
    /// and selects the width of the compressed-length field.
    fn decompress_cd(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        dest_len: usize,
        frames: usize,
    ) -> Result<usize, ChdError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Constructor for a fresh codec instance.
pub type CodecFactory = fn() -> Box<dyn Codec>;

/// Maps codec tags to constructors.
///
/// Each open container asks the registry for its own codec instances, so
/// instances are never shared between containers.
pub struct CodecRegistry {
    factories: HashMap<CodecTag, CodecFactory>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all built-in codecs.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(CodecTag::ZLIB, || Box::new(ZlibCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::CD_ZLIB, || Box::new(CdZlibCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::LZMA, || Box::new(LzmaCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::CD_LZMA, || Box::new(CdLzmaCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::FLAC, || Box::new(FlacCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::CD_FLAC, || Box::new(CdFlacCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::ZSTD, || Box::new(ZstdCodec::new()) as Box<dyn Codec>)
            .register(CodecTag::CD_ZSTD, || Box::new(CdZstdCodec::new()) as Box<dyn Codec>);
        registry
    }

    /// The process-wide built-in registry, built on first use.
    pub fn shared() -> &'static CodecRegistry {
        static SHARED: OnceLock<CodecRegistry> = OnceLock::new();
        SHARED.get_or_init(CodecRegistry::builtin)
    }

    /// Register a constructor for `tag`. The first registration of a tag wins.
    pub fn register(&mut self, tag: CodecTag, factory: CodecFactory) -> &mut Self {
        if self.factories.contains_key(&tag) {
            log::warn!("Codec {} already registered; keeping the first", tag);
        } else {
            self.factories.insert(tag, factory);
        }
        self
    }

    pub fn contains(&self, tag: CodecTag) -> bool {
        self.factories.contains_key(&tag)
    }

    /// Registered tags in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = CodecTag> + '_ {
        self.factories.keys().copied()
    }

    /// Construct a fresh codec for `tag`.
    pub fn create(&self, tag: CodecTag) -> Result<Box<dyn Codec>, ChdError> {
        self.factories
            .get(&tag)
            .map(|factory| factory())
            .ok_or_else(|| ChdError::unsupported_codec(format!("no codec registered for {tag}")))
    }
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
