use super::*;

fn lzma_factory() -> Box<dyn Codec> {
    Box::new(LzmaCodec::new())
}

fn zlib_factory() -> Box<dyn Codec> {
    Box::new(ZlibCodec::new())
}

#[test]
fn tag_display() {
    assert_eq!(CodecTag::ZLIB.to_string(), "zlib");
    assert_eq!(CodecTag::CD_ZSTD.to_string(), "cdzs");
    assert_eq!(CodecTag::NONE.to_string(), "none");
    assert_eq!(CodecTag(0x0102_0304).to_string(), "0x01020304");
}

#[test]
fn tag_bytes_are_big_endian() {
    assert_eq!(CodecTag::ZLIB.0, 0x7A6C_6962);
    assert_eq!(CodecTag::from_bytes(b"cdlz"), CodecTag::CD_LZMA);
}

#[test]
fn cd_family() {
    for tag in [
        CodecTag::CD_ZLIB,
        CodecTag::CD_LZMA,
        CodecTag::CD_FLAC,
        CodecTag::CD_ZSTD,
    ] {
        assert!(tag.is_cd(), "{tag} should be a CD codec");
    }
    for tag in [CodecTag::ZLIB, CodecTag::LZMA, CodecTag::FLAC, CodecTag::ZSTD, CodecTag::HUFF] {
        assert!(!tag.is_cd(), "{tag} should not be a CD codec");
    }
}

#[test]
fn builtin_registers_eight_codecs() {
    let registry = CodecRegistry::builtin();
    let mut tags: Vec<String> = registry.tags().map(|t| t.to_string()).collect();
    tags.sort();
    assert_eq!(
        tags,
        vec!["cdfl", "cdlz", "cdzl", "cdzs", "flac", "lzma", "zlib", "zstd"]
    );
    assert!(!registry.contains(CodecTag::HUFF));
}

#[test]
fn created_codec_reports_its_tag() {
    let registry = CodecRegistry::builtin();
    for tag in registry.tags().collect::<Vec<_>>() {
        let codec = registry.create(tag).unwrap();
        assert_eq!(codec.tag(), tag);
    }
}

#[test]
fn cd_capability_matches_tag() {
    let registry = CodecRegistry::builtin();
    for tag in registry.tags().collect::<Vec<_>>() {
        let mut codec = registry.create(tag).unwrap();
        assert_eq!(codec.as_cd().is_some(), tag.is_cd(), "capability of {tag}");
    }
}

#[test]
fn unknown_tag_is_unsupported() {
    let registry = CodecRegistry::builtin();
    match registry.create(CodecTag::HUFF) {
        Err(ChdError::UnsupportedCodec(msg)) => assert!(msg.contains("huff")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("huff should not be registered"),
    }
}

#[test]
fn empty_registry() {
    let registry = CodecRegistry::new();
    assert_eq!(registry.tags().count(), 0);
    assert!(registry.create(CodecTag::ZLIB).is_err());
}

#[test]
fn first_registration_wins() {
    let mut registry = CodecRegistry::new();
    registry
        .register(CodecTag::ZLIB, lzma_factory)
        .register(CodecTag::ZLIB, zlib_factory);
    let codec = registry.create(CodecTag::ZLIB).unwrap();
    assert_eq!(codec.tag(), CodecTag::LZMA);
}

#[test]
fn registries_are_independent() {
    let mut reduced = CodecRegistry::new();
    reduced.register(CodecTag::ZLIB, zlib_factory);
    assert!(reduced.contains(CodecTag::ZLIB));
    assert!(!reduced.contains(CodecTag::ZSTD));
    assert!(CodecRegistry::shared().contains(CodecTag::ZSTD));
}

#[test]
fn shared_registry_is_built_once() {
    let a = CodecRegistry::shared() as *const CodecRegistry;
    let b = CodecRegistry::shared() as *const CodecRegistry;
    assert_eq!(a, b);
}

#[test]
fn tag_serializes_as_string() {
    let json = serde_json::to_string(&[CodecTag::CD_LZMA, CodecTag::NONE]).unwrap();
    assert_eq!(json, r#"["cdlz","none"]"#);
}
