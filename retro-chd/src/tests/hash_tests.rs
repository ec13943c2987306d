use std::cell::Cell;

use super::*;

/// In-memory source with an optional cut-off after which reads return 0.
struct MemorySource {
    data: Vec<u8>,
    readable: usize,
}

impl SectorSource for MemorySource {
    fn sector_size(&self) -> usize {
        ISO_SECTOR_SIZE
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, ChdError> {
        let start = (offset as usize).min(self.readable);
        let n = buf.len().min(self.readable - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

#[test]
fn known_digests() {
    let data = b"The quick brown fox jumps over the lazy dog".to_vec();
    let source = MemorySource {
        readable: data.len(),
        data,
    };
    let hashes = hash_source(&source, &|_, _| {}).unwrap();
    assert_eq!(hashes.crc32, "414fa339");
    assert_eq!(hashes.sha1, "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12");
    assert_eq!(hashes.md5, "9e107d9d372bb6826bd81d3542a419d6");
    assert_eq!(hashes.data_size, 43);
}

#[test]
fn progress_reaches_total() {
    let data = vec![0xA5u8; 3 * CHUNK_SECTORS * ISO_SECTOR_SIZE + 100];
    let source = MemorySource {
        readable: data.len(),
        data,
    };
    let calls = Cell::new(0u32);
    let last = Cell::new((0u64, 0u64));
    hash_source(&source, &|done, total| {
        calls.set(calls.get() + 1);
        last.set((done, total));
    })
    .unwrap();
    assert_eq!(calls.get(), 4);
    assert_eq!(last.get(), (source.len(), source.len()));
}

#[test]
fn empty_source() {
    let source = MemorySource {
        data: Vec::new(),
        readable: 0,
    };
    let hashes = hash_source(&source, &|_, _| {}).unwrap();
    assert_eq!(hashes.crc32, "00000000");
    assert_eq!(hashes.md5, "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(hashes.data_size, 0);
}

#[test]
fn source_ending_early_is_corrupt() {
    let source = MemorySource {
        data: vec![0u8; 8192],
        readable: 4096,
    };
    let err = hash_source(&source, &|_, _| {}).unwrap_err();
    assert!(matches!(err, ChdError::CorruptData(_)), "{err}");
    assert!(err.to_string().contains("4096 of 8192"), "{err}");
}
