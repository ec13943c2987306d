use super::*;

use std::cell::Cell;

/// In-memory sectors, optionally ending early or failing past a byte.
struct MemorySectors {
    data: Vec<u8>,
    claimed_len: u64,
    fail_at: Option<u64>,
}

impl MemorySectors {
    fn new(sectors: usize) -> Self {
        let data: Vec<u8> = (0..sectors * ISO_SECTOR_SIZE).map(|i| (i / 7) as u8).collect();
        let claimed_len = data.len() as u64;
        Self {
            data,
            claimed_len,
            fail_at: None,
        }
    }
}

impl SectorSource for MemorySectors {
    fn sector_size(&self) -> usize {
        ISO_SECTOR_SIZE
    }

    fn len(&self) -> u64 {
        self.claimed_len
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, ChdError> {
        if self.fail_at.is_some_and(|at| offset >= at) {
            return Err(ChdError::decompress_failed("hunk 3: bad stream"));
        }
        let start = (offset as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

#[test]
fn copies_every_sector() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.iso");
    let source = MemorySectors::new(CHUNK_SECTORS * 2 + 3);
    let calls = Cell::new(0);

    let written = copy_sectors(&source, &dest, |_| calls.set(calls.get() + 1)).unwrap();

    assert_eq!(written, source.data.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), source.data);
    assert_eq!(calls.get(), 3);
}

#[test]
fn empty_source_writes_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("empty.iso");
    let written = copy_sectors(&MemorySectors::new(0), &dest, |_| {}).unwrap();
    assert_eq!(written, 0);
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 0);
}

#[test]
fn short_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemorySectors::new(4);
    source.claimed_len += ISO_SECTOR_SIZE as u64;

    let err = copy_sectors(&source, &dir.path().join("short.iso"), |_| {}).unwrap_err();
    match err {
        CopyError::Chd(e) => assert!(e.to_string().contains("ended at byte 8192"), "{e}"),
        CopyError::Io(e) => panic!("unexpected I/O error: {e}"),
    }
}

#[test]
fn reader_errors_propagate() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemorySectors::new(CHUNK_SECTORS * 2);
    source.fail_at = Some((CHUNK_SECTORS * ISO_SECTOR_SIZE) as u64);

    let err = copy_sectors(&source, &dir.path().join("bad.iso"), |_| {}).unwrap_err();
    assert!(matches!(err, CopyError::Chd(ChdError::DecompressFailed(_))));
}

#[test]
fn partial_path_appends_suffix() {
    assert_eq!(
        partial_path(Path::new("/tmp/game.iso")),
        PathBuf::from("/tmp/game.iso.part")
    );
}
