//! The container reader: header, hunk map and tracks of one open CHD.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use retro_chd_core::cd::{
    CD_FRAME_SIZE, ISO_SECTOR_SIZE, PVD_SECTOR, is_pvd, user_data_offset,
};
use retro_chd_core::{ChdError, DataTrackLayout, ReadAt};

use crate::codec::CodecRegistry;
use crate::header::Header;
use crate::map::HunkMap;
use crate::metadata::{MetadataEntry, read_metadata};
use crate::options::ChdOptions;
use crate::sector::{SectorMode, SectorReader};
use crate::track::{Track, parse_tracks};

/// Sectors scanned for a volume descriptor when the tracks do not say where
/// the data starts.
const PVD_SCAN_SECTORS: u64 = 100;

/// Fewest hunks scanned for a volume descriptor.
const PVD_SCAN_MIN_HUNKS: u64 = 5;

/// An open CHD container.
///
/// All read methods take `&self` and may be called from several threads.
///
/// ```no_run
/// use retro_chd::Chd;
/// use retro_chd::SectorSource;
///
/// let chd = Chd::open("game.chd")?;
/// let reader = chd.data_track_sector_reader();
/// let pvd = reader.read_sector(16)?;
/// assert_eq!(&pvd[1..6], b"CD001");
/// # Ok::<(), retro_chd::ChdError>(())
/// ```
pub struct Chd {
    source: Arc<dyn ReadAt>,
    header: Header,
    map: HunkMap,
    tracks: Vec<Track>,
    first_data_sector: OnceLock<u64>,
}

impl std::fmt::Debug for Chd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chd")
            .field("header", &self.header)
            .field("map", &self.map)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

impl Chd {
    /// Open a CHD file with default options and the built-in codecs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChdError> {
        Self::open_with_options(path, &ChdOptions::default(), CodecRegistry::shared())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: &ChdOptions,
        registry: &CodecRegistry,
    ) -> Result<Self, ChdError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::debug!("Opening {}", path.display());
        Self::from_source_with_options(Arc::new(file), options, registry)
    }

    /// Open a container from any positioned-read source.
    pub fn from_source(source: impl ReadAt + 'static) -> Result<Self, ChdError> {
        Self::from_source_with_options(
            Arc::new(source),
            &ChdOptions::default(),
            CodecRegistry::shared(),
        )
    }

    pub fn from_source_with_options(
        source: Arc<dyn ReadAt>,
        options: &ChdOptions,
        registry: &CodecRegistry,
    ) -> Result<Self, ChdError> {
        let header = Header::read(source.as_ref())?;
        if header.has_parent() {
            log::warn!("Container has a parent image; parent hunks will not be readable");
        }
        let map = HunkMap::new(Arc::clone(&source), &header, registry, options)?;

        let tracks = match load_tracks(source.as_ref(), header.meta_offset) {
            Ok(tracks) => tracks,
            Err(e) => {
                log::warn!("Ignoring track metadata: {}", e);
                Vec::new()
            }
        };
        log::debug!("{} tracks", tracks.len());

        Ok(Self {
            source,
            header,
            map,
            tracks,
            first_data_sector: OnceLock::new(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn hunk_map(&self) -> &HunkMap {
        &self.map
    }

    /// Tracks parsed at open; empty when the container has none or its
    /// metadata could not be parsed.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Logical (uncompressed) size in bytes.
    pub fn size(&self) -> u64 {
        self.header.logical_bytes
    }

    pub fn is_compressed(&self) -> bool {
        self.header.is_compressed()
    }

    /// True if the data is laid out as CD frames.
    pub fn is_cd(&self) -> bool {
        self.header.unit_bytes as usize == CD_FRAME_SIZE || !self.tracks.is_empty()
    }

    pub fn num_hunks(&self) -> u32 {
        self.map.num_hunks()
    }

    pub fn read_hunk(&self, index: u32) -> Result<Arc<[u8]>, ChdError> {
        self.map.read_hunk(index)
    }

    pub fn verify_hunk(&self, index: u32) -> Result<(), ChdError> {
        self.map.verify_hunk(index)
    }

    /// Re-read the metadata chain.
    pub fn metadata(&self) -> Result<Vec<MetadataEntry>, ChdError> {
        read_metadata(self.source.as_ref(), self.header.meta_offset)
    }

    /// Read logical bytes (hunks laid end to end) starting at `offset`.
    ///
    /// Returns the number of bytes copied, which is short at the end of the
    /// logical size or when a later hunk fails after some bytes were read.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, ChdError> {
        let size = self.size();
        if offset >= size {
            return Ok(0);
        }
        let want = buf.len().min((size - offset).min(usize::MAX as u64) as usize);
        let hunk_bytes = self.header.hunk_bytes as u64;

        let mut copied = 0;
        while copied < want {
            let position = offset + copied as u64;
            let index = position / hunk_bytes;
            let within = (position % hunk_bytes) as usize;
            let hunk = match u32::try_from(index)
                .map_err(|_| ChdError::InvalidHunk {
                    index,
                    count: self.num_hunks(),
                })
                .and_then(|index| self.read_hunk(index))
            {
                Ok(hunk) => hunk,
                Err(_) if copied > 0 => break,
                Err(e) => return Err(e),
            };
            let n = (hunk.len() - within).min(want - copied);
            buf[copied..copied + n].copy_from_slice(&hunk[within..within + n]);
            copied += n;
        }
        Ok(copied)
    }

    // -----------------------------------------------------------------------
    // Sector views
    // -----------------------------------------------------------------------

    /// Units (frames) covered by the logical size.
    pub fn total_sectors(&self) -> u64 {
        self.header.logical_bytes / self.header.unit_bytes as u64
    }

    /// 2352-byte raw sectors from the start of the disc.
    pub fn raw_sector_reader(&self) -> SectorReader<'_> {
        SectorReader::new(self, SectorMode::Raw, 0, self.total_sectors())
    }

    /// 2048-byte user data from the start of the disc.
    pub fn sector_reader(&self) -> SectorReader<'_> {
        SectorReader::new(self, SectorMode::UserData, 0, self.total_sectors())
    }

    /// 2048-byte user data from the start of the first data track. Use this
    /// for discs that open with audio tracks.
    pub fn data_track_sector_reader(&self) -> SectorReader<'_> {
        let start = self.first_data_track_sector().min(self.total_sectors());
        let sectors = (self.total_sectors() - start)
            .min(self.data_track_size() / ISO_SECTOR_SIZE as u64);
        SectorReader::new(self, SectorMode::UserData, start, sectors)
    }

    // -----------------------------------------------------------------------
    // Data track queries
    // -----------------------------------------------------------------------

    /// The first non-audio track, if any.
    pub fn first_data_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.is_data_track())
    }

    /// Sector at which the first data track's user data begins.
    ///
    /// Taken from the track layout when it says so. When the layout puts
    /// the data track at 0, or there are no tracks, the first hunks are
    /// scanned for the ISO 9660 volume descriptor instead; 0 if none is
    /// found.
    pub fn first_data_track_sector(&self) -> u64 {
        *self.first_data_sector.get_or_init(|| {
            if let Some(track) = self.first_data_track() {
                let start = track.start_frame + track.pregap as u64;
                if start > 0 {
                    return start;
                }
            }
            self.scan_for_pvd().unwrap_or(0)
        })
    }

    /// Byte offset of the first data track's first frame (pregap included).
    pub fn first_data_track_offset(&self) -> u64 {
        self.first_data_track()
            .map(|t| t.start_frame * self.header.unit_bytes as u64)
            .unwrap_or(0)
    }

    /// User-data size of the first data track, or the logical size when no
    /// track is a data track.
    pub fn data_track_size(&self) -> u64 {
        self.first_data_track()
            .map(|t| t.frames as u64 * ISO_SECTOR_SIZE as u64)
            .unwrap_or_else(|| self.size())
    }

    /// Where the first data track lives. Fails with [`ChdError::NoTracks`]
    /// when the container has no data track in its metadata.
    pub fn data_track_layout(&self) -> Result<DataTrackLayout, ChdError> {
        if self.first_data_track().is_none() {
            return Err(ChdError::NoTracks);
        }
        Ok(DataTrackLayout {
            first_sector: self.first_data_track_sector(),
            byte_offset: self.first_data_track_offset(),
            size: self.data_track_size(),
        })
    }

    /// Find the volume descriptor in the first hunks and return the sector
    /// the data track must start at for it to sit at sector 16.
    fn scan_for_pvd(&self) -> Option<u64> {
        let unit = self.header.unit_bytes as usize;
        let sectors_per_hunk = self.header.units_per_hunk() as u64;
        if sectors_per_hunk == 0 {
            return None;
        }
        let hunks = (PVD_SCAN_SECTORS / sectors_per_hunk)
            .max(PVD_SCAN_MIN_HUNKS)
            .min(self.num_hunks() as u64);

        for hunk_index in 0..hunks as u32 {
            let hunk = match self.read_hunk(hunk_index) {
                Ok(hunk) => hunk,
                Err(e) => {
                    log::debug!("Volume descriptor scan skipped hunk {}: {}", hunk_index, e);
                    continue;
                }
            };
            for (i, frame) in hunk.chunks_exact(unit).enumerate() {
                if frame.get(user_data_offset(frame)..).is_some_and(is_pvd) {
                    let sector = hunk_index as u64 * sectors_per_hunk + i as u64;
                    log::debug!("Volume descriptor found in sector {}", sector);
                    return Some(sector.saturating_sub(PVD_SECTOR));
                }
            }
        }
        None
    }
}

fn load_tracks(source: &dyn ReadAt, meta_offset: u64) -> Result<Vec<Track>, ChdError> {
    if meta_offset == 0 {
        return Ok(Vec::new());
    }
    let entries = read_metadata(source, meta_offset)?;
    parse_tracks(&entries)
}
