//! Sector views over an open container.

use retro_chd_core::cd::{CD_SECTOR_SIZE, ISO_SECTOR_SIZE, user_data_offset};
use retro_chd_core::{ChdError, SectorSource};

use crate::chd::Chd;

/// What each sector of a view holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorMode {
    /// The 2352-byte raw sector of each frame, subchannel dropped.
    Raw,
    /// The 2048-byte user data of each frame.
    UserData,
}

impl SectorMode {
    pub fn sector_size(self) -> usize {
        match self {
            Self::Raw => CD_SECTOR_SIZE,
            Self::UserData => ISO_SECTOR_SIZE,
        }
    }
}

/// A byte-addressable view of consecutive sectors.
///
/// Offset 0 is the start of sector `start_sector` of the container; each
/// sector contributes `mode.sector_size()` bytes.
#[derive(Debug, Clone, Copy)]
pub struct SectorReader<'a> {
    chd: &'a Chd,
    mode: SectorMode,
    start_sector: u64,
    sectors: u64,
}

impl<'a> SectorReader<'a> {
    pub(crate) fn new(chd: &'a Chd, mode: SectorMode, start_sector: u64, sectors: u64) -> Self {
        Self {
            chd,
            mode,
            start_sector,
            sectors,
        }
    }

    pub fn mode(&self) -> SectorMode {
        self.mode
    }

    /// Container sector that backs offset 0 of this view.
    pub fn start_sector(&self) -> u64 {
        self.start_sector
    }

    pub fn sectors(&self) -> u64 {
        self.sectors
    }
}

impl SectorSource for SectorReader<'_> {
    fn sector_size(&self) -> usize {
        self.mode.sector_size()
    }

    fn len(&self) -> u64 {
        self.sectors * self.sector_size() as u64
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, ChdError> {
        let len = self.len();
        if offset >= len || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min((len - offset).min(usize::MAX as u64) as usize);

        let header = self.chd.header();
        let unit = header.unit_bytes as u64;
        let units_per_hunk = header.units_per_hunk() as u64;
        if units_per_hunk == 0 {
            return Err(ChdError::invalid_header(format!(
                "unit size {unit} exceeds hunk size {}",
                header.hunk_bytes
            )));
        }
        let sector_size = self.sector_size() as u64;

        let mut copied = 0;
        while copied < want {
            let position = offset + copied as u64;
            let sector = self.start_sector + position / sector_size;
            let within = (position % sector_size) as usize;

            let hunk_index = sector / units_per_hunk;
            let hunk = match u32::try_from(hunk_index)
                .map_err(|_| ChdError::InvalidHunk {
                    index: hunk_index,
                    count: self.chd.num_hunks(),
                })
                .and_then(|index| self.chd.read_hunk(index))
            {
                Ok(hunk) => hunk,
                Err(_) if copied > 0 => break,
                Err(e) => return Err(e),
            };

            let unit_start = ((sector % units_per_hunk) * unit) as usize;
            let unit_end = (unit_start + unit as usize).min(hunk.len());
            let frame = &hunk[unit_start.min(unit_end)..unit_end];
            let data_offset = match self.mode {
                SectorMode::Raw => 0,
                SectorMode::UserData => user_data_offset(frame),
            };

            let start = data_offset + within;
            let available = (sector_size as usize - within).min(frame.len().saturating_sub(start));
            if available == 0 {
                break;
            }
            let n = available.min(want - copied);
            buf[copied..copied + n].copy_from_slice(&frame[start..start + n]);
            copied += n;
        }
        Ok(copied)
    }
}
