//! The disc model: datasource and track tables plus the sector fetch engine.
//!
//! A datasource record maps a contiguous run of logical sectors onto a byte
//! range of one backing resource together with the physical encoding to
//! apply. The track table layered on top is purely descriptive; sector
//! fetch never consults it.

use crate::layout::{
    FetchStrategy, SYNC_HEADER_LEN, SYNC_PATTERN, SectorLayout, XA_SUBHEADER_LEN,
};
use crate::{BuildError, BuildResult, FetchError, LOGICAL_SECTOR_LEN, detect, toc};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Red Book allows 99 numbered tracks; slot 0 holds disc-level metadata.
pub const MAX_TRACKS: usize = 100;

/// Buffered backing resource that remembers its position so consecutive
/// sector reads skip redundant seeks.
#[derive(Debug)]
pub(crate) struct BufferedSource<R> {
    reader: BufReader<R>,
    position: Option<u64>,
}

impl<R: Read + Seek> BufferedSource<R> {
    fn new(inner: R) -> Self {
        Self { reader: BufReader::new(inner), position: None }
    }

    fn read_exact_at(&mut self, offset: u64, out: &mut [u8]) -> io::Result<()> {
        if self.position != Some(offset) {
            self.reader.seek(SeekFrom::Start(offset))?;
        }
        self.reader.read_exact(out)?;
        self.position = Some(offset + out.len() as u64);
        Ok(())
    }
}

#[derive(Debug)]
pub struct DatasourceRecord<R> {
    pub sector_offset: u32,
    pub sector_count: u32,
    /// `None` denotes a synthetic zero-filled range (pregaps, silence).
    pub(crate) backing: Option<BufferedSource<R>>,
    pub resource_name: Option<String>,
    pub layout: SectorLayout,
    pub byte_offset: u64,
    pub byte_length: u64,
}

impl<R> DatasourceRecord<R> {
    #[must_use]
    pub fn is_zero_fill(&self) -> bool {
        self.backing.is_none()
    }
}

/// Ordered, non-overlapping list of datasource records. Owns every record
/// and any open resource handle; dropping the table releases them all.
#[derive(Debug)]
pub struct DatasourceTable<R> {
    records: Vec<DatasourceRecord<R>>,
}

impl<R> Default for DatasourceTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DatasourceTable<R> {
    #[must_use]
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    #[must_use]
    pub fn records(&self) -> &[DatasourceRecord<R>] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record whose half-open sector range contains `sector`.
    #[must_use]
    pub fn lookup(&self, sector: u32) -> Option<&DatasourceRecord<R>> {
        self.records
            .iter()
            .find(|record| (record.sector_offset..record.sector_offset + record.sector_count).contains(&sector))
    }

    fn lookup_mut(&mut self, sector: u32) -> Option<&mut DatasourceRecord<R>> {
        self.records
            .iter_mut()
            .find(|record| (record.sector_offset..record.sector_offset + record.sector_count).contains(&sector))
    }
}

impl<R: Read + Seek> DatasourceTable<R> {
    /// Append a record, merging into the previous one when the new range
    /// continues the same physical region: same backing kind (file vs
    /// zero-fill), same resource name for files, same layout, and the byte
    /// range picking up exactly where the previous record ends. Merging
    /// drops the redundant handle, so the table stays proportional to the
    /// number of distinct physical regions.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        sector_offset: u32,
        sector_count: u32,
        backing: Option<R>,
        resource_name: Option<String>,
        layout: SectorLayout,
        byte_offset: u64,
        byte_length: u64,
    ) {
        if let Some(prev) = self.records.last_mut() {
            let contiguous = prev.sector_offset + prev.sector_count == sector_offset
                && prev.backing.is_some() == backing.is_some()
                && (backing.is_none() || prev.resource_name == resource_name)
                && prev.layout == layout
                && prev.byte_offset + prev.byte_length == byte_offset;
            if contiguous {
                prev.sector_count += sector_count;
                prev.byte_length += byte_length;
                return;
            }
        }

        self.records.push(DatasourceRecord {
            sector_offset,
            sector_count,
            backing: backing.map(BufferedSource::new),
            resource_name,
            layout,
            byte_offset,
            byte_length,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackRecord {
    pub pregap_sectors: u32,
    pub start_sector: u32,
    pub length_sectors: u32,
    pub title: Option<String>,
    pub performer: Option<String>,
    pub songwriter: Option<String>,
    pub composer: Option<String>,
    pub arranger: Option<String>,
    pub message: Option<String>,
}

/// Descriptive track list. Never mutated after disc construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackTable {
    tracks: Vec<TrackRecord>,
}

impl TrackTable {
    /// # Errors
    ///
    /// Returns [`BuildError::TooManyTracks`] past the 100-record capacity.
    /// The error is non-fatal; the caller may continue without the track.
    pub fn append(&mut self, track: TrackRecord) -> BuildResult<()> {
        if self.tracks.len() >= MAX_TRACKS {
            return Err(BuildError::TooManyTracks);
        }
        self.tracks.push(track);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TrackRecord> {
        self.tracks.get(index)
    }

    #[must_use]
    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }
}

/// The disc: a datasource table plus a track table. Collaborators (boot
/// catalog, ISO 9660, UDF decoders) read only through [`Self::fetch_2048`]
/// and the track accessors.
#[derive(Debug)]
pub struct DiscModel<R = File> {
    datasources: DatasourceTable<R>,
    tracks: TrackTable,
}

impl<R> DiscModel<R> {
    pub(crate) fn from_parts(datasources: DatasourceTable<R>, tracks: TrackTable) -> Self {
        Self { datasources, tracks }
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// # Panics
    ///
    /// Panics if `index` is past the track count.
    #[must_use]
    pub fn track(&self, index: usize) -> &TrackRecord {
        &self.tracks.tracks()[index]
    }

    #[must_use]
    pub fn datasources(&self) -> &DatasourceTable<R> {
        &self.datasources
    }
}

impl<R: Read + Seek> DiscModel<R> {
    /// Fetch one validated 2048-byte logical sector.
    ///
    /// Zero-fill ranges yield all-zero bytes. For raw encodings the 12-byte
    /// sync pattern is verified and the header's mode byte decides how the
    /// payload is located; header, subheader, and subchannel bytes are
    /// never part of the result.
    ///
    /// # Errors
    ///
    /// See [`FetchError`]. I/O failures are reported as-is and never
    /// retried at this layer.
    pub fn fetch_2048(&mut self, sector: u32) -> Result<[u8; LOGICAL_SECTOR_LEN], FetchError> {
        let record = self
            .datasources
            .lookup_mut(sector)
            .ok_or(FetchError::OutOfRange { sector })?;

        let mut out = [0; LOGICAL_SECTOR_LEN];
        let Some(source) = record.backing.as_mut() else {
            return Ok(out);
        };

        let relative_sector = u64::from(sector - record.sector_offset);
        let base = record.byte_offset + relative_sector * record.layout.stride();
        let io_err = |source| FetchError::Io { sector, source };

        match record.layout.mode.strategy() {
            FetchStrategy::Cooked => {
                source.read_exact_at(base, &mut out).map_err(io_err)?;
            }
            FetchStrategy::SubheaderPrefixed => {
                source.read_exact_at(base + XA_SUBHEADER_LEN, &mut out).map_err(io_err)?;
            }
            FetchStrategy::Raw => {
                let mut header = [0; SYNC_HEADER_LEN as usize];
                source.read_exact_at(base, &mut header).map_err(io_err)?;
                if header[..12] != SYNC_PATTERN {
                    return Err(FetchError::CorruptSync { sector });
                }
                // header[12..15] carry the sector's own MSF address; unused here
                match header[15] {
                    0x00 => return Err(FetchError::ClearSector { sector }),
                    0x01 => {
                        source.read_exact_at(base + SYNC_HEADER_LEN, &mut out).map_err(io_err)?;
                    }
                    // 0xE2 is an alternate Mode 2 marker seen on CD-R media;
                    // kept as a compatibility allowance, no citation known
                    0x02 | 0xE2 => {
                        // subheader contents (file number, interleave flags)
                        // are not interpreted at this layer
                        let mut subheader = [0; XA_SUBHEADER_LEN as usize];
                        source
                            .read_exact_at(base + SYNC_HEADER_LEN, &mut subheader)
                            .map_err(io_err)?;
                        source
                            .read_exact_at(base + SYNC_HEADER_LEN + XA_SUBHEADER_LEN, &mut out)
                            .map_err(io_err)?;
                    }
                    mode => return Err(FetchError::UnknownSectorType { sector, mode }),
                }
            }
            FetchStrategy::Unsupported { payload } => {
                return Err(FetchError::UnsupportedLayout { sector, payload });
            }
        }

        Ok(out)
    }
}

impl DiscModel<File> {
    /// Build a single-track disc from a raw image file by sniffing its
    /// sector layout.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or probed, or when no known
    /// layout matches.
    pub fn build_from_image<P: AsRef<Path>>(path: P) -> BuildResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let mut file = File::open(path)
            .map_err(|source| BuildError::Open { path: display.clone(), source })?;
        let total_size = file
            .metadata()
            .map_err(|source| BuildError::Metadata { path: display.clone(), source })?
            .len();

        let (layout, sector_count) = detect::detect_layout(&mut file, total_size)
            .map_err(|source| BuildError::Probe { path: display.clone(), source })?
            .ok_or_else(|| BuildError::UnrecognizedLayout { path: display.clone() })?;

        let mut datasources = DatasourceTable::new();
        datasources.append(0, sector_count, Some(file), Some(display), layout, 0, total_size);

        // slot 0 is disc-level metadata; track 1 spans the whole image
        let mut tracks = TrackTable::default();
        tracks.append(TrackRecord::default())?;
        tracks.append(TrackRecord { length_sectors: sector_count, ..TrackRecord::default() })?;

        Ok(Self::from_parts(datasources, tracks))
    }

    /// Build a disc from a textual TOC/CUE sheet, resolving referenced
    /// audio and data files relative to the sheet's directory.
    ///
    /// # Errors
    ///
    /// Fails on the first lex/syntax error in the sheet or the first
    /// unresolvable source file; partial discs are never returned.
    pub fn build_from_sheet<P: AsRef<Path>>(path: P) -> BuildResult<Self> {
        toc::build_from_sheet(path.as_ref())
    }
}
