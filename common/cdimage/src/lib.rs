//! Core disc model for optical-disc container files.
//!
//! Raw ISO images, multi-file BIN dumps, and textual TOC/CUE sheets are all
//! translated into the same model: an ordered table of datasource records
//! mapping logical sector ranges onto byte ranges of backing files, plus a
//! descriptive track table. Consumers read exclusively through
//! [`DiscModel::fetch_2048`], which hides sync patterns, subheaders, and
//! subchannel data behind a uniform 2048-byte logical sector.

pub mod cdtime;
pub mod detect;
pub mod disc;
pub mod layout;
pub mod toc;
pub mod wave;

use std::io;
use thiserror::Error;

pub use cdtime::CdTime;
pub use disc::{DatasourceRecord, DatasourceTable, DiscModel, MAX_TRACKS, TrackRecord, TrackTable};
pub use layout::{SectorLayout, SectorMode, Subchannel};

/// Payload bytes exposed for every logical sector, regardless of the
/// physical encoding behind it.
pub const LOGICAL_SECTOR_LEN: usize = 2048;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sector {sector} is not mapped by any datasource")]
    OutOfRange { sector: u32 },
    #[error("sector {sector} holds {payload} bytes of payload, not 2048")]
    UnsupportedLayout { sector: u32, payload: u16 },
    #[error("invalid sync pattern in sector {sector}")]
    CorruptSync { sector: u32 },
    #[error("sector {sector} is flagged CLEAR")]
    ClearSector { sector: u32 },
    #[error("sector {sector} has unknown mode byte {mode:#04X}")]
    UnknownSectorType { sector: u32, mode: u8 },
    #[error("I/O error reading sector {sector}: {source}")]
    Io {
        sector: u32,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("error opening '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to get file metadata for '{path}': {source}")]
    Metadata {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error probing '{path}': {source}")]
    Probe {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("'{path}' does not match any recognized sector layout")]
    UnrecognizedLayout { path: String },
    #[error("unable to determine parent directory of sheet '{0}'")]
    SheetParentDir(String),
    #[error("failed to parse sheet at line {line}:\n{snippet}")]
    SheetParse { line: usize, snippet: String },
    #[error("track {track}: zero-fill source has no length")]
    SilenceLengthMissing { track: usize },
    #[error("'{path}' is not usable as track audio: {source}")]
    Wave {
        path: String,
        #[source]
        source: wave::WaveError,
    },
    #[error("source offset {offset} lies at or beyond the end of '{path}' ({length} bytes)")]
    OffsetBeyondEnd { path: String, offset: u64, length: u64 },
    #[error("disc already holds the maximum number of tracks")]
    TooManyTracks,
}

pub type BuildResult<T> = Result<T, BuildError>;
