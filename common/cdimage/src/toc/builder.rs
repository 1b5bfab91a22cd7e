//! Builds the disc model from a parsed sheet: resolves referenced audio and
//! data files into absolute byte ranges and whole-sector counts.

use crate::disc::{DatasourceTable, DiscModel, TrackRecord, TrackTable};
use crate::layout::{SectorLayout, SectorMode, Subchannel};
use crate::toc::{ParserTrackRecord, SourceSpec, TocSheet, parse_sheet};
use crate::{BuildError, BuildResult, wave};
use std::fs::{self, File};
use std::path::Path;

pub(crate) fn build_from_sheet(path: &Path) -> BuildResult<DiscModel<File>> {
    let display = path.display().to_string();
    let text =
        fs::read_to_string(path).map_err(|source| BuildError::Open { path: display, source })?;
    let sheet = parse_sheet(&text)?;
    build_disc(path, &sheet)
}

/// Convert parsed per-track records into the datasource and track tables.
/// Any failure aborts the whole build; ownership unwinds every file handle
/// opened so far, so partial discs are never exposed.
pub(crate) fn build_disc(sheet_path: &Path, sheet: &TocSheet) -> BuildResult<DiscModel<File>> {
    let parent = sheet_path
        .parent()
        .ok_or_else(|| BuildError::SheetParentDir(sheet_path.display().to_string()))?;

    let mut datasources = DatasourceTable::new();
    let mut tracks = TrackTable::default();
    let mut track_offset: u32 = 0;

    for (index, track) in sheet.tracks.iter().enumerate() {
        let mut track_length: u32 = 0;

        for source in &track.sources {
            // a stated length of exactly zero marks a vestigial entry
            if source.length_sectors == 0 {
                continue;
            }

            let sector_offset = track_offset + track_length;
            track_length += match &source.filename {
                None => append_zero_fill(&mut datasources, track, index, source, sector_offset)?,
                Some(name) => {
                    append_file(&mut datasources, parent, track, name, source, sector_offset)?
                }
            };
        }

        let pregap_sectors = if track.pregap_sectors < 0 {
            // START without an argument: the whole track so far is pregap
            track_length
        } else {
            track.pregap_sectors as u32
        };

        let record = TrackRecord {
            pregap_sectors,
            start_sector: track_offset,
            length_sectors: track_length,
            title: track.title.clone(),
            performer: track.performer.clone(),
            songwriter: track.songwriter.clone(),
            composer: track.composer.clone(),
            arranger: track.arranger.clone(),
            message: track.message.clone(),
        };
        if let Err(err) = tracks.append(record) {
            // sheet track indices are bounded upstream; losing a track
            // record does not invalidate the sector mapping
            log::warn!("dropping track {index}: {err}");
        }

        track_offset += track_length;
    }

    log::trace!(
        "built disc model from sheet: {} datasources, {} tracks, {track_offset} sectors",
        datasources.len(),
        tracks.len()
    );

    Ok(DiscModel::from_parts(datasources, tracks))
}

fn append_zero_fill(
    datasources: &mut DatasourceTable<File>,
    track: &ParserTrackRecord,
    track_index: usize,
    source: &SourceSpec,
    sector_offset: u32,
) -> BuildResult<u32> {
    if source.length_sectors < 0 {
        return Err(BuildError::SilenceLengthMissing { track: track_index });
    }

    let sectors = source.length_sectors as u32;
    let layout = SectorLayout::new(track.storage_mode, track.subchannel);
    datasources.append(sector_offset, sectors, None, None, layout, 0, 0);
    Ok(sectors)
}

fn append_file(
    datasources: &mut DatasourceTable<File>,
    parent: &Path,
    track: &ParserTrackRecord,
    name: &str,
    source: &SourceSpec,
    sector_offset: u32,
) -> BuildResult<u32> {
    let path = parent.join(name);
    let display = path.display().to_string();
    let mut file =
        File::open(&path).map_err(|source| BuildError::Open { path: display.clone(), source })?;

    let embedded_audio = track.storage_mode == SectorMode::Audio
        && track.subchannel == Subchannel::None
        && wave::is_wave_filename(name);

    let (mut byte_offset, mut byte_length, layout) = if embedded_audio {
        let (offset, length) = wave::locate_pcm_data(&mut file)
            .map_err(|source| BuildError::Wave { path: display.clone(), source })?;
        (offset, length, SectorLayout::new(SectorMode::Audio, Subchannel::None))
    } else {
        let length = file
            .metadata()
            .map_err(|source| BuildError::Metadata { path: display.clone(), source })?
            .len();
        // byte-swapped PCM makes no difference to 2048-byte fetches, but
        // the layout records it for raw-sector consumers
        let mode = if track.storage_mode == SectorMode::Audio && source.swap_endian {
            SectorMode::AudioSwapped
        } else {
            track.storage_mode
        };
        (0, length, SectorLayout::new(mode, track.subchannel))
    };

    if source.byte_offset >= byte_length {
        return Err(BuildError::OffsetBeyondEnd {
            path: display,
            offset: source.byte_offset,
            length: byte_length,
        });
    }
    byte_offset += source.byte_offset;
    byte_length -= source.byte_offset;

    // a trailing partial sector still occupies a whole sector on disc
    let sectors = byte_length.div_ceil(layout.stride()) as u32;
    datasources.append(
        sector_offset,
        sectors,
        Some(file),
        Some(name.to_owned()),
        layout,
        byte_offset,
        byte_length,
    );
    Ok(sectors)
}
