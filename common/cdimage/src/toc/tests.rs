use super::*;
use crate::cdtime::CdTime;
use std::path::PathBuf;

/// Write a sheet into a temp directory and return its path.
pub(crate) fn sheet_in_dir(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("disc.toc");
    std::fs::write(&path, text).unwrap();
    path
}

fn source(filename: Option<&str>, length_sectors: i64) -> SourceSpec {
    SourceSpec {
        filename: filename.map(str::to_owned),
        length_sectors,
        byte_offset: 0,
        swap_endian: false,
    }
}

const CD_DA_SHEET: &str = r#"CD_DA

CATALOG "1234567890123"

CD_TEXT {
  LANGUAGE_MAP {
    0 : EN
  }
  LANGUAGE 0 {
    TITLE "Some Album"
    PERFORMER "Somebody"
  }
}

// first audio track
TRACK AUDIO
TWO_CHANNEL_AUDIO
NO COPY
NO PRE_EMPHASIS
CD_TEXT {
  LANGUAGE 0 {
    TITLE "Song One"
  }
}
AUDIOFILE "track01.wav" 0

TRACK AUDIO
ISRC "USXXX0000001"
AUDIOFILE "track02.wav" 0 02:00
"#;

#[test]
fn cd_da_sheet_with_cd_text() {
    let sheet = parse_sheet(CD_DA_SHEET).unwrap();

    assert_eq!(sheet.tracks.len(), 3);

    let disc_level = &sheet.tracks[0];
    assert_eq!(disc_level.title.as_deref(), Some("Some Album"));
    assert_eq!(disc_level.performer.as_deref(), Some("Somebody"));
    assert!(disc_level.sources.is_empty());

    let first = &sheet.tracks[1];
    assert_eq!(first.storage_mode, SectorMode::Audio);
    assert_eq!(first.subchannel, Subchannel::None);
    assert_eq!(first.title.as_deref(), Some("Song One"));
    assert_eq!(first.sources, vec![source(Some("track01.wav"), -1)]);

    let second = &sheet.tracks[2];
    assert_eq!(second.title, None);
    // "02:00" is a seconds:frames literal: 2 * 75 sectors
    assert_eq!(second.sources, vec![source(Some("track02.wav"), 150)]);
}

#[test]
fn track_modes_and_subchannels() {
    let sheet = parse_sheet(
        "CD_ROM_XA\n\
         TRACK MODE1 RW\n\
         DATAFILE \"a.bin\"\n\
         TRACK MODE2_FORM1 RW_RAW\n\
         DATAFILE \"b.bin\"\n\
         TRACK MODE2_FORM_MIX\n\
         DATAFILE \"c.bin\"\n",
    )
    .unwrap();

    assert_eq!(sheet.tracks[1].storage_mode, SectorMode::Mode1);
    assert_eq!(sheet.tracks[1].subchannel, Subchannel::Rw);
    assert_eq!(sheet.tracks[2].storage_mode, SectorMode::Mode2Form1);
    assert_eq!(sheet.tracks[2].subchannel, Subchannel::RwRaw);
    assert_eq!(sheet.tracks[3].storage_mode, SectorMode::Mode2FormMix);
    assert_eq!(sheet.tracks[3].subchannel, Subchannel::None);
}

#[test]
fn zero_and_silence_append_synthetic_sources() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         SILENCE 00:02:00\n\
         ZERO 1:0:0\n",
    )
    .unwrap();

    assert_eq!(
        sheet.tracks[1].sources,
        vec![source(None, 150), source(None, 4500)]
    );
}

#[test]
fn pregap_sets_counter_and_appends_silence() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         PREGAP 00:02:00\n\
         AUDIOFILE \"a.wav\" 0\n",
    )
    .unwrap();

    let track = &sheet.tracks[1];
    assert_eq!(track.pregap_sectors, 150);
    assert_eq!(track.sources[0], source(None, 150));
    assert_eq!(track.sources[1], source(Some("a.wav"), -1));
}

#[test]
fn start_with_msf_sets_pregap_only() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         AUDIOFILE \"a.wav\" 0\n\
         START 00:02:00\n",
    )
    .unwrap();

    let track = &sheet.tracks[1];
    assert_eq!(track.pregap_sectors, 150);
    // no synthetic source, unlike PREGAP
    assert_eq!(track.sources.len(), 1);
}

#[test]
fn start_without_msf_leaves_the_sentinel() {
    // START's argument is read as optional; the -1 sentinel is resolved
    // by the disc builder to everything accumulated so far
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         AUDIOFILE \"a.wav\" 0\n\
         START\n\
         AUDIOFILE \"b.wav\" 0\n",
    )
    .unwrap();

    let track = &sheet.tracks[1];
    assert_eq!(track.pregap_sectors, -1);
    assert_eq!(track.sources.len(), 2);
}

#[test]
fn index_is_consumed_without_effect() {
    let with_index = parse_sheet(
        "TRACK AUDIO\n\
         AUDIOFILE \"a.wav\" 0\n\
         INDEX 00:05:00\n\
         INDEX 00:10:00\n",
    )
    .unwrap();
    let without_index = parse_sheet(
        "TRACK AUDIO\n\
         AUDIOFILE \"a.wav\" 0\n",
    )
    .unwrap();

    assert_eq!(with_index.tracks, without_index.tracks);
}

#[test]
fn audiofile_swap_and_offset() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         AUDIOFILE \"a.raw\" SWAP #600 0\n",
    )
    .unwrap();

    let spec = &sheet.tracks[1].sources[0];
    assert!(spec.swap_endian);
    assert_eq!(spec.byte_offset, 600);
    assert_eq!(spec.length_sectors, -1);
}

#[test]
fn datafile_with_offset_and_start_time() {
    let sheet = parse_sheet(
        "TRACK MODE1\n\
         DATAFILE \"a.iso\" #2048 00:02:00\n",
    )
    .unwrap();

    assert_eq!(sheet.tracks[1].sources[0].byte_offset, 2048);
    assert_eq!(sheet.tracks[1].pregap_sectors, 150);
}

#[test]
fn four_channel_audio_flag() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         FOUR_CHANNEL_AUDIO\n\
         AUDIOFILE \"a.wav\" 0\n",
    )
    .unwrap();

    assert!(sheet.tracks[1].four_channel_audio);
    assert!(!sheet.tracks[0].four_channel_audio);
}

#[test]
fn cd_text_first_binding_wins() {
    let sheet = parse_sheet(
        "TRACK AUDIO\n\
         CD_TEXT {\n\
           LANGUAGE 0 {\n\
             TITLE \"Kept\"\n\
             TITLE \"Ignored\"\n\
           }\n\
         }\n\
         CD_TEXT {\n\
           LANGUAGE 0 {\n\
             TITLE \"Also Ignored\"\n\
             PERFORMER \"Kept Performer\"\n\
           }\n\
         }\n",
    )
    .unwrap();

    assert_eq!(sheet.tracks[1].title.as_deref(), Some("Kept"));
    assert_eq!(sheet.tracks[1].performer.as_deref(), Some("Kept Performer"));
}

#[test]
fn binary_cd_text_blocks_are_consumed() {
    let sheet = parse_sheet(
        "CD_TEXT {\n\
           LANGUAGE 0 {\n\
             TOC_INFO1 { 1, 2, 3, 4 }\n\
             SIZE_INFO { 0, 0, 10 }\n\
             GENRE \"ignored\"\n\
             TITLE \"Album\"\n\
           }\n\
         }\n",
    )
    .unwrap();

    // discarded fields must not leak into the model
    assert_eq!(sheet.tracks[0].title.as_deref(), Some("Album"));
    assert_eq!(sheet.tracks[0].message, None);
}

#[test]
fn language_map_outside_disc_block_is_rejected() {
    let result = parse_sheet(
        "TRACK AUDIO\n\
         CD_TEXT {\n\
           LANGUAGE_MAP { 0 : EN }\n\
         }\n",
    );

    assert!(matches!(result, Err(BuildError::SheetParse { line: 3, .. })));
}

#[test]
fn disc_type_words_after_first_track_are_rejected() {
    assert!(parse_sheet("CD_DA\nTRACK AUDIO\nCD_DA\n").is_err());
    assert!(parse_sheet("TRACK AUDIO\nCD_ROM_XA\n").is_err());
}

#[test]
fn fifo_sources_are_rejected() {
    let result = parse_sheet("TRACK AUDIO\nFIFO \"pipe\" 0\n");

    assert!(matches!(result, Err(BuildError::SheetParse { line: 2, .. })));
}

#[test]
fn track_limit_is_enforced() {
    let mut text = String::from("CD_DA\n");
    for _ in 0..99 {
        text.push_str("TRACK AUDIO\nSILENCE 00:02:00\n");
    }
    let sheet = parse_sheet(&text).unwrap();
    assert_eq!(sheet.tracks.len(), 100);

    text.push_str("TRACK AUDIO\n");
    assert!(parse_sheet(&text).is_err());
}

#[test]
fn crlf_line_numbering_matches_lf() {
    let lf_line = match parse_sheet("TRACK AUDIO\nBOGUS\n").unwrap_err() {
        BuildError::SheetParse { line, .. } => line,
        other => panic!("unexpected error: {other}"),
    };
    let crlf_line = match parse_sheet("TRACK AUDIO\r\nBOGUS\r\n").unwrap_err() {
        BuildError::SheetParse { line, .. } => line,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(lf_line, 2);
    assert_eq!(crlf_line, 2);
}

#[test]
fn diagnostics_point_at_the_offending_token() {
    let (line, snippet) = match parse_sheet("TRACK AUDIO\nAUDIOFILE 42\n").unwrap_err() {
        BuildError::SheetParse { line, snippet } => (line, snippet),
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(line, 2);
    assert_eq!(snippet, "AUDIOFILE 42\n          ^ here");
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let sheet = parse_sheet(
        "// header comment\n\
         \n\
         CD_DA\n\
         TRACK AUDIO // inline comment\n\
         AUDIOFILE \"a.wav\" 0\n",
    )
    .unwrap();

    assert_eq!(sheet.tracks.len(), 2);
    assert_eq!(sheet.tracks[1].sources[0].filename.as_deref(), Some("a.wav"));
}

#[test]
fn catalog_accepts_string_or_number() {
    assert!(parse_sheet("CATALOG \"1234567890123\"\n").is_ok());
    assert!(parse_sheet("CATALOG 1234567890123\n").is_ok());
    assert!(parse_sheet("CATALOG {\n").is_err());
}

#[test]
fn isrc_requires_a_string() {
    assert!(parse_sheet("TRACK AUDIO\nISRC \"USXXX0000001\"\n").is_ok());
    assert!(parse_sheet("TRACK AUDIO\nISRC 1234\n").is_err());
}

#[test]
fn msf_fields_reach_the_model_normalized() {
    // 1:2:3 and 01:02:03 must mean the same sector count
    let short = parse_sheet("TRACK AUDIO\nSILENCE 1:2:3\n").unwrap();
    let long = parse_sheet("TRACK AUDIO\nSILENCE 01:02:03\n").unwrap();

    let expected = i64::from(CdTime::new(1, 2, 3).to_sector_number());
    assert_eq!(short.tracks[1].sources[0].length_sectors, expected);
    assert_eq!(long.tracks[1].sources[0].length_sectors, expected);
}
