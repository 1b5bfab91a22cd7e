//! TOC/CUE sheet front end: line lexer, token state machine, and the disc
//! builder that turns parsed tracks into the same model a raw image yields.

mod builder;
mod lexer;
#[cfg(test)]
mod tests;

pub(crate) use builder::build_from_sheet;

use crate::layout::{SectorMode, Subchannel};
use crate::{BuildError, BuildResult};
use lexer::{Keyword, Token};

/// Highest addressable track index; index 0 holds disc-level data.
const LAST_TRACK_INDEX: usize = 99;

/// One data source of a track as written in the sheet. Resolved against
/// real files by the disc builder and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceSpec {
    /// `None` requests zero-filled sectors (SILENCE/ZERO/PREGAP).
    pub(crate) filename: Option<String>,
    /// Length in sectors; -1 means "not stated".
    pub(crate) length_sectors: i64,
    pub(crate) byte_offset: u64,
    pub(crate) swap_endian: bool,
}

/// Per-track state accumulated while parsing. Index 0 carries the
/// disc-level CD-TEXT block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParserTrackRecord {
    pub(crate) storage_mode: SectorMode,
    pub(crate) subchannel: Subchannel,
    pub(crate) four_channel_audio: bool,
    /// Pregap in sectors; -1 means "everything accumulated so far".
    pub(crate) pregap_sectors: i32,
    pub(crate) title: Option<String>,
    pub(crate) performer: Option<String>,
    pub(crate) songwriter: Option<String>,
    pub(crate) composer: Option<String>,
    pub(crate) arranger: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) sources: Vec<SourceSpec>,
}

impl Default for ParserTrackRecord {
    fn default() -> Self {
        Self {
            storage_mode: SectorMode::Audio,
            subchannel: Subchannel::None,
            four_channel_audio: false,
            pregap_sectors: 0,
            title: None,
            performer: None,
            songwriter: None,
            composer: None,
            arranger: None,
            message: None,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TocSheet {
    pub(crate) tracks: Vec<ParserTrackRecord>,
}

/// Parse a whole sheet. Aborts on the first lex or syntax error with a
/// line + caret diagnostic; no error recovery is attempted.
pub(crate) fn parse_sheet(text: &str) -> BuildResult<TocSheet> {
    let mut parser = TocParser::new();

    // CR and LF are counted independently so CRLF sheets number the same
    // as pure-LF sheets; the empty segment between CR and LF is skipped
    let mut cr_count = 0usize;
    let mut lf_count = 0usize;

    let mut rest = text;
    while !rest.is_empty() {
        let (line, terminator, tail) = split_line(rest);
        rest = tail;

        if !line.is_empty() {
            let line_number = cr_count.max(lf_count) + 1;
            let tokens = lexer::lex_line(line)
                .map_err(|column| sheet_parse_error(line_number, line, column))?;
            for lexed in tokens {
                parser
                    .handle(&lexed.token)
                    .map_err(|()| sheet_parse_error(line_number, line, lexed.column))?;
            }
        }

        match terminator {
            Some(b'\r') => cr_count += 1,
            Some(b'\n') => lf_count += 1,
            _ => {}
        }
    }

    Ok(TocSheet { tracks: parser.tracks })
}

fn split_line(text: &str) -> (&str, Option<u8>, &str) {
    match text.find(['\r', '\n']) {
        Some(pos) => (&text[..pos], Some(text.as_bytes()[pos]), &text[pos + 1..]),
        None => (text, None, ""),
    }
}

fn sheet_parse_error(line_number: usize, line: &str, column: usize) -> BuildError {
    let text: String = line.chars().map(|c| if c == '\t' { ' ' } else { c }).collect();
    let indent = line[..column].chars().count();
    let snippet = format!("{text}\n{:indent$}^ here", "");
    BuildError::SheetParse { line: line_number, snippet }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Catalog,
    CdText0,
    CdText1,
    LanguageMap0,
    LanguageMap1,
    LanguageMap2,
    LanguageMap3,
    Language0,
    Language1,
    Language2,
    Language3,
    Language4,
    Track0,
    Track1,
    No,
    Isrc,
    Zero,
    Audiofile0,
    Audiofile1,
    Audiofile2,
    Datafile0,
    Datafile1,
    Start,
    Pregap,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Title,
    Performer,
    Songwriter,
    Composer,
    Arranger,
    Message,
}

struct TocParser {
    state: State,
    /// Destination of the next CD-TEXT string; `None` discards it.
    text_target: Option<TextField>,
    track: usize,
    tracks: Vec<ParserTrackRecord>,
}

impl TocParser {
    fn new() -> Self {
        Self {
            state: State::Ready,
            text_target: None,
            track: 0,
            tracks: vec![ParserTrackRecord::default()],
        }
    }

    fn current_track_mut(&mut self) -> &mut ParserTrackRecord {
        &mut self.tracks[self.track]
    }

    fn append_source(&mut self, filename: Option<String>) {
        self.current_track_mut().sources.push(SourceSpec {
            filename,
            length_sectors: -1,
            byte_offset: 0,
            swap_endian: false,
        });
    }

    fn last_source_mut(&mut self) -> &mut SourceSpec {
        self.current_track_mut()
            .sources
            .last_mut()
            .expect("source states are only entered right after appending a source")
    }

    fn bind_text(&mut self, value: &str) {
        let Some(field) = self.text_target else { return };
        let track = self.current_track_mut();
        let slot = match field {
            TextField::Title => &mut track.title,
            TextField::Performer => &mut track.performer,
            TextField::Songwriter => &mut track.songwriter,
            TextField::Composer => &mut track.composer,
            TextField::Arranger => &mut track.arranger,
            TextField::Message => &mut track.message,
        };
        // first binding wins; repeated assignments are silently ignored
        if slot.is_none() {
            *slot = Some(value.to_owned());
        }
    }

    fn handle(&mut self, token: &Token) -> Result<(), ()> {
        match self.state {
            State::Ready => self.handle_ready(token),

            State::Catalog => match token {
                Token::Str(_) | Token::Number(_) => {
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },

            State::CdText0 => match token {
                Token::Open => {
                    self.state = State::CdText1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::CdText1 => match token {
                Token::Close => {
                    self.state = State::Ready;
                    Ok(())
                }
                // a language map is only valid in the disc-level block
                Token::Keyword(Keyword::LanguageMap) if self.track == 0 => {
                    self.state = State::LanguageMap0;
                    Ok(())
                }
                Token::Keyword(Keyword::Language) => {
                    self.state = State::Language0;
                    Ok(())
                }
                _ => Err(()),
            },

            State::LanguageMap0 => match token {
                Token::Open => {
                    self.state = State::LanguageMap1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::LanguageMap1 => match token {
                Token::Close => {
                    self.state = State::CdText1;
                    Ok(())
                }
                Token::Number(_) => {
                    self.state = State::LanguageMap2;
                    Ok(())
                }
                _ => Err(()),
            },

            State::LanguageMap2 => match token {
                Token::Colon => {
                    self.state = State::LanguageMap3;
                    Ok(())
                }
                _ => Err(()),
            },

            State::LanguageMap3 => match token {
                Token::Keyword(Keyword::En) | Token::Number(_) => {
                    self.state = State::LanguageMap1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Language0 => match token {
                Token::Number(_) => {
                    self.state = State::Language1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Language1 => match token {
                Token::Open => {
                    self.state = State::Language2;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Language2 => match token {
                Token::Close => {
                    self.state = State::CdText1;
                    Ok(())
                }
                Token::Keyword(keyword) => {
                    self.text_target = match keyword {
                        Keyword::Title => Some(TextField::Title),
                        Keyword::Performer => Some(TextField::Performer),
                        Keyword::Songwriter => Some(TextField::Songwriter),
                        Keyword::Composer => Some(TextField::Composer),
                        Keyword::Arranger => Some(TextField::Arranger),
                        Keyword::Message => Some(TextField::Message),
                        // recognized but not part of the sector model
                        Keyword::Genre
                        | Keyword::DiscId
                        | Keyword::TocInfo1
                        | Keyword::TocInfo2
                        | Keyword::UpcEan
                        | Keyword::SizeInfo
                        | Keyword::Isrc => None,
                        _ => return Err(()),
                    };
                    self.state = State::Language3;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Language3 => match token {
                Token::Str(value) => {
                    self.bind_text(value);
                    self.state = State::Language2;
                    Ok(())
                }
                Token::Open => {
                    self.state = State::Language4;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Language4 => match token {
                Token::Number(_) | Token::Comma => Ok(()),
                Token::Close => {
                    self.state = State::Language2;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Track0 => match token {
                Token::Keyword(keyword) => {
                    let mode = match keyword {
                        Keyword::Audio => SectorMode::Audio,
                        Keyword::Mode1 => SectorMode::Mode1,
                        Keyword::Mode1Raw => SectorMode::Mode1Raw,
                        Keyword::Mode2 => SectorMode::Mode2,
                        Keyword::Mode2Form1 => SectorMode::Mode2Form1,
                        Keyword::Mode2Form2 => SectorMode::Mode2Form2,
                        Keyword::Mode2FormMix => SectorMode::Mode2FormMix,
                        Keyword::Mode2Raw => SectorMode::Mode2Raw,
                        _ => return Err(()),
                    };
                    self.current_track_mut().storage_mode = mode;
                    self.state = State::Track1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Track1 => match token {
                Token::Keyword(Keyword::RwRaw) => {
                    self.current_track_mut().subchannel = Subchannel::RwRaw;
                    self.state = State::Ready;
                    Ok(())
                }
                Token::Keyword(Keyword::Rw) => {
                    self.current_track_mut().subchannel = Subchannel::Rw;
                    self.state = State::Ready;
                    Ok(())
                }
                // the subchannel word is optional; re-dispatch at top level
                _ => {
                    self.state = State::Ready;
                    self.handle(token)
                }
            },

            State::No => match token {
                Token::Keyword(Keyword::Copy | Keyword::PreEmphasis) => {
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Isrc => match token {
                Token::Str(_) => {
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Zero => match token {
                Token::Msf(time) => {
                    self.append_source(None);
                    self.last_source_mut().length_sectors = i64::from(time.to_sector_number());
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Audiofile0 => match token {
                Token::Str(name) => {
                    self.append_source(Some(name.clone()));
                    self.state = State::Audiofile1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Audiofile1 => match token {
                Token::Keyword(Keyword::Swap) => {
                    self.last_source_mut().swap_endian = true;
                    Ok(())
                }
                Token::Offset(value) => {
                    self.last_source_mut().byte_offset = *value;
                    Ok(())
                }
                Token::Msf(time) => {
                    self.current_track_mut().pregap_sectors = time.to_sector_number() as i32;
                    self.state = State::Audiofile2;
                    Ok(())
                }
                // a bare frame count is accepted where an MSF start is
                // expected; `FILE "a.wav" 0` is the common shorthand
                Token::Number(frames) => {
                    self.current_track_mut().pregap_sectors = *frames as i32;
                    self.state = State::Audiofile2;
                    Ok(())
                }
                // every argument after the filename is optional
                _ => {
                    self.state = State::Ready;
                    self.handle(token)
                }
            },

            State::Audiofile2 => match token {
                Token::Msf(time) => {
                    self.last_source_mut().length_sectors = i64::from(time.to_sector_number());
                    self.state = State::Ready;
                    Ok(())
                }
                Token::Number(frames) => {
                    self.last_source_mut().length_sectors = *frames as i64;
                    self.state = State::Ready;
                    Ok(())
                }
                // the trailing length is optional; re-dispatch at top level
                _ => {
                    self.state = State::Ready;
                    self.handle(token)
                }
            },

            State::Datafile0 => match token {
                Token::Str(name) => {
                    self.append_source(Some(name.clone()));
                    self.state = State::Datafile1;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Datafile1 => match token {
                Token::Offset(value) => {
                    self.last_source_mut().byte_offset = *value;
                    Ok(())
                }
                Token::Msf(time) => {
                    self.current_track_mut().pregap_sectors = time.to_sector_number() as i32;
                    self.state = State::Ready;
                    Ok(())
                }
                Token::Number(frames) => {
                    self.current_track_mut().pregap_sectors = *frames as i32;
                    self.state = State::Ready;
                    Ok(())
                }
                // both arguments after the filename are optional
                _ => {
                    self.state = State::Ready;
                    self.handle(token)
                }
            },

            State::Start => match token {
                Token::Msf(time) => {
                    self.current_track_mut().pregap_sectors = time.to_sector_number() as i32;
                    self.state = State::Ready;
                    Ok(())
                }
                // START's argument is optional; the -1 sentinel set on
                // entry stands for "everything accumulated so far"
                _ => {
                    self.state = State::Ready;
                    self.handle(token)
                }
            },

            State::Pregap => match token {
                Token::Msf(time) => {
                    let sectors = time.to_sector_number();
                    self.append_source(None);
                    self.last_source_mut().length_sectors = i64::from(sectors);
                    self.current_track_mut().pregap_sectors = sectors as i32;
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },

            State::Index => match token {
                // index markers do not affect logical-sector mapping
                Token::Msf(_) => {
                    self.state = State::Ready;
                    Ok(())
                }
                _ => Err(()),
            },
        }
    }

    fn handle_ready(&mut self, token: &Token) -> Result<(), ()> {
        let Token::Keyword(keyword) = token else {
            return Err(());
        };

        match keyword {
            // disc-type words are only valid in the header
            Keyword::CdDa | Keyword::CdRom | Keyword::CdRomXa => {
                if self.track == 0 { Ok(()) } else { Err(()) }
            }
            Keyword::Catalog => {
                self.state = State::Catalog;
                Ok(())
            }
            Keyword::CdText => {
                self.state = State::CdText0;
                Ok(())
            }
            Keyword::Track => {
                if self.track >= LAST_TRACK_INDEX {
                    return Err(());
                }
                self.track += 1;
                self.tracks.push(ParserTrackRecord::default());
                self.state = State::Track0;
                Ok(())
            }
            Keyword::Language => {
                self.state = State::Language0;
                Ok(())
            }
            Keyword::No => {
                self.state = State::No;
                Ok(())
            }
            Keyword::Copy | Keyword::PreEmphasis | Keyword::TwoChannelAudio => Ok(()),
            Keyword::FourChannelAudio => {
                self.current_track_mut().four_channel_audio = true;
                Ok(())
            }
            Keyword::Isrc => {
                self.state = State::Isrc;
                Ok(())
            }
            Keyword::Silence | Keyword::Zero => {
                self.state = State::Zero;
                Ok(())
            }
            Keyword::File | Keyword::Audiofile => {
                self.state = State::Audiofile0;
                Ok(())
            }
            Keyword::Datafile => {
                self.state = State::Datafile0;
                Ok(())
            }
            // FIFO sources cannot back a seekable disc
            Keyword::Fifo => Err(()),
            Keyword::Start => {
                self.current_track_mut().pregap_sectors = -1;
                self.state = State::Start;
                Ok(())
            }
            Keyword::Pregap => {
                self.state = State::Pregap;
                Ok(())
            }
            Keyword::Index => {
                self.state = State::Index;
                Ok(())
            }
            _ => Err(()),
        }
    }
}
