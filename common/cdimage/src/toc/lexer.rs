//! Longest-match line tokenizer for TOC/CUE sheets.

use crate::cdtime::CdTime;

/// Upper bound on the unescaped content of one quoted string.
const MAX_STRING_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Str(String),
    /// `#12345` byte-offset literal.
    Offset(u64),
    /// Normalized minute:second:frame literal.
    Msf(CdTime),
    Number(u64),
    Open,
    Close,
    Colon,
    Comma,
    Keyword(Keyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Catalog,
    CdDa,
    CdRom,
    CdRomXa,
    CdText,
    LanguageMap,
    En,
    Language,
    Title,
    Performer,
    Songwriter,
    Composer,
    Arranger,
    Message,
    DiscId,
    Genre,
    TocInfo1,
    TocInfo2,
    UpcEan,
    SizeInfo,
    Track,
    Audio,
    Mode1,
    Mode1Raw,
    Mode2,
    Mode2Form1,
    Mode2Form2,
    Mode2FormMix,
    Mode2Raw,
    Rw,
    RwRaw,
    No,
    Copy,
    PreEmphasis,
    TwoChannelAudio,
    FourChannelAudio,
    Isrc,
    Silence,
    Zero,
    File,
    Audiofile,
    Datafile,
    Swap,
    Fifo,
    Start,
    Pregap,
    Index,
}

/// Keyword spellings. Shared prefixes (CD_ROM/CD_ROM_XA, MODE1/MODE1_RAW,
/// RW/RW_RAW) are disambiguated by the trailing-boundary rule, not by
/// table order.
const KEYWORDS: &[(&str, Keyword)] = &[
    ("CATALOG", Keyword::Catalog),
    ("CD_DA", Keyword::CdDa),
    ("CD_ROM", Keyword::CdRom),
    ("CD_ROM_XA", Keyword::CdRomXa),
    ("CD_TEXT", Keyword::CdText),
    ("LANGUAGE_MAP", Keyword::LanguageMap),
    ("EN", Keyword::En),
    ("LANGUAGE", Keyword::Language),
    ("TITLE", Keyword::Title),
    ("PERFORMER", Keyword::Performer),
    ("SONGWRITER", Keyword::Songwriter),
    ("COMPOSER", Keyword::Composer),
    ("ARRANGER", Keyword::Arranger),
    ("MESSAGE", Keyword::Message),
    ("DISC_ID", Keyword::DiscId),
    ("GENRE", Keyword::Genre),
    ("TOC_INFO1", Keyword::TocInfo1),
    ("TOC_INFO2", Keyword::TocInfo2),
    ("UPC_EAN", Keyword::UpcEan),
    ("SIZE_INFO", Keyword::SizeInfo),
    ("TRACK", Keyword::Track),
    ("AUDIO", Keyword::Audio),
    ("MODE1", Keyword::Mode1),
    ("MODE1_RAW", Keyword::Mode1Raw),
    ("MODE2", Keyword::Mode2),
    ("MODE2_FORM1", Keyword::Mode2Form1),
    ("MODE2_FORM2", Keyword::Mode2Form2),
    ("MODE2_FORM_MIX", Keyword::Mode2FormMix),
    ("MODE2_RAW", Keyword::Mode2Raw),
    ("RW", Keyword::Rw),
    ("RW_RAW", Keyword::RwRaw),
    ("NO", Keyword::No),
    ("COPY", Keyword::Copy),
    ("PRE_EMPHASIS", Keyword::PreEmphasis),
    ("TWO_CHANNEL_AUDIO", Keyword::TwoChannelAudio),
    ("FOUR_CHANNEL_AUDIO", Keyword::FourChannelAudio),
    ("ISRC", Keyword::Isrc),
    ("SILENCE", Keyword::Silence),
    ("ZERO", Keyword::Zero),
    ("FILE", Keyword::File),
    ("AUDIOFILE", Keyword::Audiofile),
    ("DATAFILE", Keyword::Datafile),
    ("SWAP", Keyword::Swap),
    ("FIFO", Keyword::Fifo),
    ("START", Keyword::Start),
    ("PREGAP", Keyword::Pregap),
    ("INDEX", Keyword::Index),
];

#[derive(Debug)]
pub(crate) struct LexedToken {
    pub(crate) token: Token,
    /// Byte offset of the token's first character within the line.
    pub(crate) column: usize,
}

/// Tokenize one line. On failure returns the byte offset of the offending
/// position for diagnostics.
pub(crate) fn lex_line(line: &str) -> Result<Vec<LexedToken>, usize> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        match bytes[pos] {
            b' ' | b'\t' => pos += 1,
            // rest of the line is a comment, wherever a token could start
            b'/' if bytes.get(pos + 1) == Some(&b'/') => break,
            b'"' => {
                let (value, consumed) = lex_string(line, pos).ok_or(start)?;
                tokens.push(LexedToken { token: Token::Str(value), column: start });
                pos += consumed;
            }
            b'#' => {
                pos += 1;
                let digits = count_digits(&bytes[pos..]);
                let value = lex_number(&line[pos..pos + digits]).ok_or(start)?;
                tokens.push(LexedToken { token: Token::Offset(value), column: start });
                pos += digits;
            }
            b'0'..=b'9' => {
                if let Some((time, consumed)) = match_msf(&bytes[pos..]) {
                    tokens.push(LexedToken { token: Token::Msf(time), column: start });
                    pos += consumed;
                } else {
                    let digits = count_digits(&bytes[pos..]);
                    let value = lex_number(&line[pos..pos + digits]).ok_or(start)?;
                    tokens.push(LexedToken { token: Token::Number(value), column: start });
                    pos += digits;
                }
            }
            b'{' => {
                tokens.push(LexedToken { token: Token::Open, column: start });
                pos += 1;
            }
            b'}' => {
                tokens.push(LexedToken { token: Token::Close, column: start });
                pos += 1;
            }
            b':' => {
                tokens.push(LexedToken { token: Token::Colon, column: start });
                pos += 1;
            }
            b',' => {
                tokens.push(LexedToken { token: Token::Comma, column: start });
                pos += 1;
            }
            _ => {
                let (keyword, len) = match_keyword(&bytes[pos..]).ok_or(start)?;
                tokens.push(LexedToken { token: Token::Keyword(keyword), column: start });
                pos += len;
            }
        }
    }

    Ok(tokens)
}

/// Consume a quoted string starting at `start`. Returns the unescaped
/// content and the total bytes consumed, or `None` on an unterminated or
/// oversized string.
fn lex_string(line: &str, start: usize) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = line[start + 1..].char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Some((value, index + 2)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    other => value.push(other),
                }
            }
            other => value.push(other),
        }
        if value.len() > MAX_STRING_LEN {
            return None;
        }
    }

    None
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// An empty digit run is a plain zero (`#` with nothing after it).
fn lex_number(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// Match a minute:second:frame literal. Field widths of 1 or 2 digits are
/// accepted at every position, and the minutes field may be absent; the
/// shapes are tried longest first so the match is maximal.
fn match_msf(bytes: &[u8]) -> Option<(CdTime, usize)> {
    const THREE_FIELD: [[usize; 3]; 8] = [
        [2, 2, 2],
        [1, 2, 2],
        [2, 1, 2],
        [2, 2, 1],
        [1, 1, 2],
        [1, 2, 1],
        [2, 1, 1],
        [1, 1, 1],
    ];
    const TWO_FIELD: [[usize; 2]; 4] = [[2, 2], [1, 2], [2, 1], [1, 1]];

    for widths in THREE_FIELD {
        if let Some((fields, consumed)) = match_fields(bytes, &widths) {
            return Some((CdTime::new(fields[0], fields[1], fields[2]), consumed));
        }
    }
    for widths in TWO_FIELD {
        if let Some((fields, consumed)) = match_fields(bytes, &widths) {
            return Some((CdTime::new(0, fields[0], fields[1]), consumed));
        }
    }

    None
}

fn match_fields(bytes: &[u8], widths: &[usize]) -> Option<(Vec<u8>, usize)> {
    let mut fields = Vec::with_capacity(widths.len());
    let mut pos = 0;

    for (index, &width) in widths.iter().enumerate() {
        if index > 0 {
            if bytes.get(pos) != Some(&b':') {
                return None;
            }
            pos += 1;
        }
        let mut value = 0u8;
        for _ in 0..width {
            let digit = *bytes.get(pos)?;
            if !digit.is_ascii_digit() {
                return None;
            }
            value = value * 10 + (digit - b'0');
            pos += 1;
        }
        fields.push(value);
    }

    Some((fields, pos))
}

/// A keyword only matches when followed by whitespace or end-of-line.
fn match_keyword(bytes: &[u8]) -> Option<(Keyword, usize)> {
    KEYWORDS.iter().find_map(|&(name, keyword)| {
        let name = name.as_bytes();
        let matched = bytes.starts_with(name)
            && matches!(bytes.get(name.len()).copied(), None | Some(b' ' | b'\t'));
        matched.then_some((keyword, name.len()))
    })
}
