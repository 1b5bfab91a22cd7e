//! RIFF/WAVE container probing for audio tracks backed by `.wav` files.
//!
//! Only one PCM configuration is acceptable on a disc: 16-bit, 2-channel,
//! 44100 Hz, 4-byte frames. Everything else fails the disc build.

use std::io::{Read, Seek, SeekFrom};
use thiserror::Error;

/// RIFF length must at least cover WAVE + a 16-byte fmt chunk + the data
/// chunk header + one byte of samples.
const RIFF_MIN_LEN: u32 = 4 + 8 + 16 + 8 + 1;

#[derive(Debug, Error)]
pub enum WaveError {
    #[error("I/O error reading RIFF container: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing RIFF signature")]
    MissingRiffTag,
    #[error("RIFF length {0} is smaller than any possible WAVE layout")]
    RiffTooShort(u32),
    #[error("missing WAVE signature")]
    MissingWaveTag,
    #[error("ran out of RIFF space looking for the '{0}' chunk")]
    ChunkNotFound(&'static str),
    #[error("'fmt ' chunk is {0} bytes, expected at least 16")]
    FmtTooShort(u32),
    #[error("audio is not 16-bit stereo 44100 Hz PCM")]
    UnsupportedPcmFormat,
}

/// Case-insensitive `.wav` / `.wave` filename check.
#[must_use]
pub fn is_wave_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".wav") || lower.ends_with(".wave")
}

/// Walk the RIFF chunk list and return the byte range `(offset, length)` of
/// the PCM samples in the `data` chunk.
///
/// The `fmt ` chunk must precede `data` and declare exactly the accepted
/// PCM configuration. Unknown chunks are skipped by their declared length;
/// the walk never leaves the declared RIFF extent.
///
/// # Errors
///
/// Fails on any I/O error, malformed container, or PCM format mismatch.
pub fn locate_pcm_data<R: Read + Seek>(reader: &mut R) -> Result<(u64, u64), WaveError> {
    let mut header = [0; 8];
    reader.read_exact(&mut header)?;
    if header[..4] != *b"RIFF" {
        return Err(WaveError::MissingRiffTag);
    }
    let riff_len = u32::from_le_bytes(header[4..8].try_into().unwrap());
    if riff_len < RIFF_MIN_LEN {
        return Err(WaveError::RiffTooShort(riff_len));
    }
    let mut remaining = riff_len;

    let mut tag = [0; 4];
    reader.read_exact(&mut tag)?;
    remaining -= 4;
    if tag != *b"WAVE" {
        return Err(WaveError::MissingWaveTag);
    }

    // locate "fmt "; it always appears before the sample data
    loop {
        let (chunk_tag, chunk_len) = next_chunk(reader, &mut remaining, "fmt ")?;
        if chunk_tag != *b"fmt " {
            reader.seek(SeekFrom::Current(i64::from(chunk_len)))?;
            remaining -= chunk_len;
            continue;
        }

        if chunk_len < 16 {
            return Err(WaveError::FmtTooShort(chunk_len));
        }
        let mut fmt = [0; 16];
        reader.read_exact(&mut fmt)?;
        if chunk_len > 16 {
            reader.seek(SeekFrom::Current(i64::from(chunk_len - 16)))?;
        }
        remaining -= chunk_len;

        let format_tag = u16::from_le_bytes(fmt[0..2].try_into().unwrap());
        let channels = u16::from_le_bytes(fmt[2..4].try_into().unwrap());
        let sample_rate = u32::from_le_bytes(fmt[4..8].try_into().unwrap());
        let byte_rate = u32::from_le_bytes(fmt[8..12].try_into().unwrap());
        let block_align = u16::from_le_bytes(fmt[12..14].try_into().unwrap());
        let bits_per_sample = u16::from_le_bytes(fmt[14..16].try_into().unwrap());
        if format_tag != 1
            || channels != 2
            || sample_rate != 44_100
            || byte_rate != 176_400
            || block_align != 4
            || bits_per_sample != 16
        {
            return Err(WaveError::UnsupportedPcmFormat);
        }
        break;
    }

    // locate "data"
    loop {
        let (chunk_tag, chunk_len) = next_chunk(reader, &mut remaining, "data")?;
        if chunk_tag != *b"data" {
            reader.seek(SeekFrom::Current(i64::from(chunk_len)))?;
            remaining -= chunk_len;
            continue;
        }

        // consumed RIFF body bytes plus the 8-byte file header
        let offset = u64::from(riff_len - remaining) + 8;
        return Ok((offset, u64::from(chunk_len)));
    }
}

/// Read the next chunk header, keeping the walk inside the declared RIFF
/// extent.
fn next_chunk<R: Read>(
    reader: &mut R,
    remaining: &mut u32,
    looking_for: &'static str,
) -> Result<([u8; 4], u32), WaveError> {
    if *remaining < 8 {
        return Err(WaveError::ChunkNotFound(looking_for));
    }
    let mut header = [0; 8];
    reader.read_exact(&mut header)?;
    *remaining -= 8;

    let chunk_len = u32::from_le_bytes(header[4..8].try_into().unwrap());
    if *remaining < chunk_len {
        return Err(WaveError::ChunkNotFound(looking_for));
    }

    Ok(([header[0], header[1], header[2], header[3]], chunk_len))
}
