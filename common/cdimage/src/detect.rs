//! Image-format sniffing: probe the canonical first volume-descriptor
//! sector under each candidate stride until a layout fingerprint matches.

use crate::layout::{SYNC_PATTERN, SectorLayout, SectorMode, Subchannel};
use std::io::{self, Read, Seek, SeekFrom};

/// Sector index of the first volume descriptor on every CD filesystem.
const DESCRIPTOR_SECTOR: u64 = 16;

/// Probe an opened image and identify its physical sector layout.
///
/// Candidates are tried in fixed priority order: bare 2048-byte data,
/// 2056-byte XA-subheader data, 2352-byte raw frames, then raw frames with
/// trailing subchannel data. The first whose fingerprint matches wins.
/// Returns `Ok(None)` when nothing matches. The sector count is
/// `total_size / stride`; a trailing partial sector is silently dropped.
///
/// # Errors
///
/// Propagates any seek/read failure on the resource. A failed probe read is
/// fatal; it is never treated as "candidate does not match". Only a probe
/// region lying entirely past the end of the file skips a candidate.
pub fn detect_layout<R: Read + Seek>(
    resource: &mut R,
    total_size: u64,
) -> io::Result<Option<(SectorLayout, u32)>> {
    // 2048: bare payload, fingerprint right at the descriptor start
    let mut buf = [0; 6];
    if probe(resource, total_size, 2048 * DESCRIPTOR_SECTOR, &mut buf)? && has_fingerprint(&buf) {
        log::debug!("detected 2048-byte cooked sectors (bare data)");
        return Ok(Some(finish(SectorMode::Mode1, Subchannel::None, total_size)));
    }

    // 2056: 8-byte XA subheader ahead of each payload
    let mut buf = [0; 14];
    if probe(resource, total_size, 2056 * DESCRIPTOR_SECTOR, &mut buf)?
        && xa_form1_subheader(&buf[..8])
        && has_fingerprint(&buf[8..14])
    {
        log::debug!("detected 2056-byte sectors (XA subheader + data)");
        return Ok(Some(finish(SectorMode::Mode2Xa1, Subchannel::None, total_size)));
    }

    // 2352 raw frames, then the same with 96 subchannel bytes per sector
    for (stride, subchannel) in [(2352, Subchannel::None), (2448, Subchannel::RwRaw)] {
        let mut buf = [0; 30];
        if !probe(resource, total_size, stride * DESCRIPTOR_SECTOR, &mut buf)? {
            continue;
        }
        let Some(mode) = classify_raw(&buf) else {
            continue;
        };
        log::debug!("detected {stride}-byte raw sectors ({mode:?})");
        return Ok(Some(finish(mode, subchannel, total_size)));
    }

    Ok(None)
}

fn finish(mode: SectorMode, subchannel: Subchannel, total_size: u64) -> (SectorLayout, u32) {
    let layout = SectorLayout::new(mode, subchannel);
    (layout, (total_size / layout.stride()) as u32)
}

fn classify_raw(buf: &[u8; 30]) -> Option<SectorMode> {
    if buf[..12] != SYNC_PATTERN {
        return None;
    }

    match buf[15] {
        0x01 if has_fingerprint(&buf[16..22]) => Some(SectorMode::Mode1Raw),
        0x02 if has_fingerprint(&buf[16..22]) => Some(SectorMode::Mode2Raw),
        0x02 if xa_form1_subheader(&buf[16..24]) && has_fingerprint(&buf[24..30]) => {
            Some(SectorMode::Mode2XaRaw)
        }
        _ => None,
    }
}

/// The volume-descriptor identifier bytes follow the descriptor type byte.
fn has_fingerprint(region: &[u8]) -> bool {
    region[1..6] == *b"CD001" || region[1..6] == *b"BEA01"
}

/// Form bit clear in both subheader copies marks XA Form 1 data.
fn xa_form1_subheader(subheader: &[u8]) -> bool {
    subheader[2] & 0x20 == 0 && subheader[6] & 0x20 == 0
}

fn probe<R: Read + Seek>(
    resource: &mut R,
    total_size: u64,
    offset: u64,
    buf: &mut [u8],
) -> io::Result<bool> {
    // a probe region past EOF just means this candidate cannot match
    if offset + buf.len() as u64 > total_size {
        return Ok(false);
    }
    resource.seek(SeekFrom::Start(offset))?;
    resource.read_exact(buf)?;
    Ok(true)
}
