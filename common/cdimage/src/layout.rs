//! Catalog of physical sector encodings: how one sector is laid out on the
//! backing resource and how its 2048 payload bytes are recovered.
//!
//! Every encoding is a combination of a content mode and a subchannel
//! presence. The mode fixes the base stride and the fetch strategy; the
//! subchannel adds 96 trailing bytes that a logical fetch never reads.

/// 12-byte sync pattern opening every raw data frame.
pub const SYNC_PATTERN: [u8; 12] =
    [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Sync pattern plus the 3-byte address / 1-byte mode header.
pub const SYNC_HEADER_LEN: u64 = 16;

/// XA subheader: two 4-byte copies preceding Mode 2 payload.
pub const XA_SUBHEADER_LEN: u64 = 8;

/// R-W subchannel bytes trailing each sector in subchannel-bearing dumps.
pub const SUBCHANNEL_LEN: u64 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorMode {
    /// 2352 bytes of raw PCM samples.
    Audio,
    /// Raw PCM with swapped byte order. The distinction never matters for
    /// 2048-byte fetches, which do not swap.
    AudioSwapped,
    /// 2048 bytes of bare data. Cooked XA Form 1 data is indistinguishable
    /// at this stride and is covered by the same mode.
    Mode1,
    /// Full 2352-byte frame: sync, header, 2048 data, EDC/ECC.
    Mode1Raw,
    /// 2336 bytes of data following the header.
    Mode2,
    /// 2048 bytes of XA Form 1 data, header and subheader stripped.
    Mode2Form1,
    /// 2324 bytes of XA Form 2 data.
    Mode2Form2,
    /// 2336 bytes: XA subheader plus Form 1/2 payload, mixed per sector.
    Mode2FormMix,
    /// Full 2352-byte Mode 2 frame.
    Mode2Raw,
    /// Full 2352-byte frame known to carry XA Form 1 sectors (both
    /// subheader copies agreed during detection).
    Mode2XaRaw,
    /// 8-byte XA subheader prefixed to bare 2048-byte data, as written by
    /// `mkisofs -sectype xa1`.
    Mode2Xa1,
}

impl SectorMode {
    /// Bytes per sector on the backing resource, before any subchannel data.
    #[must_use]
    pub const fn base_stride(self) -> u64 {
        match self {
            Self::Audio | Self::AudioSwapped | Self::Mode1Raw | Self::Mode2Raw | Self::Mode2XaRaw => 2352,
            Self::Mode1 | Self::Mode2Form1 => 2048,
            Self::Mode2 | Self::Mode2FormMix => 2336,
            Self::Mode2Form2 => 2324,
            Self::Mode2Xa1 => 2056,
        }
    }

    #[must_use]
    pub const fn strategy(self) -> FetchStrategy {
        match self {
            Self::Mode1 | Self::Mode2Form1 => FetchStrategy::Cooked,
            Self::Mode2Xa1 => FetchStrategy::SubheaderPrefixed,
            Self::Audio | Self::AudioSwapped | Self::Mode1Raw | Self::Mode2Raw | Self::Mode2XaRaw => {
                FetchStrategy::Raw
            }
            Self::Mode2 | Self::Mode2FormMix => FetchStrategy::Unsupported { payload: 2336 },
            Self::Mode2Form2 => FetchStrategy::Unsupported { payload: 2324 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subchannel {
    #[default]
    None,
    /// Cooked R-W subchannel data.
    Rw,
    /// Raw (uncooked) R-W subchannel data.
    RwRaw,
}

impl Subchannel {
    #[must_use]
    pub const fn overhead(self) -> u64 {
        match self {
            Self::None => 0,
            Self::Rw | Self::RwRaw => SUBCHANNEL_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLayout {
    pub mode: SectorMode,
    pub subchannel: Subchannel,
}

impl SectorLayout {
    #[must_use]
    pub const fn new(mode: SectorMode, subchannel: Subchannel) -> Self {
        Self { mode, subchannel }
    }

    /// Physical byte interval between consecutive sectors.
    #[must_use]
    pub const fn stride(self) -> u64 {
        self.mode.base_stride() + self.subchannel.overhead()
    }
}

/// How `fetch_2048` recovers payload from one physical sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Payload is stored bare at the sector's start.
    Cooked,
    /// An 8-byte XA subheader precedes bare payload.
    SubheaderPrefixed,
    /// Sync and header come first; the header's mode byte decides the rest.
    Raw,
    /// The native payload is not 2048 bytes; a logical fetch cannot be
    /// satisfied from this encoding.
    Unsupported { payload: u16 },
}
