//! Frame (FDSC) and audio (ADSC) description atoms.

use super::atoms::{put_atom_header, AtomCursor, AtomType};
use crate::report::{FilmEvent, ReportSink};
use crate::source::ReadAt;
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// NTSC video clock of the host console, in Hz. Audio timing derives from it.
pub const VIDEO_CLOCK_HZ: u64 = 26_590_906;

/// Size of both description atoms.
pub const DESCRIPTION_SIZE: u32 = 20;

/// Video compression named by the frame description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum CompressionType {
    /// `cvid`: Cinepak, compressed RGB.
    Cinepak,
    /// `$CRY`: Cinepak, expanded CRY.
    CinepakCry,
    /// `$RGB`: Cinepak, expanded RGB.
    CinepakRgb,
    Unknown(AtomType),
}

impl CompressionType {
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match &tag {
            b"cvid" => Self::Cinepak,
            b"$CRY" => Self::CinepakCry,
            b"$RGB" => Self::CinepakRgb,
            _ => Self::Unknown(AtomType(tag)),
        }
    }

    pub fn tag(&self) -> [u8; 4] {
        match self {
            Self::Cinepak => *b"cvid",
            Self::CinepakCry => *b"$CRY",
            Self::CinepakRgb => *b"$RGB",
            Self::Unknown(tag) => tag.0,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cinepak => "Cinepak compressed-RGB",
            Self::CinepakCry => "Cinepak expanded-CRY",
            Self::CinepakRgb => "Cinepak expanded-RGB",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Frame description atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FrameDescription {
    pub compression: CompressionType,
    pub width: u32,
    pub height: u32,
}

impl FrameDescription {
    pub(crate) fn read<S: ReadAt + ?Sized>(
        cursor: &mut AtomCursor<'_, S>,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        cursor.expect_tag(AtomType::FDSC)?;
        let size = cursor.read_u32()?;
        if size != DESCRIPTION_SIZE {
            return Err(Error::InvalidAtomSize {
                atom: AtomType::FDSC,
                expected: DESCRIPTION_SIZE,
                found: size,
            });
        }

        let compression = CompressionType::from_tag(cursor.read_tag()?.0);
        if let CompressionType::Unknown(tag) = compression {
            sink.report(FilmEvent::UnknownCompression { tag });
        }
        // Height precedes width on disk.
        let height = cursor.read_u32()?;
        let width = cursor.read_u32()?;

        Ok(Self {
            compression,
            width,
            height,
        })
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        put_atom_header(buf, AtomType::FDSC, DESCRIPTION_SIZE);
        buf.put_slice(&self.compression.tag());
        buf.put_u32(self.height);
        buf.put_u32(self.width);
    }
}

/// Audio sample compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum AudioCompression {
    Uncompressed,
    /// Delta-squared (n^2) compression.
    DeltaSquared,
    Unknown(u8),
}

impl AudioCompression {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Uncompressed,
            1 => Self::DeltaSquared,
            other => Self::Unknown(other),
        }
    }

    fn bits(&self) -> u32 {
        match self {
            Self::Uncompressed => 0,
            Self::DeltaSquared => 1,
            Self::Unknown(bits) => u32::from(*bits & 0x3f),
        }
    }
}

/// Audio description atom.
///
/// Films without an ADSC atom play with [`AudioDescription::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AudioDescription {
    /// 1 (mono) or 2 (stereo).
    pub channels: u8,
    /// 8 or 16.
    pub bit_depth: u8,
    pub compression: AudioCompression,
    pub signed: bool,
    /// Audio serial clock divisor.
    pub sclk: u32,
    /// Fractional rate correction, in units of 2^-32.
    pub drift_rate: u32,
}

impl Default for AudioDescription {
    fn default() -> Self {
        Self {
            channels: 1,
            bit_depth: 8,
            compression: AudioCompression::Uncompressed,
            signed: false,
            sclk: 0x18,
            drift_rate: 0x0481_db08,
        }
    }
}

impl AudioDescription {
    pub(crate) fn read<S: ReadAt + ?Sized>(cursor: &mut AtomCursor<'_, S>) -> Result<Self> {
        cursor.expect_tag(AtomType::ADSC)?;
        let size = cursor.read_u32()?;
        if size != DESCRIPTION_SIZE {
            return Err(Error::InvalidAtomSize {
                atom: AtomType::ADSC,
                expected: DESCRIPTION_SIZE,
                found: size,
            });
        }

        let packed = cursor.read_u32()?;
        let sclk = cursor.read_u32()?;
        let drift_rate = cursor.read_u32()?;

        Ok(Self {
            channels: (packed & 0x1) as u8 + 1,
            bit_depth: if packed & 0x2 != 0 { 16 } else { 8 },
            compression: AudioCompression::from_bits(((packed >> 2) & 0x3f) as u8),
            signed: packed >> 31 != 0,
            sclk,
            drift_rate,
        })
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        put_atom_header(buf, AtomType::ADSC, DESCRIPTION_SIZE);

        let mut packed = u32::from(self.channels.saturating_sub(1) & 0x1);
        if self.bit_depth == 16 {
            packed |= 0x2;
        }
        packed |= self.compression.bits() << 2;
        if self.signed {
            packed |= 1 << 31;
        }

        buf.put_u32(packed);
        buf.put_u32(self.sclk);
        buf.put_u32(self.drift_rate);
    }

    /// True audio sample rate in Hz.
    ///
    /// `nominal = clock / (2 * (sclk + 1) * 32)` corrected by
    /// `nominal * drift / 2^32`, evaluated as one exact fraction and rounded
    /// to `f64` once.
    pub fn sample_rate(&self) -> f64 {
        let num = u128::from(VIDEO_CLOCK_HZ) * ((1u128 << 32) + u128::from(self.drift_rate));
        let den = 64 * (u128::from(self.sclk) + 1) * (1u128 << 32);
        ratio_to_f64(num, den)
    }

    /// Short human-readable format, e.g. `8-bit unsigned mono (uncompressed)`.
    pub fn format_summary(&self) -> String {
        let compression = match self.compression {
            AudioCompression::Uncompressed => "uncompressed".to_string(),
            AudioCompression::DeltaSquared => "n^2 compression".to_string(),
            AudioCompression::Unknown(bits) => format!("unknown compression {bits}"),
        };
        format!(
            "{}-bit {} {} ({})",
            self.bit_depth,
            if self.signed { "signed" } else { "unsigned" },
            if self.channels == 2 { "stereo" } else { "mono" },
            compression
        )
    }
}

/// Correctly rounded conversion of `num / den` to `f64`.
fn ratio_to_f64(num: u128, den: u128) -> f64 {
    if num == 0 || den == 0 {
        return 0.0;
    }

    let num_bits = 128 - num.leading_zeros() as i32;
    let den_bits = 128 - den.leading_zeros() as i32;

    // Pick a scale so the quotient carries 54 bits: 53 for the mantissa
    // plus one rounding bit.
    let mut shift = 54 - (num_bits - den_bits);
    let (mut q, mut r) = scaled_div(num, den, shift);
    while q >= 1 << 54 {
        shift -= 1;
        (q, r) = scaled_div(num, den, shift);
    }
    while q < 1 << 53 {
        shift += 1;
        (q, r) = scaled_div(num, den, shift);
    }

    let round_bit = q & 1;
    let mut mantissa = q >> 1;
    if round_bit == 1 && (r != 0 || mantissa & 1 == 1) {
        mantissa += 1;
    }

    (mantissa as f64) * 2f64.powi(1 - shift)
}

fn scaled_div(num: u128, den: u128, shift: i32) -> (u128, u128) {
    if shift >= 0 {
        let n = num << shift;
        (n / den, n % den)
    } else {
        let d = den << -shift;
        (num / d, num % d)
    }
}
