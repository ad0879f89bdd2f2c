// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Block header (spec §3, §6): fixed layout, little-endian, CRC-protected.
//!
//! Wire layout (48 bytes):
//!
//! ```text
//! offset  size  field
//! 0       8     start_uid
//! 8       4     crc32
//! 12      4     total_block_bytes
//! 16      2     total_header_bytes
//! 18      2     model_region_bytes
//! 20      4     number_of_samples
//! 24      8     start_time (us, UTC)
//! 32      4     acquisition_channel_number
//! 36      4     parameter_flags
//! 40      4     block_flags
//! 44      2     protected_region_bytes
//! 46      2     discretionary_region_bytes
//! ```
//!
//! `encryption_level` is carried in the low two bits of `block_flags`
//! (`BlockFlags::ENCRYPTION_MASK`) rather than as a separate header word;
//! every other block-flag bit is a single boolean.

use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::config::{BLOCK_HEADER_BYTES, BLOCK_START_UID, HEADER_ALIGNMENT};
use crate::error::{CodecError, Error, Result};

/// Per-block flags (spec §3: "a set discontinuity bit implies this block
/// starts a new contiguon"). A plain bitmask newtype, not a derive-macro
/// flag set — this crate has exactly two flag words and hand-rolling them
/// keeps the on-disk bit layout explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags(u32);

impl BlockFlags {
    pub const DISCONTINUITY: u32 = 1 << 0;
    pub const ENCRYPTION_LEVEL_BIT0: u32 = 1 << 1;
    pub const ENCRYPTION_LEVEL_BIT1: u32 = 1 << 2;
    pub const ENCRYPTION_MASK: u32 = Self::ENCRYPTION_LEVEL_BIT0 | Self::ENCRYPTION_LEVEL_BIT1;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn discontinuity() -> Self {
        Self(Self::DISCONTINUITY)
    }

    pub fn is_discontinuity(self) -> bool {
        self.contains(Self::DISCONTINUITY)
    }

    /// Encryption level 0 (none) through 3, packed in the low two flag bits.
    pub fn encryption_level(self) -> u8 {
        ((self.0 & Self::ENCRYPTION_MASK) >> 1) as u8
    }

    pub fn with_encryption_level(self, level: u8) -> Self {
        let bits = (self.0 & !Self::ENCRYPTION_MASK) | (((level as u32) << 1) & Self::ENCRYPTION_MASK);
        Self(bits)
    }
}

impl std::ops::BitOr for BlockFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Bitmap selecting which variable-region parameters are present, in their
/// canonical fixed order: amplitude_scale, frequency_scale, gradient,
/// intercept (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterFlags(u32);

impl ParameterFlags {
    pub const AMPLITUDE_SCALE: u32 = 1 << 0;
    pub const FREQUENCY_SCALE: u32 = 1 << 1;
    pub const GRADIENT: u32 = 1 << 2;
    pub const INTERCEPT: u32 = 1 << 3;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }
}

impl std::ops::BitOr for ParameterFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ParameterFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The four codec modes, encoded in `acquisition_channel_number`'s sibling
/// field — the algorithm is not part of the fixed header in the spec's
/// external layout, so it is carried as the first byte of the model region
/// (see [`crate::codec::Algorithm`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Algorithm {
    Red = 0,
    Pred = 1,
    Mbe = 2,
    Vds = 3,
}

impl Algorithm {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Algorithm::Red),
            1 => Some(Algorithm::Pred),
            2 => Some(Algorithm::Mbe),
            3 => Some(Algorithm::Vds),
            _ => None,
        }
    }
}

/// Optional variable-region parameters, present according to
/// [`ParameterFlags`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VariableParams {
    pub amplitude_scale: Option<f32>,
    pub frequency_scale: Option<f32>,
    pub gradient: Option<f32>,
    pub intercept: Option<i32>,
}

impl VariableParams {
    pub fn flags(&self) -> ParameterFlags {
        let mut bits = 0u32;
        if self.amplitude_scale.is_some() {
            bits |= ParameterFlags::AMPLITUDE_SCALE;
        }
        if self.frequency_scale.is_some() {
            bits |= ParameterFlags::FREQUENCY_SCALE;
        }
        if self.gradient.is_some() {
            bits |= ParameterFlags::GRADIENT;
        }
        if self.intercept.is_some() {
            bits |= ParameterFlags::INTERCEPT;
        }
        ParameterFlags::from_bits_truncate(bits)
    }

    pub fn encoded_len(&self) -> usize {
        let mut len = 0;
        if self.amplitude_scale.is_some() {
            len += 4;
        }
        if self.frequency_scale.is_some() {
            len += 4;
        }
        if self.gradient.is_some() {
            len += 4;
        }
        if self.intercept.is_some() {
            len += 4;
        }
        len
    }

    pub fn write_into(&self, w: &mut WriteCursor<'_>) -> std::result::Result<(), CodecError> {
        if let Some(v) = self.amplitude_scale {
            w.write_f32_le(v)?;
        }
        if let Some(v) = self.frequency_scale {
            w.write_f32_le(v)?;
        }
        if let Some(v) = self.gradient {
            w.write_f32_le(v)?;
        }
        if let Some(v) = self.intercept {
            w.write_i32_le(v)?;
        }
        Ok(())
    }

    pub fn read_from(flags: ParameterFlags, r: &mut ReadCursor<'_>) -> std::result::Result<Self, CodecError> {
        let mut params = VariableParams::default();
        if flags.contains(ParameterFlags::AMPLITUDE_SCALE) {
            params.amplitude_scale = Some(r.read_f32_le()?);
        }
        if flags.contains(ParameterFlags::FREQUENCY_SCALE) {
            params.frequency_scale = Some(r.read_f32_le()?);
        }
        if flags.contains(ParameterFlags::GRADIENT) {
            params.gradient = Some(r.read_f32_le()?);
        }
        if flags.contains(ParameterFlags::INTERCEPT) {
            params.intercept = Some(r.read_i32_le()?);
        }
        Ok(params)
    }
}

/// Fixed block header, spec §3/§6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockHeader {
    pub total_block_bytes: u32,
    pub total_header_bytes: u16,
    pub model_region_bytes: u16,
    pub number_of_samples: u32,
    pub start_time: i64,
    pub acquisition_channel_number: i32,
    pub parameter_flags: ParameterFlags,
    pub block_flags: BlockFlags,
    pub protected_region_bytes: u16,
    pub discretionary_region_bytes: u16,
}

impl BlockHeader {
    /// Encode the fixed header into `buf[..48]`, computing CRC over
    /// everything from byte 12 onward through the end of the full block
    /// (`rest_of_block`, i.e. header bytes 12.. plus model region and
    /// payload) — the CRC itself and the start UID are excluded.
    pub fn encode(&self, buf: &mut [u8], rest_of_block: &[u8]) -> Result<()> {
        if buf.len() < BLOCK_HEADER_BYTES as usize {
            return Err(CodecError::WriteFailed {
                offset: 0,
                reason: "header buffer shorter than BLOCK_HEADER_BYTES".into(),
            }
            .into());
        }
        if self.total_header_bytes % HEADER_ALIGNMENT != 0 {
            return Err(Error::InvalidDimensions(format!(
                "header_bytes {} is not {}-byte aligned",
                self.total_header_bytes, HEADER_ALIGNMENT
            )));
        }

        let mut w = WriteCursor::new(buf);
        w.write_u64_le(BLOCK_START_UID).map_err(Error::from)?;
        w.write_u32_le(0).map_err(Error::from)?; // CRC placeholder, patched below
        w.write_u32_le(self.total_block_bytes).map_err(Error::from)?;
        w.write_u16_le(self.total_header_bytes).map_err(Error::from)?;
        w.write_u16_le(self.model_region_bytes).map_err(Error::from)?;
        w.write_u32_le(self.number_of_samples).map_err(Error::from)?;
        w.write_i64_le(self.start_time).map_err(Error::from)?;
        w.write_i32_le(self.acquisition_channel_number).map_err(Error::from)?;
        w.write_u32_le(self.parameter_flags.bits()).map_err(Error::from)?;
        w.write_u32_le(self.block_flags.bits()).map_err(Error::from)?;
        w.write_u16_le(self.protected_region_bytes).map_err(Error::from)?;
        w.write_u16_le(self.discretionary_region_bytes).map_err(Error::from)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[12..BLOCK_HEADER_BYTES as usize]);
        hasher.update(rest_of_block);
        let crc = hasher.finalize();
        buf[8..12].copy_from_slice(&crc.to_le_bytes());
        Ok(())
    }

    /// Decode and CRC-validate the fixed header. `block_offset` is used only
    /// to annotate errors. `rest_of_block` must be everything after the
    /// 48-byte header through the end of the block (model region + payload).
    pub fn decode(buf: &[u8], rest_of_block: &[u8], block_offset: u64) -> Result<Self> {
        if buf.len() < BLOCK_HEADER_BYTES as usize {
            return Err(Error::BlockTooShort {
                offset: block_offset,
                claimed: BLOCK_HEADER_BYTES as u32,
                have: buf.len(),
            });
        }

        let mut r = ReadCursor::new(buf);
        let start_uid = r.read_u64_le().map_err(Error::from)?;
        if start_uid != BLOCK_START_UID {
            return Err(Error::CrcMismatch { offset: block_offset });
        }
        let crc_field = r.read_u32_le().map_err(Error::from)?;
        let total_block_bytes = r.read_u32_le().map_err(Error::from)?;
        let total_header_bytes = r.read_u16_le().map_err(Error::from)?;
        let model_region_bytes = r.read_u16_le().map_err(Error::from)?;
        let number_of_samples = r.read_u32_le().map_err(Error::from)?;
        let start_time = r.read_i64_le().map_err(Error::from)?;
        let acquisition_channel_number = r.read_i32_le().map_err(Error::from)?;
        let parameter_flags = ParameterFlags::from_bits_truncate(r.read_u32_le().map_err(Error::from)?);
        let block_flags = BlockFlags::from_bits_truncate(r.read_u32_le().map_err(Error::from)?);
        let protected_region_bytes = r.read_u16_le().map_err(Error::from)?;
        let discretionary_region_bytes = r.read_u16_le().map_err(Error::from)?;

        if total_header_bytes % HEADER_ALIGNMENT != 0 {
            return Err(Error::InvalidDimensions(format!(
                "header_bytes {total_header_bytes} is not {HEADER_ALIGNMENT}-byte aligned"
            )));
        }

        let claimed_total = total_block_bytes as usize;
        let have_total = BLOCK_HEADER_BYTES as usize + rest_of_block.len();
        if claimed_total > have_total {
            return Err(Error::BlockTooShort {
                offset: block_offset,
                claimed: total_block_bytes,
                have: have_total,
            });
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[12..BLOCK_HEADER_BYTES as usize]);
        hasher.update(rest_of_block);
        let computed = hasher.finalize();
        if computed != crc_field {
            log::warn!("block CRC mismatch at offset {block_offset}: header says {crc_field:#x}, computed {computed:#x}");
            return Err(Error::CrcMismatch { offset: block_offset });
        }

        Ok(Self {
            total_block_bytes,
            total_header_bytes,
            model_region_bytes,
            number_of_samples,
            start_time,
            acquisition_channel_number,
            parameter_flags,
            block_flags,
            protected_region_bytes,
            discretionary_region_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(header_bytes: u16) -> BlockHeader {
        BlockHeader {
            total_block_bytes: 0, // patched by caller in real usage
            total_header_bytes: header_bytes,
            model_region_bytes: 4,
            number_of_samples: 4096,
            start_time: 1_700_000_000_000_000,
            acquisition_channel_number: 7,
            parameter_flags: ParameterFlags::from_bits_truncate(ParameterFlags::AMPLITUDE_SCALE),
            block_flags: BlockFlags::discontinuity().with_encryption_level(2),
            protected_region_bytes: 0,
            discretionary_region_bytes: 0,
        }
    }

    #[test]
    fn header_roundtrip() {
        let rest = vec![0xAAu8; 10];
        let mut header = sample_header(BLOCK_HEADER_BYTES);
        header.total_block_bytes = BLOCK_HEADER_BYTES as u32 + rest.len() as u32;

        let mut buf = vec![0u8; BLOCK_HEADER_BYTES as usize];
        header.encode(&mut buf, &rest).unwrap();

        let decoded = BlockHeader::decode(&buf, &rest, 0).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.block_flags.is_discontinuity());
        assert_eq!(decoded.block_flags.encryption_level(), 2);
    }

    #[test]
    fn crc_mismatch_detected() {
        let rest = vec![1u8, 2, 3];
        let mut header = sample_header(BLOCK_HEADER_BYTES);
        header.total_block_bytes = BLOCK_HEADER_BYTES as u32 + rest.len() as u32;
        let mut buf = vec![0u8; BLOCK_HEADER_BYTES as usize];
        header.encode(&mut buf, &rest).unwrap();

        let mut corrupt_rest = rest.clone();
        corrupt_rest[0] ^= 0xFF;
        let err = BlockHeader::decode(&buf, &corrupt_rest, 123).unwrap_err();
        assert!(matches!(err, Error::CrcMismatch { offset: 123 }));
    }

    #[test]
    fn unaligned_header_bytes_rejected() {
        let mut header = sample_header(47);
        header.total_block_bytes = BLOCK_HEADER_BYTES as u32;
        let mut buf = vec![0u8; BLOCK_HEADER_BYTES as usize];
        let err = header.encode(&mut buf, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
    }

    #[test]
    fn too_short_block_detected() {
        let rest = vec![0u8; 3];
        let mut header = sample_header(BLOCK_HEADER_BYTES);
        header.total_block_bytes = 10_000; // lies about size
        let mut buf = vec![0u8; BLOCK_HEADER_BYTES as usize];
        // Bypass encode()'s own validation path by writing header fields directly
        // through decode's expectations: encode still stamps a correct CRC for
        // the (small) rest-of-block it's given, so decode's size check fires
        // before CRC is even consulted.
        header.encode(&mut buf, &rest).unwrap();
        let err = BlockHeader::decode(&buf, &rest, 55).unwrap_err();
        assert!(matches!(err, Error::BlockTooShort { offset: 55, .. }));
    }

    #[test]
    fn variable_params_roundtrip() {
        let params = VariableParams {
            amplitude_scale: Some(1.5),
            frequency_scale: None,
            gradient: Some(-0.25),
            intercept: Some(7),
        };
        let mut buf = vec![0u8; params.encoded_len()];
        {
            let mut w = WriteCursor::new(&mut buf);
            params.write_into(&mut w).unwrap();
        }
        let mut r = ReadCursor::new(&buf);
        let decoded = VariableParams::read_from(params.flags(), &mut r).unwrap();
        assert_eq!(decoded, params);
    }
}
