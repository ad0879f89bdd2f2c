// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MBE: minimal bit encoding (spec §4.A).
//!
//! Extrema are scanned to find the tightest bit width that can hold every
//! sample as a signed offset from the minimum, then samples are packed at
//! that width with no entropy coding. Used when entropy coding has no room
//! to improve — tiny blocks or saturated dynamic range.

use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, Error, Result};

fn bits_needed(range: u64) -> u32 {
    if range == 0 {
        0
    } else {
        64 - range.leading_zeros()
    }
}

/// Encode `samples` into `(model_region_bytes, payload_bytes)`. The model
/// region carries `{min:i32, bit_width:u8}`; the payload is the bit-packed
/// `sample - min` values, LSB-first within each byte.
pub fn encode(samples: &[i32]) -> Result<(Vec<u8>, Vec<u8>)> {
    if samples.is_empty() {
        return Ok((vec![0u8; 5], Vec::new()));
    }
    let min = *samples.iter().min().unwrap();
    let max = *samples.iter().max().unwrap();
    let range = (max as i64 - min as i64) as u64;
    let bit_width = bits_needed(range).max(1).min(32);

    let mut model_region = vec![0u8; 5];
    {
        let mut w = WriteCursor::new(&mut model_region);
        w.write_i32_le(min).map_err(Error::from)?;
        w.write_u8(bit_width as u8).map_err(Error::from)?;
    }

    let total_bits = bit_width as usize * samples.len();
    let mut payload = vec![0u8; total_bits.div_ceil(8)];
    let mut bit_pos = 0usize;
    for &s in samples {
        let offset = (s as i64 - min as i64) as u64;
        for b in 0..bit_width {
            if (offset >> b) & 1 == 1 {
                let idx = bit_pos + b as usize;
                payload[idx / 8] |= 1 << (idx % 8);
            }
        }
        bit_pos += bit_width as usize;
    }
    Ok((model_region, payload))
}

pub fn decode(model_region: &[u8], payload: &[u8], number_of_samples: usize) -> Result<Vec<i32>> {
    if number_of_samples == 0 {
        return Ok(Vec::new());
    }
    let mut r = ReadCursor::new(model_region);
    let min = r.read_i32_le().map_err(Error::from)?;
    let bit_width = r.read_u8().map_err(Error::from)? as usize;
    if bit_width == 0 {
        return Ok(vec![min; number_of_samples]);
    }

    let total_bits = bit_width * number_of_samples;
    if payload.len() * 8 < total_bits {
        return Err(CodecError::ReadFailed {
            offset: payload.len(),
            reason: "MBE payload shorter than bit-packed sample count requires".into(),
        }
        .into());
    }

    let mut samples = Vec::with_capacity(number_of_samples);
    let mut bit_pos = 0usize;
    for _ in 0..number_of_samples {
        let mut offset = 0u64;
        for b in 0..bit_width {
            let idx = bit_pos + b;
            if (payload[idx / 8] >> (idx % 8)) & 1 == 1 {
                offset |= 1 << b;
            }
        }
        samples.push((min as i64 + offset as i64) as i32);
        bit_pos += bit_width;
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_range() {
        let samples = vec![10, 12, 11, 15, 10, 9, 14];
        let (model_region, payload) = encode(&samples).unwrap();
        let decoded = decode(&model_region, &payload, samples.len()).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn roundtrip_constant_uses_zero_bit_width() {
        let samples = vec![42; 100];
        let (model_region, payload) = encode(&samples).unwrap();
        assert!(payload.is_empty());
        let decoded = decode(&model_region, &payload, samples.len()).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn roundtrip_full_range() {
        let samples = vec![i32::MIN, 0, i32::MAX, -12345, 987654];
        let (model_region, payload) = encode(&samples).unwrap();
        let decoded = decode(&model_region, &payload, samples.len()).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let samples = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let (model_region, payload) = encode(&samples).unwrap();
        let err = decode(&model_region, &payload[..payload.len() - 1], samples.len()).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
