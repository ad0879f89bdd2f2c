// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Block codec (spec §4.A, §3, §6): four payload modes behind a common
//! block-header envelope.

pub mod cursor;
pub mod directives;
pub mod header;
mod mbe;
mod model;
mod pred;
mod rangecoder;
mod red;
pub mod vds;

use crate::config::BLOCK_HEADER_BYTES;
use crate::error::{Error, Result};
use directives::{ProcessingDirectives, ProcessingParams};
pub use header::{Algorithm, BlockFlags, BlockHeader, ParameterFlags, VariableParams};

/// Pearson correlation between each sample's empirical CDF position and the
/// tabulated normal CDF at its standardized value (spec §4.A: "a correlation
/// of the sample CDF against a tabulated normal CDF must exceed
/// minimum_normality").
fn normality_correlation(samples: &[i32]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 1.0;
    }
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n as f64;
    let variance = samples.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return 1.0;
    }

    let mut sorted: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let empirical: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) / n as f64).collect();
    let expected: Vec<f64> = sorted.iter().map(|&x| crate::globals::normal_cdf((x - mean) / std_dev)).collect();

    pearson_correlation(&empirical, &expected)
}

fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        let (da, db) = (x - mean_a, y - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        1.0
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

/// Below this many samples, RED/PRED/VDS have no room to beat a flat bit
/// pack, so the encoder falls through to MBE regardless of requested mode
/// (spec §4.A: "a sample count below a minimum falls through to MBE").
pub const MBE_FALLBACK_MIN_SAMPLES: usize = 8;

fn encode_payload(
    algorithm: Algorithm,
    samples: &[i32],
    params: &ProcessingParams,
    sampling_frequency: f64,
) -> Result<(Algorithm, Vec<u8>, Vec<u8>)> {
    if samples.len() < MBE_FALLBACK_MIN_SAMPLES {
        let (model_region, payload) = mbe::encode(samples)?;
        return Ok((Algorithm::Mbe, model_region, payload));
    }

    match algorithm {
        Algorithm::Red => {
            let (m, p) = red::encode(samples)?;
            Ok((Algorithm::Red, m, p))
        }
        Algorithm::Pred => {
            let (m, p) = pred::encode(samples)?;
            Ok((Algorithm::Pred, m, p))
        }
        Algorithm::Mbe => {
            let (m, p) = mbe::encode(samples)?;
            Ok((Algorithm::Mbe, m, p))
        }
        Algorithm::Vds => {
            // A threshold of exactly zero is defined as lossless and falls
            // through to PRED (spec §4.A).
            if params.vds_threshold == 0.0 {
                let (m, p) = pred::encode(samples)?;
                Ok((Algorithm::Pred, m, p))
            } else {
                let (m, p) = vds::encode(samples, sampling_frequency, params.vds_threshold, params.vds_lfp_high_fc)?;
                Ok((Algorithm::Vds, m, p))
            }
        }
    }
}

fn decode_payload(algorithm: Algorithm, model_region: &[u8], payload: &[u8], number_of_samples: usize) -> Result<Vec<i32>> {
    match algorithm {
        Algorithm::Red => red::decode(model_region, payload, number_of_samples),
        Algorithm::Pred => pred::decode(model_region, payload, number_of_samples),
        Algorithm::Mbe => mbe::decode(model_region, payload, number_of_samples),
        Algorithm::Vds => vds::decode(model_region, payload, number_of_samples),
    }
}

/// Apply (or invert) the variable-region linear transform: `stored = (raw -
/// intercept) / amplitude_scale / gradient`, decode is the inverse.
fn apply_variable_params(samples: &mut [i32], params: &VariableParams) {
    let gradient = params.gradient.unwrap_or(1.0);
    let intercept = params.intercept.unwrap_or(0);
    let amplitude_scale = params.amplitude_scale.unwrap_or(1.0);
    if gradient == 1.0 && intercept == 0 && amplitude_scale == 1.0 {
        return;
    }
    for s in samples.iter_mut() {
        let scaled = (*s as f32 - intercept as f32) / amplitude_scale.max(f32::EPSILON) / gradient;
        *s = scaled.round() as i32;
    }
}

fn unapply_variable_params(samples: &mut [i32], params: &VariableParams) {
    let gradient = params.gradient.unwrap_or(1.0);
    let intercept = params.intercept.unwrap_or(0);
    let amplitude_scale = params.amplitude_scale.unwrap_or(1.0);
    if gradient == 1.0 && intercept == 0 && amplitude_scale == 1.0 {
        return;
    }
    for s in samples.iter_mut() {
        let raw = (*s as f32) * amplitude_scale * gradient + intercept as f32;
        *s = raw.round() as i32;
    }
}

/// Encode a complete block (header + model region + payload) from `samples`.
pub fn encode(
    samples: &[i32],
    start_time: i64,
    acquisition_channel_number: i32,
    directives: &ProcessingDirectives,
    params: &ProcessingParams,
    sampling_frequency: f64,
) -> Result<Vec<u8>> {
    // A block whose sample distribution fails the normality gate has lossy
    // amplitude scaling disabled outright, regardless of what the caller asked
    // for (spec §4.A: "...or lossy scaling is disabled for that block").
    let lossy_scaling_enabled = if directives.require_normality {
        let correlation = normality_correlation(samples);
        let ok = correlation >= params.minimum_normality;
        if !ok {
            log::debug!(
                "block at channel {acquisition_channel_number} failed the normality gate ({correlation:.4} < {}); disabling lossy amplitude scaling",
                params.minimum_normality
            );
        }
        ok
    } else {
        true
    };

    let resolved_amplitude_scale = if directives.find_amplitude_scale && lossy_scaling_enabled {
        let search = vds::seek_amplitude_scale(
            samples.len(),
            params.goal_ratio,
            params.goal_tolerance,
            params.maximum_goal_attempts,
            params.scale_update,
            |scale| {
                let trial_variable_params =
                    VariableParams { amplitude_scale: Some(scale), frequency_scale: None, gradient: None, intercept: None };
                let mut trial = samples.to_vec();
                unapply_variable_params(&mut trial, &trial_variable_params);
                encode_payload(directives.algorithm, &trial, params, sampling_frequency)
                    .map(|(_, m, p)| m.len() + p.len())
                    .unwrap_or(usize::MAX / 2)
            },
        );
        log::debug!(
            "amplitude-scale goal-seek for channel {acquisition_channel_number} converged to scale {} after {} attempts (ratio {:.3}, goal {})",
            search.amplitude_scale,
            search.attempts,
            search.achieved_ratio,
            params.goal_ratio
        );
        Some(search.amplitude_scale)
    } else if directives.set_amplitude_scale && lossy_scaling_enabled {
        Some(params.amplitude_scale)
    } else {
        None
    };

    let variable_params = VariableParams {
        amplitude_scale: resolved_amplitude_scale,
        frequency_scale: (params.frequency_scale != 1.0).then_some(params.frequency_scale),
        gradient: None,
        intercept: None,
    };

    let mut working = samples.to_vec();
    unapply_variable_params(&mut working, &variable_params);

    let (algorithm, mut model_region, payload) =
        encode_payload(directives.algorithm, &working, params, sampling_frequency)?;

    // The algorithm selector rides as the first byte of the model region,
    // ahead of the mode-specific table — it isn't part of the fixed header.
    model_region.insert(0, algorithm as u8);

    let var_bytes_len = variable_params.encoded_len();
    let total_header_bytes = align_up(BLOCK_HEADER_BYTES as usize + var_bytes_len, 8) as u16;

    let total_block_bytes = total_header_bytes as usize + model_region.len() + payload.len();

    let header = BlockHeader {
        total_block_bytes: total_block_bytes as u32,
        total_header_bytes,
        model_region_bytes: model_region.len() as u16,
        number_of_samples: samples.len() as u32,
        start_time,
        acquisition_channel_number,
        parameter_flags: variable_params.flags(),
        block_flags: if directives.reset_discontinuity { BlockFlags::discontinuity() } else { BlockFlags::empty() },
        protected_region_bytes: 0,
        discretionary_region_bytes: 0,
    };

    let mut buf = vec![0u8; total_block_bytes];
    {
        let mut cursor = cursor::WriteCursor::new(&mut buf[BLOCK_HEADER_BYTES as usize..total_header_bytes as usize]);
        variable_params.write_into(&mut cursor).map_err(Error::from)?;
    }
    buf[total_header_bytes as usize..total_header_bytes as usize + model_region.len()].copy_from_slice(&model_region);
    buf[total_header_bytes as usize + model_region.len()..].copy_from_slice(&payload);

    let rest = buf[BLOCK_HEADER_BYTES as usize..].to_vec();
    header.encode(&mut buf[..BLOCK_HEADER_BYTES as usize], &rest)?;

    Ok(buf)
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}

/// Decode a complete block into its header and recovered samples.
pub fn decode(buf: &[u8], block_offset: u64) -> Result<(BlockHeader, Vec<i32>)> {
    if buf.len() < BLOCK_HEADER_BYTES as usize {
        return Err(Error::BlockTooShort { offset: block_offset, claimed: BLOCK_HEADER_BYTES as u32, have: buf.len() });
    }
    let rest = &buf[BLOCK_HEADER_BYTES as usize..];
    let header = BlockHeader::decode(&buf[..BLOCK_HEADER_BYTES as usize], rest, block_offset)?;

    let var_region_len = header.total_header_bytes as usize - BLOCK_HEADER_BYTES as usize;
    let mut var_cursor =
        cursor::ReadCursor::new(&buf[BLOCK_HEADER_BYTES as usize..BLOCK_HEADER_BYTES as usize + var_region_len]);
    let variable_params = VariableParams::read_from(header.parameter_flags, &mut var_cursor).map_err(Error::from)?;

    let model_start = header.total_header_bytes as usize;
    let model_end = model_start + header.model_region_bytes as usize;
    if buf.len() < model_end {
        return Err(Error::BlockTooShort { offset: block_offset, claimed: header.total_block_bytes, have: buf.len() });
    }
    let algorithm_byte = buf[model_start];
    let algorithm = Algorithm::from_bits(algorithm_byte)
        .ok_or(Error::UnknownAlgorithm { offset: block_offset, bits: algorithm_byte })?;
    let model_region = &buf[model_start + 1..model_end];
    let payload = &buf[model_end..header.total_block_bytes as usize];

    let mut samples = decode_payload(algorithm, model_region, payload, header.number_of_samples as usize)?;
    apply_variable_params(&mut samples, &variable_params);

    Ok((header, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(algo: Algorithm) -> ProcessingDirectives {
        ProcessingDirectives::lossless(algo)
    }

    #[test]
    fn roundtrip_red_block() {
        let samples: Vec<i32> = (0..500).map(|i| ((i as f64 * 0.1).sin() * 100.0) as i32).collect();
        let block = encode(&samples, 1_700_000_000_000_000, 3, &directives(Algorithm::Red), &ProcessingParams::default(), 1000.0).unwrap();
        let (header, decoded) = decode(&block, 0).unwrap();
        assert_eq!(decoded, samples);
        assert_eq!(header.number_of_samples as usize, samples.len());
    }

    #[test]
    fn roundtrip_pred_block() {
        let samples: Vec<i32> = (0..500).map(|i| ((i as f64 * 0.2).cos() * 50.0) as i32).collect();
        let block = encode(&samples, 0, 1, &directives(Algorithm::Pred), &ProcessingParams::default(), 1000.0).unwrap();
        let (_, decoded) = decode(&block, 0).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn roundtrip_mbe_block() {
        let samples = vec![1, 2, 3, 4, 5];
        let block = encode(&samples, 0, 1, &directives(Algorithm::Mbe), &ProcessingParams::default(), 1000.0).unwrap();
        let (_, decoded) = decode(&block, 0).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn tiny_block_falls_through_to_mbe_regardless_of_algorithm() {
        let samples = vec![10, 20, 30];
        let block = encode(&samples, 0, 1, &directives(Algorithm::Red), &ProcessingParams::default(), 1000.0).unwrap();
        let (header, decoded) = decode(&block, 0).unwrap();
        assert_eq!(decoded, samples);
        let model_start = header.total_header_bytes as usize;
        assert_eq!(block[model_start], Algorithm::Mbe as u8);
    }

    #[test]
    fn vds_threshold_zero_falls_through_to_pred() {
        let samples: Vec<i32> = (0..200).map(|i| i * 2).collect();
        let mut params = ProcessingParams::default();
        params.vds_threshold = 0.0;
        let block = encode(&samples, 0, 1, &directives(Algorithm::Vds), &params, 1000.0).unwrap();
        let (header, decoded) = decode(&block, 0).unwrap();
        assert_eq!(decoded, samples);
        let model_start = header.total_header_bytes as usize;
        assert_eq!(block[model_start], Algorithm::Pred as u8);
    }

    #[test]
    fn find_amplitude_scale_sets_the_header_flag_and_stays_close_to_original() {
        let samples: Vec<i32> = (0..300).map(|i| ((i as f64 * 0.05).sin() * 4000.0) as i32).collect();
        let mut directives = ProcessingDirectives::lossless(Algorithm::Red);
        directives.find_amplitude_scale = true;
        let mut params = ProcessingParams::default();
        params.goal_ratio = 4.0;
        params.maximum_goal_attempts = 10;

        let block = encode(&samples, 0, 0, &directives, &params, 1000.0).unwrap();
        let (header, decoded) = decode(&block, 0).unwrap();
        assert!(header.parameter_flags.contains(ParameterFlags::AMPLITUDE_SCALE));
        let max_err = samples.iter().zip(&decoded).map(|(a, b)| (a - b).abs()).max().unwrap();
        assert!(max_err < 500, "goal-seek scaling drifted too far from the original: {max_err}");
    }

    #[test]
    fn require_normality_disables_scaling_for_a_skewed_distribution() {
        // A distribution concentrated at one extreme correlates poorly with
        // a normal CDF, so the normality gate should refuse lossy scaling
        // and the block round-trips losslessly instead.
        let mut samples = vec![0i32; 200];
        samples[0] = 10_000;
        let mut directives = ProcessingDirectives::lossless(Algorithm::Red);
        directives.find_amplitude_scale = true;
        directives.require_normality = true;
        let mut params = ProcessingParams::default();
        params.minimum_normality = 0.999;

        let block = encode(&samples, 0, 0, &directives, &params, 1000.0).unwrap();
        let (header, decoded) = decode(&block, 0).unwrap();
        assert!(!header.parameter_flags.contains(ParameterFlags::AMPLITUDE_SCALE));
        assert_eq!(decoded, samples);
    }

    #[test]
    fn corrupted_block_reports_offset() {
        let samples = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut block = encode(&samples, 0, 1, &directives(Algorithm::Red), &ProcessingParams::default(), 1000.0).unwrap();
        let last = block.len() - 1;
        block[last] ^= 0xFF;
        let err = decode(&block, 42).unwrap_err();
        assert!(matches!(err, Error::CrcMismatch { offset: 42 }));
    }
}
