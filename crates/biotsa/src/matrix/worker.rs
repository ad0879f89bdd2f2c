// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-channel worker pipeline (spec §4.E "Worker pipeline").
//!
//! Each active channel runs through this pipeline on its own thread; see
//! [`crate::matrix::assembler`] for thread spawn/join and placement into the
//! output matrix. Placement itself happens back on the joining thread
//! rather than via concurrent writes into shared cells — the ordering
//! guarantee the spec describes ("writes to disjoint cells commute") holds
//! either way, and this avoids unsafe aliasing of a shared buffer across
//! threads for no measurable benefit at this channel count.

use crate::error::Result;
use crate::filter::{self, FilterCoeffs};
use crate::matrix::resample::{self, ResampleMode};
use crate::session::{Channel, Contiguon};

/// Per-channel configuration resolved by the assembler before dispatch.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub segment_range: (usize, usize),
    pub window_start_sample: i64,
    pub window_end_sample: i64,
    pub output_len: usize,
    pub filter_coeffs: Option<FilterCoeffs>,
    pub resample_mode: ResampleMode,
    pub range_trace: bool,
    pub detrend: bool,
    pub contiguons: Vec<Contiguon>,
}

/// What one worker hands back to the assembler.
#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub samples: Vec<f64>,
    pub range_min: Option<Vec<f64>>,
    pub range_max: Option<Vec<f64>>,
}

/// Run the full per-channel pipeline: decode → filter → resample → range
/// trace → detrend → done. Casting to the output element type and writing
/// into the matrix happens after discontinuity rendering, in the assembler.
pub fn run(channel: &Channel, config: &WorkerConfig) -> Result<ChannelResult> {
    // Steps 1-2: decompress every intersecting segment's blocks into one
    // contiguous f64 buffer.
    let (start_idx, end_idx) = config.segment_range;
    let mut raw = Vec::new();
    for segment in &channel.segments[start_idx..=end_idx] {
        let decoded = segment.decode_all()?;
        raw.extend(decoded.into_iter().map(|s| s as f64));
    }

    // Step 3: zero-phase filter in place, if requested.
    if let Some(coeffs) = &config.filter_coeffs {
        let pad_len = filter::required_pad_len(coeffs);
        if raw.len() > pad_len {
            let mut filtered = vec![0.0; raw.len()];
            filter::filtfilt(coeffs, &raw, &mut filtered)?;
            raw = filtered;
        }
    }

    // Step 4: resample onto the output grid.
    let resampled = resample::resample(&raw, config.output_len, config.resample_mode);

    // Step 5: bin-min/max range trace at the same grid, from the
    // pre-resample (filtered, full-resolution) buffer.
    let (mut range_min, mut range_max) = if config.range_trace {
        let (lo, hi) = resample::bin_min_max(&raw, config.output_len);
        (Some(lo), Some(hi))
    } else {
        (None, None)
    };

    // Step 6: least-absolute-deviations linear detrend, applied to the
    // main trace and both range traces.
    let mut samples = resampled;
    if config.detrend {
        let (slope, intercept) = lad_linear_fit(&samples);
        detrend_in_place(&mut samples, slope, intercept);
        if let Some(lo) = range_min.as_mut() {
            detrend_in_place(lo, slope, intercept);
        }
        if let Some(hi) = range_max.as_mut() {
            detrend_in_place(hi, slope, intercept);
        }
    }

    // Step 7 (trace-extrema) is folded into the assembler, which already
    // has every channel's finished trace available after join.

    Ok(ChannelResult { samples, range_min, range_max })
}

fn detrend_in_place(data: &mut [f64], slope: f64, intercept: f64) {
    for (i, v) in data.iter_mut().enumerate() {
        *v -= slope * i as f64 + intercept;
    }
}

/// Least-absolute-deviations linear fit via iteratively reweighted least
/// squares — a handful of iterations converges well past the precision the
/// detrend step needs and avoids a dedicated LP solver dependency.
fn lad_linear_fit(data: &[f64]) -> (f64, f64) {
    if data.len() < 2 {
        return (0.0, data.first().copied().unwrap_or(0.0));
    }
    let n = data.len() as f64;
    let xs: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
    let mut weights = vec![1.0; data.len()];
    let (mut slope, mut intercept) = weighted_least_squares(&xs, data, &weights);

    for _ in 0..8 {
        for (i, &x) in xs.iter().enumerate() {
            let residual = (data[i] - (slope * x + intercept)).abs();
            weights[i] = 1.0 / residual.max(1e-6);
        }
        let (s, b) = weighted_least_squares(&xs, data, &weights);
        slope = s;
        intercept = b;
    }
    let _ = n;
    (slope, intercept)
}

fn weighted_least_squares(xs: &[f64], ys: &[f64], weights: &[f64]) -> (f64, f64) {
    let w_sum: f64 = weights.iter().sum();
    let wx_sum: f64 = xs.iter().zip(weights).map(|(x, w)| x * w).sum();
    let wy_sum: f64 = ys.iter().zip(weights).map(|(y, w)| y * w).sum();
    let wxx_sum: f64 = xs.iter().zip(weights).map(|(x, w)| x * x * w).sum();
    let wxy_sum: f64 = xs.iter().zip(ys).zip(weights).map(|((x, y), w)| x * y * w).sum();

    let denom = w_sum * wxx_sum - wx_sum * wx_sum;
    if denom.abs() < 1e-12 {
        return (0.0, wy_sum / w_sum.max(1e-12));
    }
    let slope = (w_sum * wxy_sum - wx_sum * wy_sum) / denom;
    let intercept = (wy_sum - slope * wx_sum) / w_sum;
    (slope, intercept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::directives::{ProcessingDirectives, ProcessingParams};
    use crate::codec::header::Algorithm;
    use crate::codec::{self};
    use crate::session::Segment;

    fn make_channel(samples: &[i32]) -> Channel {
        let directives = ProcessingDirectives::lossless(Algorithm::Red);
        let params = ProcessingParams::default();
        let block = codec::encode(samples, 0, 1, &directives, &params, 1000.0).unwrap();
        let segment = Segment {
            start_sample: 0,
            end_sample: samples.len() as i64 - 1,
            start_time: 0,
            end_time: (samples.len() as i64) * 1000,
            blocks: vec![block],
        };
        Channel::new("EEG1", 1000.0, vec![segment])
    }

    #[test]
    fn run_decodes_and_resamples() {
        let samples: Vec<i32> = (0..100).collect();
        let channel = make_channel(&samples);
        let config = WorkerConfig {
            segment_range: (0, 0),
            window_start_sample: 0,
            window_end_sample: 99,
            output_len: 50,
            filter_coeffs: None,
            resample_mode: ResampleMode::Linear,
            range_trace: true,
            detrend: false,
            contiguons: vec![],
        };
        let result = run(&channel, &config).unwrap();
        assert_eq!(result.samples.len(), 50);
        assert!(result.range_min.is_some());
        assert!((result.samples[0] - 0.0).abs() < 1.0);
    }

    #[test]
    fn detrend_removes_linear_ramp() {
        let samples: Vec<i32> = (0..200).collect();
        let channel = make_channel(&samples);
        let config = WorkerConfig {
            segment_range: (0, 0),
            window_start_sample: 0,
            window_end_sample: 199,
            output_len: 200,
            filter_coeffs: None,
            resample_mode: ResampleMode::Linear,
            range_trace: false,
            detrend: true,
            contiguons: vec![],
        };
        let result = run(&channel, &config).unwrap();
        let mean: f64 = result.samples.iter().sum::<f64>() / result.samples.len() as f64;
        assert!(mean.abs() < 5.0, "detrended ramp should be centered near zero, got mean {mean}");
    }
}
