// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! VDS: variable-density sampler (spec §4.A).
//!
//! A lossy mode that keeps a sparse set of anchor samples dense enough that
//! a monotone cubic spline through them reconstructs the original trace
//! within a threshold. Anchor amplitudes and positions are each emitted as
//! their own integer stream, sub-encoded by whichever of RED/PRED/MBE yields
//! the smaller payload for that stream.

use crate::codec::directives::ScaleUpdate;
use crate::codec::header::Algorithm;
use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::codec::{mbe, pred, red};
use crate::error::{Error, Result};
use crate::globals::vds_threshold_lookup;
use crate::kernel::{critical_points, running_quantile_filter, TailPolicy};

/// Running-median span used to build the VDS smoothing template.
const MEDIAN_SPAN: usize = 9;

/// Encode `samples` sub-stream `data` with whichever of RED/PRED/MBE
/// produces the smallest `model_region + payload`, returning
/// `(algorithm, model_region, payload)`.
fn encode_best(data: &[i32]) -> Result<(Algorithm, Vec<u8>, Vec<u8>)> {
    let candidates = [
        (Algorithm::Red, red::encode(data)?),
        (Algorithm::Pred, pred::encode(data)?),
        (Algorithm::Mbe, mbe::encode(data)?),
    ];
    let mut best = None;
    for (algo, (model_region, payload)) in candidates {
        let size = model_region.len() + payload.len();
        let better = match &best {
            None => true,
            Some((_, _, _, best_size)) => size < *best_size,
        };
        if better {
            best = Some((algo, model_region, payload, size));
        }
    }
    let (algo, model_region, payload, _) = best.expect("candidates is non-empty");
    Ok((algo, model_region, payload))
}

fn decode_stream(algorithm: Algorithm, model_region: &[u8], payload: &[u8], n: usize) -> Result<Vec<i32>> {
    match algorithm {
        Algorithm::Red => red::decode(model_region, payload, n),
        Algorithm::Pred => pred::decode(model_region, payload, n),
        Algorithm::Mbe => mbe::decode(model_region, payload, n),
        Algorithm::Vds => Err(Error::UnknownAlgorithm { offset: 0, bits: Algorithm::Vds as u8 }),
    }
}

/// Amplitude threshold in raw sample units for the given user-facing scalar
/// `0..=10`, scaled by this block's own dynamic range.
fn threshold_for(samples: &[i32], scalar: f64, with_lfp: bool) -> f64 {
    let (min, max) = samples.iter().fold((i32::MAX, i32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = (max as f64 - min as f64).max(1.0);
    vds_threshold_lookup(scalar, with_lfp) * range
}

fn build_template(samples: &[f64], threshold_abs: f64, lfp_high_fc: Option<f64>, fs: f64) -> Vec<f64> {
    let mut smoothed = running_quantile_filter(samples, MEDIAN_SPAN, 0.5, TailPolicy::Extrapolate);
    if let Some(fc) = lfp_high_fc {
        if fc > 0.0 && fc < fs / 2.0 && smoothed.len() >= 12 {
            let order = crate::filter::select_order(fc, fs);
            if let Ok(coeffs) = crate::filter::design(crate::filter::FilterKind::Lowpass, order, &[fc], fs) {
                let mut filtered = vec![0.0; smoothed.len()];
                if crate::filter::filtfilt(&coeffs, &smoothed, &mut filtered).is_ok() {
                    smoothed = filtered;
                }
            }
        }
    }
    samples
        .iter()
        .zip(smoothed.iter())
        .map(|(&raw, &sm)| if (raw - sm).abs() > threshold_abs { raw } else { sm })
        .collect()
}

/// Fritsch-Carlson monotone cubic Hermite spline through `(xs, ys)`,
/// evaluated densely at every integer position `0..n`.
fn monotone_spline(xs: &[i32], ys: &[f64], n: usize) -> Vec<f64> {
    let m = xs.len();
    if m == 0 {
        return vec![0.0; n];
    }
    if m == 1 {
        return vec![ys[0]; n];
    }

    let mut deltas = vec![0.0; m - 1];
    for i in 0..m - 1 {
        let dx = (xs[i + 1] - xs[i]) as f64;
        deltas[i] = (ys[i + 1] - ys[i]) / dx.max(1.0);
    }
    let mut tangents = vec![0.0; m];
    tangents[0] = deltas[0];
    tangents[m - 1] = deltas[m - 2];
    for i in 1..m - 1 {
        if deltas[i - 1] == 0.0 || deltas[i] == 0.0 || deltas[i - 1].signum() != deltas[i].signum() {
            tangents[i] = 0.0;
        } else {
            tangents[i] = (deltas[i - 1] + deltas[i]) / 2.0;
        }
    }
    for i in 0..m - 1 {
        if deltas[i] == 0.0 {
            tangents[i] = 0.0;
            tangents[i + 1] = 0.0;
            continue;
        }
        let a = tangents[i] / deltas[i];
        let b = tangents[i + 1] / deltas[i];
        let s = a * a + b * b;
        if s > 9.0 {
            let t = 3.0 / s.sqrt();
            tangents[i] = t * a * deltas[i];
            tangents[i + 1] = t * b * deltas[i];
        }
    }

    let mut out = vec![0.0; n];
    let mut seg = 0usize;
    for (pos, slot) in out.iter_mut().enumerate() {
        while seg + 2 < m && (pos as i32) >= xs[seg + 1] {
            seg += 1;
        }
        let x0 = xs[seg] as f64;
        let x1 = xs[seg + 1] as f64;
        let h = (x1 - x0).max(1.0);
        let t = ((pos as f64) - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        *slot = h00 * ys[seg] + h10 * h * tangents[seg] + h01 * ys[seg + 1] + h11 * h * tangents[seg + 1];
    }
    out
}

/// Iteratively insert anchors wherever the spline residual exceeds
/// `threshold_abs`, up to `cap` anchors total.
fn select_anchors(template: &[f64], threshold_abs: f64, cap: usize) -> Vec<usize> {
    let n = template.len();
    let mut anchors = critical_points(template);
    anchors.sort_unstable();
    anchors.dedup();

    loop {
        if anchors.len() >= cap {
            break;
        }
        let xs: Vec<i32> = anchors.iter().map(|&i| i as i32).collect();
        let ys: Vec<f64> = anchors.iter().map(|&i| template[i]).collect();
        let spline = monotone_spline(&xs, &ys, n);

        let mut worst_idx = None;
        let mut worst_residual = threshold_abs;
        for i in 0..n {
            if anchors.binary_search(&i).is_ok() {
                continue;
            }
            let residual = (template[i] - spline[i]).abs();
            if residual > worst_residual {
                worst_residual = residual;
                worst_idx = Some(i);
            }
        }
        match worst_idx {
            Some(idx) => {
                let pos = anchors.binary_search(&idx).unwrap_err();
                anchors.insert(pos, idx);
            }
            None => break,
        }
    }
    anchors
}

/// Encode `samples` as VDS. `fs` and `lfp_high_fc` drive the optional
/// low-pass pre-filter on the smoothing template; `threshold_scalar` is the
/// user-facing `0..=10` knob from the compression parameters.
pub fn encode(samples: &[i32], fs: f64, threshold_scalar: f64, lfp_high_fc: Option<f64>) -> Result<(Vec<u8>, Vec<u8>)> {
    let n = samples.len();
    if n == 0 {
        return Ok((vec![0u8; 4], Vec::new()));
    }
    let with_lfp = lfp_high_fc.is_some();
    let threshold_abs = threshold_for(samples, threshold_scalar, with_lfp);
    let samples_f64: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let template = build_template(&samples_f64, threshold_abs, lfp_high_fc, fs);

    let cap = crate::config::VDS_MAX_ANCHORS_PER_SEGMENT.min(n);
    let anchor_indices = select_anchors(&template, threshold_abs, cap);

    let xs: Vec<i32> = anchor_indices.iter().map(|&i| i as i32).collect();
    let ys: Vec<i32> = anchor_indices.iter().map(|&i| samples[i]).collect();

    let (x_algo, x_model, x_payload) = encode_best(&xs)?;
    let (y_algo, y_model, y_payload) = encode_best(&ys)?;

    let mut model_region = vec![0u8; 4 + 1 + 1 + 4 + 4 + 4 + x_model.len() + y_model.len()];
    {
        let mut w = WriteCursor::new(&mut model_region);
        w.write_u32_le(anchor_indices.len() as u32).map_err(Error::from)?;
        w.write_u8(x_algo as u8).map_err(Error::from)?;
        w.write_u8(y_algo as u8).map_err(Error::from)?;
        w.write_u32_le(x_model.len() as u32).map_err(Error::from)?;
        w.write_u32_le(y_model.len() as u32).map_err(Error::from)?;
        w.write_u32_le(x_payload.len() as u32).map_err(Error::from)?;
        w.write_bytes(&x_model).map_err(Error::from)?;
        w.write_bytes(&y_model).map_err(Error::from)?;
    }

    let mut payload = Vec::with_capacity(x_payload.len() + y_payload.len());
    payload.extend_from_slice(&x_payload);
    payload.extend_from_slice(&y_payload);

    Ok((model_region, payload))
}

pub fn decode(model_region: &[u8], payload: &[u8], number_of_samples: usize) -> Result<Vec<i32>> {
    if number_of_samples == 0 {
        return Ok(Vec::new());
    }
    let mut r = ReadCursor::new(model_region);
    let anchor_count = r.read_u32_le().map_err(Error::from)? as usize;
    let x_algo = Algorithm::from_bits(r.read_u8().map_err(Error::from)?)
        .ok_or_else(|| Error::UnknownAlgorithm { offset: 0, bits: 0 })?;
    let y_algo = Algorithm::from_bits(r.read_u8().map_err(Error::from)?)
        .ok_or_else(|| Error::UnknownAlgorithm { offset: 0, bits: 0 })?;
    let x_model_len = r.read_u32_le().map_err(Error::from)? as usize;
    let y_model_len = r.read_u32_le().map_err(Error::from)? as usize;
    let x_payload_len = r.read_u32_le().map_err(Error::from)? as usize;

    let tables_start = r.offset();
    let x_model = &model_region[tables_start..tables_start + x_model_len];
    let y_model = &model_region[tables_start + x_model_len..tables_start + x_model_len + y_model_len];
    let x_payload = &payload[..x_payload_len];
    let y_payload = &payload[x_payload_len..];

    let xs = decode_stream(x_algo, x_model, x_payload, anchor_count)?;
    let ys = decode_stream(y_algo, y_model, y_payload, anchor_count)?;

    Ok(monotone_spline(&xs, &ys.iter().map(|&v| v as f64).collect::<Vec<_>>(), number_of_samples)
        .iter()
        .map(|&v| v.round() as i32)
        .collect())
}

/// Result of the amplitude-scale goal-seeking loop (spec §4.A+ supplement).
pub struct ScaleSearchResult {
    pub amplitude_scale: f32,
    pub achieved_ratio: f64,
    pub attempts: u32,
}

/// Bisect or proportionally step `amplitude_scale` until the compression
/// ratio achieved by `encode_at_scale` lands within `goal_tolerance` of
/// `goal_ratio`, or `maximum_goal_attempts` is exhausted. `encode_at_scale`
/// quantizes the caller's samples by a trial scale and returns the encoded
/// byte length; the original (unscaled) sample count in elements of `i32`
/// is `reference_len`.
pub fn seek_amplitude_scale(
    reference_len: usize,
    goal_ratio: f64,
    goal_tolerance: f64,
    maximum_goal_attempts: u32,
    update: ScaleUpdate,
    mut encode_at_scale: impl FnMut(f32) -> usize,
) -> ScaleSearchResult {
    let uncompressed_bytes = reference_len as f64 * std::mem::size_of::<i32>() as f64;
    let mut lo = 0.01f32;
    let mut hi = 100.0f32;
    let mut scale = 1.0f32;
    let mut best_scale = scale;
    let mut best_ratio = 0.0f64;
    let mut best_gap = f64::INFINITY;
    let mut attempts = 0u32;

    while attempts < maximum_goal_attempts {
        attempts += 1;
        let encoded_len = encode_at_scale(scale).max(1);
        let ratio = uncompressed_bytes / encoded_len as f64;
        let gap = (ratio - goal_ratio).abs();
        if gap < best_gap {
            best_gap = gap;
            best_ratio = ratio;
            best_scale = scale;
        }
        if gap <= goal_tolerance {
            break;
        }

        match update {
            ScaleUpdate::Bisect => {
                // A larger scale spreads quantized values over more distinct
                // levels, which tends to raise the achieved ratio less (finer
                // quantization -> more entropy); narrow toward the side that
                // would move the ratio toward the goal.
                if ratio < goal_ratio {
                    hi = scale;
                } else {
                    lo = scale;
                }
                scale = (lo + hi) / 2.0;
            }
            ScaleUpdate::Proportional => {
                let step = (goal_ratio / ratio.max(1e-9)) as f32;
                scale = (scale * step).clamp(0.001, 1000.0);
            }
        }
    }

    ScaleSearchResult { amplitude_scale: best_scale, achieved_ratio: best_ratio, attempts }
}
