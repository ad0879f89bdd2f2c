// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resampling to the output grid (spec §4.E step 4) plus the bin-min/max
//! range trace pass (step 5).

use crate::config::AUTO_RESAMPLE_SPLINE_THRESHOLD;

/// How `input` is interpolated onto `output_len` evenly-spaced points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResampleMode {
    CubicSpline,
    Linear,
    Binning(BinStat),
    /// Spline when the upsample ratio is at/above the configured threshold, else linear.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinStat {
    Midpoint,
    Mean,
    Median,
}

pub fn resample(input: &[f64], output_len: usize, mode: ResampleMode) -> Vec<f64> {
    if output_len == 0 || input.is_empty() {
        return vec![0.0; output_len];
    }
    if input.len() == 1 {
        return vec![input[0]; output_len];
    }
    let ratio = output_len as f64 / input.len() as f64;
    let effective = match mode {
        ResampleMode::Auto => {
            if ratio >= AUTO_RESAMPLE_SPLINE_THRESHOLD {
                ResampleMode::CubicSpline
            } else {
                ResampleMode::Linear
            }
        }
        other => other,
    };
    match effective {
        ResampleMode::CubicSpline => monotone_spline(input, output_len),
        ResampleMode::Linear => linear(input, output_len),
        ResampleMode::Binning(stat) => binning(input, output_len, stat),
        ResampleMode::Auto => unreachable!("resolved above"),
    }
}

fn source_position(output_len: usize, input_len: usize, i: usize) -> f64 {
    if output_len <= 1 {
        0.0
    } else {
        i as f64 * (input_len - 1) as f64 / (output_len - 1) as f64
    }
}

fn linear(input: &[f64], output_len: usize) -> Vec<f64> {
    (0..output_len)
        .map(|i| {
            let pos = source_position(output_len, input.len(), i);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(input.len() - 1);
            let frac = pos - lo as f64;
            input[lo] * (1.0 - frac) + input[hi] * frac
        })
        .collect()
}

/// Fritsch-Carlson monotone cubic Hermite interpolation (the "mak-type"
/// spline in spec §4.E), which never overshoots between samples the way a
/// natural cubic spline can on noisy physiological data.
fn monotone_spline(input: &[f64], output_len: usize) -> Vec<f64> {
    let n = input.len();
    let mut secants = vec![0.0; n.saturating_sub(1)];
    for i in 0..secants.len() {
        secants[i] = input[i + 1] - input[i];
    }
    let mut tangents = vec![0.0; n];
    for i in 0..n {
        tangents[i] = match i {
            0 => secants[0],
            _ if i == n - 1 => secants[n - 2],
            _ => 0.5 * (secants[i - 1] + secants[i]),
        };
    }
    for i in 0..secants.len() {
        if secants[i] == 0.0 {
            tangents[i] = 0.0;
            tangents[i + 1] = 0.0;
        } else {
            let a = tangents[i] / secants[i];
            let b = tangents[i + 1] / secants[i];
            let s = a.hypot(b);
            if s > 3.0 {
                let scale = 3.0 / s;
                tangents[i] = a * scale * secants[i];
                tangents[i + 1] = b * scale * secants[i];
            }
        }
    }

    (0..output_len)
        .map(|i| {
            let pos = source_position(output_len, n, i);
            let lo = (pos.floor() as usize).min(n - 2);
            let t = pos - lo as f64;
            let h = if secants.is_empty() { 1.0 } else { secants[lo] };
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            h00 * input[lo] + h10 * h * tangents[lo] + h01 * input[lo + 1] + h11 * h * tangents[lo + 1]
        })
        .collect()
}

fn binning(input: &[f64], output_len: usize, stat: BinStat) -> Vec<f64> {
    (0..output_len)
        .map(|i| {
            let start = (i * input.len()) / output_len;
            let end = (((i + 1) * input.len()) / output_len).max(start + 1).min(input.len());
            let bin = &input[start..end];
            match stat {
                BinStat::Midpoint => bin[bin.len() / 2],
                BinStat::Mean => bin.iter().sum::<f64>() / bin.len() as f64,
                BinStat::Median => {
                    let mut sorted = bin.to_vec();
                    crate::kernel::median_in_place(&mut sorted)
                }
            }
        })
        .collect()
}

/// Bin-min/max range trace at the target grid (spec §4.E step 5).
pub fn bin_min_max(input: &[f64], output_len: usize) -> (Vec<f64>, Vec<f64>) {
    let mut mins = Vec::with_capacity(output_len);
    let mut maxs = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let start = (i * input.len()) / output_len.max(1);
        let end = (((i + 1) * input.len()) / output_len.max(1)).max(start + 1).min(input.len());
        let bin = &input[start..end.max(start + 1).min(input.len().max(1))];
        if bin.is_empty() {
            mins.push(0.0);
            maxs.push(0.0);
            continue;
        }
        let mut lo = bin[0];
        let mut hi = bin[0];
        for &v in bin {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        mins.push(lo);
        maxs.push(hi);
    }
    (mins, maxs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_resample_preserves_endpoints() {
        let input = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let out = resample(&input, 9, ResampleMode::Linear);
        assert_eq!(out.first(), Some(&0.0));
        assert_eq!(out.last(), Some(&4.0));
    }

    #[test]
    fn spline_resample_preserves_endpoints() {
        let input = vec![0.0, 2.0, 1.0, 3.0, 0.5];
        let out = resample(&input, 20, ResampleMode::CubicSpline);
        assert!((out[0] - 0.0).abs() < 1e-9);
        assert!((out[19] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn auto_picks_spline_above_threshold() {
        let input = vec![0.0, 1.0];
        let spline = resample(&input, 10, ResampleMode::Auto);
        let explicit = resample(&input, 10, ResampleMode::CubicSpline);
        assert_eq!(spline, explicit);
    }

    #[test]
    fn bin_min_max_bounds_each_bin() {
        let input = vec![1.0, 5.0, 2.0, 8.0, 3.0, 9.0];
        let (mins, maxs) = bin_min_max(&input, 3);
        assert_eq!(mins.len(), 3);
        for (bin_idx, (&lo, &hi)) in mins.iter().zip(maxs.iter()).enumerate() {
            assert!(lo <= hi, "bin {bin_idx} min should not exceed max");
        }
    }

    #[test]
    fn downsample_median_binning_is_robust_to_spikes() {
        let input = vec![1.0, 1.0, 100.0, 1.0, 1.0, 1.0];
        let out = resample(&input, 2, ResampleMode::Binning(BinStat::Median));
        assert!(out.iter().all(|&v| v < 10.0));
    }
}
