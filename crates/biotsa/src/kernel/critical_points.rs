// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Critical-point (peak/trough) finder (spec §4.C).
//!
//! Returns indices of local extrema, collapsing equal-valued plateaus to
//! their midpoint index, and always including the first and last index so
//! that any downstream interpolant spans the full input range.

/// Find indices of local maxima and minima in `data`, always including `0`
/// and `data.len() - 1`. Plateaus (runs of equal consecutive values) collapse
/// to a single index at the plateau's midpoint.
pub fn critical_points(data: &[f64]) -> Vec<usize> {
    if data.len() <= 2 {
        return (0..data.len()).collect();
    }

    // Walk run-length-encoded "plateaus": each entry is (start, end_inclusive, value).
    let mut runs: Vec<(usize, usize, f64)> = Vec::new();
    let mut start = 0;
    for i in 1..data.len() {
        if data[i] != data[start] {
            runs.push((start, i - 1, data[start]));
            start = i;
        }
    }
    runs.push((start, data.len() - 1, data[start]));

    let mut points = vec![0usize];
    for i in 0..runs.len() {
        let is_interior = i > 0 && i + 1 < runs.len();
        if !is_interior {
            continue;
        }
        let (s, e, v) = runs[i];
        let prev_v = runs[i - 1].2;
        let next_v = runs[i + 1].2;
        let is_peak = v > prev_v && v > next_v;
        let is_trough = v < prev_v && v < next_v;
        if is_peak || is_trough {
            points.push((s + e) / 2);
        }
    }
    let last = data.len() - 1;
    if *points.last().unwrap() != last {
        points.push(last);
    }
    points.dedup();
    points
}
