// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discontinuity rendering (spec §4.E): turning a channel's raw,
//! gap-compacted sample buffer plus its contiguon list into the shape the
//! requested discontinuity mode demands.

use crate::session::Contiguon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscontinuityMode {
    /// No contiguon list is built; the raw resampled buffer is used as-is.
    None,
    /// The contiguon list is rewritten in matrix coordinates; the output may
    /// be narrower than the requested window.
    Contig,
    /// Full-width output, sentinel-filled at every non-covered position.
    Nan,
    /// Same as `Nan` but the sentinel is the type's zero value.
    Zero,
}

/// One contiguon's span translated from raw sample indices into output grid
/// indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContigSpan {
    pub output_start: usize,
    pub output_end: usize,
}

#[derive(Debug, Clone)]
pub enum Rendered {
    /// Full window, no gap tracking.
    Full(Vec<f64>),
    /// Compacted to only the covered spans; `spans` describes them in order.
    Contig { data: Vec<f64>, spans: Vec<ContigSpan> },
    /// Full-width, with `gap_mask[i] == true` meaning a sentinel belongs at
    /// output index `i` rather than `data[i]`.
    SentinelFilled { data: Vec<f64>, gap_mask: Vec<bool> },
}

/// Map a raw sample index in `[window_start, window_end]` onto the output
/// grid of `output_len` evenly spaced points.
fn raw_to_output_index(raw_sample: i64, window_start: i64, window_end: i64, output_len: usize) -> usize {
    let span = (window_end - window_start).max(1) as f64;
    let frac = (raw_sample - window_start) as f64 / span;
    ((frac * (output_len.saturating_sub(1)) as f64).round() as i64).clamp(0, output_len as i64 - 1) as usize
}

/// Render `resampled` (already on the output grid, gap-free and
/// concatenated) according to `mode`, given the raw-coordinate `contiguons`
/// that describe which parts of the window were actually covered.
pub fn render(
    mode: DiscontinuityMode,
    contiguons: &[Contiguon],
    window_start: i64,
    window_end: i64,
    resampled: &[f64],
) -> Rendered {
    match mode {
        DiscontinuityMode::None => Rendered::Full(resampled.to_vec()),
        DiscontinuityMode::Contig => {
            let output_len = resampled.len();
            let mut spans = Vec::with_capacity(contiguons.len());
            let mut data = Vec::with_capacity(output_len);
            for c in contiguons {
                let start = raw_to_output_index(c.start_sample.max(window_start), window_start, window_end, output_len);
                let end = raw_to_output_index(c.end_sample.min(window_end), window_start, window_end, output_len);
                if end < start {
                    continue;
                }
                let output_start = data.len();
                data.extend_from_slice(&resampled[start..=end.min(resampled.len() - 1)]);
                spans.push(ContigSpan { output_start, output_end: data.len().saturating_sub(1) });
            }
            Rendered::Contig { data, spans }
        }
        DiscontinuityMode::Nan | DiscontinuityMode::Zero => {
            let output_len = resampled.len();
            let mut gap_mask = vec![true; output_len];
            for c in contiguons {
                let start = raw_to_output_index(c.start_sample.max(window_start), window_start, window_end, output_len);
                let end = raw_to_output_index(c.end_sample.min(window_end), window_start, window_end, output_len);
                for slot in gap_mask.iter_mut().take(end.min(output_len.saturating_sub(1)) + 1).skip(start) {
                    *slot = false;
                }
            }
            Rendered::SentinelFilled { data: resampled.to_vec(), gap_mask }
        }
    }
}
