// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extent-mode resolution (spec §4.E): turning a requested extent plus the
//! slice's raw sample span into a concrete `(output_sample_count,
//! output_sampling_frequency)` pair.

use crate::error::{Error, Result};

/// Exactly one of these is selected per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtentMode {
    /// Output sample count fixed; frequency derived from the raw span.
    SampCount(usize),
    /// Output frequency fixed; sample count derived from the raw span.
    SampFreq(f64),
    /// Both fixed. Forces a sample-number search and is incompatible with
    /// NaN/zero discontinuity rendering (spec §4.E).
    CountAndFreq { count: usize, freq: f64 },
}

/// Resolved `(output_sample_count, output_sampling_frequency)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedExtent {
    pub output_count: usize,
    pub output_frequency: f64,
}

pub fn resolve(mode: ExtentMode, raw_sample_count: usize, raw_frequency: f64) -> Result<ResolvedExtent> {
    if raw_frequency <= 0.0 {
        return Err(Error::InvalidDimensions("raw sampling frequency must be positive".into()));
    }
    match mode {
        ExtentMode::SampCount(count) => {
            if count == 0 {
                return Err(Error::InvalidDimensions("SAMP_COUNT extent must be nonzero".into()));
            }
            let duration_s = raw_sample_count as f64 / raw_frequency;
            let output_frequency = if duration_s > 0.0 { count as f64 / duration_s } else { raw_frequency };
            Ok(ResolvedExtent { output_count: count, output_frequency })
        }
        ExtentMode::SampFreq(freq) => {
            if freq <= 0.0 {
                return Err(Error::InvalidDimensions("SAMP_FREQ extent must be positive".into()));
            }
            // spec §8: output count is `ceil((end_time - start_time)/1e6 *
            // sampling_frequency)`, i.e. ceil of the raw duration times freq.
            let duration_s = raw_sample_count as f64 / raw_frequency;
            let count = (duration_s * freq).ceil().max(1.0) as usize;
            Ok(ResolvedExtent { output_count: count, output_frequency: freq })
        }
        ExtentMode::CountAndFreq { count, freq } => {
            if count == 0 || freq <= 0.0 {
                return Err(Error::InvalidDimensions("COUNT_AND_FREQ extent requires nonzero count and positive frequency".into()));
            }
            Ok(ResolvedExtent { output_count: count, output_frequency: freq })
        }
    }
}

/// When `COUNT_AND_FREQ` is given only a start time, the end sample is
/// `start_sample + count * (raw_frequency / output_frequency)` (spec §4.E:
/// "end is computed from count·ratio").
pub fn count_and_freq_end_sample(start_sample: i64, count: usize, raw_frequency: f64, output_frequency: f64) -> i64 {
    let ratio = raw_frequency / output_frequency;
    start_sample + ((count as f64) * ratio).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samp_count_derives_frequency() {
        let resolved = resolve(ExtentMode::SampCount(500), 1000, 1000.0).unwrap();
        assert_eq!(resolved.output_count, 500);
        assert!((resolved.output_frequency - 500.0).abs() < 1e-9);
    }

    #[test]
    fn samp_freq_derives_count() {
        let resolved = resolve(ExtentMode::SampFreq(250.0), 1000, 1000.0).unwrap();
        assert_eq!(resolved.output_count, 250);
    }

    #[test]
    fn samp_freq_rounds_a_fractional_product_up() {
        // 999 raw samples at 1000 Hz span 0.999s; at 100 Hz that's 99.9
        // samples, which must round up rather than to nearest.
        let resolved = resolve(ExtentMode::SampFreq(100.0), 999, 1000.0).unwrap();
        assert_eq!(resolved.output_count, 100);
    }

    #[test]
    fn count_and_freq_passes_through() {
        let resolved = resolve(ExtentMode::CountAndFreq { count: 300, freq: 300.0 }, 1000, 1000.0).unwrap();
        assert_eq!(resolved.output_count, 300);
        assert_eq!(resolved.output_frequency, 300.0);
    }

    #[test]
    fn zero_count_rejected() {
        assert!(resolve(ExtentMode::SampCount(0), 1000, 1000.0).is_err());
    }

    #[test]
    fn end_sample_uses_ratio() {
        let end = count_and_freq_end_sample(0, 100, 1000.0, 500.0);
        assert_eq!(end, 200);
    }
}
