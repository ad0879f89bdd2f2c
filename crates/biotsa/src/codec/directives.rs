// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encode-time directives and parameters (spec §4.A).
//!
//! `encode()` takes a directives/params pair rather than a long argument
//! list, mirroring the teacher's preference for small config structs over
//! positional booleans at public API boundaries.

use crate::codec::header::Algorithm;

/// What the encoder should do, independent of numeric tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingDirectives {
    pub algorithm: Algorithm,
    pub detrend: bool,
    pub set_amplitude_scale: bool,
    pub find_amplitude_scale: bool,
    pub require_normality: bool,
    pub reset_discontinuity: bool,
}

impl ProcessingDirectives {
    pub fn lossless(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            detrend: false,
            set_amplitude_scale: false,
            find_amplitude_scale: false,
            require_normality: false,
            reset_discontinuity: false,
        }
    }
}

/// Strategy used by the amplitude-scale goal-seeking loop (spec §4.A "Tie-breaks").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleUpdate {
    /// `use_mean_residual_ratio`: halve the search interval each attempt.
    Bisect,
    /// `use_compression_ratio`: step proportionally to the ratio miss.
    Proportional,
}

/// Numeric tuning for the encoder, paired with [`ProcessingDirectives`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingParams {
    pub amplitude_scale: f32,
    pub frequency_scale: f32,
    pub vds_threshold: f64,
    pub vds_lfp_high_fc: Option<f64>,
    pub goal_ratio: f64,
    pub goal_tolerance: f64,
    pub maximum_goal_attempts: u32,
    pub scale_update: ScaleUpdate,
    pub minimum_normality: f64,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            amplitude_scale: 1.0,
            frequency_scale: 1.0,
            vds_threshold: 0.0,
            vds_lfp_high_fc: None,
            goal_ratio: 2.0,
            goal_tolerance: 0.05,
            maximum_goal_attempts: 16,
            scale_update: ScaleUpdate::Bisect,
            minimum_normality: crate::config::DEFAULT_MINIMUM_NORMALITY,
        }
    }
}
