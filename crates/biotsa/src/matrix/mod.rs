// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parallel matrix assembler (spec §4.E): per-channel decode, filter,
//! resample, and discontinuity rendering into a single aligned matrix.

pub mod assembler;
pub mod discontinuity;
pub mod extent;
pub mod resample;
pub mod worker;

pub use assembler::{get_matrix, get_matrix_with_runtime, ElementType, FilterMode, Layout, Matrix, MatrixData, MatrixRequest};
pub use discontinuity::DiscontinuityMode;
pub use extent::ExtentMode;
pub use resample::{BinStat, ResampleMode};
