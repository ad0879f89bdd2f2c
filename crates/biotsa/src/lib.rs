// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parallel decode and matrix-assembly core for a segmented biomedical
//! time-series archive.
//!
//! A session is a tree of channels, each holding a time-ordered run of
//! fixed-capacity segments; each segment's samples are stored in one of
//! four block-codec payload modes (`RED`/`PRED`/`MBE`/`VDS`). The matrix
//! assembler (`matrix`) pulls a time/sample window across a set of
//! channels, runs each through an optional Butterworth filter/resample/
//! detrend pipeline on its own worker thread, and places the results into
//! a single typed matrix.
//!
//! ## Module map
//!
//! - [`codec`] — block header + RED/PRED/MBE/VDS payload encode/decode.
//! - [`filter`] — Butterworth design and zero-phase `filtfilt`.
//! - [`kernel`] — running quantile, median-in-place, critical-point kernels.
//! - [`session`] — channel/segment/contiguon bookkeeping and slice resolution.
//! - [`matrix`] — the parallel matrix assembler built on top of the above.
//! - [`transport`] — length-prefixed socket framing (`transport` feature).
//! - [`license`] — the license cache file and degraded-availability check.
//! - [`crypto`] — AES-128-ECB primitive shared by `transport` and `license`
//!   (`crypto` feature).
//! - [`affinity`] — the CPU affinity expression parser.
//! - [`config`] — wire/layout constants and [`config::RuntimeConfig`].
//! - [`globals`] — lazily initialized read-only lookup tables.
//! - [`error`] — the crate-wide [`error::Error`]/[`error::Result`].

pub mod affinity;
pub mod codec;
pub mod config;
#[cfg(feature = "crypto")]
pub mod crypto;
pub mod error;
pub mod filter;
pub mod globals;
pub mod kernel;
pub mod license;
pub mod matrix;
pub mod session;
#[cfg(feature = "transport")]
pub mod transport;

pub use error::{Error, Result};
