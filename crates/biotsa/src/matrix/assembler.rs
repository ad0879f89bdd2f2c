// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `get_matrix` entry point (spec §4.E): validates the request, launches
//! worker threads for the active channels (one per channel by default, or
//! batched under a `RuntimeConfig` cap), joins, then renders
//! discontinuities into the final matrix.

use crate::config::{RuntimeConfig, ANTI_ALIAS_DIVISOR, SENTINEL_SI2, SENTINEL_SI4};
use crate::error::{Error, Result};
use crate::filter::{self, FilterKind};
use crate::matrix::discontinuity::{self, DiscontinuityMode, Rendered};
use crate::matrix::extent::{self, ExtentMode};
use crate::matrix::resample::ResampleMode;
use crate::matrix::worker::{self, WorkerConfig};
use crate::session::{Session, TimeSlice};

/// Output element type a matrix cell is cast into (spec §4.E step 8, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F32,
    F64,
    Si2,
    Si4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    ChannelMajor,
    SampleMajor,
}

/// Band shape applied in the filter stage (spec §4.E "Filter modes").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterMode {
    /// Low-pass at `output_sf / 3.5`.
    AntiAlias,
    Lowpass(f64),
    Highpass(f64),
    Bandpass(f64, f64),
    Bandstop(f64, f64),
    None,
}

#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub extent: ExtentMode,
    pub filter: FilterMode,
    pub resample: ResampleMode,
    pub discontinuity: DiscontinuityMode,
    pub detrend: bool,
    pub range_trace: bool,
    pub trace_extrema: bool,
    pub element_type: ElementType,
    pub layout: Layout,
    pub reference_channel: usize,
}

#[derive(Debug, Clone)]
pub enum MatrixData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    Si2(Vec<i16>),
    Si4(Vec<i32>),
}

impl MatrixData {
    fn new(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::F32 => MatrixData::F32(vec![0.0; len]),
            ElementType::F64 => MatrixData::F64(vec![0.0; len]),
            ElementType::Si2 => MatrixData::Si2(vec![0; len]),
            ElementType::Si4 => MatrixData::Si4(vec![0; len]),
        }
    }

    fn set(&mut self, idx: usize, value: f64) {
        match self {
            MatrixData::F32(v) => v[idx] = value as f32,
            MatrixData::F64(v) => v[idx] = value,
            MatrixData::Si2(v) => v[idx] = value.clamp(i16::MIN as f64, i16::MAX as f64) as i16,
            MatrixData::Si4(v) => v[idx] = value.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
        }
    }

    /// NaN for float element types, the typed out-of-band sentinel otherwise
    /// (spec §4.E "Sentinel-fill uses a typed broadcast memset").
    fn set_sentinel(&mut self, idx: usize) {
        match self {
            MatrixData::F32(v) => v[idx] = f32::NAN,
            MatrixData::F64(v) => v[idx] = f64::NAN,
            MatrixData::Si2(v) => v[idx] = SENTINEL_SI2,
            MatrixData::Si4(v) => v[idx] = SENTINEL_SI4,
        }
    }

    fn set_zero(&mut self, idx: usize) {
        self.set(idx, 0.0);
    }
}

#[derive(Debug, Clone)]
pub struct Matrix {
    pub data: MatrixData,
    pub rows: usize,
    pub cols: usize,
    pub layout: Layout,
    /// Per-channel validity bitmap (spec §4.E "Failure semantics").
    pub valid: Vec<bool>,
    /// Per-channel `(min, max)`, present only when `trace_extrema` was requested.
    pub extrema: Option<Vec<(f64, f64)>>,
}

fn cell_index(layout: Layout, rows: usize, cols: usize, channel: usize, sample: usize) -> usize {
    match layout {
        Layout::ChannelMajor => channel * cols + sample,
        Layout::SampleMajor => sample * rows + channel,
    }
}

fn design_filter(mode: FilterMode, channel_fs: f64, output_fs: f64) -> Result<Option<filter::FilterCoeffs>> {
    let (kind, cutoffs): (FilterKind, Vec<f64>) = match mode {
        FilterMode::None => return Ok(None),
        FilterMode::AntiAlias => (FilterKind::Lowpass, vec![output_fs / ANTI_ALIAS_DIVISOR]),
        FilterMode::Lowpass(c) => (FilterKind::Lowpass, vec![c]),
        FilterMode::Highpass(c) => (FilterKind::Highpass, vec![c]),
        FilterMode::Bandpass(lo, hi) => (FilterKind::Bandpass, vec![lo, hi]),
        FilterMode::Bandstop(lo, hi) => (FilterKind::Bandstop, vec![lo, hi]),
    };
    let order = filter::select_order(*cutoffs.last().unwrap(), channel_fs);
    Ok(Some(filter::design(kind, order, &cutoffs, channel_fs)?))
}

/// [`get_matrix`] under the default [`RuntimeConfig`] (one worker thread per
/// active channel, no affinity).
pub fn get_matrix(session: &Session, channel_indices: &[usize], slice: &TimeSlice, request: &MatrixRequest) -> Result<Matrix> {
    get_matrix_with_runtime(session, channel_indices, slice, request, &RuntimeConfig::default())
}

/// Validate the request, resolve the reference channel's window, launch
/// workers for the active channels (batched to `runtime.max_workers` at a
/// time, or one per channel if unset), join, then render discontinuities
/// into the final matrix.
pub fn get_matrix_with_runtime(
    session: &Session,
    channel_indices: &[usize],
    slice: &TimeSlice,
    request: &MatrixRequest,
    runtime: &RuntimeConfig,
) -> Result<Matrix> {
    if channel_indices.is_empty() {
        return Err(Error::NoActiveChannels);
    }
    if matches!(request.extent, ExtentMode::CountAndFreq { .. })
        && matches!(request.discontinuity, DiscontinuityMode::Nan | DiscontinuityMode::Zero)
    {
        return Err(Error::InvalidDimensions("COUNT_AND_FREQ extent is incompatible with NaN/ZERO discontinuity rendering".into()));
    }

    let reference_fs = session.reference_sampling_frequency(request.reference_channel)?;
    let (ref_start, ref_end) = slice.to_sample_range(reference_fs, session.origin_time)?;
    let raw_sample_count = (ref_end - ref_start).max(0) as usize;
    let resolved = extent::resolve(request.extent, raw_sample_count, reference_fs)?;

    let mut configs = Vec::with_capacity(channel_indices.len());
    for &ch_idx in channel_indices {
        let channel = session.channel(ch_idx)?;
        let segment_range = session.resolve_segment_range(ch_idx, request.reference_channel, slice)?;
        let filter_coeffs = design_filter(request.filter, channel.sampling_frequency, resolved.output_frequency)?;
        let contiguons = session.build_contiguons(ch_idx)?;
        configs.push(WorkerConfig {
            segment_range,
            window_start_sample: ref_start,
            window_end_sample: ref_end,
            output_len: resolved.output_count,
            filter_coeffs,
            resample_mode: request.resample,
            range_trace: request.range_trace,
            detrend: request.detrend,
            contiguons,
        });
    }

    let results = dispatch(session, channel_indices, &configs, runtime.max_workers);
    assemble(request, resolved.output_count, &configs, &results)
}

/// Spawn up to `max_workers` threads at a time across the active channels
/// and join each batch before starting the next; a channel whose worker
/// panics or errors is marked invalid but never aborts its peers (spec
/// §4.E "Failure semantics"). `max_workers = None` spawns one thread per
/// channel, matching the original unbounded concurrency model.
fn dispatch(
    session: &Session,
    channel_indices: &[usize],
    configs: &[WorkerConfig],
    max_workers: Option<usize>,
) -> Vec<Option<worker::ChannelResult>> {
    let batch_size = max_workers.filter(|&n| n > 0).unwrap_or(channel_indices.len().max(1));
    let mut results = Vec::with_capacity(channel_indices.len());

    for (idx_batch, config_batch) in channel_indices.chunks(batch_size).zip(configs.chunks(batch_size)) {
        let batch_results = std::thread::scope(|scope| {
            let handles: Vec<_> = idx_batch
                .iter()
                .zip(config_batch)
                .map(|(&ch_idx, config)| {
                    scope.spawn(move || {
                        let channel = session.channel(ch_idx).ok()?;
                        match worker::run(channel, config) {
                            Ok(result) => Some(result),
                            Err(e) => {
                                log::warn!("channel {ch_idx} worker failed, leaving it unfilled: {e:?}");
                                None
                            }
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        log::warn!("a channel worker thread panicked, leaving it unfilled");
                        None
                    })
                })
                .collect::<Vec<_>>()
        });
        results.extend(batch_results);
    }

    results
}

/// Render discontinuities per channel (now that every worker has joined,
/// establishing the happens-before edge the concurrency model describes),
/// cast into the output element type, and place into the final matrix.
fn assemble(
    request: &MatrixRequest,
    output_len: usize,
    configs: &[WorkerConfig],
    results: &[Option<worker::ChannelResult>],
) -> Result<Matrix> {
    let n_channels = results.len();
    let rendered: Vec<Option<Rendered>> = results
        .iter()
        .zip(configs)
        .map(|(result, config)| {
            result.as_ref().map(|r| {
                discontinuity::render(request.discontinuity, &config.contiguons, config.window_start_sample, config.window_end_sample, &r.samples)
            })
        })
        .collect();

    let cols = match request.discontinuity {
        DiscontinuityMode::Contig => rendered
            .iter()
            .filter_map(|r| match r {
                Some(Rendered::Contig { data, .. }) => Some(data.len()),
                _ => None,
            })
            .max()
            .unwrap_or(output_len),
        _ => output_len,
    };

    let mut data = MatrixData::new(request.element_type, n_channels * cols);
    let mut valid = vec![false; n_channels];
    let mut extrema = request.trace_extrema.then(|| vec![(f64::NAN, f64::NAN); n_channels]);

    for (ch, r) in rendered.iter().enumerate() {
        let (samples, gap_mask): (Vec<f64>, Option<Vec<bool>>) = match r {
            Some(Rendered::Full(d)) => (d.clone(), None),
            Some(Rendered::Contig { data, .. }) => (data.clone(), None),
            Some(Rendered::SentinelFilled { data, gap_mask }) => (data.clone(), Some(gap_mask.clone())),
            None => continue,
        };
        valid[ch] = true;

        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for (i, &v) in samples.iter().enumerate().take(cols) {
            let idx = cell_index(request.layout, n_channels, cols, ch, i);
            let is_gap = gap_mask.as_ref().is_some_and(|m| m[i]);
            if is_gap {
                match request.discontinuity {
                    DiscontinuityMode::Zero => data.set_zero(idx),
                    _ => data.set_sentinel(idx),
                }
            } else {
                data.set(idx, v);
                if v.is_finite() {
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
        }
        if let Some(extrema) = extrema.as_mut() {
            extrema[ch] = (lo, hi);
        }
    }

    Ok(Matrix { data, rows: n_channels, cols, layout: request.layout, valid, extrema })
}
