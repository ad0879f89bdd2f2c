// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `get_matrix` exercised end to end: building a tiny session out of
//! encoded blocks, then assembling it into a matrix under a few extent and
//! discontinuity configurations.

use biotsa::codec::{self, directives::{ProcessingDirectives, ProcessingParams}, Algorithm};
use biotsa::config::RuntimeConfig;
use biotsa::matrix::{get_matrix, get_matrix_with_runtime, DiscontinuityMode, ElementType, ExtentMode, FilterMode, Layout, MatrixData, MatrixRequest, ResampleMode};
use biotsa::session::{Bound, Channel, RecordLog, Segment, Session, TimeSlice};

fn encode_ramp(start_sample: i64, n: usize, fs: f64) -> Vec<u8> {
    let samples: Vec<i32> = (0..n as i32).map(|i| i + start_sample as i32).collect();
    let directives = ProcessingDirectives::lossless(Algorithm::Red);
    let params = ProcessingParams::default();
    let start_time = (start_sample as f64 / fs * 1_000_000.0) as i64;
    codec::encode(&samples, start_time, 0, &directives, &params, fs).unwrap()
}

fn single_channel_session(fs: f64, n: usize) -> Session {
    let block = encode_ramp(0, n, fs);
    let segment = Segment { start_sample: 0, end_sample: n as i64 - 1, start_time: 0, end_time: (n as f64 / fs * 1_000_000.0) as i64, blocks: vec![block] };
    let channel = Channel::new("EEG1", fs, vec![segment]);
    Session::open(vec![channel], RecordLog::new(), 0)
}

fn two_channel_session(fs: f64, n: usize) -> Session {
    let block_a = encode_ramp(0, n, fs);
    let block_b = encode_ramp(0, n, fs);
    let seg_a = Segment { start_sample: 0, end_sample: n as i64 - 1, start_time: 0, end_time: (n as f64 / fs * 1_000_000.0) as i64, blocks: vec![block_a] };
    let seg_b = Segment { start_sample: 0, end_sample: n as i64 - 1, start_time: 0, end_time: (n as f64 / fs * 1_000_000.0) as i64, blocks: vec![block_b] };
    let ch_a = Channel::new("EEG1", fs, vec![seg_a]);
    let ch_b = Channel::new("EEG2", fs, vec![seg_b]);
    Session::open(vec![ch_a, ch_b], RecordLog::new(), 0)
}

fn default_request(extent: ExtentMode) -> MatrixRequest {
    MatrixRequest {
        extent,
        filter: FilterMode::None,
        resample: ResampleMode::Linear,
        discontinuity: DiscontinuityMode::None,
        detrend: false,
        range_trace: false,
        trace_extrema: false,
        element_type: ElementType::F64,
        layout: Layout::ChannelMajor,
        reference_channel: 0,
    }
}

#[test]
fn get_matrix_produces_requested_sample_count() {
    let session = single_channel_session(256.0, 512);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(511));
    slice.condition().unwrap();
    let request = default_request(ExtentMode::SampCount(100));

    let matrix = get_matrix(&session, &[0], &slice, &request).unwrap();
    assert_eq!(matrix.cols, 100);
    assert_eq!(matrix.rows, 1);
    assert_eq!(matrix.valid, vec![true]);
}

#[test]
fn no_active_channels_is_rejected() {
    let session = single_channel_session(256.0, 128);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(127));
    slice.condition().unwrap();
    let request = default_request(ExtentMode::SampCount(10));
    assert!(get_matrix(&session, &[], &slice, &request).is_err());
}

#[test]
fn count_and_freq_rejects_nan_discontinuity() {
    let session = single_channel_session(256.0, 128);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(127));
    slice.condition().unwrap();
    let mut request = default_request(ExtentMode::CountAndFreq { count: 64, freq: 128.0 });
    request.discontinuity = DiscontinuityMode::Nan;
    assert!(get_matrix(&session, &[0], &slice, &request).is_err());
}

#[test]
fn si2_element_type_clamps_out_of_range_values() {
    let session = single_channel_session(256.0, 256);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(255));
    slice.condition().unwrap();
    let mut request = default_request(ExtentMode::SampCount(256));
    request.element_type = ElementType::Si2;

    let matrix = get_matrix(&session, &[0], &slice, &request).unwrap();
    match matrix.data {
        MatrixData::Si2(values) => assert_eq!(values.len(), 256),
        other => panic!("expected Si2 matrix data, got {other:?}"),
    }
}

#[test]
fn max_workers_of_one_still_assembles_every_channel() {
    let session = two_channel_session(256.0, 128);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(127));
    slice.condition().unwrap();
    let request = default_request(ExtentMode::SampCount(64));
    let runtime = RuntimeConfig { max_workers: Some(1), ..RuntimeConfig::default() };

    let matrix = get_matrix_with_runtime(&session, &[0, 1], &slice, &request, &runtime).unwrap();
    assert_eq!(matrix.rows, 2);
    assert_eq!(matrix.cols, 64);
    assert_eq!(matrix.valid, vec![true, true]);
}

#[test]
fn sample_major_layout_places_channels_in_columns() {
    let session = single_channel_session(256.0, 200);
    let mut slice = TimeSlice::new(Bound::Sample(0), Bound::Sample(199));
    slice.condition().unwrap();
    let mut request = default_request(ExtentMode::SampCount(50));
    request.layout = Layout::SampleMajor;

    let matrix = get_matrix(&session, &[0], &slice, &request).unwrap();
    assert_eq!(matrix.rows, 1);
    assert_eq!(matrix.cols, 50);
    match matrix.data {
        MatrixData::F64(values) => assert_eq!(values.len(), 50),
        other => panic!("expected F64 matrix data, got {other:?}"),
    }
}
