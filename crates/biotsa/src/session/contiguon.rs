// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Contiguon list construction (spec §4.D): maximal runs of samples with no
//! recording discontinuity between them, built by walking segment
//! boundaries and embedded record events.

use crate::session::channel::Channel;
use crate::session::records::RecordLog;

/// One contiguous, discontinuity-free run of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contiguon {
    pub start_sample: i64,
    pub end_sample: i64,
}

/// Walk `channel`'s segments (already in sample order) and split them at
/// every point a [`RecordLog`] event falls strictly inside a segment,
/// matching the spec's "segment boundaries and embedded record events".
pub fn build_contiguons(channel: &Channel, records: &RecordLog, origin_time: i64, sampling_frequency: f64) -> Vec<Contiguon> {
    let mut out = Vec::new();
    for segment in &channel.segments {
        let mut cursor = segment.start_sample;
        let events = records.records_intersecting(segment.start_time, segment.end_time);
        let mut split_samples: Vec<i64> = events
            .iter()
            .map(|r| origin_time_to_sample(r.time, origin_time, sampling_frequency))
            .filter(|&s| s > segment.start_sample && s < segment.end_sample)
            .collect();
        split_samples.sort_unstable();
        split_samples.dedup();

        for split in split_samples {
            out.push(Contiguon { start_sample: cursor, end_sample: split - 1 });
            cursor = split;
        }
        out.push(Contiguon { start_sample: cursor, end_sample: segment.end_sample });
    }
    out
}

fn origin_time_to_sample(time: i64, origin_time: i64, sampling_frequency: f64) -> i64 {
    (((time - origin_time) as f64 / 1_000_000.0) * sampling_frequency).round() as i64
}
