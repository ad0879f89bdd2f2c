// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session model (spec §4.D): channels, segments, time-slice resolution, and
//! contiguon construction.

pub mod channel;
pub mod contiguon;
pub mod records;
pub mod segment;
pub mod slice;

pub use channel::Channel;
pub use contiguon::Contiguon;
pub use records::{RecordLog, SessionRecord};
pub use segment::Segment;
pub use slice::{Bound, TimeSlice};

use crate::error::{Error, Result};

/// An opened session: its channels and session-wide record log. Mapping a
/// caller-provided path or file list to this structure is an external
/// collaborator's job (spec §4.D) — this type is constructed directly from
/// already-resolved channel metadata.
#[derive(Debug, Clone)]
pub struct Session {
    pub channels: Vec<Channel>,
    pub records: RecordLog,
    /// Recording origin, used to translate record/slice times to sample numbers.
    pub origin_time: i64,
}

impl Session {
    pub fn open(channels: Vec<Channel>, records: RecordLog, origin_time: i64) -> Self {
        Self { channels, records, origin_time }
    }

    pub fn channel(&self, idx: usize) -> Result<&Channel> {
        self.channels.get(idx).ok_or_else(|| Error::InvalidDimensions(format!("no channel at index {idx}")))
    }

    /// The reference channel's sampling frequency, authoritative for
    /// sample-based slices when the session is heterogeneous (spec §4.D).
    pub fn reference_sampling_frequency(&self, reference_channel: usize) -> Result<f64> {
        Ok(self.channel(reference_channel)?.sampling_frequency)
    }

    /// Resolve `slice` to a concrete `[start_segment, end_segment]` index
    /// range for `channel_idx`, using `reference_channel`'s sampling
    /// frequency when the slice is sample-based.
    pub fn resolve_segment_range(
        &self,
        channel_idx: usize,
        reference_channel: usize,
        slice: &TimeSlice,
    ) -> Result<(usize, usize)> {
        if !slice.is_conditioned() {
            return Err(Error::InvalidSlice("slice must be conditioned before resolving segments".into()));
        }
        let reference_fs = self.reference_sampling_frequency(reference_channel)?;
        let (start_sample, end_sample) = slice.to_sample_range(reference_fs, self.origin_time)?;
        let channel = self.channel(channel_idx)?;
        channel
            .segment_range_for_samples(start_sample, end_sample)
            .ok_or(Error::InvalidDimensions("requested slice does not intersect any segment".into()))
    }

    pub fn build_contiguons(&self, channel_idx: usize) -> Result<Vec<Contiguon>> {
        let channel = self.channel(channel_idx)?;
        Ok(contiguon::build_contiguons(channel, &self.records, self.origin_time, channel.sampling_frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: i64, end: i64) -> Segment {
        Segment { start_sample: start, end_sample: end, start_time: start * 1000, end_time: end * 1000, blocks: vec![] }
    }

    #[test]
    fn resolve_segment_range_uses_reference_fs() {
        let channel = Channel::new("EEG1", 1000.0, vec![seg(0, 999), seg(1000, 1999)]);
        let session = Session::open(vec![channel], RecordLog::new(), 0);
        let mut slice = TimeSlice::new(Bound::Sample(500), Bound::Sample(1500));
        slice.condition().unwrap();
        let range = session.resolve_segment_range(0, 0, &slice).unwrap();
        assert_eq!(range, (0, 1));
    }

    #[test]
    fn unknown_channel_index_errors() {
        let session = Session::open(vec![], RecordLog::new(), 0);
        assert!(session.channel(0).is_err());
    }
}
