// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A channel's contiguous recording segment: a run of blocks with no
//! internal discontinuity (spec §3, §4.D).

use crate::codec;
use crate::error::Result;

/// One segment's encoded blocks, in order, plus the sample/time range they
/// claim to cover.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start_sample: i64,
    pub end_sample: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub blocks: Vec<Vec<u8>>,
}

impl Segment {
    pub fn sample_count(&self) -> i64 {
        self.end_sample - self.start_sample + 1
    }

    pub fn intersects_sample_range(&self, start: i64, end: i64) -> bool {
        self.start_sample <= end && self.end_sample >= start
    }

    /// Decompress every block in this segment into one contiguous `i32`
    /// buffer, in block order.
    pub fn decode_all(&self) -> Result<Vec<i32>> {
        let mut out = Vec::with_capacity(self.sample_count().max(0) as usize);
        for (i, block) in self.blocks.iter().enumerate() {
            let (_, samples) = codec::decode(block, i as u64)?;
            out.extend(samples);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::directives::{ProcessingDirectives, ProcessingParams};
    use crate::codec::header::Algorithm;

    #[test]
    fn decode_all_concatenates_blocks_in_order() {
        let a: Vec<i32> = (0..50).collect();
        let b: Vec<i32> = (50..100).collect();
        let directives = ProcessingDirectives::lossless(Algorithm::Red);
        let params = ProcessingParams::default();
        let block_a = codec::encode(&a, 0, 1, &directives, &params, 1000.0).unwrap();
        let block_b = codec::encode(&b, 1000, 1, &directives, &params, 1000.0).unwrap();

        let segment = Segment {
            start_sample: 0,
            end_sample: 99,
            start_time: 0,
            end_time: 100_000,
            blocks: vec![block_a, block_b],
        };
        let decoded = segment.decode_all().unwrap();
        let expected: Vec<i32> = (0..100).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn intersection_check() {
        let segment = Segment { start_sample: 10, end_sample: 20, start_time: 0, end_time: 0, blocks: vec![] };
        assert!(segment.intersects_sample_range(15, 25));
        assert!(segment.intersects_sample_range(0, 10));
        assert!(!segment.intersects_sample_range(21, 30));
    }
}
