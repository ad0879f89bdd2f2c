// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Order-0 static statistics model for RED/PRED (spec §4.A): a dictionary of
//! at most 256 residual values with per-value frequencies, serialized into
//! the block's model region as a cumulative-count table. Residual values
//! outside the dictionary are escaped and written as a literal `i32` in a
//! side stream, so the model stays lossless regardless of how skewed the
//! residual distribution is.

use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::error::{CodecError, Result};
use std::collections::HashMap;

pub const MAX_BINS: usize = 256;

pub struct StatModel {
    /// `values[symbol]` is the residual value that symbol represents.
    values: Vec<i32>,
    /// `freqs[symbol]` is that value's occurrence count (at least 1).
    freqs: Vec<u32>,
    escape_freq: u32,
    lookup: HashMap<i32, usize>,
}

impl StatModel {
    /// Build a model from a residual stream, keeping the `MAX_BINS - 1` most
    /// frequent distinct values and escaping the rest.
    pub fn build(residuals: &[i32]) -> Self {
        let mut counts: HashMap<i32, u32> = HashMap::new();
        for &r in residuals {
            *counts.entry(r).or_insert(0) += 1;
        }
        let mut pairs: Vec<(i32, u32)> = counts.into_iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        pairs.truncate(MAX_BINS - 1);

        let dict_total: u32 = pairs.iter().map(|&(_, c)| c).sum();
        let stream_total = residuals.len() as u32;
        let escape_freq = stream_total.saturating_sub(dict_total).max(1);

        let mut values = Vec::with_capacity(pairs.len());
        let mut freqs = Vec::with_capacity(pairs.len());
        let mut lookup = HashMap::with_capacity(pairs.len());
        for (i, (value, freq)) in pairs.into_iter().enumerate() {
            values.push(value);
            freqs.push(freq.max(1));
            lookup.insert(value, i);
        }

        Self { values, freqs, escape_freq, lookup }
    }

    fn escape_symbol(&self) -> usize {
        self.values.len()
    }

    fn total(&self) -> u32 {
        self.freqs.iter().sum::<u32>() + self.escape_freq
    }

    /// `(symbol, cum_freq, freq, total)` for `value`, where `symbol ==
    /// escape_symbol()` means the value isn't in the dictionary.
    pub fn lookup_value(&self, value: i32) -> (usize, u32, u32, u32) {
        let total = self.total();
        match self.lookup.get(&value) {
            Some(&sym) => {
                let cum: u32 = self.freqs[..sym].iter().sum();
                (sym, cum, self.freqs[sym], total)
            }
            None => {
                let cum: u32 = self.freqs.iter().sum();
                (self.escape_symbol(), cum, self.escape_freq, total)
            }
        }
    }

    /// `(cum_freq_target -> symbol, cum_freq, freq)` inverse of
    /// [`Self::lookup_value`], used by the decoder.
    pub fn symbol_at(&self, target: u32) -> (usize, u32, u32) {
        let mut acc = 0u32;
        for (sym, &f) in self.freqs.iter().enumerate() {
            if target < acc + f {
                return (sym, acc, f);
            }
            acc += f;
        }
        (self.escape_symbol(), acc, self.escape_freq)
    }

    pub fn total_freq(&self) -> u32 {
        self.total()
    }

    pub fn value_of(&self, symbol: usize) -> Option<i32> {
        self.values.get(symbol).copied()
    }

    pub fn is_escape(&self, symbol: usize) -> bool {
        symbol == self.escape_symbol()
    }

    /// Serialize `{num_bins:u16}{escape_freq:u16}{(value:i32, freq:u16)...}`.
    pub fn encode_table(&self) -> Result<Vec<u8>> {
        let len = 4 + self.values.len() * 6;
        let mut buf = vec![0u8; len];
        let mut w = WriteCursor::new(&mut buf);
        w.write_u16_le(self.values.len() as u16).map_err(crate::error::Error::from)?;
        w.write_u16_le(self.escape_freq.min(u16::MAX as u32) as u16).map_err(crate::error::Error::from)?;
        for (&value, &freq) in self.values.iter().zip(self.freqs.iter()) {
            w.write_i32_le(value).map_err(crate::error::Error::from)?;
            w.write_u16_le(freq.min(u16::MAX as u32) as u16).map_err(crate::error::Error::from)?;
        }
        Ok(buf)
    }

    pub fn decode_table(buf: &[u8]) -> Result<(Self, usize)> {
        let mut r = ReadCursor::new(buf);
        let num_bins = r.read_u16_le().map_err(crate::error::Error::from)? as usize;
        let escape_freq = r.read_u16_le().map_err(crate::error::Error::from)? as u32;
        let mut values = Vec::with_capacity(num_bins);
        let mut freqs = Vec::with_capacity(num_bins);
        let mut lookup = HashMap::with_capacity(num_bins);
        for i in 0..num_bins {
            let value = r.read_i32_le().map_err(crate::error::Error::from)?;
            let freq = r.read_u16_le().map_err(crate::error::Error::from)? as u32;
            values.push(value);
            freqs.push(freq.max(1));
            lookup.insert(value, i);
        }
        if r.offset() > buf.len() {
            return Err(CodecError::ReadFailed { offset: r.offset(), reason: "model table truncated".into() }.into());
        }
        let consumed = r.offset();
        Ok((Self { values, freqs, escape_freq: escape_freq.max(1), lookup }, consumed))
    }
}
