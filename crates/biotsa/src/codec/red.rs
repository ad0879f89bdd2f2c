// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RED: range-encoded residuals (spec §4.A).
//!
//! Single-pass first differences, entropy-coded against a static order-0
//! model of at most 256 bins. The model table and escape-literal stream
//! occupy the model region; the range-coded symbol stream is the payload.

use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::codec::model::StatModel;
use crate::codec::rangecoder::{RangeDecoder, RangeEncoder};
use crate::error::{CodecError, Error, Result};

fn differences(samples: &[i32]) -> Vec<i32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(samples.len());
    out.push(samples[0]);
    for w in samples.windows(2) {
        out.push(w[1].wrapping_sub(w[0]));
    }
    out
}

fn integrate(first: i32, diffs: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(diffs.len() + 1);
    out.push(first);
    let mut acc = first;
    for &d in diffs {
        acc = acc.wrapping_add(d);
        out.push(acc);
    }
    out
}

/// Encode `samples` as `(model_region_bytes, payload_bytes)`.
pub fn encode(samples: &[i32]) -> Result<(Vec<u8>, Vec<u8>)> {
    if samples.is_empty() {
        return Ok((StatModel::build(&[]).encode_table()?, Vec::new()));
    }
    let diffs = differences(samples);
    // The first raw sample is carried in the model region (fixed i32),
    // the rest are residuals fed through the range coder.
    let residual_tail = &diffs[1..];
    let model = StatModel::build(residual_tail);

    let mut enc = RangeEncoder::new();
    let mut literals: Vec<u8> = Vec::new();
    for &value in residual_tail {
        let (sym, cum, freq, total) = model.lookup_value(value);
        enc.encode(cum, freq, total);
        if model.is_escape(sym) {
            literals.extend_from_slice(&value.to_le_bytes());
        }
    }
    let payload = enc.finish();

    let table = model.encode_table()?;
    let mut model_region = vec![0u8; 4 + table.len() + literals.len()];
    {
        let mut w = WriteCursor::new(&mut model_region);
        w.write_i32_le(diffs[0]).map_err(Error::from)?;
        w.write_bytes(&table).map_err(Error::from)?;
        w.write_bytes(&literals).map_err(Error::from)?;
    }
    Ok((model_region, payload))
}

/// Decode `number_of_samples` i32 samples from `model_region` + `payload`.
pub fn decode(model_region: &[u8], payload: &[u8], number_of_samples: usize) -> Result<Vec<i32>> {
    if number_of_samples == 0 {
        return Ok(Vec::new());
    }
    let mut r = ReadCursor::new(model_region);
    let first = r.read_i32_le().map_err(Error::from)?;
    let table_start = r.offset();
    let (model, table_len) = StatModel::decode_table(&model_region[table_start..])?;
    let mut literal_cursor = ReadCursor::new(&model_region[table_start + table_len..]);

    let residual_count = number_of_samples - 1;
    let mut residuals = Vec::with_capacity(residual_count);
    let mut dec = RangeDecoder::new(payload);
    let total = model.total_freq();
    for _ in 0..residual_count {
        let target = dec.decode_freq(total);
        let (sym, cum, freq) = model.symbol_at(target);
        dec.consume(cum, freq, total);
        let value = if model.is_escape(sym) {
            literal_cursor.read_i32_le().map_err(Error::from)?
        } else {
            model.value_of(sym).ok_or_else(|| {
                Error::Codec(CodecError::ReadFailed { offset: 0, reason: "symbol has no dictionary value".into() })
            })?
        };
        residuals.push(value);
    }

    Ok(integrate(first, &residuals))
}
