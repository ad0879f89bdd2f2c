// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PRED: predictive RED (spec §4.A).
//!
//! The residual stream is partitioned into three categories by the sign
//! class of the immediately prior sample (negative / zero / positive), each
//! with its own static statistics model; categories are interleaved in a
//! single range-coded stream so decode can proceed sample-by-sample,
//! picking the category for each symbol from the sample it just decoded.

use crate::codec::cursor::{ReadCursor, WriteCursor};
use crate::codec::model::StatModel;
use crate::codec::rangecoder::{RangeDecoder, RangeEncoder};
use crate::error::{CodecError, Error, Result};

const NUM_CATEGORIES: usize = 3;

fn category_of(prev_sample: i32) -> usize {
    match prev_sample.signum() {
        -1 => 0,
        0 => 1,
        _ => 2,
    }
}

pub fn encode(samples: &[i32]) -> Result<(Vec<u8>, Vec<u8>)> {
    if samples.len() < 2 {
        let models: Vec<StatModel> = (0..NUM_CATEGORIES).map(|_| StatModel::build(&[])).collect();
        return Ok((serialize_models(samples.first().copied().unwrap_or(0), &models, &[])?, Vec::new()));
    }

    let mut residuals_by_category: [Vec<i32>; NUM_CATEGORIES] = Default::default();
    for w in samples.windows(2) {
        let cat = category_of(w[0]);
        residuals_by_category[cat].push(w[1].wrapping_sub(w[0]));
    }
    let models: Vec<StatModel> = residuals_by_category.iter().map(|r| StatModel::build(r)).collect();

    let mut enc = RangeEncoder::new();
    let mut literals = Vec::new();
    for w in samples.windows(2) {
        let cat = category_of(w[0]);
        let residual = w[1].wrapping_sub(w[0]);
        let model = &models[cat];
        let (sym, cum, freq, total) = model.lookup_value(residual);
        enc.encode(cum, freq, total);
        if model.is_escape(sym) {
            literals.extend_from_slice(&residual.to_le_bytes());
        }
    }
    let payload = enc.finish();
    let model_region = serialize_models(samples[0], &models, &literals)?;
    Ok((model_region, payload))
}

fn serialize_models(first: i32, models: &[StatModel], literals: &[u8]) -> Result<Vec<u8>> {
    let mut tables = Vec::new();
    for m in models {
        tables.push(m.encode_table()?);
    }
    let total_len = 4 + tables.iter().map(|t| t.len()).sum::<usize>() + literals.len();
    let mut buf = vec![0u8; total_len];
    let mut w = WriteCursor::new(&mut buf);
    w.write_i32_le(first).map_err(Error::from)?;
    for t in &tables {
        w.write_bytes(t).map_err(Error::from)?;
    }
    w.write_bytes(literals).map_err(Error::from)?;
    Ok(buf)
}

pub fn decode(model_region: &[u8], payload: &[u8], number_of_samples: usize) -> Result<Vec<i32>> {
    if number_of_samples == 0 {
        return Ok(Vec::new());
    }
    let mut r = ReadCursor::new(model_region);
    let first = r.read_i32_le().map_err(Error::from)?;
    if number_of_samples == 1 {
        return Ok(vec![first]);
    }

    let mut models = Vec::with_capacity(NUM_CATEGORIES);
    let mut offset = r.offset();
    for _ in 0..NUM_CATEGORIES {
        let (model, consumed) = StatModel::decode_table(&model_region[offset..])?;
        offset += consumed;
        models.push(model);
    }
    let mut literal_cursor = ReadCursor::new(&model_region[offset..]);

    let mut samples = Vec::with_capacity(number_of_samples);
    samples.push(first);
    let mut dec = RangeDecoder::new(payload);
    let mut prev = first;
    for _ in 1..number_of_samples {
        let cat = category_of(prev);
        let model = &models[cat];
        let total = model.total_freq();
        let target = dec.decode_freq(total);
        let (sym, cum, freq) = model.symbol_at(target);
        dec.consume(cum, freq, total);
        let residual = if model.is_escape(sym) {
            literal_cursor.read_i32_le().map_err(Error::from)?
        } else {
            model.value_of(sym).ok_or_else(|| {
                Error::Codec(CodecError::ReadFailed { offset: 0, reason: "symbol has no dictionary value".into() })
            })?
        };
        let current = prev.wrapping_add(residual);
        samples.push(current);
        prev = current;
    }
    Ok(samples)
}
