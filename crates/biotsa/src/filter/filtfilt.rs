// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Zero-phase forward-reverse filtering (spec §4.B).
//!
//! Edge handling uses reflective padding: `pad_len` samples on each end,
//! where `pad_len` is three samples per pole (`3 * max(a.len(), b.len())`).
//! Padding values are `2*x[0] - x[1+k]` at the front and the mirror at the
//! back. Initial conditions for the direct-form-II transposed filter are
//! solved from the steady-state linear system so the filtered output starts
//! without a startup transient.

use crate::error::{Error, Result};
use crate::filter::butterworth::FilterCoeffs;

fn pad_len(coeffs: &FilterCoeffs) -> usize {
    3 * coeffs.a.len().max(coeffs.b.len())
}

/// Direct-form-II transposed IIR filter, `a`/`b` highest-power-first
/// (already normalized so `a[0] == 1`).
fn lfilter(coeffs: &FilterCoeffs, x: &[f64], zi: &[f64]) -> Vec<f64> {
    let b = &coeffs.b;
    let a = &coeffs.a;
    let n = a.len().max(b.len());
    let mut z = zi.to_vec();
    z.resize(n.saturating_sub(1), 0.0);
    let mut y = Vec::with_capacity(x.len());

    // Coefficients are stored highest-power-first; reindex ascending (b[0] = z^0 term).
    let b_asc: Vec<f64> = (0..n).map(|i| *b.get(b.len() - 1 - i.min(b.len() - 1)).unwrap_or(&0.0)).collect();
    let a_asc: Vec<f64> = (0..n).map(|i| *a.get(a.len() - 1 - i.min(a.len() - 1)).unwrap_or(&0.0)).collect();

    for &xi in x {
        let yi = b_asc[0] * xi + z.first().copied().unwrap_or(0.0);
        for k in 0..z.len() {
            let b_k1 = b_asc.get(k + 1).copied().unwrap_or(0.0);
            let a_k1 = a_asc.get(k + 1).copied().unwrap_or(0.0);
            let next = if k + 1 < z.len() { z[k + 1] } else { 0.0 };
            z[k] = b_k1 * xi - a_k1 * yi + next;
        }
        y.push(yi);
    }
    y
}

/// Initial steady-state condition for a unit step input, solved as in
/// `scipy.signal.lfilter_zi`: `zi` solves `(I - A) zi = B - A[:,0]` for the
/// transposed direct-form-II state-space realization.
fn initial_conditions(coeffs: &FilterCoeffs) -> Vec<f64> {
    let n = coeffs.a.len().max(coeffs.b.len());
    let b_asc: Vec<f64> = (0..n).map(|i| *coeffs.b.get(coeffs.b.len().wrapping_sub(1).wrapping_sub(i)).unwrap_or(&0.0)).collect();
    let a_asc: Vec<f64> = (0..n).map(|i| *coeffs.a.get(coeffs.a.len().wrapping_sub(1).wrapping_sub(i)).unwrap_or(&0.0)).collect();
    let m = n - 1;
    if m == 0 {
        return Vec::new();
    }

    // Build (I - A) zi = B - A*b0 as a dense m x m system and solve by
    // Gaussian elimination with partial pivoting; m is always small
    // (3*order at most), so this is cheap relative to the data length.
    let mut mat = vec![vec![0.0f64; m + 1]; m];
    for i in 0..m {
        for j in 0..m {
            let identity = if i == j { 1.0 } else { 0.0 };
            // A[i][j] for the companion-form transposed realization.
            let a_ij = if i == 0 { -a_asc[j + 1] } else if j + 1 == i { 1.0 } else { 0.0 };
            mat[i][j] = identity - a_ij;
        }
        let rhs = b_asc[i + 1] - a_asc[i + 1] * b_asc[0];
        mat[i][m] = rhs;
    }

    gaussian_solve(&mut mat).unwrap_or_else(|| vec![0.0; m])
}

fn gaussian_solve(mat: &mut [Vec<f64>]) -> Option<Vec<f64>> {
    let n = mat.len();
    for col in 0..n {
        let mut pivot = col;
        for row in (col + 1)..n {
            if mat[row][col].abs() > mat[pivot][col].abs() {
                pivot = row;
            }
        }
        if mat[pivot][col].abs() < 1e-14 {
            return None;
        }
        mat.swap(col, pivot);
        let pivot_val = mat[col][col];
        for k in col..=n {
            mat[col][k] /= pivot_val;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = mat[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                mat[row][k] -= factor * mat[col][k];
            }
        }
    }
    Some(mat.iter().map(|row| row[n]).collect())
}

fn reflect_pad(x: &[f64], pad: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(x.len() + 2 * pad);
    for k in (0..pad).rev() {
        out.push(2.0 * x[0] - x[(1 + k).min(x.len() - 1)]);
    }
    out.extend_from_slice(x);
    let last = x.len() - 1;
    for k in 0..pad {
        let idx = last.saturating_sub(1 + k);
        out.push(2.0 * x[last] - x[idx]);
    }
    out
}

/// Apply `coeffs` forward then backward over `data`, writing the zero-phase
/// result into `out`. `out` may alias `data`'s storage at the padding offset
/// the caller reserved (see module docs); here `data`/`out` are plain
/// slices, so the caller decides whether a copy is needed.
pub fn filtfilt(coeffs: &FilterCoeffs, data: &[f64], out: &mut [f64]) -> Result<()> {
    let pad = pad_len(coeffs);
    if data.len() < pad {
        // Leave the caller with the unfiltered input rather than a
        // half-written buffer (spec §4.B: "copying the input unchanged to
        // the output").
        let copy_len = data.len().min(out.len());
        out[..copy_len].copy_from_slice(&data[..copy_len]);
        return Err(Error::DataTooShortForPad { data_len: data.len(), pad_len: pad });
    }
    if out.len() != data.len() {
        return Err(Error::InvalidDimensions(format!(
            "filtfilt output length {} does not match input length {}",
            out.len(),
            data.len()
        )));
    }

    let padded = reflect_pad(data, pad);
    let zi = initial_conditions(coeffs);

    let zi_fwd: Vec<f64> = zi.iter().map(|&v| v * padded[0]).collect();
    let forward = lfilter(coeffs, &padded, &zi_fwd);

    let mut reversed = forward.clone();
    reversed.reverse();
    let zi_bwd: Vec<f64> = zi.iter().map(|&v| v * reversed[0]).collect();
    let mut backward = lfilter(coeffs, &reversed, &zi_bwd);
    backward.reverse();

    out.copy_from_slice(&backward[pad..pad + data.len()]);
    Ok(())
}

/// Required padding length for `coeffs`, exposed so callers can size scratch
/// buffers with padding built in (spec §4.B: "skip the initial copy").
pub fn required_pad_len(coeffs: &FilterCoeffs) -> usize {
    pad_len(coeffs)
}
