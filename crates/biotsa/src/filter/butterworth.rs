// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Butterworth IIR design (spec §4.B).
//!
//! Pipeline: analog lowpass prototype poles on the left half-plane, a
//! frequency transform (lowpass/highpass/bandpass/bandstop) applied directly
//! to the pole/zero set, a prewarped bilinear transform into the z-plane,
//! then expansion of the z-plane pole and zero sets into real polynomial
//! coefficients via repeated multiplication of conjugate-paired factors.
//! This produces the same transfer function as a state-space
//! balance/Hessenberg/QR eigen-decomposition route would, without needing a
//! general-purpose eigensolver for a problem this fits in closed form.

use crate::error::{Error, Result};
use crate::filter::complex::Complex64;

/// Band shape being designed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

/// Numerator/denominator coefficients of a digital IIR filter, highest
/// power first, length `order * n_cutoffs + 1` as specified.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoeffs {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

/// Auto-select filter order from the cutoff-to-sampling-frequency ratio
/// (spec §4.B+: order 4 at/above the threshold, order 3 below).
pub fn select_order(cutoff_hz: f64, sampling_frequency: f64) -> usize {
    if sampling_frequency <= 0.0 {
        return 3;
    }
    let ratio = cutoff_hz / sampling_frequency;
    if ratio >= crate::config::ORDER_4_RATIO_THRESHOLD {
        4
    } else {
        3
    }
}

fn analog_prototype_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let theta = std::f64::consts::PI * (2.0 * k as f64 + order as f64 + 1.0) / (2.0 * order as f64);
            Complex64::from_polar(1.0, theta)
        })
        .collect()
}

fn prewarp(cutoff_hz: f64, fs: f64) -> f64 {
    2.0 * fs * (std::f64::consts::PI * cutoff_hz / fs).tan()
}

/// Apply the frequency transform to the normalized analog prototype,
/// returning `(poles, zeros)` in the s-plane for the requested band shape.
fn frequency_transform(kind: FilterKind, order: usize, cutoffs: &[f64], fs: f64) -> Result<(Vec<Complex64>, Vec<Complex64>)> {
    let proto = analog_prototype_poles(order);

    match kind {
        FilterKind::Lowpass => {
            let wc = prewarp(cutoffs[0], fs);
            let poles = proto.iter().map(|&p| p * wc).collect();
            let zeros = Vec::new();
            Ok((poles, zeros))
        }
        FilterKind::Highpass => {
            let wc = prewarp(cutoffs[0], fs);
            let poles = proto.iter().map(|&p| Complex64::from(wc) / p).collect();
            let zeros = vec![Complex64::ZERO; order];
            Ok((poles, zeros))
        }
        FilterKind::Bandpass => {
            let (fc_lo, fc_hi) = (cutoffs[0], cutoffs[1]);
            if fc_lo >= fc_hi {
                return Err(Error::BadCutoffs("bandpass requires fc_low < fc_high".into()));
            }
            let w_lo = prewarp(fc_lo, fs);
            let w_hi = prewarp(fc_hi, fs);
            let bw = w_hi - w_lo;
            let w0_sq = w_lo * w_hi;
            let mut poles = Vec::with_capacity(order * 2);
            for &p in &proto {
                let pb = p * bw;
                let disc = (pb * pb - Complex64::from(4.0 * w0_sq)).sqrt();
                poles.push((pb + disc) / 2.0);
                poles.push((pb - disc) / 2.0);
            }
            let zeros = vec![Complex64::ZERO; order];
            Ok((poles, zeros))
        }
        FilterKind::Bandstop => {
            let (fc_lo, fc_hi) = (cutoffs[0], cutoffs[1]);
            if fc_lo >= fc_hi {
                return Err(Error::BadCutoffs("bandstop requires fc_low < fc_high".into()));
            }
            let w_lo = prewarp(fc_lo, fs);
            let w_hi = prewarp(fc_hi, fs);
            let bw = w_hi - w_lo;
            let w0_sq = w_lo * w_hi;
            let w0 = w0_sq.sqrt();
            let mut poles = Vec::with_capacity(order * 2);
            for &p in &proto {
                let pb = Complex64::from(bw) / p;
                let disc = (pb * pb - Complex64::from(4.0 * w0_sq)).sqrt();
                poles.push((pb + disc) / 2.0);
                poles.push((pb - disc) / 2.0);
            }
            let mut zeros = Vec::with_capacity(order * 2);
            for _ in 0..order {
                zeros.push(Complex64::new(0.0, w0));
                zeros.push(Complex64::new(0.0, -w0));
            }
            Ok((poles, zeros))
        }
    }
}

/// Bilinear-transform one s-plane root into the z-plane, given `fs2 = 2*fs`.
fn bilinear(root: Complex64, fs2: f64) -> Complex64 {
    (Complex64::from(fs2) + root) / (Complex64::from(fs2) - root)
}

/// Expand a list of (possibly complex-conjugate-paired) roots into a real
/// monic polynomial `prod(z - root_i)`, highest power first.
fn roots_to_poly(roots: &[Complex64], total_degree: usize) -> Vec<f64> {
    let mut coeffs = vec![Complex64::ONE];
    for &r in roots {
        let mut next = vec![Complex64::ZERO; coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] = next[i] + c;
            next[i + 1] = next[i + 1] - c * r;
        }
        coeffs = next;
    }
    // Zeros at infinity (fewer finite roots than the target degree, e.g. the
    // digital lowpass/bandpass numerator) pad with leading zero coefficients
    // once we reverse into ascending order below — instead we just right-pad
    // with (z - 1) factors is wrong, so pad with trailing zero terms in the
    // *lowest*-power slots, which for a causal FIR-style numerator means
    // leading zeros in highest-power-first order.
    let mut real: Vec<f64> = coeffs.iter().map(|c| c.re).collect();
    while real.len() < total_degree + 1 {
        real.insert(0, 0.0);
    }
    real
}

/// Design Butterworth filter coefficients for `order` and `cutoffs` (one
/// value for lowpass/highpass, two for bandpass/bandstop) at `fs`.
pub fn design(kind: FilterKind, order: usize, cutoffs: &[f64], fs: f64) -> Result<FilterCoeffs> {
    if order == 0 {
        return Err(Error::BadOrder(order));
    }
    let expected_cutoffs = match kind {
        FilterKind::Lowpass | FilterKind::Highpass => 1,
        FilterKind::Bandpass | FilterKind::Bandstop => 2,
    };
    if cutoffs.len() != expected_cutoffs {
        return Err(Error::BadCutoffs(format!(
            "{kind:?} requires {expected_cutoffs} cutoff(s), got {}",
            cutoffs.len()
        )));
    }
    if fs <= 0.0 || cutoffs.iter().any(|&c| c <= 0.0 || c >= fs / 2.0) {
        return Err(Error::BadCutoffs("cutoffs must be in (0, fs/2)".into()));
    }

    let (s_poles, s_zeros) = frequency_transform(kind, order, cutoffs, fs)?;
    let fs2 = 2.0 * fs;

    let z_poles: Vec<Complex64> = s_poles.iter().map(|&p| bilinear(p, fs2)).collect();
    let degree = z_poles.len();
    let z_zeros: Vec<Complex64> = match kind {
        // Zeros at s = infinity map to z = -1.
        FilterKind::Lowpass => vec![Complex64::new(-1.0, 0.0); degree],
        FilterKind::Highpass => vec![Complex64::new(1.0, 0.0); s_zeros.len()],
        FilterKind::Bandpass => vec![Complex64::new(-1.0, 0.0); s_zeros.len()]
            .into_iter()
            .chain(std::iter::repeat(Complex64::new(1.0, 0.0)).take(degree.saturating_sub(s_zeros.len())))
            .collect(),
        FilterKind::Bandstop => s_zeros.iter().map(|&z| bilinear(z, fs2)).collect(),
    };

    let mut a = roots_to_poly(&z_poles, degree);
    let mut b = roots_to_poly(&z_zeros, degree);

    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(Error::FilterDesignNonFinite);
    }

    // Normalize gain so the passband reference frequency has unit response:
    // DC (z=1) for lowpass/bandstop, Nyquist (z=-1) for highpass, and the
    // geometric center frequency for bandpass.
    let reference_z = match kind {
        FilterKind::Lowpass | FilterKind::Bandstop => Complex64::new(1.0, 0.0),
        FilterKind::Highpass => Complex64::new(-1.0, 0.0),
        FilterKind::Bandpass => {
            let w0 = prewarp(cutoffs[0], fs).sqrt() * prewarp(cutoffs[1], fs).sqrt();
            bilinear(Complex64::new(0.0, w0), fs2)
        }
    };
    let num_at_ref = eval_poly(&b, reference_z);
    let den_at_ref = eval_poly(&a, reference_z);
    let gain = den_at_ref.abs() / num_at_ref.abs().max(1e-300);
    for v in b.iter_mut() {
        *v *= gain;
    }
    let a0 = a[0];
    for v in a.iter_mut() {
        *v /= a0;
    }
    for v in b.iter_mut() {
        *v /= a0;
    }

    Ok(FilterCoeffs { b, a })
}

fn eval_poly(coeffs: &[f64], z: Complex64) -> Complex64 {
    let mut acc = Complex64::ZERO;
    for &c in coeffs {
        acc = acc * z + Complex64::from(c);
    }
    acc
}
