// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Phase coherence `κ = |Σ w·e^{iθ} / Σ w|`.
//!
//! Read-only: phases are pulled through [`Pif::phases`], so
//! a lazy instance is never materialized. Weights come from a per-sample
//! amplitude when `weighted` is set; a scalar amplitude means unweighted.

use crate::error::PifError;
use crate::model::{Amplitude, Pif};

/// Windowed coherence series.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedKappa {
    /// Window centres in sample units, `start + (win - 1) / 2`.
    pub centers: Vec<f64>,
    /// Coherence per window.
    pub kappas: Vec<f64>,
}

/// Coherence over the whole instance.
pub fn kappa(p: &Pif, weighted: bool) -> Result<f64, PifError> {
    coherence_range(p, 0, p.len(), weights(p, weighted))
}

/// Coherence over sliding windows of `win` samples advanced by `hop`.
///
/// When `win` exceeds the length, a single window covers the whole sequence
/// and its centre is `(N - 1) / 2`.
pub fn kappa_windowed(
    p: &Pif,
    win: usize,
    hop: usize,
    weighted: bool,
) -> Result<WindowedKappa, PifError> {
    if win == 0 || hop == 0 {
        return Err(PifError::Diagnostic(
            "win and hop must be positive".to_owned(),
        ));
    }
    let n = p.len();
    let w = weights(p, weighted);
    if win > n {
        let k = coherence_range(p, 0, n, w)?;
        return Ok(WindowedKappa {
            centers: vec![n.saturating_sub(1) as f64 / 2.0],
            kappas: vec![k],
        });
    }

    let mut out = WindowedKappa {
        centers: Vec::new(),
        kappas: Vec::new(),
    };
    let mut start = 0;
    while start + win <= n {
        out.centers.push(start as f64 + (win - 1) as f64 / 2.0);
        out.kappas.push(coherence_range(p, start, start + win, w)?);
        start += hop;
    }
    Ok(out)
}

fn weights(p: &Pif, weighted: bool) -> Option<&[f64]> {
    match p.amplitude() {
        Amplitude::PerSample(v) if weighted => Some(v),
        _ => None,
    }
}

fn coherence_range(
    p: &Pif,
    start: usize,
    end: usize,
    weights: Option<&[f64]>,
) -> Result<f64, PifError> {
    if start >= end {
        return Err(PifError::Diagnostic(
            "coherence of an empty sequence".to_owned(),
        ));
    }
    let (mut re, mut im, mut total) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (offset, theta) in p.phases().skip(start).take(end - start).enumerate() {
        let w = match weights {
            Some(ws) => *ws.get(start + offset).ok_or_else(|| {
                PifError::Diagnostic("amplitude shorter than the payload".to_owned())
            })?,
            None => 1.0,
        };
        let (s, c) = theta.sin_cos();
        re += w * c;
        im += w * s;
        total += w;
    }
    if !(total.is_finite() && total > 0.0) {
        return Err(PifError::Diagnostic(
            "weights must sum to a positive finite value".to_owned(),
        ));
    }
    Ok(re.hypot(im) / total)
}
