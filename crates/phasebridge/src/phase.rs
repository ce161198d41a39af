// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lattice arithmetic on the unit circle.
//!
//! Symbol `n` of an alphabet of size `M` sits at `θ = (2π/M)·n`. Both directions
//! are computed in `f64` whatever the storage width.

use crate::model::PhaseArray;
use crate::symbols::SymbolArray;

/// `2π` in double precision.
pub const TWO_PI: f64 = std::f64::consts::TAU;

/// Angle for symbol `n` on an `m`-point lattice, wrapped into `[0, 2π)`.
#[inline]
pub fn lattice_phase(n: u64, m: u64) -> f64 {
    wrap((TWO_PI / m as f64) * n as f64)
}

/// Nearest lattice index for `theta`.
///
/// `floor((M/2π)·θ + 0.5) mod M`: ties round up, and the top edge folds back to 0.
#[inline]
pub fn lattice_index(theta: f64, m: u64) -> u64 {
    let scaled = ((m as f64 / TWO_PI) * theta + 0.5).floor();
    if scaled <= 0.0 {
        return 0;
    }
    (scaled as u64) % m
}

/// Fold a finite angle into `[0, 2π)`.
#[inline]
pub fn wrap(theta: f64) -> f64 {
    let r = theta.rem_euclid(TWO_PI);
    if r >= TWO_PI {
        0.0
    } else {
        r
    }
}

/// Narrow a wrapped angle to `f32`, keeping it strictly below `2π`.
///
/// Rounding to single precision can land on `f32(2π)`, which is larger than
/// `2π` in double precision.
#[inline]
pub fn narrow(theta: f64) -> f32 {
    let n = theta as f32;
    if f64::from(n) >= TWO_PI {
        0.0
    } else {
        n
    }
}

/// Borrowing iterator over the phase values of an instance, in `f64`.
///
/// For a lazy payload each angle is computed on demand from its symbol; no
/// angle array is ever allocated.
#[derive(Debug, Clone)]
pub struct Phases<'a> {
    source: Source<'a>,
    index: usize,
}

#[derive(Debug, Clone)]
enum Source<'a> {
    Narrow(&'a [f32]),
    Wide(&'a [f64]),
    Lattice { symbols: &'a SymbolArray, m: u64 },
}

impl<'a> Phases<'a> {
    pub(crate) fn stored(array: &'a PhaseArray) -> Self {
        let source = match array {
            PhaseArray::Narrow(v) => Source::Narrow(v),
            PhaseArray::Wide(v) => Source::Wide(v),
        };
        Self { source, index: 0 }
    }

    pub(crate) fn lattice(symbols: &'a SymbolArray, m: u64) -> Self {
        Self {
            source: Source::Lattice { symbols, m },
            index: 0,
        }
    }

    fn total(&self) -> usize {
        match &self.source {
            Source::Narrow(v) => v.len(),
            Source::Wide(v) => v.len(),
            Source::Lattice { symbols, .. } => symbols.len(),
        }
    }
}

impl Iterator for Phases<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let i = self.index;
        let value = match &self.source {
            Source::Narrow(v) => v.get(i).copied().map(f64::from),
            Source::Wide(v) => v.get(i).copied(),
            Source::Lattice { symbols, m } => symbols.get(i).map(|n| lattice_phase(n, *m)),
        }?;
        self.index += 1;
        Some(value)
    }

    fn nth(&mut self, n: usize) -> Option<f64> {
        self.index = self.index.saturating_add(n);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.total().saturating_sub(self.index);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for Phases<'_> {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn lattice_points_m256() {
        assert_eq!(lattice_phase(0, 256), 0.0);
        assert!((lattice_phase(1, 256) - 0.024_543_692_606_170_26).abs() < 1e-15);
        assert!((lattice_phase(255, 256) - 6.258_641_614_573_416).abs() < 1e-12);
    }

    #[test]
    fn index_inverts_phase_at_extremes() {
        for m in [2u64, 3, 256, 65_536, 70_000, 1 << 32] {
            for n in [0, 1, m / 2, m - 2, m - 1] {
                assert_eq!(lattice_index(lattice_phase(n, m), m), n, "m={m} n={n}");
            }
        }
    }

    #[test]
    fn rounds_to_nearest_and_top_edge_folds() {
        let half = TWO_PI / 8.0;
        assert_eq!(lattice_index(half + 1e-9, 4), 1);
        assert_eq!(lattice_index(half - 1e-9, 4), 0);
        assert_eq!(lattice_index(TWO_PI - 1e-12, 4), 0);
    }

    #[test]
    fn narrow_never_reaches_two_pi() {
        let just_below = TWO_PI - 1e-9;
        assert!(f64::from(narrow(just_below)) < TWO_PI);
        assert_eq!(wrap(TWO_PI), 0.0);
        assert!((wrap(-0.5) - (TWO_PI - 0.5)).abs() < 1e-15);
    }

    #[test]
    fn lazy_iterator_matches_lattice() {
        let symbols = SymbolArray::U8(vec![0, 64, 128]);
        let got: Vec<f64> = Phases::lattice(&symbols, 256).collect();
        assert_eq!(got.len(), 3);
        assert!((got[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert!((got[2] - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(Phases::lattice(&symbols, 256).len(), 3);
    }
}
