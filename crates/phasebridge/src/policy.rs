// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Numeric policy resolution for phase storage.
//!
//! Decoding always rounds in `f64`, so `float32` storage is safe as long as the
//! lattice spacing `2π/M` stays far above `f32` resolution near `2π`. The
//! conservative safe zone is `M ≤ 65536`.
//!
//! The caller's preference is an explicit [`PolicyConfig`] value; there is no
//! process-wide default to mutate.

use serde::{Deserialize, Serialize};

/// Largest alphabet for which narrow (`float32`) storage is declared safe.
pub const NARROW_SAFE_MAX_M: u64 = 65_536;

/// Storage width for materialized phase values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhaseDtype {
    /// IEEE-754 single precision (`float32`).
    #[serde(rename = "float32")]
    Narrow,
    /// IEEE-754 double precision (`float64`).
    #[default]
    #[serde(rename = "float64")]
    Wide,
}

impl PhaseDtype {
    /// Wire name (`"float32"` / `"float64"`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Narrow => "float32",
            Self::Wide => "float64",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float32" => Some(Self::Narrow),
            "float64" => Some(Self::Wide),
            _ => None,
        }
    }
}

impl std::fmt::Display for PhaseDtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns `true` if narrow storage is inside the safe zone for alphabet `m`.
pub fn is_narrow_safe(m: u64) -> bool {
    m <= NARROW_SAFE_MAX_M
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// Chosen storage width.
    pub dtype: PhaseDtype,
    /// Whether the choice guarantees the round-trip contract.
    pub precision_safe: bool,
}

/// Pick the phase storage width for alphabet size `m`.
///
/// | `prefer_narrow` | `m ≤ 65536` | `allow_downgrade` | result |
/// |---|---|---|---|
/// | false | any | any | `(Wide, true)` |
/// | true | yes | any | `(Narrow, true)` |
/// | true | no | true | `(Wide, true)` |
/// | true | no | false | `(Narrow, false)` |
///
/// Total, deterministic and side-effect free; never looks at the data.
pub fn resolve(m: u64, prefer_narrow: bool, allow_downgrade: bool) -> ResolvedPolicy {
    if !prefer_narrow {
        return ResolvedPolicy {
            dtype: PhaseDtype::Wide,
            precision_safe: true,
        };
    }
    if is_narrow_safe(m) {
        return ResolvedPolicy {
            dtype: PhaseDtype::Narrow,
            precision_safe: true,
        };
    }
    if allow_downgrade {
        ResolvedPolicy {
            dtype: PhaseDtype::Wide,
            precision_safe: true,
        }
    } else {
        ResolvedPolicy {
            dtype: PhaseDtype::Narrow,
            precision_safe: false,
        }
    }
}

/// Caller preference passed into [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Ask for `float32` storage.
    pub prefer_narrow: bool,
    /// Silently fall back to `float64` outside the safe zone.
    pub allow_downgrade: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            prefer_narrow: false,
            allow_downgrade: true,
        }
    }
}

impl PolicyConfig {
    /// Prefer narrow storage, downgrading outside the safe zone.
    pub fn narrow() -> Self {
        Self {
            prefer_narrow: true,
            allow_downgrade: true,
        }
    }

    /// Prefer narrow storage even outside the safe zone (explicit unsafe opt-in).
    pub fn narrow_unchecked() -> Self {
        Self {
            prefer_narrow: true,
            allow_downgrade: false,
        }
    }

    /// Resolve this preference for alphabet `m`.
    pub fn resolve(&self, m: u64) -> ResolvedPolicy {
        resolve(m, self.prefer_narrow, self.allow_downgrade)
    }

    /// Returns `true` when resolving for `m` would silently downgrade to wide.
    pub fn downgrades(&self, m: u64) -> bool {
        self.prefer_narrow && self.resolve(m).dtype == PhaseDtype::Wide
    }
}
