// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Phase Interchange Format (PIF).
//!
//! `phasebridge` maps a finite alphabet of unsigned integers `{0, …, M-1}` onto
//! evenly spaced angles on the unit circle and back again, exactly.
//!
//! # Layers
//!
//! - [`policy`] picks the storage width for phase values (`float32` vs `float64`).
//! - [`codec`] is the canonical bijection `θ = (2π/M)·n` and its inverse.
//! - [`model`] holds the immutable in-memory [`Pif`] instance.
//! - [`wire`] converts a [`Pif`] to/from JSON text, CBOR, MessagePack and a ZIP bundle.
//! - [`validate`] and [`integrity`] gate every entry point above.
//! - [`coherence`] is a read-only diagnostic over decoded phases.
//!
//! # Round-trip contract
//!
//! For `meta.note == no_processing`, `decode(encode(x)) == x` element-wise, for both
//! payload modes and both storage widths (narrow only inside the safe zone
//! `M ≤ 65536`). The final rounding step always runs in `f64`.
//!
//! ```
//! use phasebridge::{Schema, S1PhaseCodec};
//!
//! # fn main() -> Result<(), phasebridge::PifError> {
//! let codec = S1PhaseCodec::new(256)?;
//! let pif = codec.encode(&[0u8, 1, 255], &Schema::uint(256))?;
//! let text = pif.to_text()?;
//!
//! let back = phasebridge::Pif::from_text(&text, true)?;
//! assert_eq!(codec.decode(&back)?.to_u64_vec(), vec![0, 1, 255]);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod codec;
pub mod coherence;
pub mod error;
pub mod integrity;
pub mod model;
pub mod phase;
pub mod policy;
pub mod symbols;
pub mod validate;
pub mod wire;

pub use codec::{
    decode, encode, verify_roundtrip, Decoded, EncodeOptions, IntegrityStatus, PayloadMode,
    RoundTripReport, S1PhaseCodec,
};
pub use coherence::{kappa, kappa_windowed, WindowedKappa};
pub use error::{ErrorKind, IntegrityError, PifError};
pub use integrity::{ContentHash, HashAlgorithm};
pub use model::{
    Alphabet, Amplitude, Meta, Note, NumericPolicy, Payload, PhaseArray, Pif, Sampling, Schema,
    FORMAT_VERSION,
};
pub use phase::{Phases, TWO_PI};
pub use policy::{resolve, PhaseDtype, PolicyConfig, ResolvedPolicy};
pub use symbols::{SymbolArray, SymbolWidth, UnsignedSymbol};
pub use validate::{validate, ValidationReport, Violation};
pub use wire::Format;
