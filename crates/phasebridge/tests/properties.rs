// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests for the codec and the text container.
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use phasebridge::phase::{lattice_index, lattice_phase};
use phasebridge::{
    decode, encode, EncodeOptions, PayloadMode, Pif, PolicyConfig, Schema, TWO_PI,
};

fn alphabet_and_symbols() -> impl Strategy<Value = (u64, Vec<u64>)> {
    (2u64..=(1 << 32)).prop_flat_map(|m| (Just(m), prop::collection::vec(0..m, 0..64)))
}

proptest! {
    #[test]
    fn roundtrip_holds_for_any_alphabet(
        (m, x) in alphabet_and_symbols(),
        lazy in any::<bool>(),
        narrow in any::<bool>(),
    ) {
        let opts = EncodeOptions {
            mode: if lazy { PayloadMode::Lazy } else { PayloadMode::Eager },
            policy: if narrow { PolicyConfig::narrow() } else { PolicyConfig::default() },
            ..EncodeOptions::default()
        };
        let pif = encode(&x, &Schema::uint(m), &opts).unwrap();
        let decoded = decode(&pif).unwrap().into_verified().unwrap();
        prop_assert_eq!(decoded.to_u64_vec(), x);
    }

    #[test]
    fn lattice_points_are_fixed_points(m in 2u64..=(1 << 32), seed in any::<u64>()) {
        let n = seed % m;
        let theta = lattice_phase(n, m);
        prop_assert!((0.0..TWO_PI).contains(&theta));
        prop_assert_eq!(lattice_index(theta, m), n);
    }

    #[test]
    fn text_roundtrip_preserves_symbols((m, x) in alphabet_and_symbols()) {
        let pif = encode(&x, &Schema::uint(m), &EncodeOptions::lazy()).unwrap();
        let back = Pif::from_text(&pif.to_text().unwrap(), true).unwrap();
        prop_assert_eq!(&back, &pif);
    }

    #[test]
    fn arbitrary_text_never_panics(text in ".{0,256}") {
        let _ = Pif::from_text(&text, true);
    }
}
