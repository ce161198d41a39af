// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic CBOR encoder for the binary container.
//!
//! Definite lengths only, minimal integer heads, map keys sorted by their
//! encoded bytes, floats in the shortest of f16/f32/f64 that is lossless. Floats
//! stay floats even when integral, so `1.0` reads back as a float. Tags are
//! rejected. Reading goes through `ciborium` and accepts any well-formed CBOR.

use ciborium::value::Value;
use half::f16;

use crate::error::PifError;

type Result<T> = std::result::Result<T, PifError>;

pub(crate) fn encode_value(val: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    enc_value(val, &mut out)?;
    Ok(out)
}

fn enc_value(v: &Value, out: &mut Vec<u8>) -> Result<()> {
    match v {
        Value::Bool(b) => out.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => out.push(0xf6),
        Value::Integer(n) => enc_int(i128::from(*n), out),
        Value::Float(f) => enc_float(*f, out),
        Value::Text(s) => {
            write_major(3, s.len() as u64, out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            write_major(2, b.len() as u64, out);
            out.extend_from_slice(b);
        }
        Value::Array(items) => {
            write_major(4, items.len() as u64, out);
            for it in items {
                enc_value(it, out)?;
            }
        }
        Value::Map(entries) => {
            let mut buf: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let mut kb = Vec::new();
                enc_value(k, &mut kb)?;
                buf.push((kb, v));
            }
            buf.sort_by(|a, b| a.0.cmp(&b.0));
            if buf.windows(2).any(|w| w[0].0 == w[1].0) {
                return Err(PifError::Serialization("duplicate map key".into()));
            }
            write_major(5, buf.len() as u64, out);
            for (kb, v) in buf {
                out.extend_from_slice(&kb);
                enc_value(v, out)?;
            }
        }
        Value::Tag(_, _) => {
            return Err(PifError::Serialization("CBOR tags are not allowed".into()))
        }
        _ => {
            return Err(PifError::Serialization(
                "unsupported CBOR simple value".into(),
            ))
        }
    }
    Ok(())
}

fn enc_int(n: i128, out: &mut Vec<u8>) {
    if n >= 0 {
        write_major(0, n as u64, out);
    } else {
        write_major(1, (-1 - n) as u64, out);
    }
}

fn enc_float(f: f64, out: &mut Vec<u8>) {
    if f.is_nan() {
        write_half(f16::NAN, out);
        return;
    }
    let h = f16::from_f64(f);
    if h.to_f64().to_bits() == f.to_bits() {
        write_half(h, out);
        return;
    }
    let single = f as f32;
    if f64::from(single).to_bits() == f.to_bits() {
        out.push(0xfa);
        out.extend_from_slice(&single.to_be_bytes());
    } else {
        out.push(0xfb);
        out.extend_from_slice(&f.to_be_bytes());
    }
}

fn write_half(h: f16, out: &mut Vec<u8>) {
    out.push(0xf9);
    out.extend_from_slice(&h.to_bits().to_be_bytes());
}

fn write_major(major: u8, n: u64, out: &mut Vec<u8>) {
    debug_assert!(major <= 7);
    match n {
        0..=23 => out.push((major << 5) | n as u8),
        24..=0xff => {
            out.push((major << 5) | 24);
            out.push(n as u8);
        }
        0x100..=0xffff => {
            out.push((major << 5) | 25);
            out.extend_from_slice(&(n as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push((major << 5) | 26);
            out.extend_from_slice(&(n as u32).to_be_bytes());
        }
        _ => {
            out.push((major << 5) | 27);
            out.extend_from_slice(&n.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn integer_heads_are_minimal() {
        let cases: [(u64, &[u8]); 4] = [
            (23, &[0x17]),
            (24, &[0x18, 24]),
            (256, &[0x19, 1, 0]),
            (1 << 32, &[0x1b, 0, 0, 0, 1, 0, 0, 0, 0]),
        ];
        for (n, want) in cases {
            assert_eq!(encode_value(&Value::Integer(n.into())).unwrap(), want);
        }
        assert_eq!(encode_value(&Value::Integer((-1i64).into())).unwrap(), [0x20]);
    }

    #[test]
    fn floats_use_shortest_lossless_width() {
        assert_eq!(encode_value(&Value::Float(1.0)).unwrap(), [0xf9, 0x3c, 0x00]);
        assert_eq!(encode_value(&Value::Float(0.1)).unwrap()[0], 0xfb);
        assert_eq!(
            encode_value(&Value::Float(f64::from(0.1f32))).unwrap()[0],
            0xfa
        );
    }

    #[test]
    fn map_keys_sorted_by_encoding() {
        let map = Value::Map(vec![
            (text("meta"), Value::Null),
            (text("amp"), Value::Null),
        ]);
        let bytes = encode_value(&map).unwrap();
        // "amp" (3 chars) encodes shorter than "meta" and sorts first.
        assert_eq!(&bytes[..5], &[0xa2, 0x63, b'a', b'm', b'p']);

        let dup = Value::Map(vec![(text("a"), Value::Null), (text("a"), Value::Null)]);
        assert!(encode_value(&dup).is_err());
    }

    #[test]
    fn output_is_readable_by_ciborium() {
        let v = Value::Map(vec![
            (text("x"), Value::Float(2.5)),
            (text("b"), Value::Bytes(vec![1, 2, 3])),
        ]);
        let bytes = encode_value(&v).unwrap();
        let back: Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        let Value::Map(entries) = back else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, text("b"));
    }

    #[test]
    fn tags_rejected() {
        let tagged = Value::Tag(1, Box::new(Value::Null));
        assert!(encode_value(&tagged).is_err());
    }
}
