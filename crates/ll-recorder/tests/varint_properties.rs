// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use ll_recorder::varint::{
    MAX_ENCODED_LEN, decode, encode, encoded_len, read_i64, read_u64, write_i64, write_u64,
    zigzag_decode, zigzag_encode,
};
use proptest::prelude::*;
use std::io::Cursor;

fn boundary_values() -> Vec<u64> {
    let mut values = vec![0, u64::MAX];
    for n in 0..64 {
        values.push(1u64 << n);
        values.push((1u64 << n) - 1);
    }
    values
}

#[test]
fn unsigned_boundaries_roundtrip() {
    for value in boundary_values() {
        let bytes = encode(value);
        assert_eq!(bytes.len(), encoded_len(value), "length of {value}");
        assert_eq!(decode(&bytes).unwrap(), (value, bytes.len()), "value {value}");
    }
}

#[test]
fn signed_boundaries_roundtrip() {
    let mut values = vec![0i64, i64::MIN, i64::MAX, -1];
    for n in 0..63 {
        values.push(1i64 << n);
        values.push((1i64 << n) - 1);
        values.push(-(1i64 << n));
    }
    for value in values {
        let mut out = Vec::new();
        write_i64(&mut out, value).unwrap();
        assert_eq!(read_i64(Cursor::new(&out)).unwrap(), value);
        assert_eq!(zigzag_decode(zigzag_encode(value)), value);
    }
}

#[test]
fn tier_widths_at_limits() {
    assert_eq!(encode((1 << 7) - 1).len(), 1);
    assert_eq!(encode(1 << 7).len(), 2);
    assert_eq!(encode((1 << 14) - 1).len(), 2);
    assert_eq!(encode(1 << 14).len(), 4);
    assert_eq!(encode((1 << 29) - 1).len(), 4);
    assert_eq!(encode(1 << 29).len(), 8);
    assert_eq!(encode((1 << 60) - 1).len(), 8);
    assert_eq!(encode(1 << 60).len(), MAX_ENCODED_LEN);
}

#[test]
fn stream_of_values() {
    let values = boundary_values();
    let mut out = Vec::new();
    for &value in &values {
        write_u64(&mut out, value).unwrap();
    }
    let mut input = Cursor::new(out);
    for &value in &values {
        assert_eq!(read_u64(&mut input).unwrap(), value);
    }
    assert!(read_u64(&mut input).is_err());
}

proptest! {
    #[test]
    fn any_u64_roundtrips(value in any::<u64>()) {
        let bytes = encode(value);
        prop_assert_eq!(decode(&bytes).unwrap(), (value, bytes.len()));
    }

    #[test]
    fn any_i64_roundtrips(value in any::<i64>()) {
        let mut out = Vec::new();
        write_i64(&mut out, value).unwrap();
        prop_assert_eq!(read_i64(Cursor::new(&out)).unwrap(), value);
    }

    #[test]
    fn zigzag_keeps_small_magnitudes_small(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(a)), a);
        if a.unsigned_abs() < b.unsigned_abs() {
            prop_assert!(zigzag_encode(a) < zigzag_encode(b));
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes(value in any::<u64>(), tail in proptest::collection::vec(any::<u8>(), 0..4)) {
        let mut bytes = encode(value);
        let len = bytes.len();
        bytes.extend_from_slice(&tail);
        prop_assert_eq!(decode(&bytes).unwrap(), (value, len));
    }
}
