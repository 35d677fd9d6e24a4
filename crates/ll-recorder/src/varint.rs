// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Self-describing variable-length integer encoding
//
// The number of leading one bits in the head byte selects the tier; the
// remaining head bits carry the most significant value bits and the
// continuation bytes follow big-endian.
//
//   0xxxxxxx                       values < 2^7
//   10xxxxxx + 1 byte              values < 2^14
//   110xxxxx + 3 bytes             values < 2^29
//   1110xxxx + 7 bytes             values < 2^60
//   11111111 + 8 bytes             everything else
//
// Head bytes 0xF0..=0xFE are reserved and rejected on decode.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Longest possible encoding (raw tier)
pub const MAX_ENCODED_LEN: usize = 9;

/// Head byte of the raw 8-byte tier
const RAW_HEADER: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum VarintError {
    #[error("truncated varint: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("reserved varint header byte 0x{0:02X}")]
    ReservedHeader(u8),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Number of bytes `encode` produces for `value`
pub fn encoded_len(value: u64) -> usize {
    if value < 1 << 7 {
        1
    } else if value < 1 << 14 {
        2
    } else if value < 1 << 29 {
        4
    } else if value < 1 << 60 {
        8
    } else {
        MAX_ENCODED_LEN
    }
}

pub fn encode(value: u64) -> Vec<u8> {
    let len = encoded_len(value);
    let be = value.to_be_bytes();
    let mut out = Vec::with_capacity(len);
    match len {
        1 => out.push(value as u8),
        2 => {
            out.push(0x80 | (value >> 8) as u8);
            out.push(value as u8);
        }
        4 => {
            out.push(0xC0 | (value >> 24) as u8);
            out.extend_from_slice(&be[5..]);
        }
        8 => {
            out.push(0xE0 | (value >> 56) as u8);
            out.extend_from_slice(&be[1..]);
        }
        _ => {
            out.push(RAW_HEADER);
            out.extend_from_slice(&be);
        }
    }
    out
}

/// Total encoded length and the value bits carried by a head byte
fn tier(head: u8) -> Result<(usize, u64), VarintError> {
    match head.leading_ones() {
        0 => Ok((1, head as u64)),
        1 => Ok((2, (head & 0x3F) as u64)),
        2 => Ok((4, (head & 0x1F) as u64)),
        3 => Ok((8, (head & 0x0F) as u64)),
        _ if head == RAW_HEADER => Ok((MAX_ENCODED_LEN, 0)),
        _ => Err(VarintError::ReservedHeader(head)),
    }
}

fn assemble(len: usize, high: u64, tail: u64) -> u64 {
    if len == 1 {
        high
    } else if len == MAX_ENCODED_LEN {
        tail
    } else {
        (high << (8 * (len - 1))) | tail
    }
}

/// Decode one value from the front of `bytes`, returning it with the number
/// of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize), VarintError> {
    let head = *bytes
        .first()
        .ok_or(VarintError::Truncated { needed: 1, available: 0 })?;
    let (len, high) = tier(head)?;
    if bytes.len() < len {
        return Err(VarintError::Truncated {
            needed: len,
            available: bytes.len(),
        });
    }
    let tail = if len > 1 {
        BigEndian::read_uint(&bytes[1..len], len - 1)
    } else {
        0
    };
    Ok((assemble(len, high, tail), len))
}

pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn write_u64<W: Write>(mut w: W, value: u64) -> io::Result<()> {
    w.write_all(&encode(value))
}

pub fn write_i64<W: Write>(w: W, value: i64) -> io::Result<()> {
    write_u64(w, zigzag_encode(value))
}

pub fn read_u64<R: Read>(mut r: R) -> Result<u64, VarintError> {
    let head = r.read_u8()?;
    let (len, high) = tier(head)?;
    let tail = if len > 1 {
        r.read_uint::<BigEndian>(len - 1)?
    } else {
        0
    };
    Ok(assemble(len, high, tail))
}

pub fn read_i64<R: Read>(r: R) -> Result<i64, VarintError> {
    read_u64(r).map(zigzag_decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_tier_layouts() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(0x7F), vec![0x7F]);
        assert_eq!(encode(0x80), vec![0x80, 0x80]);
        assert_eq!(encode(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(encode(0x4000), vec![0xC0, 0x00, 0x40, 0x00]);
        assert_eq!(encode((1 << 29) - 1), vec![0xDF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            encode(1 << 29),
            vec![0xE0, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00]
        );
        assert_eq!(encode((1 << 60) - 1)[0], 0xEF);
        assert_eq!(
            encode(u64::MAX),
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(encode(1 << 60).len(), MAX_ENCODED_LEN);
    }

    #[test]
    fn test_decode_reports_consumed_bytes() {
        let mut buf = encode(300);
        buf.extend_from_slice(&encode(5));
        let (first, used) = decode(&buf).unwrap();
        assert_eq!((first, used), (300, 2));
        let (second, used2) = decode(&buf[used..]).unwrap();
        assert_eq!((second, used2), (5, 1));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode(&[]),
            Err(VarintError::Truncated { needed: 1, available: 0 })
        ));
        assert!(matches!(
            decode(&[0xC0, 0x01]),
            Err(VarintError::Truncated { needed: 4, available: 2 })
        ));
    }

    #[test]
    fn test_decode_reserved_header() {
        for head in 0xF0..=0xFEu8 {
            assert!(matches!(
                decode(&[head, 0, 0, 0, 0, 0, 0, 0, 0]),
                Err(VarintError::ReservedHeader(h)) if h == head
            ));
        }
    }

    #[test]
    fn test_zigzag_small_magnitudes() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn test_stream_roundtrip() {
        let values = [0i64, -1, 63, -64, 64, 1 << 40, i64::MIN, i64::MAX];
        let mut buf = Vec::new();
        for v in values {
            write_i64(&mut buf, v).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        for v in values {
            assert_eq!(read_i64(&mut cursor).unwrap(), v);
        }
        assert!(matches!(read_u64(&mut cursor), Err(VarintError::Io(_))));
    }
}
