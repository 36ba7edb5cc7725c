//! Decoding of the factory calibration blocks.
//!
//! The part stores its coefficients packed as MSB/LSB pairs in sign-magnitude form:
//! the top bit of the high byte is the sign, the remaining bits are the magnitude.
//! H4 and H5 are 12-bit values that share a middle byte at nibble granularity.

use std::collections::HashMap;
use std::convert::TryFrom;

use log::debug;

use crate::error::{Error, Result};
use crate::registers::Register;
use crate::structs::CalibrationSet;

/// Byte offsets of an MSB/LSB pair inside a calibration block.
#[derive(Clone, Copy)]
struct Pair {
    msb: usize,
    lsb: usize,
}

const fn pair(msb: usize, lsb: usize) -> Pair {
    Pair { msb, lsb }
}

// Block A, 0x88 - 0xA1.
const T1: Pair = pair(1, 0);
const T2: Pair = pair(3, 2);
const T3: Pair = pair(5, 4);
const P1: Pair = pair(7, 6);
const P2: Pair = pair(9, 8);
const P3: Pair = pair(11, 10);
const P4: Pair = pair(13, 12);
const P5: Pair = pair(15, 14);
const P6: Pair = pair(17, 16);
const P7: Pair = pair(19, 18);
const P8: Pair = pair(21, 20);
const P9: Pair = pair(23, 22);
const H1: usize = 25;

// Block B, 0xE1 - 0xE8.
const H2: Pair = pair(1, 0);
const H3: usize = 2;
const H4_HIGH: usize = 3;
const H45_SHARED: usize = 4;
const H5_HIGH: usize = 5;
const H6: usize = 6;

/// Calibration keys in persistence order.
pub const KEYS: [&str; 18] = [
    "T1", "T2", "T3", "P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "H1", "H2", "H3",
    "H4", "H5", "H6",
];

/// Largest magnitude of the 12-bit H4/H5 coefficients.
const NIBBLE_PACKED_MAX: i64 = 0x7FF;

/// `(msb << 8) | lsb`, zero-extended.
pub fn unsigned_from_pair(msb: u8, lsb: u8) -> u16 {
    (u16::from(msb) << 8) | u16::from(lsb)
}

/// Sign-magnitude pair: bit 7 of `msb` is the sign, the other 15 bits the magnitude.
pub fn signed_from_pair(msb: u8, lsb: u8) -> i16 {
    let magnitude = (i16::from(msb & 0x7F) << 8) | i16::from(lsb);
    apply_sign(msb, magnitude)
}

/// 12-bit sign-magnitude value: seven bits from `high`, four from `low_nibble`.
fn signed_from_nibbles(high: u8, low_nibble: u8) -> i16 {
    let magnitude = (i16::from(high & 0x7F) << 4) | i16::from(low_nibble & 0x0F);
    apply_sign(high, magnitude)
}

/// Single sign-magnitude byte.
fn signed_from_byte(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn apply_sign(sign_byte: u8, magnitude: i16) -> i16 {
    if sign_byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn check_len(block: Register, bytes: &[u8]) -> Result<()> {
    let expected = block.block_len();
    if bytes.len() < expected {
        return Err(Error::IncompleteCalibration {
            block,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decodes the 8-byte block at `0xE1` and the 26-byte block at `0x88`.
///
/// Fails with [`Error::IncompleteCalibration`] if either block is short. Extra
/// trailing bytes are ignored.
pub fn decode(block_b: &[u8], block_a: &[u8]) -> Result<CalibrationSet> {
    check_len(Register::CalibB, block_b)?;
    check_len(Register::CalibA, block_a)?;

    let a = |p: Pair| (block_a[p.msb], block_a[p.lsb]);
    let b = |p: Pair| (block_b[p.msb], block_b[p.lsb]);
    let unsigned = |(msb, lsb): (u8, u8)| unsigned_from_pair(msb, lsb);
    let signed = |(msb, lsb): (u8, u8)| signed_from_pair(msb, lsb);

    let shared = block_b[H45_SHARED];
    let cal = CalibrationSet {
        t1: unsigned(a(T1)),
        t2: signed(a(T2)),
        t3: signed(a(T3)),
        p1: unsigned(a(P1)),
        p2: signed(a(P2)),
        p3: signed(a(P3)),
        p4: signed(a(P4)),
        p5: signed(a(P5)),
        p6: signed(a(P6)),
        p7: signed(a(P7)),
        p8: signed(a(P8)),
        p9: signed(a(P9)),
        h1: unsigned_from_pair(0, block_a[H1]) as u8,
        h2: signed(b(H2)),
        h3: unsigned_from_pair(0, block_b[H3]) as u8,
        h4: signed_from_nibbles(block_b[H4_HIGH], shared & 0x0F),
        h5: signed_from_nibbles(block_b[H5_HIGH], shared >> 4),
        h6: signed_from_byte(block_b[H6]),
    };
    debug!("decoded calibration: {:?}", cal);
    Ok(cal)
}

impl CalibrationSet {
    /// Decodes a calibration set, see [`decode`].
    pub fn decode(block_b: &[u8], block_a: &[u8]) -> Result<Self> {
        decode(block_b, block_a)
    }

    /// The 18 coefficients as `(key, value)` pairs, in [`KEYS`] order.
    pub fn entries(&self) -> [(&'static str, i32); 18] {
        let values = [
            i32::from(self.t1),
            i32::from(self.t2),
            i32::from(self.t3),
            i32::from(self.p1),
            i32::from(self.p2),
            i32::from(self.p3),
            i32::from(self.p4),
            i32::from(self.p5),
            i32::from(self.p6),
            i32::from(self.p7),
            i32::from(self.p8),
            i32::from(self.p9),
            i32::from(self.h1),
            i32::from(self.h2),
            i32::from(self.h3),
            i32::from(self.h4),
            i32::from(self.h5),
            i32::from(self.h6),
        ];
        let mut out = [("", 0); 18];
        for (slot, (key, value)) in out.iter_mut().zip(KEYS.iter().zip(values.iter())) {
            *slot = (*key, *value);
        }
        out
    }

    /// Rebuilds a set from a key/value mapping such as a stored calibration file.
    ///
    /// All 18 keys must be present. Unknown keys are ignored.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<i64>,
    {
        let mut found: HashMap<&'static str, i64> = HashMap::new();
        for (key, value) in entries {
            if let Some(known) = KEYS.iter().find(|k| **k == key.as_ref()) {
                found.insert(*known, value.into());
            }
        }

        fn get<T: TryFrom<i64>>(found: &HashMap<&'static str, i64>, key: &'static str) -> Result<T> {
            let value = *found.get(key).ok_or(Error::MissingCoefficient(key))?;
            T::try_from(value).map_err(|_| Error::CoefficientOutOfRange { key, value })
        }

        fn get_12bit(found: &HashMap<&'static str, i64>, key: &'static str) -> Result<i16> {
            let value: i16 = get(found, key)?;
            if i64::from(value).abs() > NIBBLE_PACKED_MAX {
                return Err(Error::CoefficientOutOfRange {
                    key,
                    value: i64::from(value),
                });
            }
            Ok(value)
        }

        Ok(CalibrationSet {
            t1: get(&found, "T1")?,
            t2: get(&found, "T2")?,
            t3: get(&found, "T3")?,
            p1: get(&found, "P1")?,
            p2: get(&found, "P2")?,
            p3: get(&found, "P3")?,
            p4: get(&found, "P4")?,
            p5: get(&found, "P5")?,
            p6: get(&found, "P6")?,
            p7: get(&found, "P7")?,
            p8: get(&found, "P8")?,
            p9: get(&found, "P9")?,
            h1: get(&found, "H1")?,
            h2: get(&found, "H2")?,
            h3: get(&found, "H3")?,
            h4: get_12bit(&found, "H4")?,
            h5: get_12bit(&found, "H5")?,
            h6: get(&found, "H6")?,
        })
    }
}
