//! Oracle NUMBER codec.
//!
//! Oracle NUMBER is a variable-length format where:
//! - First byte is exponent (with sign info in high bit)
//! - Remaining bytes are base-100 digits of mantissa
//! - Negative numbers with fewer than 20 mantissa bytes end with byte 102
//!
//! `OracleNumber` keeps the decimal digits on the stack so decoding a column
//! value never touches the heap unless an arbitrary-precision value is asked for.

use std::fmt;

use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;
use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::constants::{
    NUMBER_MAX_DIGITS, NUMBER_MAX_MANTISSA_BYTES, NUMBER_NEGATIVE_TERMINATOR, NUMBER_ZERO,
};

// Base-100 exponent range of a finite NUMBER.
const MIN_EXPONENT: i16 = -65;
const MAX_EXPONENT: i16 = 62;

// Longest shortest-representation of an f64.
const F64_MAX_DIGITS: usize = 17;

/// Decoded NUMBER: `0.d1 d2 .. dn × 10^point`, digits stripped of leading
/// and trailing zeros. Zero has no digits.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OracleNumber {
    negative: bool,
    digits: [u8; NUMBER_MAX_DIGITS],
    len: u8,
    point: i16,
}

impl OracleNumber {
    /// The value zero.
    pub const ZERO: OracleNumber = OracleNumber {
        negative: false,
        digits: [0; NUMBER_MAX_DIGITS],
        len: 0,
        point: 0,
    };

    /// Build from a raw decimal digit run, trimming zeros on both ends.
    ///
    /// Returns `None` if more than 40 significant digits remain.
    fn from_digits(negative: bool, raw: &[u8], mut point: i16) -> Option<Self> {
        let lead = raw.iter().take_while(|&&d| d == 0).count();
        if lead == raw.len() {
            return Some(Self::ZERO);
        }
        point = point.checked_sub(i16::try_from(lead).ok()?)?;
        let raw = &raw[lead..];
        let trail = raw.iter().rev().take_while(|&&d| d == 0).count();
        let raw = &raw[..raw.len() - trail];
        if raw.len() > NUMBER_MAX_DIGITS {
            return None;
        }
        let mut digits = [0u8; NUMBER_MAX_DIGITS];
        digits[..raw.len()].copy_from_slice(raw);
        Some(Self {
            negative,
            digits,
            len: raw.len() as u8,
            point,
        })
    }

    /// Decode Oracle NUMBER wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some((&exp_byte, mantissa)) = bytes.split_first() else {
            return Err(Error::malformed("NUMBER value is empty"));
        };
        let is_positive = (exp_byte & 0x80) != 0;

        if mantissa.is_empty() {
            return match exp_byte {
                NUMBER_ZERO => Ok(Self::ZERO),
                0x00 => Err(Error::NumericOverflow {
                    value: "-Infinity".to_string(),
                    target: "NUMBER",
                }),
                _ => Err(Error::malformed(format!(
                    "NUMBER exponent byte {:#04x} without mantissa",
                    exp_byte
                ))),
            };
        }
        if (exp_byte == 0xFF && mantissa == [101]) || (exp_byte == 0x00 && mantissa == [101]) {
            return Err(Error::NumericOverflow {
                value: if is_positive { "Infinity" } else { "-Infinity" }.to_string(),
                target: "NUMBER",
            });
        }

        // Check for trailing 102 byte for negative numbers
        let mantissa = match mantissa.split_last() {
            Some((&NUMBER_NEGATIVE_TERMINATOR, rest)) if !is_positive => rest,
            _ => mantissa,
        };
        if mantissa.is_empty() || mantissa.len() > NUMBER_MAX_MANTISSA_BYTES {
            return Err(Error::malformed(format!(
                "NUMBER mantissa of {} bytes",
                mantissa.len()
            )));
        }

        let exponent: i16 = if is_positive {
            exp_byte as i16 - 193
        } else {
            // Invert bits for negative numbers
            (!exp_byte) as i16 - 193
        };

        let mut raw = [0u8; NUMBER_MAX_DIGITS];
        for (i, &byte) in mantissa.iter().enumerate() {
            let pair = if is_positive {
                byte.wrapping_sub(1)
            } else {
                101u8.wrapping_sub(byte)
            };
            if pair > 99 {
                return Err(Error::malformed(format!(
                    "NUMBER mantissa byte {} out of range",
                    byte
                )));
            }
            raw[i * 2] = pair / 10;
            raw[i * 2 + 1] = pair % 10;
        }

        let point = (exponent + 1) * 2;
        Self::from_digits(!is_positive, &raw[..mantissa.len() * 2], point)
            .ok_or_else(|| Error::malformed("NUMBER mantissa too long"))
    }

    /// Encode to Oracle NUMBER wire bytes.
    ///
    /// Values too small for the exponent range encode as zero; values too
    /// large raise `NumericOverflow`.
    pub fn encode(&self, out: &mut BytesMut) -> Result<()> {
        if self.is_zero() {
            out.put_u8(NUMBER_ZERO);
            return Ok(());
        }

        // Align to an even decimal exponent with a leading zero digit.
        let mut aligned = [0u8; NUMBER_MAX_DIGITS + 2];
        let lead = (self.point.rem_euclid(2)) as usize;
        let digits = self.digits();
        aligned[lead..lead + digits.len()].copy_from_slice(digits);
        let mut count = lead + digits.len();
        if count % 2 == 1 {
            count += 1;
        }
        let pairs = count / 2;
        let exponent = (self.point as i32 + lead as i32) / 2 - 1;

        if exponent < MIN_EXPONENT as i32 {
            out.put_u8(NUMBER_ZERO);
            return Ok(());
        }
        if exponent > MAX_EXPONENT as i32 || pairs > NUMBER_MAX_MANTISSA_BYTES {
            return Err(Error::NumericOverflow {
                value: self.to_string(),
                target: "NUMBER",
            });
        }

        let exp_byte = (exponent + 193) as u8;
        if self.negative {
            out.put_u8(!exp_byte);
        } else {
            out.put_u8(exp_byte);
        }
        for pair in aligned[..count].chunks_exact(2) {
            let value = pair[0] * 10 + pair[1];
            if self.negative {
                out.put_u8(101 - value);
            } else {
                out.put_u8(value + 1);
            }
        }
        if self.negative && pairs < NUMBER_MAX_MANTISSA_BYTES {
            out.put_u8(NUMBER_NEGATIVE_TERMINATOR);
        }
        Ok(())
    }

    /// Convert a native integer.
    pub fn from_i64(value: i64) -> Self {
        let mut magnitude = value.unsigned_abs();
        let mut raw = [0u8; 20];
        let mut start = raw.len();
        while magnitude > 0 {
            start -= 1;
            raw[start] = (magnitude % 10) as u8;
            magnitude /= 10;
        }
        let len = (raw.len() - start) as i16;
        Self::from_digits(value < 0, &raw[start..], len).unwrap_or(Self::ZERO)
    }

    /// Convert a native float using its shortest round-trip representation.
    ///
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::ZERO);
        }
        let mut buf = StackBuf::new();
        fmt::Write::write_fmt(&mut buf, format_args!("{:e}", value.abs())).ok()?;
        let text = buf.as_str();
        let (mantissa, exp) = text.split_once('e')?;
        let exp: i16 = exp.parse().ok()?;

        let mut raw = [0u8; 24];
        let mut len = 0;
        for b in mantissa.bytes().filter(u8::is_ascii_digit) {
            raw[len] = b - b'0';
            len += 1;
        }
        Self::from_digits(value < 0.0, &raw[..len], exp + 1)
    }

    /// Convert an arbitrary-precision decimal.
    ///
    /// Returns `None` if more than 40 significant digits would be needed.
    pub fn from_decimal(value: &BigDecimal) -> Option<Self> {
        let (int, scale) = value.as_bigint_and_exponent();
        let (sign, raw) = int.to_radix_be(10);
        if sign == Sign::NoSign {
            return Some(Self::ZERO);
        }
        let point = raw.len() as i64 - scale;
        let point = i16::try_from(point).ok()?;
        Self::from_digits(sign == Sign::Minus, &raw, point)
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.len == 0
    }

    /// Whether the value is negative.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Significant decimal digits.
    pub fn digits(&self) -> &[u8] {
        &self.digits[..self.len as usize]
    }

    /// Number of significant decimal digits.
    pub fn precision(&self) -> usize {
        self.len as usize
    }

    /// Whether the value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.len as i16 <= self.point
    }

    /// Convert to i64 if the value is integral and in range.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        let mut acc: i128 = 0;
        for &d in self.digits() {
            acc = acc.checked_mul(10)?.checked_add(d as i128)?;
        }
        for _ in self.len as i16..self.point {
            acc = acc.checked_mul(10)?;
        }
        if self.negative {
            acc = -acc;
        }
        i64::try_from(acc).ok()
    }

    /// Convert to f64 if no significant digit would be lost.
    ///
    /// The value is accepted when the shortest representation of the parsed
    /// float has exactly the same digits and exponent.
    pub fn to_f64(&self) -> Option<f64> {
        if self.is_zero() {
            return Some(0.0);
        }
        if self.precision() > F64_MAX_DIGITS {
            return None;
        }
        let mut buf = StackBuf::new();
        if self.negative {
            buf.push(b'-');
        }
        buf.push(b'0');
        buf.push(b'.');
        for &d in self.digits() {
            buf.push(b'0' + d);
        }
        fmt::Write::write_fmt(&mut buf, format_args!("e{}", self.point)).ok()?;
        let value: f64 = buf.as_str().parse().ok()?;
        if !value.is_finite() || value == 0.0 {
            return None;
        }
        match Self::from_f64(value) {
            Some(back) if back == *self => Some(value),
            _ => None,
        }
    }

    /// Convert to an arbitrary-precision decimal (exact).
    pub fn to_decimal(&self) -> BigDecimal {
        if self.is_zero() {
            return BigDecimal::from(0);
        }
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        let int = BigInt::from_radix_be(sign, self.digits(), 10).unwrap_or_default();
        BigDecimal::new(int, self.len as i64 - self.point as i64)
    }
}

impl fmt::Display for OracleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }
        let digits = self.digits();
        let num_digits = digits.len() as i16;
        let ch = |d: &u8| (b'0' + d) as char;

        if self.point <= 0 {
            // Number is less than 1: 0.00...digits
            f.write_str("0.")?;
            for _ in self.point..0 {
                f.write_str("0")?;
            }
            for d in digits {
                write!(f, "{}", ch(d))?;
            }
        } else if self.point >= num_digits {
            // Number is an integer: digits + trailing zeros
            for d in digits {
                write!(f, "{}", ch(d))?;
            }
            for _ in num_digits..self.point {
                f.write_str("0")?;
            }
        } else {
            for (i, d) in digits.iter().enumerate() {
                if i as i16 == self.point {
                    f.write_str(".")?;
                }
                write!(f, "{}", ch(d))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OracleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OracleNumber({})", self)
    }
}

/// Decode Oracle NUMBER format to string.
///
/// Preserves full precision by returning the number as a string.
pub fn decode_oracle_number(bytes: &[u8]) -> Result<String> {
    Ok(OracleNumber::decode(bytes)?.to_string())
}

/// Fixed-capacity text buffer for float formatting without allocation.
struct StackBuf {
    buf: [u8; 64],
    len: usize,
}

impl StackBuf {
    fn new() -> Self {
        Self {
            buf: [0; 64],
            len: 0,
        }
    }

    fn push(&mut self, b: u8) {
        if self.len < self.buf.len() {
            self.buf[self.len] = b;
            self.len += 1;
        }
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl fmt::Write for StackBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.len + s.len() > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..self.len + s.len()].copy_from_slice(s.as_bytes());
        self.len += s.len();
        Ok(())
    }
}
