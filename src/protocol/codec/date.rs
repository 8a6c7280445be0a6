//! Oracle DATE codec.
//!
//! Oracle DATE is encoded as 7 bytes (big-endian):
//! - byte[0]: century + 100
//! - byte[1]: year (in century) + 100
//! - byte[2]: month (1-12)
//! - byte[3]: day (1-31)
//! - byte[4]: hour + 1 (0-23)
//! - byte[5]: minute + 1 (0-59)
//! - byte[6]: second + 1 (0-59)

use crate::error::{Error, Result};
use bytes::{BufMut, BytesMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MIN_YEAR: i32 = -4712;
const MAX_YEAR: i32 = 9999;

/// Decode an Oracle DATE from 7 bytes.
///
/// # Errors
/// Returns `Error::MalformedValue` if data is not exactly 7 bytes or contains
/// invalid values.
///
/// # Example
/// ```ignore
/// let date = decode_oracle_date(&[0x78, 0x7C, 0x0A, 0x15, 0x0D, 0x25, 0x06])?;
/// // Returns: 2024-10-21 12:36:05
/// ```
pub fn decode_oracle_date(data: &[u8]) -> Result<NaiveDateTime> {
    let &[c, y, month, day, h, mi, s] = data else {
        return Err(Error::malformed(format!(
            "DATE value must be exactly 7 bytes, got {}",
            data.len()
        )));
    };

    let year = (c as i32 - 100) * 100 + (y as i32 - 100);

    // Hour, minute, second are stored as value + 1
    let hour = h.wrapping_sub(1);
    let minute = mi.wrapping_sub(1);
    let second = s.wrapping_sub(1);

    if !(1..=12).contains(&month) {
        return Err(Error::malformed(format!("Invalid month: {}", month)));
    }
    if !(1..=31).contains(&day) {
        return Err(Error::malformed(format!("Invalid day: {}", day)));
    }
    if hour > 23 || minute > 59 || second > 59 {
        return Err(Error::malformed(format!(
            "Invalid TIME: hour={}, minute={}, second={}",
            hour, minute, second
        )));
    }

    let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32).ok_or_else(|| {
        Error::malformed(format!(
            "Invalid DATE: year={}, month={}, day={}",
            year, month, day
        ))
    })?;
    let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)
        .ok_or_else(|| Error::malformed("Invalid TIME"))?;
    Ok(NaiveDateTime::new(date, time))
}

/// Encode a date/time as 7 Oracle DATE bytes.
///
/// Sub-second precision is dropped; DATE has none.
pub fn encode_oracle_date(value: &NaiveDateTime, out: &mut BytesMut) -> Result<()> {
    let year = value.year();
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(Error::malformed(format!("DATE year {} out of range", year)));
    }
    out.put_u8((year / 100 + 100) as u8);
    out.put_u8((year % 100 + 100) as u8);
    out.put_u8(value.month() as u8);
    out.put_u8(value.day() as u8);
    out.put_u8(value.hour() as u8 + 1);
    out.put_u8(value.minute() as u8 + 1);
    out.put_u8(value.second() as u8 + 1);
    Ok(())
}
