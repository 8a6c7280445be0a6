//! Wire codecs for Oracle NUMBER and DATE.
//!
//! Text and byte kinds need no dedicated codec: text is UTF-8 and bytes
//! are copied as-is.

mod date;
mod number;

pub use date::{decode_oracle_date, encode_oracle_date};
pub use number::{decode_oracle_number, OracleNumber};
