//! Wire constants for Oracle column kinds and buffer sizing.
//!
//! Type numbers follow the Oracle internal datatype codes.

// Oracle type numbers
pub const ORA_TYPE_NUM_VARCHAR: u16 = 1;
pub const ORA_TYPE_NUM_NUMBER: u16 = 2;
pub const ORA_TYPE_NUM_BINARY_INTEGER: u16 = 3;
pub const ORA_TYPE_NUM_LONG: u16 = 8;
pub const ORA_TYPE_NUM_DATE: u16 = 12;
pub const ORA_TYPE_NUM_RAW: u16 = 23;
pub const ORA_TYPE_NUM_LONG_RAW: u16 = 24;
pub const ORA_TYPE_NUM_CHAR: u16 = 96;
pub const ORA_TYPE_NUM_CLOB: u16 = 112;
pub const ORA_TYPE_NUM_BLOB: u16 = 113;

// Scale reported for FLOAT(p) and unconstrained NUMBER columns
pub const ORA_NUMBER_SCALE_FLOAT: i8 = -127;

// Maximum wire sizes
pub const TNS_MAX_VARCHAR_LENGTH: u32 = 4000;
pub const TNS_MAX_CHAR_LENGTH: u32 = 2000;
pub const TNS_MAX_RAW_LENGTH: u32 = 2000;
pub const TNS_MAX_LONG_LENGTH: u32 = 0x7fffffff;
pub const TNS_NUMBER_MAX_LENGTH: u32 = 22;
pub const TNS_DATE_LENGTH: u32 = 7;

// NUMBER format limits
pub const NUMBER_MAX_DIGITS: usize = 40;
pub const NUMBER_MAX_MANTISSA_BYTES: usize = 20;
pub const NUMBER_NEGATIVE_TERMINATOR: u8 = 102;
pub const NUMBER_ZERO: u8 = 0x80;

// Statement buffer defaults
pub const DEFAULT_LOB_CHUNK_SIZE: usize = 16_000;
pub const DEFAULT_LONG_BUFFER_SIZE: usize = 16_000_000;

// Indicator values handed to the engine
pub const INDICATOR_NOT_NULL: i16 = 0;
pub const INDICATOR_NULL: i16 = -1;
