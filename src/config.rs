//! Numeric precision policy and statement configuration.
//!
//! A process-wide default lives behind a `RwLock`. Every result set takes a
//! copy (`RsetConfig`) when it opens and never consults the global again, so
//! changing the default only affects result sets opened afterwards.

use std::sync::RwLock;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::codec::OracleNumber;
use crate::protocol::constants::{
    DEFAULT_LOB_CHUNK_SIZE, DEFAULT_LONG_BUFFER_SIZE, ORA_NUMBER_SCALE_FLOAT,
};
use crate::protocol::types::{ColumnKind, Numeric};

// Largest decimal precision that always fits i64.
const INT_MAX_PRECISION: i8 = 18;
// Largest decimal precision that round-trips through f64.
const FLOAT_MAX_PRECISION: i8 = 15;
// Largest FLOAT(p) binary precision that fits f64.
const FLOAT_MAX_BINARY_PRECISION: i8 = 53;

/// How numeric columns materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericMode {
    /// Fixed-width `i64` / `f64`. Values that do not fit raise `NumericOverflow`.
    Native,
    /// `BigDecimal`, exact for every NUMBER.
    Arbitrary,
}

/// Numeric column category, each with its own mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberCategory {
    /// Integers of at most 18 digits.
    Int,
    /// Wider integers.
    BigInt,
    /// Fractions of at most 15 digits.
    Float,
    /// Wider fractions.
    BigFloat,
}

impl NumberCategory {
    /// Category implied by a column's declared precision and scale.
    ///
    /// Returns `None` for unconstrained NUMBER columns and non-numeric kinds;
    /// unconstrained values are categorized one at a time with `of_value`.
    pub fn of(kind: &ColumnKind) -> Option<Self> {
        let (precision, scale) = match *kind {
            ColumnKind::BinaryInteger => return Some(NumberCategory::Int),
            ColumnKind::Number { precision, scale } => (precision, scale),
            _ => return None,
        };
        if precision <= 0 {
            return None;
        }
        let category = if scale == ORA_NUMBER_SCALE_FLOAT {
            if precision <= FLOAT_MAX_BINARY_PRECISION {
                NumberCategory::Float
            } else {
                NumberCategory::BigFloat
            }
        } else if scale <= 0 {
            if precision <= INT_MAX_PRECISION {
                NumberCategory::Int
            } else {
                NumberCategory::BigInt
            }
        } else if precision <= FLOAT_MAX_PRECISION {
            NumberCategory::Float
        } else {
            NumberCategory::BigFloat
        };
        Some(category)
    }

    /// Category of a single value from an unconstrained column.
    pub fn of_value(value: &OracleNumber) -> Self {
        if value.is_integer() {
            NumberCategory::BigInt
        } else {
            NumberCategory::BigFloat
        }
    }

    /// Whether values of this category are integral.
    pub fn is_integral(self) -> bool {
        matches!(self, NumberCategory::Int | NumberCategory::BigInt)
    }
}

/// How byte columns materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesForm {
    /// `HostValue::Bytes`, with `HostValue::Null` for NULL.
    Bytes,
    /// `HostValue::NullableBytes` carrying an explicit null flag.
    NullableBytes,
}

/// Decode configuration frozen into a result set when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsetConfig {
    pub int: NumericMode,
    pub big_int: NumericMode,
    pub float: NumericMode,
    pub big_float: NumericMode,
    pub bytes_form: BytesForm,
}

impl RsetConfig {
    /// Built-in defaults: native for values that fit, arbitrary otherwise.
    pub const DEFAULT: RsetConfig = RsetConfig {
        int: NumericMode::Native,
        big_int: NumericMode::Arbitrary,
        float: NumericMode::Native,
        big_float: NumericMode::Arbitrary,
        bytes_form: BytesForm::Bytes,
    };

    /// Mode used for a category.
    pub fn mode_for(&self, category: NumberCategory) -> NumericMode {
        match category {
            NumberCategory::Int => self.int,
            NumberCategory::BigInt => self.big_int,
            NumberCategory::Float => self.float,
            NumberCategory::BigFloat => self.big_float,
        }
    }

    /// Set the mode for one category.
    pub fn set_mode(&mut self, category: NumberCategory, mode: NumericMode) {
        match category {
            NumberCategory::Int => self.int = mode,
            NumberCategory::BigInt => self.big_int = mode,
            NumberCategory::Float => self.float = mode,
            NumberCategory::BigFloat => self.big_float = mode,
        }
    }

    /// Set the mode for every category.
    pub fn set_numeric_mode(&mut self, mode: NumericMode) {
        self.int = mode;
        self.big_int = mode;
        self.float = mode;
        self.big_float = mode;
    }

    /// Builder form of `set_numeric_mode`.
    pub fn with_numeric_mode(mut self, mode: NumericMode) -> Self {
        self.set_numeric_mode(mode);
        self
    }

    /// Builder form of `set_mode`.
    pub fn with_mode(mut self, category: NumberCategory, mode: NumericMode) -> Self {
        self.set_mode(category, mode);
        self
    }

    /// Materialize a decoded NUMBER from a column of `kind`.
    ///
    /// Native integers must fit `i64` and native fractions must keep every
    /// significant digit in `f64`; otherwise `NumericOverflow` is raised.
    pub fn materialize(&self, kind: &ColumnKind, value: &OracleNumber) -> Result<Numeric> {
        let category = NumberCategory::of(kind).unwrap_or_else(|| NumberCategory::of_value(value));
        match self.mode_for(category) {
            NumericMode::Arbitrary => Ok(Numeric::Decimal(value.to_decimal())),
            NumericMode::Native if category.is_integral() && value.is_integer() => value
                .to_i64()
                .map(Numeric::Int)
                .ok_or_else(|| Error::NumericOverflow {
                    value: value.to_string(),
                    target: "i64",
                }),
            NumericMode::Native => {
                value
                    .to_f64()
                    .map(Numeric::Float)
                    .ok_or_else(|| Error::NumericOverflow {
                        value: value.to_string(),
                        target: "f64",
                    })
            }
        }
    }

    /// Set how byte columns materialize.
    pub fn with_bytes_form(mut self, form: BytesForm) -> Self {
        self.bytes_form = form;
        self
    }
}

impl Default for RsetConfig {
    fn default() -> Self {
        default_rset_config()
    }
}

struct Defaults {
    rset: RsetConfig,
    lob_chunk_size: usize,
}

static DEFAULTS: RwLock<Defaults> = RwLock::new(Defaults {
    rset: RsetConfig::DEFAULT,
    lob_chunk_size: DEFAULT_LOB_CHUNK_SIZE,
});

/// Snapshot of the process-wide result-set configuration.
pub fn default_rset_config() -> RsetConfig {
    DEFAULTS.read().unwrap_or_else(|e| e.into_inner()).rset
}

/// Replace the process-wide result-set configuration.
pub fn set_default_rset_config(config: RsetConfig) {
    DEFAULTS.write().unwrap_or_else(|e| e.into_inner()).rset = config;
}

/// Process-wide LOB chunk size.
pub fn default_lob_chunk_size() -> usize {
    DEFAULTS.read().unwrap_or_else(|e| e.into_inner()).lob_chunk_size
}

/// Replace the process-wide LOB chunk size.
pub fn set_default_lob_chunk_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::invalid_config("LOB chunk size must be positive"));
    }
    DEFAULTS.write().unwrap_or_else(|e| e.into_inner()).lob_chunk_size = size;
    Ok(())
}

/// Where a numeric mode change applies.
#[derive(Debug)]
pub enum NumericScope<'a> {
    /// Result sets opened from now on without an explicit configuration.
    Global,
    /// One result-set configuration (not yet handed to `ResultSet::open`).
    ResultSet(&'a mut RsetConfig),
}

/// Set the numeric mode for all categories in a scope.
///
/// Records already materialized keep their representation.
pub fn set_numeric_mode(mode: NumericMode, scope: NumericScope<'_>) {
    match scope {
        NumericScope::Global => {
            let mut defaults = DEFAULTS.write().unwrap_or_else(|e| e.into_inner());
            defaults.rset.set_numeric_mode(mode);
            tracing::debug!(?mode, "global numeric mode changed");
        }
        NumericScope::ResultSet(config) => config.set_numeric_mode(mode),
    }
}

/// Per-statement buffer and decode configuration.
#[derive(Debug, Clone)]
pub struct StatementConfig {
    /// Chunk size for LOB reads and writes.
    pub lob_chunk_size: usize,
    /// Define buffer size for LONG and LONG RAW columns.
    pub long_buffer_size: usize,
    /// Deadline per LOB chunk transfer.
    pub lob_timeout: Option<Duration>,
    /// Result-set override; `None` snapshots the global default at open.
    pub rset: Option<RsetConfig>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            lob_chunk_size: default_lob_chunk_size(),
            long_buffer_size: DEFAULT_LONG_BUFFER_SIZE,
            lob_timeout: None,
            rset: None,
        }
    }
}

impl StatementConfig {
    /// Set the LOB chunk size.
    pub fn with_lob_chunk_size(mut self, size: usize) -> Self {
        self.lob_chunk_size = size;
        self
    }

    /// Set the LONG / LONG RAW buffer size.
    pub fn with_long_buffer_size(mut self, size: usize) -> Self {
        self.long_buffer_size = size;
        self
    }

    /// Set a per-chunk LOB timeout.
    pub fn with_lob_timeout(mut self, timeout: Duration) -> Self {
        self.lob_timeout = Some(timeout);
        self
    }

    /// Override the numeric mode for this statement's result sets.
    pub fn with_numeric_mode(mut self, mode: NumericMode) -> Self {
        self.rset_mut().set_numeric_mode(mode);
        self
    }

    /// Override the whole result-set configuration.
    pub fn with_rset_config(mut self, config: RsetConfig) -> Self {
        self.rset = Some(config);
        self
    }

    /// Result-set override, seeded from the global default on first use.
    pub fn rset_mut(&mut self) -> &mut RsetConfig {
        self.rset.get_or_insert_with(default_rset_config)
    }

    /// Configuration a result set opened now would freeze.
    pub fn rset_snapshot(&self) -> RsetConfig {
        self.rset.unwrap_or_else(default_rset_config)
    }

    /// Check sizes are usable.
    pub fn validate(&self) -> Result<()> {
        if self.lob_chunk_size == 0 {
            return Err(Error::invalid_config("LOB chunk size must be positive"));
        }
        if self.long_buffer_size == 0 {
            return Err(Error::invalid_config("long buffer size must be positive"));
        }
        if self.lob_timeout == Some(Duration::ZERO) {
            return Err(Error::invalid_config("LOB timeout must be non-zero"));
        }
        Ok(())
    }
}
