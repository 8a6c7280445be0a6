//! Buffer sizing for bind slots and define buffers.

use crate::config::StatementConfig;
use crate::protocol::registry::TypeRule;
use crate::protocol::types::ColumnDescriptor;

/// Round `size` up to a multiple of `alignment`.
pub fn align_up(size: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

/// Define buffer capacity for one column.
///
/// - Streamed kinds: exactly one chunk.
/// - LONG / LONG RAW: the statement's long buffer size.
/// - Others: declared maximum (or the registry default), at least the kind's
///   minimum wire size, rounded up to the engine alignment.
pub fn define_capacity(
    column: &ColumnDescriptor,
    rule: &TypeRule,
    config: &StatementConfig,
    alignment: usize,
) -> usize {
    if rule.streamed {
        return config.lob_chunk_size;
    }
    if column.kind.is_long() {
        return config.long_buffer_size;
    }
    let declared = match column.kind.max_size() {
        0 => rule.default_size,
        n => n,
    };
    let size = (declared.max(rule.min_size) as usize).max(1);
    align_up(size, alignment)
}

/// Bind slot size for one parameter given the largest encoded row.
///
/// Fixed-width kinds always use the registry size so every row fits.
pub fn bind_slot_size(
    rule: &TypeRule,
    max_encoded: usize,
    alignment: usize,
) -> usize {
    let size = if rule.is_fixed_width() {
        rule.default_size as usize
    } else {
        max_encoded.max(1)
    };
    align_up(size, alignment)
}

/// Number of chunk transfers needed for `len` bytes.
pub fn chunk_count(len: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::registry::rule;
    use crate::protocol::types::ColumnKind;

    fn capacity(kind: ColumnKind, config: &StatementConfig, alignment: usize) -> usize {
        let col = ColumnDescriptor::new("C", 0, kind);
        define_capacity(&col, rule(&kind), config, alignment)
    }

    #[test]
    fn test_define_capacity() {
        let config = StatementConfig::default()
            .with_lob_chunk_size(8)
            .with_long_buffer_size(100);
        assert_eq!(capacity(ColumnKind::Blob, &config, 1), 8);
        assert_eq!(capacity(ColumnKind::Clob, &config, 64), 8);
        assert_eq!(capacity(ColumnKind::LongRaw, &config, 1), 100);
        assert_eq!(capacity(ColumnKind::Raw { max_size: 10 }, &config, 1), 10);
        assert_eq!(capacity(ColumnKind::Raw { max_size: 10 }, &config, 8), 16);
        assert_eq!(capacity(ColumnKind::Raw { max_size: 0 }, &config, 1), 2000);
        assert_eq!(capacity(ColumnKind::Date, &config, 1), 7);
        assert_eq!(
            capacity(
                ColumnKind::Number {
                    precision: 5,
                    scale: 0
                },
                &config,
                4
            ),
            24
        );
    }

    #[test]
    fn test_bind_slot_size() {
        let raw = ColumnKind::Raw { max_size: 2000 };
        assert_eq!(bind_slot_size(rule(&raw), 9, 1), 9);
        assert_eq!(bind_slot_size(rule(&raw), 0, 1), 1);
        assert_eq!(bind_slot_size(rule(&ColumnKind::Date), 7, 1), 7);
        let num = ColumnKind::Number {
            precision: 0,
            scale: 0,
        };
        assert_eq!(bind_slot_size(rule(&num), 3, 1), 22);
    }

    #[test]
    fn test_chunk_count() {
        let c = 8;
        assert_eq!(chunk_count(7, c), 1);
        assert_eq!(chunk_count(8, c), 1);
        assert_eq!(chunk_count(9, c), 2);
        assert_eq!(chunk_count(23, c), 3);
        assert_eq!(chunk_count(24, c), 3);
        assert_eq!(chunk_count(25, c), 4);
        assert_eq!(chunk_count(0, c), 0);
    }
}
