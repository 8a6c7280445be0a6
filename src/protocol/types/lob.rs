//! LOB locator handles for streamed columns.
//!
//! A CLOB or BLOB value never travels inline. The engine hands back an opaque
//! locator and the data moves through `read_chunk` / `write_chunk` calls.

use bytes::Bytes;

/// LOB locator handle issued by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LobLocator {
    /// Opaque locator bytes.
    pub locator: Bytes,
    /// Total size in bytes, when the engine knows it.
    pub size: Option<u64>,
    /// Engine-recommended chunk size (0 if none).
    pub chunk_size: u32,
    /// Whether this is a temporary LOB created for a bind.
    pub temporary: bool,
}

impl LobLocator {
    /// Create a new LOB locator.
    pub fn new(locator: impl Into<Bytes>, size: Option<u64>, chunk_size: u32) -> Self {
        Self {
            locator: locator.into(),
            size,
            chunk_size,
            temporary: false,
        }
    }

    /// Create a locator for a temporary LOB.
    pub fn temporary(locator: impl Into<Bytes>, chunk_size: u32) -> Self {
        Self {
            locator: locator.into(),
            size: Some(0),
            chunk_size,
            temporary: true,
        }
    }

    /// Whether the engine reported the LOB as empty.
    pub fn is_empty(&self) -> bool {
        self.size == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lob_locator_new() {
        let locator = LobLocator::new(vec![1, 2, 3, 4], Some(100), 8192);
        assert_eq!(locator.size, Some(100));
        assert_eq!(locator.chunk_size, 8192);
        assert!(!locator.temporary);
        assert!(!locator.is_empty());
    }

    #[test]
    fn test_lob_locator_temporary() {
        let locator = LobLocator::temporary(Bytes::from_static(b"tmp"), 0);
        assert!(locator.temporary);
        assert!(locator.is_empty());
    }
}
