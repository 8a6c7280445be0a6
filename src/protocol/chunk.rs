//! Chunked LOB transfer.
//!
//! `Chunks` is a single-pass lazy sequence over a `ChunkSource`, reusing one
//! caller buffer for every chunk. LOB reads pull from the engine through
//! `LobReader`; LOB writes pull from host memory through `SliceSource` and
//! push each chunk to the engine. Both stop on the first of:
//! - the source flags the last chunk
//! - a short read
//! - a zero-length read (not counted as a chunk)
//!
//! so a value of exactly `k * C` bytes takes `k` chunks whether or not the
//! engine reports the end.

use std::future::Future;
use std::time::Duration;

use tracing::{trace, warn};

use crate::cancel::{guard, CancelToken};
use crate::engine::{ChunkRead, Engine};
use crate::error::{Error, Result};
use crate::protocol::types::LobLocator;

/// Something that fills a buffer one chunk at a time.
pub trait ChunkSource {
    /// Fill `buf` from the current position and advance.
    fn read_chunk(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<ChunkRead>> + Send;
}

/// Counters for one transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Non-empty chunks moved.
    pub chunks: u64,
    /// Total bytes moved.
    pub bytes: u64,
}

/// Lazy chunk sequence over a source and a reusable buffer.
pub struct Chunks<'b, S> {
    source: S,
    buf: &'b mut [u8],
    done: bool,
    stats: TransferStats,
}

impl<'b, S: ChunkSource> Chunks<'b, S> {
    /// Create a sequence; `buf.len()` is the chunk size.
    pub fn new(source: S, buf: &'b mut [u8]) -> Self {
        Self {
            source,
            buf,
            done: false,
            stats: TransferStats::default(),
        }
    }

    /// Next chunk, or `None` once the source is exhausted.
    pub async fn next(&mut self) -> Result<Option<&[u8]>> {
        if self.done || self.buf.is_empty() {
            return Ok(None);
        }
        let read = match self.source.read_chunk(&mut *self.buf).await {
            Ok(read) => read,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        if read.bytes_read > self.buf.len() {
            self.done = true;
            return Err(Error::buffer_too_small(read.bytes_read, self.buf.len()));
        }
        if read.is_last || read.bytes_read < self.buf.len() {
            self.done = true;
        }
        if read.bytes_read == 0 {
            self.done = true;
            return Ok(None);
        }
        self.stats.chunks += 1;
        self.stats.bytes += read.bytes_read as u64;
        trace!(
            chunk = self.stats.chunks,
            bytes = read.bytes_read,
            last = self.done,
            "chunk"
        );
        Ok(Some(&self.buf[..read.bytes_read]))
    }

    /// Whether the sequence has ended.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Counters so far.
    pub fn stats(&self) -> TransferStats {
        self.stats
    }
}

/// Chunk source over an in-memory value.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ChunkSource for SliceSource<'_> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ChunkRead> {
        let rest = &self.data[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(ChunkRead {
            bytes_read: n,
            is_last: self.pos == self.data.len(),
        })
    }
}

/// Chunk source reading a LOB through the engine.
pub struct LobReader<'a, E> {
    engine: &'a mut E,
    lob: &'a LobLocator,
    offset: u64,
    cancel: &'a CancelToken,
    timeout: Option<Duration>,
}

impl<'a, E: Engine> LobReader<'a, E> {
    pub fn new(
        engine: &'a mut E,
        lob: &'a LobLocator,
        cancel: &'a CancelToken,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            lob,
            offset: 0,
            cancel,
            timeout,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<E: Engine> ChunkSource for LobReader<'_, E> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ChunkRead> {
        let read = guard(
            "LOB read",
            self.engine.read_chunk(self.lob, self.offset, buf),
            self.cancel,
            self.timeout,
        )
        .await?;
        self.offset += read.bytes_read as u64;
        Ok(read)
    }
}

async fn close_quietly<E: Engine>(engine: &mut E, lob: &LobLocator) {
    if let Err(e) = engine.close_lob(lob).await {
        warn!(error = %e, "failed to close LOB after transfer error");
    }
}

/// Read a whole LOB through `buf`, one chunk per engine call.
///
/// The LOB is closed afterwards on every path.
pub async fn read_lob<E: Engine>(
    engine: &mut E,
    lob: &LobLocator,
    buf: &mut [u8],
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<(Vec<u8>, TransferStats)> {
    let mut out = Vec::with_capacity(lob.size.unwrap_or(0).min(buf.len() as u64 * 64) as usize);
    let (result, stats) = {
        let mut chunks = Chunks::new(LobReader::new(engine, lob, cancel, timeout), buf);
        let result = loop {
            match chunks.next().await {
                Ok(Some(chunk)) => out.extend_from_slice(chunk),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        (result, chunks.stats())
    };
    match result {
        Ok(()) => {
            engine.close_lob(lob).await?;
            Ok((out, stats))
        }
        Err(e) => {
            drop(out);
            close_quietly(engine, lob).await;
            Err(e)
        }
    }
}

/// Write `data` into `lob` in chunks of `chunk_size` bytes.
///
/// Issues exactly `ceil(len / chunk_size)` `write_chunk` calls. On error the
/// LOB is closed before returning.
pub async fn write_lob<E: Engine>(
    engine: &mut E,
    lob: &LobLocator,
    data: &[u8],
    chunk_size: usize,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<TransferStats> {
    let mut scratch = vec![0u8; chunk_size.min(data.len()).max(1)];
    let mut chunks = Chunks::new(SliceSource::new(data), &mut scratch);
    let mut offset = 0u64;
    let result = loop {
        let chunk = match chunks.next().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        let len = chunk.len() as u64;
        if let Err(e) = guard(
            "LOB write",
            engine.write_chunk(lob, offset, chunk),
            cancel,
            timeout,
        )
        .await
        {
            break Err(e);
        }
        offset += len;
    };
    let stats = chunks.stats();
    match result {
        Ok(()) => Ok(stats),
        Err(e) => {
            close_quietly(engine, lob).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that never flags the last chunk.
    struct Unflagged<'a>(SliceSource<'a>);

    impl ChunkSource for Unflagged<'_> {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ChunkRead> {
            let read = self.0.read_chunk(buf).await?;
            Ok(ChunkRead {
                bytes_read: read.bytes_read,
                is_last: false,
            })
        }
    }

    async fn collect<S: ChunkSource>(source: S, chunk: usize) -> (Vec<u8>, TransferStats) {
        let mut buf = vec![0u8; chunk];
        let mut chunks = Chunks::new(source, &mut buf);
        let mut out = Vec::new();
        while let Some(c) = chunks.next().await.unwrap() {
            out.extend_from_slice(c);
        }
        assert!(chunks.is_done());
        (out, chunks.stats())
    }

    #[tokio::test]
    async fn test_nine_bytes_chunk_eight() {
        let data = b"123456789";
        let (out, stats) = collect(SliceSource::new(data), 8).await;
        assert_eq!(out, data);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.bytes, 9);
    }

    #[tokio::test]
    async fn test_boundary_matrix() {
        let c = 8usize;
        for len in [c - 1, c, c + 1, 3 * c - 1, 3 * c, 3 * c + 1] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let expected = len.div_ceil(c) as u64;

            let (out, stats) = collect(SliceSource::new(&data), c).await;
            assert_eq!(out, data, "flagged len {}", len);
            assert_eq!(stats.chunks, expected, "flagged len {}", len);

            let (out, stats) = collect(Unflagged(SliceSource::new(&data)), c).await;
            assert_eq!(out, data, "unflagged len {}", len);
            assert_eq!(stats.chunks, expected, "unflagged len {}", len);
        }
    }

    #[tokio::test]
    async fn test_empty_source() {
        let (out, stats) = collect(SliceSource::new(&[]), 8).await;
        assert!(out.is_empty());
        assert_eq!(stats, TransferStats::default());
    }

    struct Overfill;

    impl ChunkSource for Overfill {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ChunkRead> {
            Ok(ChunkRead {
                bytes_read: buf.len() + 1,
                is_last: false,
            })
        }
    }

    #[tokio::test]
    async fn test_overfill_is_error() {
        let mut buf = vec![0u8; 4];
        let mut chunks = Chunks::new(Overfill, &mut buf);
        assert!(matches!(
            chunks.next().await,
            Err(Error::BufferTooSmall {
                needed: 5,
                available: 4,
                ..
            })
        ));
        assert!(chunks.next().await.unwrap().is_none());
    }
}
