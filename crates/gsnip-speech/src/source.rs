//! Audio sources feeding the producer task.

use crate::error::SpeechResult;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

#[async_trait]
pub trait AudioSource: Send {
    /// Next chunk, or `None` once the input is exhausted.
    async fn read_chunk(&mut self) -> SpeechResult<Option<Bytes>>;
}

/// Raw LINEAR16 from any reader (a file, stdin, a capture pipe), cut into
/// fixed-size chunks. The last chunk may be short.
pub struct ReaderSource<R> {
    reader: R,
    chunk_bytes: usize,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R, chunk_bytes: usize) -> Self {
        Self {
            reader,
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> AudioSource for ReaderSource<R> {
    async fn read_chunk(&mut self) -> SpeechResult<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(self.chunk_bytes);
        let mut filled = 0;
        while filled < self.chunk_bytes {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf.freeze()))
    }
}

/// Pre-recorded chunks, mostly for tests and replaying captures.
pub struct ChunkSource {
    chunks: std::vec::IntoIter<Bytes>,
}

impl ChunkSource {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

#[async_trait]
impl AudioSource for ChunkSource {
    async fn read_chunk(&mut self) -> SpeechResult<Option<Bytes>> {
        Ok(self.chunks.next())
    }
}
