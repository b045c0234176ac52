//! Audio not yet covered by a final result.

use bytes::Bytes;
use std::collections::VecDeque;

/// FIFO of fixed-duration chunks with the stream offset of the first one.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    chunks: VecDeque<Bytes>,
    start_ms: i64,
    chunk_ms: i64,
}

impl ReplayBuffer {
    pub fn new(chunk_ms: i64) -> Self {
        Self {
            chunks: VecDeque::new(),
            start_ms: 0,
            chunk_ms,
        }
    }

    pub fn push(&mut self, chunk: Bytes) {
        self.chunks.push_back(chunk);
    }

    /// Drop every chunk that ends at or before `watermark_ms`.
    pub fn trim_to(&mut self, watermark_ms: i64) {
        while !self.chunks.is_empty() {
            let end = self.start_ms + self.chunk_ms;
            if end > watermark_ms {
                break;
            }
            self.start_ms = end;
            self.chunks.pop_front();
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Bytes> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Offset of the first buffered chunk across all streams.
    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(n: u8) -> ReplayBuffer {
        let mut b = ReplayBuffer::new(1000);
        for i in 0..n {
            b.push(Bytes::from(vec![i]));
        }
        b
    }

    #[test]
    fn trims_whole_chunks_only() {
        let mut b = buffer_of(4);
        b.trim_to(1999);
        assert_eq!(b.len(), 3);
        assert_eq!(b.start_ms(), 1000);

        b.trim_to(3000);
        assert_eq!(b.len(), 1);
        assert_eq!(b.start_ms(), 3000);
        assert_eq!(b.chunks().next().unwrap()[0], 3);
    }

    #[test]
    fn watermark_behind_start_is_a_no_op() {
        let mut b = buffer_of(2);
        b.trim_to(1000);
        b.trim_to(500);
        assert_eq!(b.len(), 1);
        assert_eq!(b.start_ms(), 1000);
    }

    #[test]
    fn empty_buffer_keeps_offset() {
        let mut b = buffer_of(1);
        b.trim_to(10_000);
        assert!(b.is_empty());
        assert_eq!(b.start_ms(), 1000);
    }
}
