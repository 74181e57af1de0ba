//! Fixed-size re-chunking of response bodies
//!
//! The network hands out frames of arbitrary size. Both the plain transfer
//! path and the cipher path need exact block boundaries, so the body is
//! re-framed here: every block is exactly `chunk_size` bytes except the last.

use crate::error::{MediaripError, Result};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Boxed body stream of a `reqwest` response
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Reads a byte stream back as fixed-size chunks
pub struct ChunkReader<S> {
    stream: S,
    buffer: BytesMut,
    chunk_size: usize,
    finished: bool,
}

impl ChunkReader<ByteStream> {
    /// Re-frame the body of a response
    pub fn from_response(response: reqwest::Response, chunk_size: usize) -> Self {
        Self::new(Box::pin(response.bytes_stream()), chunk_size)
    }
}

impl<S, E> ChunkReader<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    MediaripError: From<E>,
{
    pub fn new(stream: S, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            stream,
            buffer: BytesMut::with_capacity(chunk_size),
            chunk_size,
            finished: false,
        }
    }

    /// Next block, `None` once the body is exhausted
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        loop {
            if self.buffer.len() >= self.chunk_size {
                return Some(Ok(self.buffer.split_to(self.chunk_size).freeze()));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return None;
                }
                return Some(Ok(self.buffer.split().freeze()));
            }

            match self.stream.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.clear();
                    return Some(Err(e.into()));
                }
                None => self.finished = true,
            }
        }
    }
}
