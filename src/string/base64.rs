//! Base64 encoding and decoding of `AUTHENTICATE`-style frames.

use crate::{consts::PLUS, error::FrameError};
use base64::engine::{general_purpose::STANDARD as ENGINE, Engine};

// Do not impl Debug. The encoders here may handle sensitive data.

/// `AUTHENTICATE`-style Base64 encoder.
/// Encodes data using Base64, then splits them into chunks no longer
/// than some pre-determined number of bytes.
///
/// If the encoded data is empty or exactly fills its last chunk,
/// a final `"+"` is yielded so that the receiver knows nothing more is coming.
#[derive(Clone)]
pub struct ChunkEncoder {
    encoded: zeroize::Zeroizing<String>,
    pos: usize,
    max: usize,
    done: bool,
}

impl ChunkEncoder {
    /// Constructs a new chunk encoder with a maximum chunk size of `max`.
    pub fn new<B: AsRef<[u8]>>(bytes: B, max: usize) -> Self {
        if max == 0 {
            return ChunkEncoder::empty();
        }
        let encoded = zeroize::Zeroizing::new(ENGINE.encode(bytes));
        ChunkEncoder { encoded, pos: 0, max, done: false }
    }
    /// Constructs an empty chunk encoder.
    pub fn empty() -> Self {
        ChunkEncoder { encoded: Default::default(), pos: 0, max: 0, done: true }
    }
    /// Returns `true` if this chunk encoder is empty.
    pub fn is_empty(&self) -> bool {
        self.done
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        ChunkEncoder::empty()
    }
}

impl Iterator for ChunkEncoder {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.encoded[self.pos..];
        if rest.is_empty() {
            self.done = true;
            return Some(PLUS.to_owned());
        }
        let len = std::cmp::min(rest.len(), self.max);
        // Base64 is pure ASCII, so any byte offset is a char boundary.
        let chunk = rest[..len].to_owned();
        self.pos += len;
        if len < self.max {
            self.done = true;
        }
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = std::iter::ExactSizeIterator::len(self);
        (chunks, Some(chunks))
    }
}
impl std::iter::FusedIterator for ChunkEncoder {}
impl std::iter::ExactSizeIterator for ChunkEncoder {
    fn len(&self) -> usize {
        if self.done {
            0
        } else {
            // Integer division plus one is intended here.
            // On exactly max bytes, we need to send an extra +.
            (self.encoded.len() - self.pos) / self.max + 1
        }
    }
}

/// The result of adding one chunk to a [`ChunkDecoder`].
#[derive(PartialEq, Eq, Debug)]
pub enum Decoded {
    /// The client aborted authentication.
    Abort,
    /// More chunks are needed.
    Partial,
    /// A complete message was reassembled and decoded.
    ///
    /// An empty message is the result of a lone `"+"`.
    Complete(zeroize::Zeroizing<Vec<u8>>),
}

/// `AUTHENTICATE`-style Base64 decoder.
/// Accepts chunks until it receives one that is not a pre-determined number of bytes long.
///
/// The total amount of buffered data is bounded.
#[derive(Clone)]
pub struct ChunkDecoder {
    buf: zeroize::Zeroizing<Vec<u8>>,
    chunk_len: usize,
    max: usize,
}

impl ChunkDecoder {
    /// Creates a new decoder that accepts chunks of up to `chunk_len` bytes
    /// and buffers no more than `max` bytes in total.
    pub fn new(chunk_len: usize, max: usize) -> Self {
        ChunkDecoder { buf: Default::default(), chunk_len, max }
    }

    /// Returns the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no data is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Adds a chunk of base64-encoded data.
    ///
    /// If `chunk` is shorter than the chunk length the decoder was provided,
    /// treats `chunk` as the final chunk and attempts decoding.
    ///
    /// If `chunk` is `"+"`, the chunk is treated as an empty final chunk.
    /// If `chunk` is `"*"`, the client is aborting and the buffer is discarded.
    ///
    /// On error the buffer is discarded.
    pub fn add<B: AsRef<[u8]>>(&mut self, chunk: B) -> Result<Decoded, FrameError> {
        let chunk = chunk.as_ref();
        match chunk {
            b"*" => {
                self.clear();
                return Ok(Decoded::Abort);
            }
            b"+" => return self.decode().map(Decoded::Complete),
            _ => (),
        }
        if chunk.len() > self.chunk_len {
            self.clear();
            return Err(FrameError::Oversized(chunk.len()));
        }
        if self.buf.len() + chunk.len() > self.max {
            self.clear();
            return Err(FrameError::Overflow);
        }
        self.buf.extend_from_slice(chunk);
        if chunk.len() < self.chunk_len {
            self.decode().map(Decoded::Complete)
        } else {
            Ok(Decoded::Partial)
        }
    }

    /// Decodes the data already added to the decoder.
    ///
    /// This operation leaves the decoder empty.
    pub fn decode(&mut self) -> Result<zeroize::Zeroizing<Vec<u8>>, FrameError> {
        let buf = std::mem::take(&mut self.buf);
        Ok(zeroize::Zeroizing::new(ENGINE.decode(buf.as_slice())?))
    }

    /// Discards any buffered data.
    pub fn clear(&mut self) {
        // Zeroizing wipes the old buffer on drop.
        self.buf = Default::default();
    }
}
