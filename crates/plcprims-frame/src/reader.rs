use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{split_record, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete records from any `Read` stream (sockets, capture files).
///
/// Short reads are buffered until a whole record is available.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = split_record(&mut self.buf, &self.config)? {
                return Ok(frame);
            }
            if self.fill()? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    // Append one read's worth of bytes to `buf`. Zero means EOF.
    fn fill(&mut self) -> Result<usize> {
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK_SIZE, 0);
        let read = loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => break Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => break Err(FrameError::Io(err)),
            }
        };
        let n = read.as_ref().map_or(0, |n| *n);
        self.buf.truncate(start + n);
        read
    }

    /// Read frames until a clean EOF between records.
    ///
    /// EOF in the middle of a record is still reported as an error.
    pub fn read_to_end(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            match self.read_frame() {
                Ok(frame) => frames.push(frame),
                Err(FrameError::ConnectionClosed) if self.buf.is_empty() => return Ok(frames),
                Err(err) => return Err(err),
            }
        }
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
