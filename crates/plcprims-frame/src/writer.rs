use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete records to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send one payload (blocking).
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let limit = self.config.payload_limit();
        if payload.len() > limit {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: limit,
            });
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;

        match self.inner.write_all(&self.buf) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WriteZero => {
                return Err(FrameError::ConnectionClosed)
            }
            Err(err) => return Err(FrameError::Io(err)),
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::decode_frame_strict;
    use crate::reader::FrameReader;

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(&[0x01, 0x00, 0x00, 0x01, 0x00, 0x64, 0x02]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(&wire[..4], &[0x03, 0x00, 0x00, 0x0B]);
        let (payload, consumed) = decode_frame_strict(&wire).unwrap();
        assert_eq!(payload, &[0x01, 0x00, 0x00, 0x01, 0x00, 0x64, 0x02]);
        assert_eq!(consumed, wire.len());
    }

    #[test]
    fn written_frames_read_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(b"one").unwrap();
        writer.send(b"two").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire));
        let frames = reader.read_to_end().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload.as_ref(), b"two");
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 4 }));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), 9);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
