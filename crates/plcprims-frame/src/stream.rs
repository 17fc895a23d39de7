//! Stream transports have no record boundaries of their own; this codec
//! recovers them from the declared header length.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, split_record, Frame, FrameConfig};
use crate::error::FrameError;

/// `tokio_util` codec splitting a byte stream into ISO-on-TCP records.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: FrameConfig,
}

impl FrameCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        split_record(src, &self.config)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let limit = self.config.payload_limit();
        if item.len() > limit {
            return Err(FrameError::PayloadTooLarge {
                size: item.len(),
                max: limit,
            });
        }
        encode_frame(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::MAGIC;

    #[test]
    fn decode_complete_record() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        encode_frame(&[0x41, 0x00, 0x00, 0x01, 0x00, 0x2A], &mut buf).unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.length, 10);
        assert_eq!(frame.payload.as_ref(), &[0x41, 0x00, 0x00, 0x01, 0x00, 0x2A]);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_header_and_payload() {
        let mut codec = FrameCodec::new();
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire).unwrap();

        let mut buf = BytesMut::from(&wire[..3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&wire[3..6]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&wire[6..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn decode_splits_back_to_back_records() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = codec.decode(&mut buf).unwrap().unwrap();
        let f2 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f1.payload.as_ref(), b"first");
        assert_eq!(f2.payload.as_ref(), b"second");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_rejects_bad_magic_without_resync() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x05, 0x03, 0x00, 0x04][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic { found: 0x05 }));
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn decode_rejects_length_below_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x03, 0x00, 0x00, 0x02][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { declared: 2 }));
    }

    #[test]
    fn decode_rejects_payload_over_limit() {
        let mut codec = FrameCodec::with_config(FrameConfig {
            max_payload_size: 8,
            ..FrameConfig::default()
        });
        let mut buf = BytesMut::new();
        buf.put_u8(MAGIC);
        buf.put_u8(0);
        buf.put_u16(64);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 60, max: 8 }));
    }

    #[test]
    fn encode_respects_limit() {
        let mut codec = FrameCodec::with_config(FrameConfig {
            max_payload_size: 2,
            ..FrameConfig::default()
        });
        let mut dst = BytesMut::new();
        let err = codec
            .encode(Bytes::from_static(b"abc"), &mut dst)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (left, right) = tokio::io::duplex(64);
        let mut sink = FramedWrite::new(left, FrameCodec::new());
        let mut source = FramedRead::new(right, FrameCodec::new());

        sink.send(Bytes::from_static(b"one")).await.unwrap();
        sink.send(Bytes::from_static(b"two")).await.unwrap();

        let f1 = source.next().await.unwrap().unwrap();
        let f2 = source.next().await.unwrap().unwrap();
        assert_eq!(f1.payload.as_ref(), b"one");
        assert_eq!(f2.payload.as_ref(), b"two");
    }
}
