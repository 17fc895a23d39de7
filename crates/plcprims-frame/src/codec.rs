use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (1) + reserved (1) + total length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// ISO-on-TCP version marker. Fixed by the protocol, not configurable.
pub const MAGIC: u8 = 0x03;

const RESERVED: u8 = 0x00;

/// Largest payload whose total length still fits the 16-bit length field.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - HEADER_SIZE;

/// One transport record: the declared header length and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Total length as declared by the header (advisory on decode).
    pub length: u16,
    /// The record payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, computing the declared length from the payload.
    pub fn new(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let length = total_length(payload.len())?;
        Ok(Self { length, payload })
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────────┬─────────────────┐
/// │ Magic    │ Reserved │ Length       │ Payload          │
/// │ 0x03     │ 0x00     │ (2B BE)      │ (Length-4 bytes) │
/// └──────────┴──────────┴──────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = total_length(payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(MAGIC);
    dst.put_u8(RESERVED);
    dst.put_u16(length);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one transport record.
///
/// The declared length is read but not trusted: everything after the header
/// up to the end of `input` is returned as payload, and the whole record is
/// reported as consumed. Callers that want the declared length enforced use
/// [`decode_frame_strict`].
pub fn decode_frame(input: &[u8]) -> Result<(&[u8], usize)> {
    let declared = read_header(input)?;
    if declared as usize != input.len() {
        tracing::trace!(
            declared,
            actual = input.len(),
            "frame length disagrees with record size, passing through"
        );
    }
    Ok((&input[HEADER_SIZE..], input.len()))
}

/// Decode one transport record, rejecting a declared length that differs
/// from the record size.
pub fn decode_frame_strict(input: &[u8]) -> Result<(&[u8], usize)> {
    let declared = read_header(input)?;
    if declared as usize != input.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: input.len(),
        });
    }
    Ok((&input[HEADER_SIZE..], input.len()))
}

/// Validate the marker and return the declared total length.
pub(crate) fn read_header(input: &[u8]) -> Result<u16> {
    let Some(&first) = input.first() else {
        return Err(FrameError::Truncated { available: 0 });
    };
    if first != MAGIC {
        return Err(FrameError::InvalidMagic { found: first });
    }
    if input.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            available: input.len(),
        });
    }
    Ok(u16::from_be_bytes([input[2], input[3]]))
}

/// Split one complete record off the front of a stream buffer.
///
/// Returns `Ok(None)` until the buffer holds the full declared length. On
/// stream transports the declared length is the only record boundary there
/// is, so it is enforced here rather than treated as advisory.
pub(crate) fn split_record(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != MAGIC {
        return Err(FrameError::InvalidMagic { found: first });
    }
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let declared = u16::from_be_bytes([src[2], src[3]]);
    let total = declared as usize;
    if total < HEADER_SIZE {
        return Err(FrameError::InvalidLength { declared });
    }
    let limit = config.payload_limit();
    if total - HEADER_SIZE > limit {
        return Err(FrameError::PayloadTooLarge {
            size: total - HEADER_SIZE,
            max: limit,
        });
    }
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    let record = src.split_to(total).freeze();
    let (_, consumed) = config.decode(&record)?;
    tracing::trace!(length = declared, "frame received");
    Ok(Some(Frame {
        length: declared,
        payload: record.slice(HEADER_SIZE..consumed),
    }))
}

fn total_length(payload_len: usize) -> Result<u16> {
    if payload_len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD,
        });
    }
    Ok((payload_len + HEADER_SIZE) as u16)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default and ceiling: [`MAX_PAYLOAD`].
    pub max_payload_size: usize,
    /// Reject records whose declared length differs from their size.
    pub strict_length: bool,
}

impl FrameConfig {
    /// Decode a record using the configured length policy.
    pub fn decode<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], usize)> {
        if self.strict_length {
            decode_frame_strict(input)
        } else {
            decode_frame(input)
        }
    }

    /// Effective payload limit, never above what the header can express.
    pub fn payload_limit(&self) -> usize {
        self.max_payload_size.min(MAX_PAYLOAD)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            strict_length: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = [0x01, 0x00, 0x00, 0x07, 0x00, 0x64, 0x02];

        encode_frame(&payload, &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + payload.len());
        assert_eq!(&buf[..4], &[0x03, 0x00, 0x00, 0x0B]);

        let (decoded, consumed) = decode_frame(&buf).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x03, 0x00, 0x00, 0x04]);

        let (decoded, consumed) = decode_frame(&buf).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(consumed, HEADER_SIZE);
    }

    #[test]
    fn test_max_payload_accepted() {
        let payload = vec![0x5A; MAX_PAYLOAD];
        let mut buf = BytesMut::new();
        encode_frame(&payload, &mut buf).unwrap();
        assert_eq!(&buf[2..4], &[0xFF, 0xFF]);

        let (decoded, _) = decode_frame_strict(&buf).unwrap();
        assert_eq!(decoded.len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(&payload, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size, max } if size == MAX_PAYLOAD + 1 && max == MAX_PAYLOAD
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let bytes = [0x05, 0x00, 0x00, 0x06, 0x41, 0x00];
        let err = decode_frame(&bytes).unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic { found: 0x05 }));
    }

    #[test]
    fn test_decode_truncated_header() {
        let err = decode_frame(&[0x03, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { available: 2 }));

        let err = decode_frame(&[]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { available: 0 }));
    }

    // The declared length is advisory in lenient mode: a record that is
    // longer or shorter than declared still yields all remaining bytes.
    #[test]
    fn test_lenient_length_passthrough() {
        let longer = [0x03, 0x00, 0x00, 0x05, 0xAA, 0xBB, 0xCC];
        let (payload, consumed) = decode_frame(&longer).unwrap();
        assert_eq!(payload, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(consumed, 7);

        let bogus = [0x03, 0x00, 0xFF, 0xFF, 0x01];
        let (payload, _) = decode_frame(&bogus).unwrap();
        assert_eq!(payload, &[0x01]);
    }

    #[test]
    fn test_strict_length_mismatch() {
        let longer = [0x03, 0x00, 0x00, 0x05, 0xAA, 0xBB, 0xCC];
        let err = decode_frame_strict(&longer).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthMismatch {
                declared: 5,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_config_selects_policy() {
        let record = [0x03, 0x00, 0x00, 0x09, 0x01];
        assert!(FrameConfig::default().decode(&record).is_ok());

        let strict = FrameConfig {
            strict_length: true,
            ..FrameConfig::default()
        };
        assert!(strict.decode(&record).is_err());
    }

    #[test]
    fn test_payload_limit_is_capped() {
        let cfg = FrameConfig {
            max_payload_size: usize::MAX,
            ..FrameConfig::default()
        };
        assert_eq!(cfg.payload_limit(), MAX_PAYLOAD);
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(Bytes::from_static(b"test")).unwrap();
        assert_eq!(frame.length, 8);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
