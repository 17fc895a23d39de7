//! ISO-on-TCP record framing for PLC protocol payloads.
//!
//! Every record on the wire carries a fixed 4-byte header:
//! - A 1-byte magic/version marker (`0x03`)
//! - A reserved byte, always `0x00`
//! - A 2-byte big-endian total length (payload + 4)
//!
//! The codec carries no protocol semantics. Payloads are opaque bytes
//! produced and consumed by a message codec one layer up.

pub mod codec;
pub mod error;
pub mod reader;
#[cfg(feature = "async")]
pub mod stream;
pub mod writer;

pub use codec::{
    decode_frame, decode_frame_strict, encode_frame, Frame, FrameConfig, HEADER_SIZE, MAGIC,
    MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
#[cfg(feature = "async")]
pub use stream::FrameCodec;
pub use writer::FrameWriter;
