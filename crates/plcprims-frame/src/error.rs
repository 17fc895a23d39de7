/// Errors that can occur during frame encoding/decoding.
///
/// Every decode-side variant is connection-fatal: the decoder never tries to
/// resynchronize on a damaged stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The record does not start with the ISO-on-TCP marker.
    #[error("invalid frame magic 0x{found:02x} (expected 0x03)")]
    InvalidMagic { found: u8 },

    /// The record is shorter than the fixed header.
    #[error("truncated frame header ({available} bytes, need 4)")]
    Truncated { available: usize },

    /// The declared total length cannot even cover the header.
    #[error("invalid declared frame length {declared}")]
    InvalidLength { declared: u16 },

    /// Strict mode only: declared length disagrees with the record size.
    #[error("declared frame length {declared} does not match record size {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    /// The payload exceeds the configured or representable maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
