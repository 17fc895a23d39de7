use std::time::Duration;

use plcprims_field::{AddressKind, DataType, FieldError, TransactionId};
use plcprims_frame::FrameError;

/// Errors raised while translating between commands and protocol bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The data type has no fixed wire width in this protocol.
    #[error("data type {0} has no wire width in this protocol")]
    UnsupportedDataType(DataType),

    /// The address kind cannot be expressed by this protocol.
    #[error("{0:?} addresses are not supported by this protocol")]
    UnsupportedOperation(AddressKind),

    /// The address does not fit the command's address field.
    #[error("address {0} out of range")]
    AddressOutOfRange(u32),

    /// A write value does not fit the field's wire type.
    #[error("value {value} out of range for {data_type}")]
    ValueOutOfRange { value: i64, data_type: DataType },

    /// A write value does not match the field's data type.
    #[error("value does not match data type {0}")]
    ValueTypeMismatch(DataType),

    /// A write command was built without a value.
    #[error("write to field {0} carries no value")]
    MissingValue(String),

    /// Recognized, but not handled by this codec.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Fewer bytes than the structure requires.
    #[error("truncated message ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// The element size in a command is not a known width.
    #[error("invalid element size {0}")]
    InvalidSize(u8),

    /// The command byte is not one this codec knows.
    #[error("unknown command 0x{0:02x}")]
    UnknownCommand(u8),

    /// A decoded command does not form a valid field.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Errors from the correlation table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The id is already held by a pending entry.
    #[error("transaction {0} already pending")]
    Duplicate(TransactionId),
}

/// Errors surfaced to callers of the driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Framing failure; fatal to the connection.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Field or request construction failure.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// The request cannot be expressed or the reply cannot be read.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Correlation invariant violated; fatal to the connection.
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(TransactionId),

    /// No reply arrived within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The reply was recognized but this driver does not handle it.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The session ended before a reply arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TableError> for DriverError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Duplicate(id) => DriverError::DuplicateTransaction(id),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
