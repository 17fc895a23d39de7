use std::fmt;
use std::io;

use plcprims_driver::{CodecError, DriverError};
use plcprims_field::FieldError;
use plcprims_frame::FrameError;

// Process exit codes. 124 matches timeout(1); 64 and up follow sysexits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn field_error(context: &str, err: FieldError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    let code = match err {
        CodecError::UnsupportedDataType(_)
        | CodecError::UnsupportedOperation(_)
        | CodecError::AddressOutOfRange(_)
        | CodecError::ValueOutOfRange { .. }
        | CodecError::ValueTypeMismatch(_)
        | CodecError::MissingValue(_) => USAGE,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn driver_error(context: &str, err: DriverError) -> CliError {
    match err {
        DriverError::Frame(err) => frame_error(context, err),
        DriverError::Field(err) => field_error(context, err),
        DriverError::Codec(err) => codec_error(context, err),
        DriverError::Io(err) => io_error(context, err),
        DriverError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        DriverError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}
