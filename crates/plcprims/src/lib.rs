//! PLC protocol plumbing with permissive licensing.
//!
//! plcprims frames ISO-on-TCP records, models controller fields, encodes
//! DF1 commands and correlates replies to concurrent callers over one
//! connection.
//!
//! # Crate Structure
//!
//! - [`frame`]: ISO-on-TCP record framing (`0x03 0x00 <len:2>`)
//! - [`field`]: Field descriptors, address parsing, requests and responses
//! - [`driver`]: Message codecs, correlation table and the async pipeline
//!   (behind the default `driver` feature)

/// Re-export frame types.
pub mod frame {
    pub use plcprims_frame::*;
}

/// Re-export field model types.
pub mod field {
    pub use plcprims_field::*;
}

/// Re-export driver types (requires `driver` feature).
#[cfg(feature = "driver")]
pub mod driver {
    pub use plcprims_driver::*;
}
