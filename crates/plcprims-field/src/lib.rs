//! Field descriptors and the request/response model shared by PLC drivers.
//!
//! A [`FieldDescriptor`] names one addressable value in controller memory
//! together with its wire data type. Descriptors are produced by an
//! [`AddressParser`] and are immutable once built; drivers only consume them.

pub mod descriptor;
pub mod error;
pub mod parser;
pub mod request;
pub mod response;

pub use descriptor::{Address, AddressKind, DataType, FieldDescriptor};
pub use error::{FieldError, Result};
pub use parser::{AddressParser, Df1AddressParser};
pub use request::{ReadRequestBuilder, Request, RequestItem, RequestKind, WriteRequestBuilder};
pub use response::{FieldOutcome, PlcValue, Response, ResponseCode, TransactionId};
