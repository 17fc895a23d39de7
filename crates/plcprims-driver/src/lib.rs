//! Request/response driver core for PLC protocols.
//!
//! A [`Driver`] owns one established byte stream. Callers submit
//! [`Request`](plcprims_field::Request)s concurrently; each field becomes one
//! protocol command with its own transaction id, registered in a
//! [`CorrelationTable`] until the matching reply arrives, the caller gives
//! up, or the session ends.
//!
//! ```no_run
//! use plcprims_driver::{Df1Codec, Driver, DriverConfig};
//! use plcprims_field::{AddressParser, Df1AddressParser, Request};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = tokio::net::TcpStream::connect("10.0.0.5:102").await?;
//! let driver = Driver::from_stream(stream, Df1Codec, DriverConfig::default());
//!
//! let field = Df1AddressParser.parse("DB1", "DB100", "100:INTEGER")?;
//! let response = driver.submit(&Request::read().field(field).build()?).await?;
//! println!("{:?}", response.value("DB1/DB100"));
//! driver.close().await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stats;
pub mod table;

pub use codec::{Codec, Command, Df1Codec, Reply, ReplyKind};
pub use config::DriverConfig;
pub use error::{CodecError, DriverError, Result, TableError};
pub use pipeline::{CloseCause, Driver, PendingResponse};
pub use stats::{DriverStats, StatsSnapshot};
pub use table::CorrelationTable;
