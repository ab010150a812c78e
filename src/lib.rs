//! # influxdb3-flight
//!
//! Async query client for InfluxDB 3 over Arrow Flight SQL.
//!
//! Queries are prepared, executed and fetched through Flight SQL; results
//! come back as a [`QueryIterator`] that can be walked batch by batch or
//! row by row, so large results never have to sit in memory at once.
//!
//! ## Quick Start
//!
//! ```ignore
//! use influxdb3_flight::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         ClientConfig::new("http://localhost:8181", "my-token").with_database("sensors"),
//!     )?;
//!
//!     let mut it = client
//!         .query("SELECT time, room, temp FROM home WHERE time > now() - interval '1 hour'")
//!         .await?;
//!
//!     while let Some(record) = it.next_record().await? {
//!         println!(
//!             "{:?} {} = {:?}",
//!             record.time(),
//!             record.get_string("room").unwrap_or_default(),
//!             record.get("temp")
//!         );
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Options
//!
//! Query and write settings are resolved from a defaults record plus an
//! ordered list of overrides; see [`options`].
//!
//! ```ignore
//! use influxdb3_flight::options::{QueryType, with_database, with_query_type};
//!
//! let it = client
//!     .query_with(
//!         "SHOW MEASUREMENTS",
//!         [with_database("events"), with_query_type(QueryType::InfluxQl)],
//!     )
//!     .await?;
//! ```
//!
//! ## Parameters
//!
//! ```ignore
//! use std::sync::Arc;
//! use arrow_array::{RecordBatch, StringArray};
//!
//! let params = RecordBatch::try_from_iter([(
//!     "room",
//!     Arc::new(StringArray::from(vec!["kitchen"])) as _,
//! )])?;
//! let it = client
//!     .query_parametrized("SELECT * FROM home WHERE room = $room", params)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod iterator;
pub mod options;
pub mod record;
pub mod transport;
pub mod value;

// Re-export main types at crate root
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use iterator::QueryIterator;
pub use options::{Precision, QueryOptions, QueryType, WriteOptions};
pub use record::QueryRecord;
pub use value::Value;

// Re-export the transport seam for custom transports
pub use transport::{CallHeaders, FlightSqlTransport, FlightTransport, PreparedStatementHandle};
