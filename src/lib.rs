//! Inventory [Amazon Kinesis Data Firehose](https://docs.aws.amazon.com/firehose/latest/dev/what-is-this-service.html)
//! delivery streams as flat relational rows, received from a
//! [Rust Stream](https://docs.rs/futures-core/0.3.29/futures_core/stream/trait.Stream.html).
//!
//! Every delivery stream is listed, described and tagged, then its nested configuration is
//! flattened into one row per table: the delivery stream itself, its OpenSearch and extended S3
//! destinations, their processors and the processors' parameters. Child rows reference their
//! parent row through a `<parent>_cq_id` column.
//!
//! ## Getting Started
//!
//! A simple example is as follows. Edit your **Cargo.toml** at first.
//!
//! ```toml
//! [dependencies]
//! firehose-inventory = "0.1"
//! aws-config = "1.0.1"
//! tokio = { version = "1", features = ["macros", "rt-multi-thread"] }
//! tokio-stream = "0.1.14"
//! ```
//!
//! Then in code, you can receive every delivery stream of the configured region with the
//! following. This stream emits a [`Resource`] per delivery stream.
//!
//! ```rust,no_run
//! use aws_config::BehaviorVersion;
//! use firehose_inventory as inventory;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
//!
//!     let client = inventory::Client::new(&config);
//!     let mut stream = inventory::builder()
//!         .client(client)
//!         .account_id("123456789012")
//!         .build();
//!
//!     while let Some(resource) = stream.next().await {
//!         match resource {
//!             Ok(resource) => println!("{:#?}", resource.rows()),
//!             Err(err) => eprintln!("{err}"),
//!         }
//!     }
//! }
//! ```
//!
//! ## Writing rows
//!
//! [`InventoryStream::write_all`] drains the stream into any [`RowWriter`]. Rows of one delivery
//! stream are written together, parents before children.
//!
//! ```rust,no_run
//! # use aws_config::BehaviorVersion;
//! use firehose_inventory as inventory;
//!
//! # async fn wrapper() -> Result<(), inventory::error::Error> {
//! # let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
//! # let client = inventory::Client::new(&config);
//! let writer = inventory::writer::JsonLinesWriter::new(std::io::stdout());
//! let summary = inventory::builder().client(client).build().write_all(&writer).await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## AWS SDK Dependency
//!
//! To build [`Client`] of this crate, you must pass the reference for
//! [`SdkConfig`](aws_config::SdkConfig).

/// Cancellation shared by every stage of the inventory.
pub mod cancel;

/// Client for calling AWS APIs.
pub mod client;

/// Common errors.
pub mod error;

/// Listing, describing and tagging delivery streams.
pub mod inventory;

/// Projection of detail records onto a schema.
pub mod materialize;

/// Cursor-driven pagination.
pub mod paginate;

/// Dotted paths into nested records.
pub mod path;

/// Materialized rows.
pub mod row;

/// Table definitions.
pub mod schema;

/// Tag aggregation.
pub mod tags;

/// Data structures used by operations.
pub mod types;

/// Destinations for materialized rows.
pub mod writer;

pub use client::{Client, FirehoseClient};
pub use inventory::{builder, InventoryBuilder, InventoryStream, Summary};
pub use row::{Datum, Resource, Row};
pub use writer::RowWriter;
