// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapath
//!
//! Symbolic-path client layer for hierarchical industrial address spaces.
//!
//! The crate sits on top of a pluggable [`Transport`] and turns wire-level
//! browse/read/write primitives into a path-oriented API:
//!
//! - **Navigation** — the configured root object is located with a bounded
//!   parallel level-order search; dotted paths such as `cepn1.sensor1` then
//!   resolve as successive child lookups ([`Navigator`]).
//! - **Metadata caching** — record field layouts and per-node type
//!   descriptors are cached in bounded LRU maps with hit/miss accounting
//!   ([`MetadataCache`]).
//! - **Value codec** — payloads decode by category: scalars, arrays,
//!   structured records, option sets to named booleans, enumerations to
//!   member names, timestamps to RFC 3339 ([`ValueCodec`]).
//! - **Write planning** — batched writes group by parent, and writes that
//!   target fields of one array-backed record collapse into a single
//!   read-patch-write call ([`WritePlanner`]).
//!
//! [`PathClient`] composes all of the above behind one session facade.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example<T: uapath::Transport + 'static>(transport: T) -> uapath::Result<()> {
//! use uapath::{ClientConfig, PathClient, Value};
//!
//! let config = ClientConfig::builder()
//!     .root_object("ePAC:Project")
//!     .max_concurrency(20)
//!     .build()?;
//!
//! let client = PathClient::new(transport, config)?;
//! client.connect().await?;
//!
//! let readings = client.read_node("cepn1").await?;
//! println!("{:?}", readings);
//!
//! let report = client
//!     .write(vec![
//!         ("cepn1.sensor1".to_string(), Value::Int32(1)),
//!         ("cepn1.sensor2".to_string(), Value::Int32(0)),
//!     ])
//!     .await?;
//! println!("{:?}", report);
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod codec;
pub mod error;
pub mod navigator;
pub mod planner;
pub mod transport;
pub mod types;

pub use cache::{CacheStats, MetadataCache};
pub use client::{ClientStats, PathClient};
pub use codec::{classify, ValueCategory, ValueCodec};
pub use error::{
    ClientError, CodecError, ConfigurationError, ConnectionError, OperationError, Result,
    TimeoutError,
};
pub use navigator::{Navigator, NavigatorStats};
pub use planner::{group_by_parent, PlannedWrite, WritePlanner};
pub use transport::{
    BrowseEntry, RawValue, ScalarType, Transport, TypeDescriptor, WriteOutcome, WriteReport,
};
pub use types::{
    ClientConfig, ClientConfigBuilder, NodeId, NodeIdentifier, NodeKind, PathSpec, TypeId, Value,
};
