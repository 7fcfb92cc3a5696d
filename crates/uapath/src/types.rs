// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types for the symbolic-path client layer.
//!
//! This module defines node identity ([`NodeId`]), symbolic paths
//! ([`PathSpec`]), the generic value representation ([`Value`]) that decoded
//! server payloads are mapped into, and the session configuration
//! ([`ClientConfig`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, ConfigurationError};

/// Default root object name resolved at connect time.
pub const DEFAULT_ROOT_OBJECT: &str = "ePAC:Project";

/// Default maximum depth for the root-object search.
pub const DEFAULT_MAX_SEARCH_DEPTH: usize = 10;

/// Default bound on concurrent browse/read requests per tree level.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Default capacity of each metadata cache sub-map.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

// =============================================================================
// NodeId
// =============================================================================

/// Handle to one entry in the server's hierarchical address space.
///
/// A node id pairs a namespace index with an identifier. Node ids are
/// discovered lazily during traversal, borrowed from the transport for the
/// session's lifetime, and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index within the server's namespace table.
    pub namespace_index: u16,

    /// The identifier within the namespace.
    pub identifier: NodeIdentifier,
}

/// Identifier of a structured/record type; stable for the life of a session.
///
/// Type identifiers live in the same address space as nodes.
pub type TypeId = NodeId;

impl NodeId {
    /// Creates a numeric node id.
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node id.
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node id.
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Returns the numeric identifier value, if numeric.
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string identifier value, if string.
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::numeric(0, 0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};{}", self.namespace_index, self.identifier)
    }
}

impl FromStr for NodeId {
    type Err = ClientError;

    /// Parses `ns=<n>;i=<v>`, `ns=<n>;s=<v>` or `ns=<n>;g=<v>` notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ClientError::configuration(ConfigurationError::invalid(
                "node_id",
                format!("cannot parse '{}'", s),
            ))
        };

        let (ns_part, id_part) = s.split_once(';').ok_or_else(invalid)?;
        let namespace_index: u16 = ns_part
            .strip_prefix("ns=")
            .and_then(|v| v.parse().ok())
            .ok_or_else(invalid)?;

        let identifier = if let Some(v) = id_part.strip_prefix("i=") {
            NodeIdentifier::Numeric(v.parse().map_err(|_| invalid())?)
        } else if let Some(v) = id_part.strip_prefix("s=") {
            NodeIdentifier::String(v.to_string())
        } else if let Some(v) = id_part.strip_prefix("g=") {
            NodeIdentifier::Guid(Uuid::parse_str(v).map_err(|_| invalid())?)
        } else {
            return Err(invalid());
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
        }
    }
}

// =============================================================================
// NodeKind
// =============================================================================

/// Coarse classification of a browsed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Container node with children.
    Object,

    /// Node carrying a readable/writable value.
    Variable,

    /// Callable method node.
    Method,

    /// Any other node class.
    Other,
}

impl NodeKind {
    /// Returns `true` if this node can carry a value.
    #[inline]
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Variable)
    }

    /// Returns `true` if this node is worth descending into.
    #[inline]
    pub fn is_browsable(&self) -> bool {
        matches!(self, Self::Object)
    }
}

// =============================================================================
// PathSpec
// =============================================================================

/// An ordered sequence of non-empty segments from splitting a dotted path.
///
/// The first segment resolves under the configured root object; remaining
/// segments resolve as successive child lookups. `"cepn1.sensor1"` becomes
/// `["cepn1", "sensor1"]`. Empty segments are dropped, so `"a..b"` parses the
/// same as `"a.b"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec {
    segments: Vec<String>,
}

impl PathSpec {
    /// Parses a dotted path. Returns `None` when no non-empty segment remains.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Returns the segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the path has no segments (never true for a parsed path).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the final segment.
    pub fn leaf(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Returns the path without its final segment, or `None` for a
    /// single-segment path.
    pub fn parent(&self) -> Option<PathSpec> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

// =============================================================================
// Value
// =============================================================================

/// Generic representation of a decoded server value.
///
/// Scalars keep their declared width; structured records decode to [`Map`],
/// arrays to [`Array`], timestamps to RFC 3339 strings. Insertion order of map
/// entries is not semantically significant.
///
/// [`Map`]: Value::Map
/// [`Array`]: Value::Array
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/absent value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed 8-bit integer.
    Int8(i8),

    /// Signed 16-bit integer.
    Int16(i16),

    /// Signed 32-bit integer.
    Int32(i32),

    /// Signed 64-bit integer.
    Int64(i64),

    /// Unsigned 8-bit integer.
    UInt8(u8),

    /// Unsigned 16-bit integer.
    UInt16(u16),

    /// Unsigned 32-bit integer.
    UInt32(u32),

    /// Unsigned 64-bit integer.
    UInt64(u64),

    /// 32-bit floating point.
    Float32(f32),

    /// 64-bit floating point.
    Float64(f64),

    /// UTF-8 string.
    String(String),

    /// Raw bytes.
    Bytes(Vec<u8>),

    /// Ordered sequence of values.
    Array(Vec<Value>),

    /// Mapping from field/child name to value.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to view the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to view the value as a signed 64-bit integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Int8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::UInt8(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to view the value as a 64-bit float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Attempts to view the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to view the value as a map.
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to view the value as an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the type name of this value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int8(_) => "Int8",
            Self::Int16(_) => "Int16",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::UInt8(_) => "UInt8",
            Self::UInt16(_) => "UInt16",
            Self::UInt32(_) => "UInt32",
            Self::UInt64(_) => "UInt64",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int8(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt8(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Map(v) => write!(f, "{{{} fields}}", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Session configuration for the symbolic-path client.
///
/// # Examples
///
/// ```
/// use uapath::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .root_object("ePAC:Project")
///     .max_search_depth(10)
///     .connect_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the root object resolved at connect time. All symbolic paths
    /// are anchored under this object.
    pub root_object: String,

    /// Maximum depth for the level-order root-object search.
    pub max_search_depth: usize,

    /// Bound on concurrent browse/read requests within one tree level.
    pub max_concurrency: usize,

    /// Capacity of each metadata cache sub-map.
    pub cache_capacity: usize,

    /// Deadline for connection establishment and root resolution.
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Whether writes adapt value types to server-declared metadata.
    pub auto_convert: bool,
}

impl ClientConfig {
    /// Returns a builder with default settings.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.root_object.trim().is_empty() {
            return Err(ClientError::configuration(ConfigurationError::missing(
                "root_object",
            )));
        }
        if self.max_search_depth == 0 {
            return Err(ClientError::configuration(ConfigurationError::invalid(
                "max_search_depth",
                "must be greater than zero",
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ClientError::configuration(ConfigurationError::invalid(
                "max_concurrency",
                "must be greater than zero",
            )));
        }
        if self.cache_capacity == 0 {
            return Err(ClientError::configuration(ConfigurationError::invalid(
                "cache_capacity",
                "must be greater than zero",
            )));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root_object: DEFAULT_ROOT_OBJECT.to_string(),
            max_search_depth: DEFAULT_MAX_SEARCH_DEPTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            connect_timeout: Duration::from_secs(30),
            auto_convert: true,
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the root object name.
    pub fn root_object(mut self, name: impl Into<String>) -> Self {
        self.config.root_object = name.into();
        self
    }

    /// Sets the maximum search depth.
    pub fn max_search_depth(mut self, depth: usize) -> Self {
        self.config.max_search_depth = depth;
        self
    }

    /// Sets the per-level concurrency bound.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.config.max_concurrency = limit;
        self
    }

    /// Sets the metadata cache capacity per sub-map.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Sets the connect deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets whether writes adapt to server-declared types.
    pub fn auto_convert(mut self, enabled: bool) -> Self {
        self.config.auto_convert = enabled;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Duration Serialization Helper
// =============================================================================

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// =============================================================================
// Tests
// =============================================================================
