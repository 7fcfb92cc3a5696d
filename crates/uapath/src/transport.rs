// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport abstraction over a connected server session.
//!
//! The [`Transport`] trait is the only seam between this crate and the
//! underlying protocol stack. It speaks in wire-level terms: raw variant
//! payloads ([`RawValue`]), browse results ([`BrowseEntry`]) and declared
//! type metadata ([`TypeDescriptor`]). Everything above it — path
//! resolution, decoding, write planning — is protocol-agnostic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{NodeId, NodeKind, TypeId};

// =============================================================================
// Transport Trait
// =============================================================================

/// Connected session to a hierarchical address space.
///
/// All methods take `&self`; implementations are expected to use interior
/// mutability so a single session can serve concurrent browse and read
/// requests. The client layer clones the transport behind an [`Arc`] when
/// fanning out.
///
/// [`Arc`]: std::sync::Arc
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the underlying session.
    async fn connect(&self) -> Result<()>;

    /// Tears down the session. Must be idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Returns `true` while the session is usable.
    fn is_connected(&self) -> bool;

    /// Returns the server endpoint, for diagnostics.
    fn endpoint(&self) -> &str;

    /// Returns the root of the browsable object tree.
    fn objects_root(&self) -> NodeId;

    /// Lists the immediate children of `node`.
    async fn browse_children(&self, node: &NodeId) -> Result<Vec<BrowseEntry>>;

    /// Reads the current value of `node` together with its declared type
    /// metadata.
    async fn read_value(&self, node: &NodeId) -> Result<(RawValue, TypeDescriptor)>;

    /// Writes `value` to `node`.
    async fn write_value(&self, node: &NodeId, value: RawValue) -> Result<WriteOutcome>;

    /// Returns the ordered field names of the record type `type_id`.
    async fn fetch_record_layout(&self, type_id: &TypeId) -> Result<Vec<String>>;
}

// =============================================================================
// BrowseEntry
// =============================================================================

/// One child node returned from a browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseEntry {
    /// The child node.
    pub node: NodeId,

    /// Technical name, unique among siblings.
    pub browse_name: String,

    /// Human-facing name; may differ from the browse name.
    pub display_name: String,

    /// Node classification.
    pub kind: NodeKind,
}

impl BrowseEntry {
    /// Creates a browse entry whose display name equals its browse name.
    pub fn new(node: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        Self {
            node,
            display_name: name.clone(),
            browse_name: name,
            kind,
        }
    }

    /// Sets a display name that differs from the browse name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Returns `true` if either name matches `target` exactly.
    pub fn matches(&self, target: &str) -> bool {
        self.browse_name == target || self.display_name == target
    }
}

// =============================================================================
// RawValue
// =============================================================================

/// Wire-level variant payload as the transport delivers it.
///
/// Variant names follow the server's built-in type vocabulary. Structured
/// payloads arrive either as [`Record`] (self-describing, carrying the type
/// id of their layout) or as a bare positional [`Array`] when the server
/// flattens the record into its field order.
///
/// [`Record`]: RawValue::Record
/// [`Array`]: RawValue::Array
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Absent value.
    Null,

    /// Boolean.
    Boolean(bool),

    /// Signed 8-bit integer.
    SByte(i8),

    /// Unsigned 8-bit integer.
    Byte(u8),

    /// Signed 16-bit integer.
    Int16(i16),

    /// Unsigned 16-bit integer.
    UInt16(u16),

    /// Signed 32-bit integer.
    Int32(i32),

    /// Unsigned 32-bit integer.
    UInt32(u32),

    /// Signed 64-bit integer.
    Int64(i64),

    /// Unsigned 64-bit integer.
    UInt64(u64),

    /// 32-bit floating point.
    Float(f32),

    /// 64-bit floating point.
    Double(f64),

    /// UTF-8 string.
    String(String),

    /// UTC timestamp.
    DateTime(DateTime<Utc>),

    /// GUID.
    Guid(Uuid),

    /// Opaque byte string.
    ByteString(Vec<u8>),

    /// Homogeneous sequence of values.
    Array(Vec<RawValue>),

    /// Structured payload with a known layout type.
    Record {
        /// Identifier of the record's layout type.
        type_id: TypeId,
        /// Field values in layout order, keyed by field name when the
        /// transport resolved names, positional otherwise.
        fields: Vec<(String, RawValue)>,
    },
}

impl RawValue {
    /// Returns the variant name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::Array(_) => "Array",
            Self::Record { .. } => "Record",
        }
    }

    /// Returns the bitmask/enum numeric payload, if this is an unsigned or
    /// signed integer variant.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Boolean(v) => Some(u64::from(*v)),
            Self::Byte(v) => Some(u64::from(*v)),
            Self::UInt16(v) => Some(u64::from(*v)),
            Self::UInt32(v) => Some(u64::from(*v)),
            Self::UInt64(v) => Some(*v),
            Self::SByte(v) => u64::try_from(*v).ok(),
            Self::Int16(v) => u64::try_from(*v).ok(),
            Self::Int32(v) => u64::try_from(*v).ok(),
            Self::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

// =============================================================================
// ScalarType
// =============================================================================

/// Declared scalar base type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Boolean.
    Boolean,

    /// Signed 8-bit integer.
    SByte,

    /// Unsigned 8-bit integer.
    Byte,

    /// Signed 16-bit integer.
    Int16,

    /// Unsigned 16-bit integer.
    UInt16,

    /// Signed 32-bit integer.
    Int32,

    /// Unsigned 32-bit integer.
    UInt32,

    /// Signed 64-bit integer.
    Int64,

    /// Unsigned 64-bit integer.
    UInt64,

    /// 32-bit floating point.
    Float,

    /// 64-bit floating point.
    Double,

    /// UTF-8 string.
    String,

    /// UTC timestamp.
    DateTime,

    /// GUID.
    Guid,

    /// Opaque byte string.
    ByteString,

    /// Structured record type.
    Structure,

    /// Anything not covered above.
    Other,
}

impl ScalarType {
    /// Returns `true` for any integer width.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns `true` for floating-point widths.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

// =============================================================================
// TypeDescriptor
// =============================================================================

/// Declared type metadata of a variable, as read alongside its value.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Identifier of the declared data type.
    pub data_type: TypeId,

    /// Scalar base classification of the data type.
    pub scalar: ScalarType,

    /// Declared value rank: `-1` scalar, `1` one-dimensional array, and so on.
    pub value_rank: i32,

    /// Declared array dimensions, when the variable is array-valued.
    pub array_dimensions: Vec<u32>,

    /// Named members when the type is an enumeration or option set, in bit
    /// order for option sets and discriminant order for enumerations.
    pub enum_strings: Option<Vec<String>>,

    /// `true` when the type is an option set (bitmask) rather than an
    /// exclusive enumeration.
    pub is_option_set: bool,
}

impl TypeDescriptor {
    /// Creates a plain scalar descriptor.
    pub fn scalar(data_type: TypeId, scalar: ScalarType) -> Self {
        Self {
            data_type,
            scalar,
            value_rank: -1,
            array_dimensions: Vec::new(),
            enum_strings: None,
            is_option_set: false,
        }
    }

    /// Marks the descriptor as a one-dimensional array of `len` elements.
    pub fn with_array(mut self, len: u32) -> Self {
        self.value_rank = 1;
        self.array_dimensions = vec![len];
        self
    }

    /// Attaches enumeration member names.
    pub fn with_enum_strings(mut self, names: Vec<String>) -> Self {
        self.enum_strings = Some(names);
        self
    }

    /// Marks the descriptor as an option set (bitmask).
    pub fn with_option_set(mut self) -> Self {
        self.is_option_set = true;
        self
    }

    /// Returns `true` when the declared rank or dimensions indicate an array.
    pub fn is_array(&self) -> bool {
        self.value_rank >= 1 || !self.array_dimensions.is_empty()
    }
}

// =============================================================================
// WriteOutcome
// =============================================================================

/// Result of one transport-level write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The server accepted the write.
    Accepted,

    /// The server rejected the write with a status message.
    Rejected(String),
}

impl WriteOutcome {
    /// Returns `true` when the write was accepted.
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Map from symbolic path to per-path write acceptance, as returned by batch
/// writes.
pub type WriteReport = HashMap<String, bool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_entry_matches_either_name() {
        let entry = BrowseEntry::new(NodeId::numeric(2, 5), "2:cepn1", NodeKind::Object)
            .with_display_name("cepn1");

        assert!(entry.matches("2:cepn1"));
        assert!(entry.matches("cepn1"));
        assert!(!entry.matches("cepn2"));
    }

    #[test]
    fn test_raw_value_as_u64() {
        assert_eq!(RawValue::UInt32(5).as_u64(), Some(5));
        assert_eq!(RawValue::Int32(-1).as_u64(), None);
        assert_eq!(RawValue::Boolean(true).as_u64(), Some(1));
        assert_eq!(RawValue::String("x".into()).as_u64(), None);
    }

    #[test]
    fn test_type_descriptor_array_detection() {
        let dt = NodeId::numeric(0, 6);
        assert!(!TypeDescriptor::scalar(dt.clone(), ScalarType::Int32).is_array());
        assert!(TypeDescriptor::scalar(dt.clone(), ScalarType::Int32)
            .with_array(4)
            .is_array());

        let mut rank_only = TypeDescriptor::scalar(dt, ScalarType::Double);
        rank_only.value_rank = 1;
        assert!(rank_only.is_array());
    }
}
