// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value decoding and encoding.
//!
//! The codec maps wire-level payloads ([`RawValue`]) to the generic
//! [`Value`] model and back, dispatching on the value's category as derived
//! from its declared metadata. Decoding is best-effort: missing metadata
//! degrades to a shape-driven mapping instead of failing, so a read never
//! errors on an unfamiliar payload. Encoding is strict and reports
//! conversion problems as [`CodecError`]s.
//!
//! [`CodecError`]: crate::error::CodecError

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::cache::MetadataCache;
use crate::error::{ClientError, CodecError, Result};
use crate::transport::{RawValue, ScalarType, Transport, TypeDescriptor};
use crate::types::{TypeId, Value};

// =============================================================================
// ValueCategory
// =============================================================================

/// Decode/encode dispatch category of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    /// Plain scalar.
    Scalar,

    /// Array-valued.
    Array,

    /// Structured record.
    Record,

    /// Option set decoded to named booleans.
    Bitmask,

    /// Exclusive enumeration decoded to its member name.
    Enum,

    /// Timestamp decoded to an RFC 3339 string.
    Timestamp,
}

/// Derives the dispatch category from declared metadata.
///
/// Option-set and enumeration classification take precedence over array
/// rank, so an option-set variable with array dimensions still decodes as a
/// bitmask.
pub fn classify(descriptor: &TypeDescriptor) -> ValueCategory {
    if descriptor.enum_strings.is_some() {
        if descriptor.is_option_set {
            return ValueCategory::Bitmask;
        }
        return ValueCategory::Enum;
    }
    if descriptor.is_array() {
        return ValueCategory::Array;
    }
    match descriptor.scalar {
        ScalarType::Structure => ValueCategory::Record,
        ScalarType::DateTime => ValueCategory::Timestamp,
        _ => ValueCategory::Scalar,
    }
}

// =============================================================================
// ValueCodec
// =============================================================================

/// Category-dispatched codec over one transport session.
///
/// Record layouts are resolved through the shared [`MetadataCache`] and only
/// fall through to the transport on a cache miss.
pub struct ValueCodec<T: Transport + 'static> {
    transport: Arc<T>,
    cache: Arc<MetadataCache>,
}

impl<T: Transport + 'static> Clone for ValueCodec<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<T: Transport + 'static> ValueCodec<T> {
    /// Creates a codec over `transport` sharing `cache`.
    pub fn new(transport: Arc<T>, cache: Arc<MetadataCache>) -> Self {
        Self { transport, cache }
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decodes a raw payload under its declared metadata.
    ///
    /// Never fails: metadata gaps and unexpected shapes fall back to the
    /// shape-driven mapping of [`decode_untyped`].
    ///
    /// [`decode_untyped`]: Self::decode_untyped
    pub async fn decode(&self, raw: &RawValue, descriptor: &TypeDescriptor) -> Value {
        match classify(descriptor) {
            ValueCategory::Bitmask => self.decode_bitmask(raw, descriptor).await,
            ValueCategory::Enum => self.decode_enum(raw, descriptor).await,
            ValueCategory::Timestamp => self.decode_untyped(raw).await,
            ValueCategory::Array => self.decode_array(raw, descriptor).await,
            ValueCategory::Record => self.decode_record(raw, descriptor).await,
            ValueCategory::Scalar => self.decode_untyped(raw).await,
        }
    }

    /// Decodes an option set into a map of member name to bit state.
    ///
    /// Bit `i` of the numeric payload pairs with member `i` of the declared
    /// member list.
    async fn decode_bitmask(&self, raw: &RawValue, descriptor: &TypeDescriptor) -> Value {
        let (Some(bits), Some(names)) = (raw.as_u64(), descriptor.enum_strings.as_ref())
        else {
            return self.decode_untyped(raw).await;
        };

        // Names past the integer's bit width are simply false.
        let map = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let set = i < u64::BITS as usize && (bits >> i) & 1 == 1;
                (name.clone(), Value::Bool(set))
            })
            .collect();
        Value::Map(map)
    }

    /// Decodes an enumeration into its member name, keeping the raw number
    /// when the discriminant is out of range.
    async fn decode_enum(&self, raw: &RawValue, descriptor: &TypeDescriptor) -> Value {
        let (Some(index), Some(names)) = (raw.as_u64(), descriptor.enum_strings.as_ref())
        else {
            return self.decode_untyped(raw).await;
        };

        match names.get(index as usize) {
            Some(name) => Value::String(name.clone()),
            None => Value::UInt64(index),
        }
    }

    /// Decodes an array element-wise under the element's scalar type.
    async fn decode_array(&self, raw: &RawValue, descriptor: &TypeDescriptor) -> Value {
        let RawValue::Array(items) = raw else {
            return self.decode_untyped(raw).await;
        };

        let element = TypeDescriptor::scalar(descriptor.data_type.clone(), descriptor.scalar);
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            decoded.push(self.decode_boxed(item, &element).await);
        }
        Value::Array(decoded)
    }

    /// Decodes a structured record into a name-keyed map.
    ///
    /// Handles both the self-describing [`RawValue::Record`] form and the
    /// flattened positional array form; in either case field names come from
    /// the record layout, fetched through the cache.
    async fn decode_record(&self, raw: &RawValue, descriptor: &TypeDescriptor) -> Value {
        match raw {
            RawValue::Record { type_id, fields } => {
                let layout = self.record_layout(type_id).await;
                let mut map = std::collections::HashMap::with_capacity(fields.len());
                for (position, (name, field)) in fields.iter().enumerate() {
                    let key = if !name.is_empty() {
                        name.clone()
                    } else {
                        layout
                            .as_ref()
                            .and_then(|l| l.get(position).cloned())
                            .unwrap_or_else(|| format!("field_{}", position))
                    };
                    map.insert(key, self.decode_untyped(field).await);
                }
                Value::Map(map)
            }
            RawValue::Array(items) => {
                // Flattened record: pair positions with the layout of the
                // declared data type.
                let Some(layout) = self.record_layout(&descriptor.data_type).await else {
                    return self.decode_untyped(raw).await;
                };
                let mut map = std::collections::HashMap::with_capacity(items.len());
                for (position, item) in items.iter().enumerate() {
                    let key = layout
                        .get(position)
                        .cloned()
                        .unwrap_or_else(|| format!("field_{}", position));
                    map.insert(key, self.decode_untyped(item).await);
                }
                Value::Map(map)
            }
            _ => self.decode_untyped(raw).await,
        }
    }

    /// Shape-driven decode used when no usable metadata is available.
    ///
    /// Scalars map directly, timestamps become RFC 3339 strings, GUIDs
    /// become their canonical string form, and records fall back to field
    /// names carried on the wire.
    pub fn decode_untyped<'a>(
        &'a self,
        raw: &'a RawValue,
    ) -> Pin<Box<dyn Future<Output = Value> + Send + 'a>> {
        Box::pin(async move {
            match raw {
                RawValue::Null => Value::Null,
                RawValue::Boolean(v) => Value::Bool(*v),
                RawValue::SByte(v) => Value::Int8(*v),
                RawValue::Byte(v) => Value::UInt8(*v),
                RawValue::Int16(v) => Value::Int16(*v),
                RawValue::UInt16(v) => Value::UInt16(*v),
                RawValue::Int32(v) => Value::Int32(*v),
                RawValue::UInt32(v) => Value::UInt32(*v),
                RawValue::Int64(v) => Value::Int64(*v),
                RawValue::UInt64(v) => Value::UInt64(*v),
                RawValue::Float(v) => Value::Float32(*v),
                RawValue::Double(v) => Value::Float64(*v),
                RawValue::String(v) => Value::String(v.clone()),
                RawValue::DateTime(v) => Value::String(v.to_rfc3339()),
                RawValue::Guid(v) => Value::String(v.to_string()),
                RawValue::ByteString(v) => Value::Bytes(v.clone()),
                RawValue::Array(items) => {
                    let mut decoded = Vec::with_capacity(items.len());
                    for item in items {
                        decoded.push(self.decode_untyped(item).await);
                    }
                    Value::Array(decoded)
                }
                RawValue::Record { type_id, fields } => {
                    let layout = self.record_layout(type_id).await;
                    let mut map = std::collections::HashMap::with_capacity(fields.len());
                    for (position, (name, field)) in fields.iter().enumerate() {
                        let key = if !name.is_empty() {
                            name.clone()
                        } else {
                            layout
                                .as_ref()
                                .and_then(|l| l.get(position).cloned())
                                .unwrap_or_else(|| format!("field_{}", position))
                        };
                        map.insert(key, self.decode_untyped(field).await);
                    }
                    Value::Map(map)
                }
            }
        })
    }

    fn decode_boxed<'a>(
        &'a self,
        raw: &'a RawValue,
        descriptor: &'a TypeDescriptor,
    ) -> Pin<Box<dyn Future<Output = Value> + Send + 'a>> {
        Box::pin(self.decode(raw, descriptor))
    }

    /// Resolves a record layout through the cache, fetching on a miss.
    ///
    /// Fetch failures are logged and reported as `None`; the caller then
    /// falls back to positional field keys.
    pub async fn record_layout(&self, type_id: &TypeId) -> Option<Vec<String>> {
        if let Some(fields) = self.cache.get_fields(type_id) {
            return Some(fields);
        }
        match self.transport.fetch_record_layout(type_id).await {
            Ok(fields) => {
                self.cache.set_fields(type_id.clone(), fields.clone());
                Some(fields)
            }
            Err(error) => {
                debug!(type_id = %type_id, %error, "record layout unavailable");
                None
            }
        }
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encodes a value for writing.
    ///
    /// With a descriptor the value is adapted to the declared type: integers
    /// are width-converted with range checks, enumeration member names map
    /// back to their discriminant, bitmask maps reassemble into their
    /// numeric form, and timestamps parse from RFC 3339. Without a
    /// descriptor the wire type is inferred from the value's shape.
    pub fn encode(&self, value: &Value, descriptor: Option<&TypeDescriptor>) -> Result<RawValue> {
        match descriptor {
            Some(descriptor) => self.encode_typed(value, descriptor),
            None => encode_inferred(value),
        }
    }

    fn encode_typed(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<RawValue> {
        match classify(descriptor) {
            ValueCategory::Bitmask => self.encode_bitmask(value, descriptor),
            ValueCategory::Enum => self.encode_enum(value, descriptor),
            ValueCategory::Timestamp => encode_timestamp(value),
            ValueCategory::Array => self.encode_array(value, descriptor),
            ValueCategory::Record => Err(ClientError::codec(CodecError::unsupported(
                "structured values are written through their individual fields",
            ))),
            ValueCategory::Scalar => encode_scalar(value, descriptor.scalar),
        }
    }

    fn encode_bitmask(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<RawValue> {
        let names = descriptor
            .enum_strings
            .as_ref()
            .ok_or_else(|| ClientError::codec(CodecError::unsupported("option set without members")))?;

        match value {
            Value::Map(flags) => {
                let mut bits: u64 = 0;
                for (name, flag) in flags {
                    let position = names.iter().position(|n| n == name).ok_or_else(|| {
                        ClientError::type_mismatch("option set member", name)
                    })?;
                    if flag.as_bool().ok_or_else(|| {
                        ClientError::type_mismatch("Bool", flag.type_name())
                    })? {
                        if position >= u64::BITS as usize {
                            return Err(ClientError::codec(CodecError::out_of_range(
                                name.clone(),
                                "option set width",
                            )));
                        }
                        bits |= 1 << position;
                    }
                }
                encode_unsigned(bits, descriptor.scalar)
            }
            // A pre-assembled numeric mask passes straight through.
            other => match other.as_i64() {
                Some(v) if v >= 0 => encode_unsigned(v as u64, descriptor.scalar),
                _ => Err(ClientError::type_mismatch("Map or unsigned integer", other.type_name())),
            },
        }
    }

    fn encode_enum(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<RawValue> {
        let names = descriptor
            .enum_strings
            .as_ref()
            .ok_or_else(|| ClientError::codec(CodecError::unsupported("enumeration without members")))?;

        match value {
            Value::String(name) => {
                let index = names.iter().position(|n| n == name).ok_or_else(|| {
                    ClientError::type_mismatch("enumeration member", name)
                })?;
                encode_unsigned(index as u64, descriptor.scalar)
            }
            other => match other.as_i64() {
                Some(v) if v >= 0 => encode_unsigned(v as u64, descriptor.scalar),
                _ => Err(ClientError::type_mismatch(
                    "String or unsigned integer",
                    other.type_name(),
                )),
            },
        }
    }

    fn encode_array(&self, value: &Value, descriptor: &TypeDescriptor) -> Result<RawValue> {
        let Value::Array(items) = value else {
            return Err(ClientError::type_mismatch("Array", value.type_name()));
        };
        let items = items
            .iter()
            .map(|item| encode_scalar(item, descriptor.scalar))
            .collect::<Result<Vec<_>>>()?;
        Ok(RawValue::Array(items))
    }
}

// =============================================================================
// Scalar Conversion
// =============================================================================

/// Converts a value into the declared scalar wire type, range-checked.
pub(crate) fn encode_scalar(value: &Value, target: ScalarType) -> Result<RawValue> {
    if value.is_null() {
        return Ok(RawValue::Null);
    }

    let mismatch = || ClientError::type_mismatch(scalar_name(target), value.type_name());
    let range = |v: &dyn std::fmt::Display| {
        ClientError::codec(CodecError::out_of_range(v.to_string(), scalar_name(target)))
    };

    match target {
        ScalarType::Boolean => match value {
            Value::Bool(v) => Ok(RawValue::Boolean(*v)),
            other => match other.as_i64() {
                Some(0) => Ok(RawValue::Boolean(false)),
                Some(1) => Ok(RawValue::Boolean(true)),
                _ => Err(mismatch()),
            },
        },
        ScalarType::SByte => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            i8::try_from(v).map(RawValue::SByte).map_err(|_| range(&v))
        }
        ScalarType::Byte => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            u8::try_from(v).map(RawValue::Byte).map_err(|_| range(&v))
        }
        ScalarType::Int16 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            i16::try_from(v).map(RawValue::Int16).map_err(|_| range(&v))
        }
        ScalarType::UInt16 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            u16::try_from(v).map(RawValue::UInt16).map_err(|_| range(&v))
        }
        ScalarType::Int32 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            i32::try_from(v).map(RawValue::Int32).map_err(|_| range(&v))
        }
        ScalarType::UInt32 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            u32::try_from(v).map(RawValue::UInt32).map_err(|_| range(&v))
        }
        ScalarType::Int64 => value.as_i64().map(RawValue::Int64).ok_or_else(mismatch),
        ScalarType::UInt64 => match value {
            Value::UInt64(v) => Ok(RawValue::UInt64(*v)),
            other => {
                let v = other.as_i64().ok_or_else(mismatch)?;
                u64::try_from(v).map(RawValue::UInt64).map_err(|_| range(&v))
            }
        },
        ScalarType::Float => value
            .as_f64()
            .map(|v| RawValue::Float(v as f32))
            .ok_or_else(mismatch),
        ScalarType::Double => value.as_f64().map(RawValue::Double).ok_or_else(mismatch),
        ScalarType::String => match value {
            Value::String(v) => Ok(RawValue::String(v.clone())),
            Value::Array(_) | Value::Map(_) | Value::Bytes(_) => Err(mismatch()),
            other => Ok(RawValue::String(other.to_string())),
        },
        ScalarType::DateTime => encode_timestamp(value),
        ScalarType::Guid => {
            let text = value.as_str().ok_or_else(mismatch)?;
            Uuid::parse_str(text).map(RawValue::Guid).map_err(|_| mismatch())
        }
        ScalarType::ByteString => match value {
            Value::Bytes(v) => Ok(RawValue::ByteString(v.clone())),
            _ => Err(mismatch()),
        },
        ScalarType::Structure | ScalarType::Other => Err(ClientError::codec(
            CodecError::unsupported(format!("cannot encode into {}", scalar_name(target))),
        )),
    }
}

fn encode_unsigned(bits: u64, target: ScalarType) -> Result<RawValue> {
    let target = if target.is_integer() {
        target
    } else {
        ScalarType::UInt32
    };
    encode_scalar(&Value::UInt64(bits), target)
}

fn encode_timestamp(value: &Value) -> Result<RawValue> {
    let text = value
        .as_str()
        .ok_or_else(|| ClientError::type_mismatch("RFC 3339 string", value.type_name()))?;
    DateTime::parse_from_rfc3339(text)
        .map(|dt| RawValue::DateTime(dt.with_timezone(&Utc)))
        .map_err(|_| ClientError::type_mismatch("RFC 3339 string", text))
}

/// Infers the wire type from the value's shape when no metadata is declared.
pub(crate) fn encode_inferred(value: &Value) -> Result<RawValue> {
    Ok(match value {
        Value::Null => RawValue::Null,
        Value::Bool(v) => RawValue::Boolean(*v),
        Value::Int8(v) => RawValue::SByte(*v),
        Value::Int16(v) => RawValue::Int16(*v),
        Value::Int32(v) => RawValue::Int32(*v),
        Value::Int64(v) => {
            if let Ok(narrow) = i32::try_from(*v) {
                RawValue::Int32(narrow)
            } else {
                RawValue::Int64(*v)
            }
        }
        Value::UInt8(v) => RawValue::Byte(*v),
        Value::UInt16(v) => RawValue::UInt16(*v),
        Value::UInt32(v) => RawValue::UInt32(*v),
        Value::UInt64(v) => RawValue::UInt64(*v),
        Value::Float32(v) => RawValue::Float(*v),
        Value::Float64(v) => RawValue::Double(*v),
        Value::String(v) => RawValue::String(v.clone()),
        Value::Bytes(v) => RawValue::ByteString(v.clone()),
        Value::Array(items) => RawValue::Array(
            items
                .iter()
                .map(encode_inferred)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(_) => {
            return Err(ClientError::codec(CodecError::unsupported(
                "maps cannot be encoded without declared type metadata",
            )))
        }
    })
}

fn scalar_name(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::Boolean => "Boolean",
        ScalarType::SByte => "SByte",
        ScalarType::Byte => "Byte",
        ScalarType::Int16 => "Int16",
        ScalarType::UInt16 => "UInt16",
        ScalarType::Int32 => "Int32",
        ScalarType::UInt32 => "UInt32",
        ScalarType::Int64 => "Int64",
        ScalarType::UInt64 => "UInt64",
        ScalarType::Float => "Float",
        ScalarType::Double => "Double",
        ScalarType::String => "String",
        ScalarType::DateTime => "DateTime",
        ScalarType::Guid => "Guid",
        ScalarType::ByteString => "ByteString",
        ScalarType::Structure => "Structure",
        ScalarType::Other => "Other",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transport::{BrowseEntry, WriteOutcome};
    use crate::types::NodeId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Minimal transport that only serves record layouts.
    struct LayoutTransport {
        layouts: RwLock<HashMap<TypeId, Vec<String>>>,
    }

    impl LayoutTransport {
        fn new() -> Self {
            Self {
                layouts: RwLock::new(HashMap::new()),
            }
        }

        fn with_layout(self, type_id: TypeId, fields: &[&str]) -> Self {
            self.layouts
                .write()
                .unwrap()
                .insert(type_id, fields.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    #[async_trait]
    impl Transport for LayoutTransport {
        async fn connect(&self) -> Result<()> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn endpoint(&self) -> &str {
            "opc.tcp://test:4840"
        }
        fn objects_root(&self) -> NodeId {
            NodeId::numeric(0, 85)
        }
        async fn browse_children(&self, _node: &NodeId) -> Result<Vec<BrowseEntry>> {
            Ok(Vec::new())
        }
        async fn read_value(&self, node: &NodeId) -> Result<(RawValue, TypeDescriptor)> {
            Err(ClientError::read_failed(node.to_string(), "not wired"))
        }
        async fn write_value(&self, _node: &NodeId, _value: RawValue) -> Result<WriteOutcome> {
            Ok(WriteOutcome::Accepted)
        }
        async fn fetch_record_layout(&self, type_id: &TypeId) -> Result<Vec<String>> {
            self.layouts
                .read()
                .unwrap()
                .get(type_id)
                .cloned()
                .ok_or_else(|| ClientError::read_failed(type_id.to_string(), "unknown type"))
        }
    }

    fn codec_with(transport: LayoutTransport) -> ValueCodec<LayoutTransport> {
        ValueCodec::new(Arc::new(transport), Arc::new(MetadataCache::new(16)))
    }

    fn enum_descriptor(names: &[&str], option_set: bool) -> TypeDescriptor {
        let mut d = TypeDescriptor::scalar(NodeId::numeric(2, 100), ScalarType::UInt32)
            .with_enum_strings(names.iter().map(|s| s.to_string()).collect());
        if option_set {
            d = d.with_option_set();
        }
        d
    }

    #[test]
    fn test_classify_precedence() {
        let dt = NodeId::numeric(0, 6);

        assert_eq!(
            classify(&enum_descriptor(&["a"], true)),
            ValueCategory::Bitmask
        );
        assert_eq!(
            classify(&enum_descriptor(&["a"], false)),
            ValueCategory::Enum
        );
        assert_eq!(
            classify(&TypeDescriptor::scalar(dt.clone(), ScalarType::Int32).with_array(3)),
            ValueCategory::Array
        );
        assert_eq!(
            classify(&TypeDescriptor::scalar(dt.clone(), ScalarType::Structure)),
            ValueCategory::Record
        );
        assert_eq!(
            classify(&TypeDescriptor::scalar(dt.clone(), ScalarType::DateTime)),
            ValueCategory::Timestamp
        );
        assert_eq!(
            classify(&TypeDescriptor::scalar(dt, ScalarType::Double)),
            ValueCategory::Scalar
        );

        // Option set flags beat array rank.
        assert_eq!(
            classify(&enum_descriptor(&["a"], true).with_array(2)),
            ValueCategory::Bitmask
        );
    }

    #[tokio::test]
    async fn test_decode_bitmask_bits() {
        let codec = codec_with(LayoutTransport::new());
        let descriptor = enum_descriptor(&["a", "b", "c"], true);

        let decoded = codec.decode(&RawValue::UInt32(0b101), &descriptor).await;
        let map = decoded.as_map().unwrap();
        assert_eq!(map["a"], Value::Bool(true));
        assert_eq!(map["b"], Value::Bool(false));
        assert_eq!(map["c"], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_decode_enum_name_and_out_of_range() {
        let codec = codec_with(LayoutTransport::new());
        let descriptor = enum_descriptor(&["stopped", "running"], false);

        assert_eq!(
            codec.decode(&RawValue::UInt32(1), &descriptor).await,
            Value::String("running".into())
        );
        assert_eq!(
            codec.decode(&RawValue::UInt32(9), &descriptor).await,
            Value::UInt64(9)
        );
    }

    #[tokio::test]
    async fn test_decode_flattened_record() {
        let type_id = NodeId::numeric(3, 500);
        let codec = codec_with(
            LayoutTransport::new().with_layout(type_id.clone(), &["speed", "active"]),
        );
        let descriptor = TypeDescriptor::scalar(type_id, ScalarType::Structure);

        let raw = RawValue::Array(vec![RawValue::Double(12.5), RawValue::Boolean(true)]);
        let decoded = codec.decode(&raw, &descriptor).await;
        let map = decoded.as_map().unwrap();
        assert_eq!(map["speed"], Value::Float64(12.5));
        assert_eq!(map["active"], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_decode_record_layout_miss_keeps_positions() {
        let codec = codec_with(LayoutTransport::new());
        let raw = RawValue::Record {
            type_id: NodeId::numeric(3, 1),
            fields: vec![
                (String::new(), RawValue::Int32(1)),
                (String::new(), RawValue::Int32(2)),
            ],
        };
        let descriptor = TypeDescriptor::scalar(NodeId::numeric(3, 1), ScalarType::Structure);

        let decoded = codec.decode(&raw, &descriptor).await;
        let map = decoded.as_map().unwrap();
        assert_eq!(map["field_0"], Value::Int32(1));
        assert_eq!(map["field_1"], Value::Int32(2));
    }

    #[tokio::test]
    async fn test_decode_timestamp_to_rfc3339() {
        let codec = codec_with(LayoutTransport::new());
        let descriptor =
            TypeDescriptor::scalar(NodeId::numeric(0, 13), ScalarType::DateTime);
        let instant = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let decoded = codec.decode(&RawValue::DateTime(instant), &descriptor).await;
        assert_eq!(decoded.as_str().unwrap(), instant.to_rfc3339());
    }

    #[test]
    fn test_encode_scalar_width_and_range() {
        assert_eq!(
            encode_scalar(&Value::Int64(300), ScalarType::Int16).unwrap(),
            RawValue::Int16(300)
        );
        assert!(encode_scalar(&Value::Int64(70000), ScalarType::Int16).is_err());
        assert!(encode_scalar(&Value::Int64(-1), ScalarType::Byte).is_err());
        assert_eq!(
            encode_scalar(&Value::Int32(1), ScalarType::Boolean).unwrap(),
            RawValue::Boolean(true)
        );
        assert_eq!(
            encode_scalar(&Value::Int32(42), ScalarType::String).unwrap(),
            RawValue::String("42".into())
        );
    }

    #[test]
    fn test_encode_enum_by_name() {
        let codec = codec_with(LayoutTransport::new());
        let descriptor = enum_descriptor(&["stopped", "running"], false);

        assert_eq!(
            codec
                .encode(&Value::String("running".into()), Some(&descriptor))
                .unwrap(),
            RawValue::UInt32(1)
        );
        assert!(codec
            .encode(&Value::String("sideways".into()), Some(&descriptor))
            .is_err());
    }

    #[test]
    fn test_encode_bitmask_from_map() {
        let codec = codec_with(LayoutTransport::new());
        let descriptor = enum_descriptor(&["a", "b", "c"], true);

        let mut flags = HashMap::new();
        flags.insert("a".to_string(), Value::Bool(true));
        flags.insert("c".to_string(), Value::Bool(true));

        assert_eq!(
            codec
                .encode(&Value::Map(flags), Some(&descriptor))
                .unwrap(),
            RawValue::UInt32(0b101)
        );
    }

    #[test]
    fn test_encode_inferred() {
        assert_eq!(
            encode_inferred(&Value::Int64(5)).unwrap(),
            RawValue::Int32(5)
        );
        assert_eq!(
            encode_inferred(&Value::Int64(1 << 40)).unwrap(),
            RawValue::Int64(1 << 40)
        );
        assert_eq!(
            encode_inferred(&Value::Bool(true)).unwrap(),
            RawValue::Boolean(true)
        );
        assert_eq!(
            encode_inferred(&Value::Float64(1.5)).unwrap(),
            RawValue::Double(1.5)
        );
        assert!(encode_inferred(&Value::Map(HashMap::new())).is_err());
    }
}
