// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Write planning.
//!
//! A batch of path writes is grouped by parent before anything touches the
//! transport. When several writes target fields of one array-backed record,
//! the planner reads the parent array once, patches the affected positions
//! and writes the whole array back in a single call. Everything else falls
//! through to independent per-node writes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::MetadataCache;
use crate::codec::ValueCodec;
use crate::navigator::Navigator;
use crate::transport::{RawValue, ScalarType, Transport, TypeDescriptor, WriteOutcome, WriteReport};
use crate::types::{NodeId, PathSpec, Value};

// =============================================================================
// Grouping
// =============================================================================

/// One pending write inside a parent group.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    /// The full path as submitted.
    pub path: String,

    /// Final segment when the path has a parent, `None` for single-segment
    /// paths that are written directly.
    pub leaf: Option<String>,

    /// The value to write.
    pub value: Value,
}

/// Writes grouped by their parent path.
///
/// The key is the parent path string; single-segment paths group under their
/// own full path with no leaf.
pub type WriteGroups = HashMap<String, Vec<PlannedWrite>>;

/// Groups a write batch by parent path.
///
/// Unparseable paths are dropped here and reported as failed by the caller.
pub fn group_by_parent<I>(requests: I) -> WriteGroups
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut groups: WriteGroups = HashMap::new();
    for (path, value) in requests {
        let Some(spec) = PathSpec::parse(&path) else {
            continue;
        };
        let (key, leaf) = match spec.parent() {
            Some(parent) => (parent.to_string(), Some(spec.leaf().to_string())),
            None => (spec.to_string(), None),
        };
        groups
            .entry(key)
            .or_default()
            .push(PlannedWrite { path, leaf, value });
    }
    groups
}

// =============================================================================
// WritePlanner
// =============================================================================

/// Executes grouped write batches against one session.
pub struct WritePlanner<T: Transport + 'static> {
    transport: Arc<T>,
    navigator: Navigator<T>,
    codec: ValueCodec<T>,
    cache: Arc<MetadataCache>,
}

impl<T: Transport + 'static> WritePlanner<T> {
    /// Creates a planner over shared session components.
    pub fn new(
        transport: Arc<T>,
        navigator: Navigator<T>,
        codec: ValueCodec<T>,
        cache: Arc<MetadataCache>,
    ) -> Self {
        Self {
            transport,
            navigator,
            codec,
            cache,
        }
    }

    /// Executes a write batch under `base`, returning per-path acceptance.
    ///
    /// With `auto_convert` set, independent writes adapt their value to the
    /// target node's declared type; without it the wire type is inferred
    /// from the value's shape. Every submitted path appears in the report;
    /// paths that fail to parse or resolve report `false` rather than
    /// aborting the batch.
    pub async fn execute(
        &self,
        base: &NodeId,
        requests: Vec<(String, Value)>,
        auto_convert: bool,
    ) -> WriteReport {
        let mut report: WriteReport =
            requests.iter().map(|(path, _)| (path.clone(), false)).collect();

        for (parent_path, writes) in group_by_parent(requests) {
            let Some(parent_spec) = PathSpec::parse(&parent_path) else {
                continue;
            };
            let Some(parent_node) = self.navigator.resolve_path(base, &parent_spec).await
            else {
                debug!(parent = %parent_path, "write parent not found");
                continue;
            };

            let named: Vec<&PlannedWrite> =
                writes.iter().filter(|w| w.leaf.is_some()).collect();

            // Coalescing only pays off for multi-field groups; a lone field
            // write stays an ordinary per-node write.
            if named.len() >= 2 {
                if let Some(results) = self.try_coalesce(&parent_node, &named).await {
                    for (path, accepted) in results {
                        report.insert(path, accepted);
                    }
                    // A direct write to the parent path itself can share the
                    // group key; it still goes out on its own.
                    for write in writes.iter().filter(|w| w.leaf.is_none()) {
                        let accepted =
                            self.write_single(&parent_node, write, auto_convert).await;
                        report.insert(write.path.clone(), accepted);
                    }
                    continue;
                }
            }

            for write in &writes {
                let accepted = self.write_single(&parent_node, write, auto_convert).await;
                report.insert(write.path.clone(), accepted);
            }
        }

        report
    }

    /// Attempts to patch an array-backed record in one call.
    ///
    /// Returns `None` when the parent value is not an array or its layout is
    /// unknown; the caller then falls back to independent writes. Fields
    /// with no position in the layout report `false` without blocking the
    /// rest of the group.
    async fn try_coalesce(
        &self,
        parent_node: &NodeId,
        writes: &[&PlannedWrite],
    ) -> Option<Vec<(String, bool)>> {
        let (raw, descriptor) = match self.transport.read_value(parent_node).await {
            Ok(read) => read,
            Err(error) => {
                debug!(node = %parent_node, %error, "parent read failed");
                return None;
            }
        };
        let RawValue::Array(mut elements) = raw else {
            return None;
        };
        let layout = self.codec.record_layout(&descriptor.data_type).await?;

        let mut results = Vec::with_capacity(writes.len());
        let mut patched = 0usize;

        for write in writes {
            let leaf = write.leaf.as_deref().unwrap_or_default();
            let position = layout.iter().position(|name| name == leaf);

            let Some(position) = position.filter(|p| *p < elements.len()) else {
                debug!(path = %write.path, "field has no position in record layout");
                results.push((write.path.clone(), false));
                continue;
            };

            // The current element tells us the wire type to hit.
            let target = raw_scalar_kind(&elements[position]);
            match crate::codec::encode_scalar(&write.value, target) {
                Ok(encoded) => {
                    elements[position] = encoded;
                    patched += 1;
                    results.push((write.path.clone(), true));
                }
                Err(error) => {
                    debug!(path = %write.path, %error, "field conversion failed");
                    results.push((write.path.clone(), false));
                }
            }
        }

        if patched == 0 {
            return Some(results);
        }

        let outcome = self
            .transport
            .write_value(parent_node, RawValue::Array(elements))
            .await;
        let accepted = matches!(outcome, Ok(WriteOutcome::Accepted));
        if !accepted {
            if let Ok(WriteOutcome::Rejected(status)) = &outcome {
                warn!(node = %parent_node, %status, "coalesced write rejected");
            }
            // The single transport call carried every patched field.
            for entry in &mut results {
                entry.1 = false;
            }
        }
        Some(results)
    }

    /// Writes one path independently: resolve the leaf, adapt the value to
    /// its declared type, write.
    async fn write_single(
        &self,
        parent_node: &NodeId,
        write: &PlannedWrite,
        auto_convert: bool,
    ) -> bool {
        let node = match &write.leaf {
            Some(leaf) => match self.navigator.find_child(parent_node, leaf).await {
                Some(entry) => entry.node,
                None => {
                    debug!(path = %write.path, "leaf not found under parent");
                    return false;
                }
            },
            None => parent_node.clone(),
        };

        let descriptor = if auto_convert {
            self.node_descriptor(&node).await
        } else {
            None
        };

        let encoded = match self.codec.encode(&write.value, descriptor.as_ref()) {
            Ok(encoded) => encoded,
            Err(error) => {
                debug!(path = %write.path, %error, "value conversion failed");
                return false;
            }
        };

        match self.transport.write_value(&node, encoded).await {
            Ok(WriteOutcome::Accepted) => true,
            Ok(WriteOutcome::Rejected(status)) => {
                warn!(path = %write.path, %status, "write rejected");
                false
            }
            Err(error) => {
                warn!(path = %write.path, %error, "write failed");
                false
            }
        }
    }

    /// Returns the declared type of `node`, reading it once per session.
    async fn node_descriptor(&self, node: &NodeId) -> Option<TypeDescriptor> {
        if let Some(descriptor) = self.cache.get_definition(node) {
            return Some(descriptor);
        }
        match self.transport.read_value(node).await {
            Ok((_, descriptor)) => {
                self.cache.set_definition(node.clone(), descriptor.clone());
                Some(descriptor)
            }
            Err(error) => {
                debug!(node = %node, %error, "type metadata unavailable");
                None
            }
        }
    }
}

/// Scalar classification of a wire value, used to pick the conversion target
/// when patching array elements in place.
fn raw_scalar_kind(raw: &RawValue) -> ScalarType {
    match raw {
        RawValue::Boolean(_) => ScalarType::Boolean,
        RawValue::SByte(_) => ScalarType::SByte,
        RawValue::Byte(_) => ScalarType::Byte,
        RawValue::Int16(_) => ScalarType::Int16,
        RawValue::UInt16(_) => ScalarType::UInt16,
        RawValue::Int32(_) => ScalarType::Int32,
        RawValue::UInt32(_) => ScalarType::UInt32,
        RawValue::Int64(_) => ScalarType::Int64,
        RawValue::UInt64(_) => ScalarType::UInt64,
        RawValue::Float(_) => ScalarType::Float,
        RawValue::Double(_) => ScalarType::Double,
        RawValue::String(_) => ScalarType::String,
        RawValue::DateTime(_) => ScalarType::DateTime,
        RawValue::Guid(_) => ScalarType::Guid,
        RawValue::ByteString(_) => ScalarType::ByteString,
        RawValue::Null | RawValue::Array(_) | RawValue::Record { .. } => ScalarType::Other,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_parent() {
        let groups = group_by_parent(vec![
            ("cepn1.sensor1".to_string(), Value::Int32(1)),
            ("cepn1.sensor2".to_string(), Value::Int32(2)),
            ("cepn2.sensor1".to_string(), Value::Int32(3)),
            ("standalone".to_string(), Value::Bool(true)),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups["cepn1"].len(), 2);
        assert_eq!(groups["cepn1"][0].leaf.as_deref(), Some("sensor1"));
        assert_eq!(groups["cepn2"].len(), 1);

        let direct = &groups["standalone"][0];
        assert_eq!(direct.leaf, None);
        assert_eq!(direct.path, "standalone");
    }

    #[test]
    fn test_group_by_parent_nested_paths() {
        let groups = group_by_parent(vec![
            ("line1.motor.speed".to_string(), Value::Float64(1.0)),
            ("line1.motor.torque".to_string(), Value::Float64(2.0)),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["line1.motor"].len(), 2);
    }

    #[test]
    fn test_group_by_parent_drops_empty_paths() {
        let groups = group_by_parent(vec![
            ("...".to_string(), Value::Int32(0)),
            ("valid".to_string(), Value::Int32(1)),
        ]);
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("valid"));
    }

    #[test]
    fn test_raw_scalar_kind() {
        assert_eq!(raw_scalar_kind(&RawValue::Int32(0)), ScalarType::Int32);
        assert_eq!(raw_scalar_kind(&RawValue::Double(0.0)), ScalarType::Double);
        assert_eq!(
            raw_scalar_kind(&RawValue::Array(Vec::new())),
            ScalarType::Other
        );
    }
}
