// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level session facade.
//!
//! [`PathClient`] owns one transport session and composes the navigator,
//! metadata cache, codec and write planner behind a small path-oriented API:
//! connect, read by symbolic path, write a batch, inspect cache statistics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cache::{CacheStats, MetadataCache};
use crate::codec::ValueCodec;
use crate::error::{ClientError, Result};
use crate::navigator::{Navigator, NavigatorStats};
use crate::planner::WritePlanner;
use crate::transport::{Transport, WriteReport};
use crate::types::{ClientConfig, NodeId, PathSpec, Value};

// =============================================================================
// PathClient
// =============================================================================

/// Path-oriented client over one transport session.
///
/// # Examples
///
/// ```no_run
/// # async fn example<T: uapath::Transport + 'static>(transport: T) -> uapath::Result<()> {
/// use uapath::{ClientConfig, PathClient};
///
/// let client = PathClient::new(transport, ClientConfig::default())?;
/// client.connect().await?;
///
/// let values = client.read_node("cepn1").await?;
/// println!("{:?}", values);
///
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct PathClient<T: Transport + 'static> {
    transport: Arc<T>,
    config: ClientConfig,
    cache: Arc<MetadataCache>,
    navigator: Navigator<T>,
    codec: ValueCodec<T>,
    planner: WritePlanner<T>,
    semaphore: Arc<Semaphore>,
    root: Mutex<Option<NodeId>>,
    counters: ClientCounters,
}

impl<T: Transport + 'static> PathClient<T> {
    /// Creates a client over `transport`. The configuration is validated up
    /// front; no connection is made until [`connect`].
    ///
    /// [`connect`]: Self::connect
    pub fn new(transport: T, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(transport);
        let cache = Arc::new(MetadataCache::new(config.cache_capacity));
        let navigator = Navigator::new(Arc::clone(&transport), config.max_concurrency);
        let codec = ValueCodec::new(Arc::clone(&transport), Arc::clone(&cache));
        let planner = WritePlanner::new(
            Arc::clone(&transport),
            navigator.clone(),
            codec.clone(),
            Arc::clone(&cache),
        );
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        Ok(Self {
            transport,
            config,
            cache,
            navigator,
            codec,
            planner,
            semaphore,
            root: Mutex::new(None),
            counters: ClientCounters::default(),
        })
    }

    /// Connects the transport and locates the configured root object.
    ///
    /// Both steps share one deadline; on expiry the session is left
    /// disconnected and a timeout error is returned.
    pub async fn connect(&self) -> Result<()> {
        let deadline = self.config.connect_timeout;
        let setup = async {
            self.transport.connect().await?;
            self.navigator
                .find_root(&self.config.root_object, self.config.max_search_depth)
                .await
        };

        match tokio::time::timeout(deadline, setup).await {
            Ok(Ok(root)) => {
                info!(
                    endpoint = self.transport.endpoint(),
                    root = %root,
                    object = self.config.root_object.as_str(),
                    "session established"
                );
                *self.root.lock() = Some(root);
                Ok(())
            }
            Ok(Err(error)) => {
                let _ = self.transport.disconnect().await;
                Err(error)
            }
            Err(_) => {
                let _ = self.transport.disconnect().await;
                Err(ClientError::connect_timeout(deadline))
            }
        }
    }

    /// Disconnects and drops all session-scoped state.
    pub async fn disconnect(&self) -> Result<()> {
        *self.root.lock() = None;
        self.cache.clear();
        self.transport.disconnect().await
    }

    /// Returns `true` while the session is connected and the root object is
    /// resolved.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected() && self.root.lock().is_some()
    }

    fn root(&self) -> Result<NodeId> {
        if !self.transport.is_connected() {
            return Err(ClientError::not_connected());
        }
        self.root.lock().clone().ok_or_else(ClientError::not_connected)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Resolves `path` under the root object and reads it, descending at
    /// most the configured search depth.
    ///
    /// A variable node yields its decoded value keyed by the path's final
    /// segment; an object node yields its subtree as nested maps. Returns
    /// `Ok(None)` when the path does not resolve.
    pub async fn read_node(&self, path: &str) -> Result<Option<HashMap<String, Value>>> {
        self.read_node_depth(path, self.config.max_search_depth).await
    }

    /// Like [`read_node`], descending at most `max_depth` levels below the
    /// resolved node.
    ///
    /// [`read_node`]: Self::read_node
    pub async fn read_node_depth(
        &self,
        path: &str,
        max_depth: usize,
    ) -> Result<Option<HashMap<String, Value>>> {
        let root = self.root()?;
        let Some(spec) = PathSpec::parse(path) else {
            return Ok(None);
        };
        let Some(node) = self.navigator.resolve_path(&root, &spec).await else {
            return Ok(None);
        };

        let value = self.read_subtree(node, max_depth).await;
        let mut result = HashMap::with_capacity(1);
        result.insert(spec.leaf().to_string(), value);
        Ok(Some(result))
    }

    /// Reads the entire subtree under the root object, descending at most
    /// the configured search depth.
    pub async fn read_all(&self) -> Result<HashMap<String, Value>> {
        self.read_all_depth(self.config.max_search_depth).await
    }

    /// Like [`read_all`] with an explicit depth bound.
    ///
    /// [`read_all`]: Self::read_all
    pub async fn read_all_depth(&self, max_depth: usize) -> Result<HashMap<String, Value>> {
        let root = self.root()?;
        match self.read_subtree(root, max_depth).await {
            Value::Map(map) => Ok(map),
            other => {
                // The root resolved to a plain variable.
                let mut map = HashMap::with_capacity(1);
                map.insert(self.config.root_object.clone(), other);
                Ok(map)
            }
        }
    }

    /// Reads many paths concurrently.
    ///
    /// The result contains an entry per path that resolved to a readable
    /// node; paths that did not resolve are absent.
    pub async fn read_values(&self, paths: &[String]) -> Result<HashMap<String, Value>> {
        let root = self.root()?;
        let specs: Vec<PathSpec> = paths.iter().filter_map(|p| PathSpec::parse(p)).collect();
        let resolved = self.navigator.resolve_many(&root, &specs).await;

        let targets: Vec<(String, NodeId)> = specs
            .iter()
            .zip(resolved)
            .filter_map(|(spec, node)| node.map(|n| (spec.to_string(), n)))
            .collect();

        debug!(
            requested = paths.len(),
            resolved = targets.len(),
            "batch read"
        );
        Ok(self.read_leaves(targets).await.into_iter().collect())
    }

    /// Reads and decodes a set of variable nodes with bounded fan-out.
    ///
    /// Results are reassembled by index, so the output order is the input
    /// order minus failed reads.
    async fn read_leaves<K: Send + 'static>(&self, targets: Vec<(K, NodeId)>) -> Vec<(K, Value)> {
        let mut set = JoinSet::new();
        for (idx, (key, node)) in targets.into_iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let cache = Arc::clone(&self.cache);
            let codec = self.codec.clone();
            let semaphore = Arc::clone(&self.semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                match transport.read_value(&node).await {
                    Ok((raw, descriptor)) => {
                        cache.set_definition(node, descriptor.clone());
                        let value = codec.decode(&raw, &descriptor).await;
                        (idx, Some((key, value)))
                    }
                    Err(error) => {
                        debug!(node = %node, %error, "read failed");
                        (idx, None)
                    }
                }
            });
        }

        let mut slots: Vec<Option<(K, Value)>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((idx, entry)) = joined {
                if slots.len() <= idx {
                    slots.resize_with(idx + 1, || None);
                }
                // Failed reads are dropped from the result and do not count.
                if entry.is_some() {
                    self.counters.reads.fetch_add(1, Ordering::Relaxed);
                }
                slots[idx] = entry;
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// Reads one node as a value. A variable decodes directly; an object is
    /// walked level by level down to `max_depth`, its variables read with
    /// bounded fan-out and reassembled into nested maps.
    async fn read_subtree(&self, node: NodeId, max_depth: usize) -> Value {
        // Try the node as a variable first; objects fail this read and fall
        // through to enumeration.
        if let Ok((raw, descriptor)) = self.transport.read_value(&node).await {
            self.counters.reads.fetch_add(1, Ordering::Relaxed);
            self.cache.set_definition(node, descriptor.clone());
            return self.codec.decode(&raw, &descriptor).await;
        }

        let descendants = self.navigator.enumerate_children(&node, max_depth).await;
        let targets: Vec<(Vec<String>, NodeId)> = descendants
            .into_iter()
            .filter(|(_, entry)| entry.kind.has_value())
            .map(|(path, entry)| (path, entry.node))
            .collect();

        let mut map = HashMap::new();
        for (path, value) in self.read_leaves(targets).await {
            insert_at_path(&mut map, &path, value);
        }
        Value::Map(map)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Writes a batch of path/value pairs, returning per-path acceptance.
    ///
    /// Writes targeting fields of one array-backed record collapse into a
    /// single transport call; everything else writes independently. A failed
    /// path never aborts the rest of the batch. Values are adapted to their
    /// target's declared type per the configured `auto_convert` default; use
    /// [`write_with`] to override it for one batch.
    ///
    /// [`write_with`]: Self::write_with
    pub async fn write(&self, requests: Vec<(String, Value)>) -> Result<WriteReport> {
        self.write_with(requests, self.config.auto_convert).await
    }

    /// Writes a batch with an explicit auto-conversion setting.
    ///
    /// With `auto_convert` off, wire types are inferred from the submitted
    /// values rather than the target nodes' declared types.
    pub async fn write_with(
        &self,
        requests: Vec<(String, Value)>,
        auto_convert: bool,
    ) -> Result<WriteReport> {
        let root = self.root()?;
        let report = self.planner.execute(&root, requests, auto_convert).await;
        self.counters
            .writes
            .fetch_add(report.len() as u64, Ordering::Relaxed);
        Ok(report)
    }

    /// Writes a single path.
    pub async fn write_one(&self, path: &str, value: Value) -> Result<bool> {
        let report = self.write(vec![(path.to_string(), value)]).await?;
        Ok(report.get(path).copied().unwrap_or(false))
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns the session configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns metadata cache effectiveness counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resets cache hit/miss counters.
    pub fn reset_cache_stats(&self) {
        self.cache.reset_stats();
    }

    /// Returns a snapshot of session activity.
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            navigation: self.navigator.stats(),
            cache: self.cache.stats(),
        }
    }
}

/// Inserts a decoded value into nested maps along its name path, creating
/// intermediate maps as needed. A path that collides with an existing
/// non-map value replaces it.
fn insert_at_path(map: &mut HashMap<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            map.insert(leaf.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Map(HashMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(HashMap::new());
            }
            if let Value::Map(inner) = slot {
                insert_at_path(inner, rest, value);
            }
        }
    }
}

#[derive(Debug, Default)]
struct ClientCounters {
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Point-in-time snapshot of session activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStats {
    /// Values read through the session.
    pub reads: u64,

    /// Write requests submitted through the session.
    pub writes: u64,

    /// Navigation counters.
    pub navigation: NavigatorStats,

    /// Cache counters.
    pub cache: CacheStats,
}
