// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space navigation.
//!
//! The [`Navigator`] resolves symbolic names to node ids by browsing the
//! server's object tree. The root object is located with a level-order
//! search so that a shallow match always wins over a deeper one; symbolic
//! paths then resolve as successive child lookups under that root. All
//! fan-out is bounded by one semaphore shared across the session.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::error::{ClientError, ConnectionError, Result};
use crate::transport::{BrowseEntry, Transport};
use crate::types::{NodeId, PathSpec};

// =============================================================================
// Navigator
// =============================================================================

/// Resolves symbolic names against the server's object tree.
pub struct Navigator<T: Transport + 'static> {
    transport: Arc<T>,
    semaphore: Arc<Semaphore>,
    stats: Arc<NavigatorCounters>,
}

impl<T: Transport + 'static> Clone for Navigator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            semaphore: Arc::clone(&self.semaphore),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: Transport + 'static> Navigator<T> {
    /// Creates a navigator over `transport` with the given concurrency bound.
    pub fn new(transport: Arc<T>, max_concurrency: usize) -> Self {
        Self {
            transport,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            stats: Arc::new(NavigatorCounters::default()),
        }
    }

    /// Locates the named root object with a level-order search from the
    /// objects root, descending at most `max_depth` levels.
    ///
    /// Each level is browsed in full before any match is taken, so a match at
    /// depth 1 always wins over one at depth 3. Within a level, a technical
    /// (browse) name match takes precedence over a display-name match. Only
    /// object nodes are candidates; a variable sharing the name is skipped
    /// rather than anchoring the session on a leaf. A visited set keeps the
    /// search terminating on address spaces with cyclic references.
    pub async fn find_root(&self, name: &str, max_depth: usize) -> Result<NodeId> {
        let root = self.transport.objects_root();
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(root.clone());
        let mut frontier = vec![root];

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            trace!(depth, frontier = frontier.len(), "searching level");

            let level = self.browse_level(&frontier).await;

            let mut display_match: Option<NodeId> = None;
            let mut next = Vec::new();
            for entries in &level {
                for entry in entries {
                    if !entry.kind.is_browsable() {
                        continue;
                    }
                    if entry.browse_name == name {
                        debug!(node = %entry.node, depth, "root object found by browse name");
                        return Ok(entry.node.clone());
                    }
                    if display_match.is_none() && entry.display_name == name {
                        display_match = Some(entry.node.clone());
                    }
                    if visited.insert(entry.node.clone()) {
                        next.push(entry.node.clone());
                    }
                }
            }
            if let Some(node) = display_match {
                debug!(node = %node, depth, "root object found by display name");
                return Ok(node);
            }

            frontier = next;
        }

        Err(ClientError::connection(ConnectionError::root_not_found(
            name,
        )))
    }

    /// Resolves a symbolic path as successive child lookups under `base`.
    ///
    /// Returns `None` when any segment fails to match; browse failures along
    /// the way are treated the same as missing children.
    pub async fn resolve_path(&self, base: &NodeId, path: &PathSpec) -> Option<NodeId> {
        let mut current = base.clone();

        for segment in path.segments() {
            match self.find_child(&current, segment).await {
                Some(entry) => current = entry.node,
                None => {
                    debug!(path = %path, segment = segment.as_str(), "path segment not found");
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        self.stats.resolved.fetch_add(1, Ordering::Relaxed);
        Some(current)
    }

    /// Single-level child lookup under `parent`, technical name first, then
    /// display name.
    pub async fn find_child(&self, parent: &NodeId, name: &str) -> Option<BrowseEntry> {
        let entries = self.children(parent).await;
        entries
            .iter()
            .find(|e| e.browse_name == name)
            .or_else(|| entries.iter().find(|e| e.display_name == name))
            .cloned()
    }

    /// Resolves many paths concurrently, bounded by the shared semaphore.
    ///
    /// The result vector is index-aligned with `paths`.
    pub async fn resolve_many(
        &self,
        base: &NodeId,
        paths: &[PathSpec],
    ) -> Vec<Option<NodeId>> {
        let mut set = JoinSet::new();
        for (idx, path) in paths.iter().cloned().enumerate() {
            let navigator = self.clone();
            let base = base.clone();
            set.spawn(async move {
                // Permit is None only when the semaphore is closed, which
                // this crate never does.
                let _permit = navigator.semaphore.clone().acquire_owned().await.ok();
                let resolved = navigator.resolve_path(&base, &path).await;
                (idx, resolved)
            });
        }

        let mut results = vec![None; paths.len()];
        while let Some(joined) = set.join_next().await {
            if let Ok((idx, resolved)) = joined {
                results[idx] = resolved;
            }
        }
        results
    }

    /// Collects descendants of `node` level by level, down to `max_depth`.
    ///
    /// Each entry is returned with its name path relative to `node`. Depth
    /// truncation is silent; the caller gets whatever was discovered. An
    /// explicit worklist keeps task creation bounded on wide or deep trees,
    /// and a visited set keeps cyclic references from re-entering the
    /// frontier or duplicating entries.
    pub async fn enumerate_children(
        &self,
        node: &NodeId,
        max_depth: usize,
    ) -> Vec<(Vec<String>, BrowseEntry)> {
        let mut collected = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(node.clone());
        let mut frontier: Vec<(Vec<String>, NodeId)> = vec![(Vec::new(), node.clone())];

        for _ in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            let nodes: Vec<NodeId> = frontier.iter().map(|(_, n)| n.clone()).collect();
            let level = self.browse_level(&nodes).await;

            let mut next = Vec::new();
            for ((prefix, _), entries) in frontier.iter().zip(level) {
                for entry in entries {
                    let name = if entry.display_name.is_empty() {
                        entry.browse_name.clone()
                    } else {
                        entry.display_name.clone()
                    };
                    let mut path = prefix.clone();
                    path.push(name);
                    if entry.kind.is_browsable() {
                        if !visited.insert(entry.node.clone()) {
                            continue;
                        }
                        next.push((path.clone(), entry.node.clone()));
                    }
                    collected.push((path, entry));
                }
            }
            frontier = next;
        }
        collected
    }

    /// Browses `node`, swallowing transport failures.
    pub(crate) async fn children(&self, node: &NodeId) -> Vec<BrowseEntry> {
        self.stats.browses.fetch_add(1, Ordering::Relaxed);
        match self.transport.browse_children(node).await {
            Ok(entries) => entries,
            Err(error) => {
                debug!(node = %node, %error, "browse failed, skipping subtree");
                Vec::new()
            }
        }
    }

    /// Browses a whole frontier concurrently, preserving parent order.
    async fn browse_level(&self, parents: &[NodeId]) -> Vec<Vec<BrowseEntry>> {
        let mut set = JoinSet::new();
        for (idx, node) in parents.iter().cloned().enumerate() {
            let navigator = self.clone();
            set.spawn(async move {
                let _permit = navigator.semaphore.clone().acquire_owned().await.ok();
                let entries = navigator.children(&node).await;
                (idx, entries)
            });
        }

        let mut results = vec![Vec::new(); parents.len()];
        while let Some(joined) = set.join_next().await {
            if let Ok((idx, entries)) = joined {
                results[idx] = entries;
            }
        }
        results
    }

    /// Returns navigation counters accumulated since the session started.
    pub fn stats(&self) -> NavigatorStats {
        NavigatorStats {
            browses: self.stats.browses.load(Ordering::Relaxed),
            paths_resolved: self.stats.resolved.load(Ordering::Relaxed),
            paths_failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct NavigatorCounters {
    browses: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of navigation activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorStats {
    /// Browse calls issued against the transport.
    pub browses: u64,

    /// Paths resolved to a node id.
    pub paths_resolved: u64,

    /// Paths that failed to resolve.
    pub paths_failed: u64,
}
