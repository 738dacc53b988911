//! Process-wide index from template identifier to the live instances of that
//! template.
//!
//! The registry stores `(graph id, NodeID)` pairs, never owning references.
//! The graph id disambiguates handles that alias across arenas, and liveness
//! is decided by the arena's generation check at lookup time, so a destroyed
//! instance is simply absent from the next `get_instances` call without the
//! registry being told about the destruction.

use calco_ids::NodeID;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::RwLock;

use crate::graph::SceneGraph;

#[derive(Default)]
pub struct InstanceRegistry {
    buckets: FxHashMap<String, IndexSet<(u64, NodeID)>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op if the pair is already present (redundant calls are safe).
    pub fn register(&mut self, template_id: &str, graph_id: u64, node: NodeID) {
        if node.is_nil() {
            return;
        }
        self.buckets
            .entry(template_id.to_string())
            .or_default()
            .insert((graph_id, node));
    }

    /// No-op if the pair is absent (redundant calls are safe).
    pub fn unregister(&mut self, template_id: &str, graph_id: u64, node: NodeID) {
        if let Some(bucket) = self.buckets.get_mut(template_id) {
            bucket.shift_remove(&(graph_id, node));
            if bucket.is_empty() {
                self.buckets.remove(template_id);
            }
        }
    }

    /// Live instances of `template_id` in `graph`, in registration order.
    /// Entries registered under a different graph id are skipped, and
    /// liveness is the arena's generation check, so a handle whose node is
    /// gone does not show up. Stale entries are left in place (the removal
    /// paths unregister).
    pub fn get_instances(&self, graph: &SceneGraph, template_id: &str) -> Vec<NodeID> {
        self.buckets
            .get(template_id)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|&&(g, id)| g == graph.graph_id() && graph.contains(id))
                    .map(|&(_, id)| id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn instance_count(&self, graph: &SceneGraph, template_id: &str) -> usize {
        self.get_instances(graph, template_id).len()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn clear_template(&mut self, template_id: &str) {
        self.buckets.remove(template_id);
    }

    /// Raw entry count including possibly-stale handles (diagnostics only).
    pub fn raw_len(&self, template_id: &str) -> usize {
        self.buckets.get(template_id).map_or(0, IndexSet::len)
    }
}

static GLOBAL: Lazy<RwLock<InstanceRegistry>> =
    Lazy::new(|| RwLock::new(InstanceRegistry::new()));

pub fn global() -> &'static RwLock<InstanceRegistry> {
    &GLOBAL
}

// Free-function surface over the process-wide registry. The scene graph's
// attach/detach hooks and the fan-out path go through these.

pub fn register(template_id: &str, graph_id: u64, node: NodeID) {
    GLOBAL.write().unwrap().register(template_id, graph_id, node);
}

pub fn unregister(template_id: &str, graph_id: u64, node: NodeID) {
    GLOBAL.write().unwrap().unregister(template_id, graph_id, node);
}

pub fn get_instances(graph: &SceneGraph, template_id: &str) -> Vec<NodeID> {
    GLOBAL.read().unwrap().get_instances(graph, template_id)
}

pub fn instance_count(graph: &SceneGraph, template_id: &str) -> usize {
    GLOBAL.read().unwrap().instance_count(graph, template_id)
}

pub fn clear() {
    GLOBAL.write().unwrap().clear();
}

pub fn clear_template(template_id: &str) {
    GLOBAL.write().unwrap().clear_template(template_id);
}
