//! Scene graph over the node arena: tree links, child lookup, component
//! management, and the attach/detach hooks that keep the global instance
//! registry in sync.

use std::sync::atomic::{AtomicU64, Ordering};

use calco_ids::{NodeID, Uid};

use crate::arena::NodeArena;
use crate::component::{Component, ComponentType};
use crate::node::SceneNode;
use crate::registry;
use crate::structs::Transform3D;

// Runtime handles are per-arena, so every graph gets a process-unique id at
// construction. Registry entries pair that id with the handle; without it,
// `NodeID(1:0)` in one graph would alias `NodeID(1:0)` in another.
static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct SceneGraph {
    nodes: NodeArena,
    graph_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: NodeArena::with_capacity(capacity),
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Process-unique identity of this graph, stamped at construction.
    pub fn graph_id(&self) -> u64 {
        self.graph_id
    }

    // ---------------- node lifecycle ----------------

    /// Insert a node, stamping its runtime handle. If the node carries an
    /// instance ledger it is registered with the global registry.
    pub fn insert(&mut self, node: SceneNode) -> NodeID {
        let template_id = node.ledger().map(|l| l.template_id.clone());
        let id = self.insert_raw(node);
        if let Some(template_id) = template_id {
            registry::register(&template_id, self.graph_id, id);
        }
        id
    }

    /// Insert without touching the registry. Used for scratch copies; live
    /// spawn paths register explicitly.
    fn insert_raw(&mut self, node: SceneNode) -> NodeID {
        let id = self.nodes.insert(node);
        if let Some(node) = self.nodes.get_mut(id) {
            node.id = id;
        }
        id
    }

    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeID) -> bool {
        self.nodes.contains(id)
    }

    /// Remove `root` and every descendant. Ledger-carrying nodes are
    /// unregistered from the global registry as they go.
    pub fn remove_subtree(&mut self, root: NodeID) {
        // Detach from the parent first so the tree stays consistent even if
        // the caller holds other handles into it.
        if let Some(parent) = self.nodes.get(root).map(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.remove_child(root);
            }
        }

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.remove(id) else {
                continue;
            };
            if let Some(ledger) = node.ledger() {
                registry::unregister(&ledger.template_id, self.graph_id, id);
            }
            stack.extend(node.children.iter().copied());
        }
    }

    /// Drop every node. Ledgers are unregistered before the arena resets.
    pub fn clear(&mut self) {
        let instances: Vec<(String, NodeID)> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| node.ledger().map(|l| (l.template_id.clone(), id)))
            .collect();
        for (template_id, id) in instances {
            registry::unregister(&template_id, self.graph_id, id);
        }
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeID, &SceneNode)> {
        self.nodes.iter()
    }

    // ---------------- tree links ----------------

    /// Link `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: NodeID, child: NodeID) -> bool {
        if parent == child || !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return false;
        }
        self.detach(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.add_child(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = parent;
        }
        true
    }

    /// Unlink `child` from its parent without destroying it.
    pub fn detach(&mut self, child: NodeID) {
        let Some(parent) = self.nodes.get(child).map(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.remove_child(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = NodeID::nil();
        }
    }

    pub fn children(&self, id: NodeID) -> &[NodeID] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// First child whose name matches, in child order.
    pub fn child_by_name(&self, parent: NodeID, name: &str) -> Option<NodeID> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    pub fn child_by_index(&self, parent: NodeID, index: usize) -> Option<NodeID> {
        self.children(parent).get(index).copied()
    }

    /// Child addressed by a path segment: an all-digit segment is tried as a
    /// positional index first, then as a name. Everything else is a name.
    pub fn child_by_segment(&self, parent: NodeID, segment: &str) -> Option<NodeID> {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(child) = self.child_by_index(parent, index) {
                    return Some(child);
                }
            }
        }
        self.child_by_name(parent, segment)
    }

    /// Search the subtree under `root` (root included) for a node by its
    /// stable uid.
    pub fn find_by_uid(&self, root: NodeID, uid: Uid) -> Option<NodeID> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(id)?;
            if node.uid == uid {
                return Some(id);
            }
            stack.extend(node.children.iter().copied());
        }
        None
    }

    /// Direct child of `parent` with the given uid.
    pub fn child_by_uid(&self, parent: NodeID, uid: Uid) -> Option<NodeID> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.uid == uid))
    }

    /// True when `node` sits somewhere under `root` (or is `root` itself).
    pub fn is_in_subtree(&self, root: NodeID, node: NodeID) -> bool {
        let mut current = node;
        while !current.is_nil() {
            if current == root {
                return true;
            }
            current = match self.nodes.get(current) {
                Some(n) => n.parent,
                None => return false,
            };
        }
        false
    }

    // ---------------- components ----------------

    /// Attach a component, replacing any existing one of the same type. An
    /// instance ledger registers the node with the global registry.
    pub fn add_component(&mut self, id: NodeID, component: Component) -> bool {
        let ty = component.ty();
        let template_id = match &component {
            Component::Instance(ledger) => Some(ledger.template_id.clone()),
            _ => None,
        };
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.components.retain(|c| c.ty() != ty);
        node.components.push(component);
        if let Some(template_id) = template_id {
            registry::register(&template_id, self.graph_id, id);
        }
        true
    }

    pub fn remove_component(&mut self, id: NodeID, ty: ComponentType) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let before = node.components.len();
        let template_id = match node.component(ty) {
            Some(Component::Instance(ledger)) => Some(ledger.template_id.clone()),
            _ => None,
        };
        node.components.retain(|c| c.ty() != ty);
        let removed = node.components.len() != before;
        if removed {
            if let Some(template_id) = template_id {
                registry::unregister(&template_id, self.graph_id, id);
            }
        }
        removed
    }

    pub fn component(&self, id: NodeID, ty: ComponentType) -> Option<&Component> {
        self.nodes.get(id)?.component(ty)
    }

    pub fn component_mut(&mut self, id: NodeID, ty: ComponentType) -> Option<&mut Component> {
        self.nodes.get_mut(id)?.component_mut(ty)
    }

    // ---------------- transform helpers ----------------

    pub fn transform(&self, id: NodeID) -> Option<&Transform3D> {
        self.nodes.get(id).map(|n| &n.transform)
    }

    pub fn transform_mut(&mut self, id: NodeID) -> Option<&mut Transform3D> {
        self.nodes.get_mut(id).map(|n| &mut n.transform)
    }

    // ---------------- cross-graph copy ----------------

    /// Deep-copy the subtree rooted at `src_root` in `source` into this
    /// graph, preserving node uids. Returns the new local root handle, or
    /// `None` when `src_root` is stale.
    ///
    /// The copy does not register ledgers with the instance registry; scratch
    /// and template-internal graphs must stay invisible to it. Spawn paths
    /// that want registration call [`registry::register`] afterwards.
    pub fn copy_subtree_from(&mut self, source: &SceneGraph, src_root: NodeID) -> Option<NodeID> {
        let src_node = source.get(src_root)?;
        let mut copy = src_node.clone();
        copy.id = NodeID::nil();
        copy.parent = NodeID::nil();
        copy.children = Vec::new();
        let dst_root = self.insert_raw(copy);

        for &src_child in &src_node.children {
            if let Some(dst_child) = self.copy_subtree_from(source, src_child) {
                self.add_child(dst_root, dst_child);
            }
        }
        Some(dst_root)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
