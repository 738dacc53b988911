//! Template storage and the instantiate/refresh operations.
//!
//! A template is a pristine subtree captured under a stable uuid. Stamping it
//! into a live graph preserves the template-side node uids for every node
//! except the instance root, which gets a fresh uid of its own; that keeps
//! instance/template correlation a plain uid match, and makes the ledger's
//! added set (instance-side uids) naturally disjoint from its removed set
//! (template-side uids).

use calco_ids::{NodeID, Uid};
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::component::Component;
use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::ledger::OverrideLedger;
use crate::path;
use crate::registry;
use crate::structs::Vector3;

/// A named pristine subtree, held in its own private graph so live scenes
/// can never mutate it.
#[derive(Debug)]
pub struct Template {
    pub uuid: String,
    pub name: String,
    graph: SceneGraph,
    root: NodeID,
}

impl Template {
    /// Capture the subtree under `source_root` as a template. Node uids are
    /// preserved so instances stay correlated with the captured structure.
    pub fn from_subtree<S: Into<String>>(
        uuid: S,
        name: S,
        source: &SceneGraph,
        source_root: NodeID,
    ) -> Option<Self> {
        let mut graph = SceneGraph::new();
        let root = graph.copy_subtree_from(source, source_root)?;
        // A captured instance root would drag its old ledger along.
        if let Some(node) = graph.get_mut(root) {
            node.components
                .retain(|c| !matches!(c, Component::Instance(_)));
        }
        Some(Self {
            uuid: uuid.into(),
            name: name.into(),
            graph,
            root,
        })
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }
}

/// Source of templates plus the two operations every consumer needs.
pub trait TemplateProvider {
    fn get_by_uuid(&self, uuid: &str) -> Option<&Template>;

    /// Stamp a fresh instance of `uuid` under no parent, returning its root.
    /// `None` when the template is unknown.
    fn instantiate(
        &self,
        graph: &mut SceneGraph,
        uuid: &str,
        position: Option<Vector3>,
        name: Option<&str>,
    ) -> Option<NodeID>;

    /// Re-derive the instance rooted at `root` from its template: baseline
    /// first, then the ledger's deltas. `false` when `root` is not an
    /// instance or its template is unknown.
    fn apply_to_instance(&self, graph: &mut SceneGraph, root: NodeID) -> bool;
}

/// In-memory template store keyed by uuid.
#[derive(Default)]
pub struct TemplateLibrary {
    templates: FxHashMap<String, Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.uuid.clone(), template);
    }

    /// Capture and store in one step.
    pub fn capture<S: Into<String>>(
        &mut self,
        uuid: S,
        name: S,
        source: &SceneGraph,
        source_root: NodeID,
    ) -> bool {
        match Template::from_subtree(uuid, name, source, source_root) {
            Some(template) => {
                self.insert(template);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, uuid: &str) -> Option<Template> {
        self.templates.remove(uuid)
    }

    /// Lookup that surfaces the miss as an error, for callers that cannot
    /// degrade to a placeholder.
    pub fn require(&self, uuid: &str) -> SceneResult<&Template> {
        self.get_by_uuid(uuid)
            .ok_or_else(|| SceneError::MissingTemplate(uuid.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateProvider for TemplateLibrary {
    fn get_by_uuid(&self, uuid: &str) -> Option<&Template> {
        self.templates.get(uuid)
    }

    fn instantiate(
        &self,
        graph: &mut SceneGraph,
        uuid: &str,
        position: Option<Vector3>,
        name: Option<&str>,
    ) -> Option<NodeID> {
        let template = match self.get_by_uuid(uuid) {
            Some(t) => t,
            None => {
                warn!("instantiate: unknown template '{uuid}'");
                return None;
            }
        };
        let root = graph.copy_subtree_from(&template.graph, template.root)?;

        let mut ledger = OverrideLedger::new(uuid);
        if let Some(node) = graph.get_mut(root) {
            node.uid = Uid::new();
            if let Some(name) = name {
                node.name = name.to_string().into();
                ledger.set_override("name", name.into());
            }
            if let Some(position) = position {
                node.transform.position = position;
                ledger.set_override("transform/position", position.to_value());
            }
        }
        graph.add_component(root, Component::Instance(ledger));
        register_nested_instances(graph, root);
        Some(root)
    }

    fn apply_to_instance(&self, graph: &mut SceneGraph, root: NodeID) -> bool {
        let Some(ledger) = graph.get(root).and_then(|n| n.ledger()).cloned() else {
            warn!("apply_to_instance: node is not an instance root");
            return false;
        };
        let template = match self.require(&ledger.template_id) {
            Ok(template) => template,
            Err(err) => {
                warn!("apply_to_instance: {err}");
                return false;
            }
        };

        // Pristine stamp in a scratch graph, reconciled pairwise by uid.
        let mut scratch = SceneGraph::new();
        let Some(pristine) = scratch.copy_subtree_from(&template.graph, template.root) else {
            return false;
        };
        reconcile(graph, root, &scratch, pristine, &ledger, String::new());

        // Overrides go on strictly after the baseline, whole map at once, so
        // a dotted override is never clobbered by a parent-field copy above.
        for (override_path, value) in ledger.overrides() {
            if !path::set(graph, root, override_path, value) {
                warn!(
                    "apply_to_instance: stale override '{override_path}' on template '{}'",
                    ledger.template_id
                );
            }
        }
        true
    }
}

/// Reset one instance node to its template counterpart, then recurse into
/// uid-matched children. `prefix` is the canonical path of `tpl_id` relative
/// to the instance root, used for the per-path override check.
fn reconcile(
    graph: &mut SceneGraph,
    inst_id: NodeID,
    scratch: &SceneGraph,
    tpl_id: NodeID,
    ledger: &OverrideLedger,
    prefix: String,
) {
    for (local, value) in path::local_pairs(scratch, tpl_id) {
        let full = format!("{prefix}{local}");
        if !ledger.is_overridden(&full) {
            path::set_local(graph, inst_id, &local, &value);
        }
    }

    let template_children: Vec<NodeID> = scratch.children(tpl_id).to_vec();
    let mut matched_uids: Vec<Uid> = Vec::new();

    for tpl_child in template_children {
        let Some(child_uid) = scratch.get(tpl_child).map(|n| n.uid) else {
            continue;
        };
        if ledger.is_child_removed(child_uid) {
            if let Some(inst_child) = graph.child_by_uid(inst_id, child_uid) {
                graph.remove_subtree(inst_child);
            }
            matched_uids.push(child_uid);
            continue;
        }
        let segment = path::child_segment(scratch, tpl_id, tpl_child);
        let child_prefix = format!("{prefix}children/{segment}/");
        match graph.child_by_uid(inst_id, child_uid) {
            Some(inst_child) => {
                reconcile(graph, inst_child, scratch, tpl_child, ledger, child_prefix);
            }
            None => {
                // Deleted locally without a removed-mark; the template wins.
                if let Some(recreated) = graph.copy_subtree_from(scratch, tpl_child) {
                    graph.add_child(inst_id, recreated);
                    register_nested_instances(graph, recreated);
                }
            }
        }
        matched_uids.push(child_uid);
    }

    // Instance-side children neither matched nor marked as added do not
    // belong to this instance anymore.
    let instance_children: Vec<NodeID> = graph.children(inst_id).to_vec();
    for inst_child in instance_children {
        let Some(child_uid) = graph.get(inst_child).map(|n| n.uid) else {
            continue;
        };
        if matched_uids.contains(&child_uid) || ledger.is_child_added(child_uid) {
            continue;
        }
        debug!("apply_to_instance: dropping unmatched child {child_uid}");
        graph.remove_subtree(inst_child);
    }
}

/// Register every ledger-bearing node in the subtree with the global
/// registry. Copies skip registration, so spawn paths call this afterwards.
fn register_nested_instances(graph: &SceneGraph, root: NodeID) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = graph.get(id) else { continue };
        if let Some(ledger) = node.ledger() {
            registry::register(&ledger.template_id, graph.graph_id(), id);
        }
        stack.extend(node.children.iter().copied());
    }
}

/// Re-derive one instance from its template through `provider`.
pub fn refresh_from_template(
    graph: &mut SceneGraph,
    root: NodeID,
    provider: &dyn TemplateProvider,
) -> bool {
    provider.apply_to_instance(graph, root)
}

/// Fan a template edit out to every live instance of it in `graph`.
/// Returns the number of instances refreshed.
pub fn notify_template_changed(
    graph: &mut SceneGraph,
    provider: &dyn TemplateProvider,
    template_id: &str,
) -> usize {
    let instances = registry::get_instances(graph, template_id);
    let mut refreshed = 0;
    for id in instances {
        if provider.apply_to_instance(graph, id) {
            refreshed += 1;
        }
    }
    refreshed
}
