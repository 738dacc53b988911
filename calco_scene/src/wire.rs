//! Serialized node records.
//!
//! Two shapes share one untagged enum: an instance root saves compactly as a
//! template reference plus its ledger deltas, anything else saves fully.
//! Deserialization tries the compact shape first; only it carries a
//! `template_id`, so the two never collide.

use calco_ids::{NodeID, Uid};
use calco_variant::Value;
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::node::SceneNode;
use crate::path;
use crate::structs::{Quaternion, Transform3D, Vector3};
use crate::template::TemplateProvider;

/// Position and rotation bundled; the pair changes together often enough
/// that storing them as one block keeps the common record small.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub position: Vector3,
    #[serde(default)]
    pub rotation: Quaternion,
}

/// Compact record for an instantiated template root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub template_id: String,
    pub instance_id: Uid,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "default_scale")]
    pub scale: Vector3,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_children: Vec<NodeRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_children: Vec<Uid>,
}

/// Full record for a plain node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullRecord {
    pub uid: Uid,
    pub name: String,

    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub pickable: bool,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub flags: u64,
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub transform: Transform3D,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

fn default_true() -> bool {
    true
}

fn default_scale() -> Vector3 {
    Vector3::ONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRecord {
    Instance(InstanceRecord),
    Full(FullRecord),
}

// ---------------- save ----------------

/// Serialize the subtree under `id` into a record tree. Instance roots take
/// the compact branch; their template-derived children are not stored, only
/// the ledger deltas and any added subtrees.
pub fn save_node(graph: &SceneGraph, id: NodeID) -> SceneResult<NodeRecord> {
    let node = graph
        .get(id)
        .ok_or_else(|| SceneError::InvalidRecord("stale node handle".to_string()))?;

    if let Some(ledger) = node.ledger() {
        let mut added_children = Vec::new();
        for &child in &node.children {
            let Some(child_node) = graph.get(child) else {
                continue;
            };
            if ledger.is_child_added(child_node.uid) {
                added_children.push(save_node(graph, child)?);
            }
        }
        return Ok(NodeRecord::Instance(InstanceRecord {
            template_id: ledger.template_id.clone(),
            instance_id: node.uid,
            name: node.name.to_string(),
            pose: Pose {
                position: node.transform.position,
                rotation: node.transform.rotation,
            },
            scale: node.transform.scale,
            overrides: ledger.overrides().clone(),
            added_children,
            removed_children: ledger.removed_children().iter().copied().collect(),
        }));
    }

    let mut children = Vec::new();
    for &child in &node.children {
        children.push(save_node(graph, child)?);
    }
    Ok(NodeRecord::Full(FullRecord {
        uid: node.uid,
        name: node.name.to_string(),
        visible: node.visible,
        active: node.active,
        pickable: node.pickable,
        selectable: node.selectable,
        layer: node.layer,
        flags: node.flags,
        priority: node.priority,
        transform: node.transform,
        components: node.components.clone(),
        children,
    }))
}

pub fn save_node_to_string(graph: &SceneGraph, id: NodeID) -> SceneResult<String> {
    let record = save_node(graph, id)?;
    Ok(serde_json::to_string_pretty(&record)?)
}

// ---------------- load ----------------

/// Rebuild a subtree from a record tree. The returned root is not yet
/// parented; the caller attaches it where it belongs.
pub fn load_node(
    graph: &mut SceneGraph,
    record: &NodeRecord,
    provider: &dyn TemplateProvider,
) -> SceneResult<NodeID> {
    match record {
        NodeRecord::Full(full) => load_full(graph, full, provider),
        NodeRecord::Instance(instance) => load_instance(graph, instance, provider),
    }
}

/// Parse and rebuild in one step. A record that is not valid JSON, or not
/// either record shape, is a hard error; everything past parsing degrades
/// per-path instead.
pub fn load_node_from_str(
    graph: &mut SceneGraph,
    json: &str,
    provider: &dyn TemplateProvider,
) -> SceneResult<NodeID> {
    let record: NodeRecord = serde_json::from_str(json)?;
    load_node(graph, &record, provider)
}

fn load_full(
    graph: &mut SceneGraph,
    record: &FullRecord,
    provider: &dyn TemplateProvider,
) -> SceneResult<NodeID> {
    let mut node = SceneNode::new(record.name.clone());
    node.uid = record.uid;
    node.visible = record.visible;
    node.active = record.active;
    node.pickable = record.pickable;
    node.selectable = record.selectable;
    node.layer = record.layer;
    node.flags = record.flags;
    node.priority = record.priority;
    node.transform = record.transform;
    node.components = record.components.clone();
    let id = graph.insert(node);

    for child_record in &record.children {
        let child = load_node(graph, child_record, provider)?;
        graph.add_child(id, child);
    }
    Ok(id)
}

fn load_instance(
    graph: &mut SceneGraph,
    record: &InstanceRecord,
    provider: &dyn TemplateProvider,
) -> SceneResult<NodeID> {
    let graph_id = graph.graph_id();
    let root = match provider.instantiate(graph, &record.template_id, None, None) {
        Some(root) => root,
        None => {
            // Unknown template: spawn a visible placeholder that keeps the
            // full ledger state so a later save loses nothing.
            warn!(
                "load: template '{}' missing, spawning placeholder for instance {}",
                record.template_id, record.instance_id
            );
            graph.insert(SceneNode::new(record.name.clone()))
        }
    };

    {
        let node = graph
            .get_mut(root)
            .ok_or_else(|| SceneError::InvalidRecord("instantiate produced no node".to_string()))?;
        node.uid = record.instance_id;
        node.name = record.name.clone().into();
        node.transform.position = record.pose.position;
        node.transform.rotation = record.pose.rotation;
        node.transform.scale = record.scale;
    }

    // Ledger state is restored verbatim; overrides that no longer resolve
    // stay recorded so they round-trip through the next save.
    {
        let node = graph.get_mut(root).ok_or_else(|| {
            SceneError::InvalidRecord("instantiate produced no node".to_string())
        })?;
        if node.ledger().is_none() {
            node.components.push(Component::Instance(
                crate::ledger::OverrideLedger::new(record.template_id.clone()),
            ));
            crate::registry::register(&record.template_id, graph_id, root);
        }
        let ledger = node.ledger_mut().ok_or_else(|| {
            SceneError::InvalidRecord("instance root lost its ledger".to_string())
        })?;
        ledger.restore_overrides(record.overrides.clone());
        ledger.restore_removed_children(record.removed_children.iter().copied());
    }

    for &removed in &record.removed_children {
        if let Some(child) = graph.child_by_uid(root, removed) {
            graph.remove_subtree(child);
        }
    }

    for (override_path, value) in &record.overrides {
        if !path::set(graph, root, override_path, value) {
            warn!(
                "load: stale override '{override_path}' on template '{}'",
                record.template_id
            );
        }
    }

    for child_record in &record.added_children {
        let child = load_node(graph, child_record, provider)?;
        graph.add_child(root, child);
        let child_uid = graph
            .get(child)
            .map(|n| n.uid)
            .unwrap_or_else(Uid::nil);
        if let Some(ledger) = graph.get_mut(root).and_then(|n| n.ledger_mut()) {
            ledger.mark_child_added(child_uid);
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentType, Light};
    use crate::template::TemplateLibrary;
    use calco_variant::Value;

    fn unique(tag: &str) -> String {
        format!("{tag}-{}", Uid::new())
    }

    fn lamp_library(uuid: &str) -> TemplateLibrary {
        let mut source = SceneGraph::new();
        let root = source.insert(SceneNode::new("Lamp"));
        let bulb = source.insert(SceneNode::new("Bulb"));
        source.add_child(root, bulb);
        source.add_component(bulb, Component::Light(Light::default()));
        let mut library = TemplateLibrary::new();
        library.capture(uuid, "Lamp", &source, root);
        library
    }

    #[test]
    fn full_record_roundtrip() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(SceneNode::new("World"));
        let prop = graph.insert(SceneNode::new("Crate"));
        graph.add_child(root, prop);
        graph.get_mut(prop).unwrap().layer = 3;
        graph.add_component(prop, Component::Light(Light::default()));

        let library = TemplateLibrary::new();
        let json = save_node_to_string(&graph, root).unwrap();

        let mut restored = SceneGraph::new();
        let new_root = load_node_from_str(&mut restored, &json, &library).unwrap();

        assert!(path::diff(&graph, root, &restored, new_root).is_empty());
        assert_eq!(
            restored.get(new_root).unwrap().uid,
            graph.get(root).unwrap().uid
        );
    }

    #[test]
    fn instance_record_is_compact_and_roundtrips() {
        let uuid = unique("wire-compact");
        let library = lamp_library(&uuid);

        let mut graph = SceneGraph::new();
        let root = library
            .instantiate(&mut graph, &uuid, None, Some("Desk Lamp"))
            .unwrap();
        let intensity_path = "children/Bulb/components/Light/intensity";
        path::set(&mut graph, root, intensity_path, &Value::from(6.0));
        graph
            .get_mut(root)
            .unwrap()
            .ledger_mut()
            .unwrap()
            .set_override(intensity_path, Value::from(6.0));

        let json = save_node_to_string(&graph, root).unwrap();
        // Template-derived structure stays out of the record.
        match serde_json::from_str::<NodeRecord>(&json).unwrap() {
            NodeRecord::Instance(rec) => {
                assert!(rec.added_children.is_empty());
                assert!(rec.removed_children.is_empty());
                assert_eq!(rec.overrides.len(), 2); // name + intensity
            }
            NodeRecord::Full(_) => panic!("instance saved as full record"),
        }

        let mut restored = SceneGraph::new();
        let new_root = load_node_from_str(&mut restored, &json, &library).unwrap();
        assert_eq!(restored.get(new_root).unwrap().name, "Desk Lamp");
        assert_eq!(
            path::get(&restored, new_root, intensity_path).unwrap(),
            Value::from(6.0)
        );
        assert!(path::diff(&graph, root, &restored, new_root).is_empty());
    }

    #[test]
    fn structural_deltas_roundtrip() {
        let uuid = unique("wire-struct");
        let library = lamp_library(&uuid);

        let mut graph = SceneGraph::new();
        let root = library.instantiate(&mut graph, &uuid, None, None).unwrap();

        let shade = graph.insert(SceneNode::new("Shade"));
        let shade_uid = graph.get(shade).unwrap().uid;
        graph.add_child(root, shade);
        let bulb = graph.child_by_name(root, "Bulb").unwrap();
        let bulb_uid = graph.get(bulb).unwrap().uid;
        graph.remove_subtree(bulb);
        {
            let ledger = graph.get_mut(root).unwrap().ledger_mut().unwrap();
            ledger.mark_child_added(shade_uid);
            ledger.mark_child_removed(bulb_uid);
        }

        let json = save_node_to_string(&graph, root).unwrap();
        let mut restored = SceneGraph::new();
        let new_root = load_node_from_str(&mut restored, &json, &library).unwrap();

        assert!(restored.child_by_name(new_root, "Shade").is_some());
        assert!(restored.child_by_name(new_root, "Bulb").is_none());
        let ledger = restored.get(new_root).unwrap().ledger().unwrap();
        assert!(ledger.is_child_added(shade_uid));
        assert!(ledger.is_child_removed(bulb_uid));
    }

    #[test]
    fn missing_template_spawns_placeholder_and_keeps_state() {
        let uuid = unique("wire-missing");
        let library = lamp_library(&uuid);

        let mut graph = SceneGraph::new();
        let root = library.instantiate(&mut graph, &uuid, None, None).unwrap();
        graph
            .get_mut(root)
            .unwrap()
            .ledger_mut()
            .unwrap()
            .set_override("visible", Value::from(false));
        let json = save_node_to_string(&graph, root).unwrap();

        // Load against an empty library.
        let empty = TemplateLibrary::new();
        let mut restored = SceneGraph::new();
        let new_root = load_node_from_str(&mut restored, &json, &empty).unwrap();

        let node = restored.get(new_root).unwrap();
        assert_eq!(node.name, "Lamp");
        assert!(node.children.is_empty());
        let ledger = node.ledger().unwrap();
        assert_eq!(ledger.template_id, uuid);
        assert!(ledger.is_overridden("visible"));

        // Re-saving the placeholder loses nothing.
        let rejson = save_node_to_string(&restored, new_root).unwrap();
        let reparsed: NodeRecord = serde_json::from_str(&rejson).unwrap();
        match reparsed {
            NodeRecord::Instance(rec) => {
                assert_eq!(rec.template_id, uuid);
                assert!(rec.overrides.contains_key("visible"));
            }
            NodeRecord::Full(_) => panic!("placeholder saved as full record"),
        }
    }

    #[test]
    fn malformed_json_is_a_hard_error() {
        let mut graph = SceneGraph::new();
        let library = TemplateLibrary::new();
        let err = load_node_from_str(&mut graph, "{ not json", &library).unwrap_err();
        assert!(matches!(err, SceneError::MalformedRecord(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn full_record_defaults_fill_in() {
        let mut graph = SceneGraph::new();
        let library = TemplateLibrary::new();
        let id = load_node_from_str(
            &mut graph,
            r#"{ "uid": "0000002a", "name": "Bare" }"#,
            &library,
        )
        .unwrap();

        let node = graph.get(id).unwrap();
        assert!(node.visible && node.active);
        assert_eq!(node.layer, 0);
        assert_eq!(node.transform, Transform3D::IDENTITY);
        assert!(!node.has_component(ComponentType::Instance));
    }
}
