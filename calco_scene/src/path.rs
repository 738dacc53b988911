//! Property-path addressing over the scene graph.
//!
//! Paths are `/`-separated, rooted at a caller-supplied node:
//!
//! ```text
//! visible
//! transform/position
//! components/Light/intensity
//! components/Sprite/modulate.r
//! children/Arm/components/Light/intensity
//! children/0/visible
//! ```
//!
//! Child segments accept either a name or a positional index; all-digit
//! segments are tried as an index first. Component segments accept either a
//! type tag or an index into the node's component list. The final component
//! field segment may be dotted to descend into a map-shaped field.

use std::collections::VecDeque;

use calco_ids::NodeID;
use calco_variant::{Value, NUMERIC_TOLERANCE};
use indexmap::IndexMap;
use log::warn;

use crate::component::{field_table, Component};
use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::node::NodeField;
use crate::structs::{Quaternion, Vector3};

/// Read the value at `path`, relative to `root`.
pub fn get(graph: &SceneGraph, root: NodeID, path: &str) -> SceneResult<Value> {
    let (node, local) = resolve(graph, root, path)?;
    local_get(graph, node, &local, path)
}

/// Write `value` at `path`. Best-effort: a path that does not resolve or a
/// value of the wrong shape leaves the graph untouched, logs, and returns
/// `false`.
pub fn set(graph: &mut SceneGraph, root: NodeID, path: &str, value: &Value) -> bool {
    let (node, local) = match resolve(graph, root, path) {
        Ok(pair) => pair,
        Err(err) => {
            warn!("set '{path}' skipped: {err}");
            return false;
        }
    };
    let ok = local_set(graph, node, &local, value);
    if !ok {
        warn!(
            "set '{path}' rejected: value shape '{}' does not fit",
            value.shape_name()
        );
    }
    ok
}

/// True when `path` resolves to a readable value.
pub fn exists(graph: &SceneGraph, root: NodeID, path: &str) -> bool {
    get(graph, root, path).is_ok()
}

/// Walk `children/...` prefixes down to the owning node, returning its
/// handle plus the node-local remainder segments.
fn resolve(graph: &SceneGraph, root: NodeID, path: &str) -> SceneResult<(NodeID, Vec<String>)> {
    if !graph.contains(root) {
        return Err(SceneError::PathNotFound(path.to_string()));
    }
    let mut node = root;
    let mut segments: VecDeque<&str> = path.split('/').collect();

    while segments.front() == Some(&"children") {
        segments.pop_front();
        let Some(segment) = segments.pop_front() else {
            return Err(SceneError::PathNotFound(path.to_string()));
        };
        node = graph
            .child_by_segment(node, segment)
            .ok_or_else(|| SceneError::PathNotFound(path.to_string()))?;
    }

    if segments.is_empty() {
        return Err(SceneError::PathNotFound(path.to_string()));
    }
    Ok((node, segments.into_iter().map(str::to_string).collect()))
}

fn local_get(graph: &SceneGraph, id: NodeID, segs: &[String], full: &str) -> SceneResult<Value> {
    let not_found = || SceneError::PathNotFound(full.to_string());
    let node = graph.get(id).ok_or_else(not_found)?;

    match segs[0].as_str() {
        "transform" if segs.len() == 2 => match segs[1].as_str() {
            "position" => Ok(node.transform.position.to_value()),
            "rotation" => Ok(node.transform.rotation.to_value()),
            "scale" => Ok(node.transform.scale.to_value()),
            _ => Err(not_found()),
        },
        "components" if segs.len() == 3 => {
            let component = select_component(node.components.as_slice(), &segs[1])
                .ok_or_else(not_found)?;
            let (head, dotted) = split_dotted(&segs[2]);
            let value = component.get_field(head).ok_or_else(not_found)?;
            descend_dotted(value, dotted, full)
        }
        field if segs.len() == 1 => NodeField::from_str(field)
            .map(|f| f.get(node))
            .ok_or_else(not_found),
        _ => Err(not_found()),
    }
}

fn local_set(graph: &mut SceneGraph, id: NodeID, segs: &[String], value: &Value) -> bool {
    let Some(node) = graph.get_mut(id) else {
        return false;
    };

    match segs[0].as_str() {
        "transform" if segs.len() == 2 => match segs[1].as_str() {
            "position" => match Vector3::from_value(value) {
                Some(v) => {
                    node.transform.position = v;
                    true
                }
                None => false,
            },
            "rotation" => match Quaternion::from_value(value) {
                Some(q) => {
                    node.transform.rotation = q;
                    true
                }
                None => false,
            },
            "scale" => match Vector3::from_value(value) {
                Some(v) => {
                    node.transform.scale = v;
                    true
                }
                None => false,
            },
            _ => false,
        },
        "components" if segs.len() == 3 => {
            let Some(index) = select_component_index(node.components.as_slice(), &segs[1]) else {
                return false;
            };
            let component = &mut node.components[index];
            let (head, dotted) = split_dotted(&segs[2]);
            if dotted.is_empty() {
                return component.set_field(head, value);
            }
            // Dotted write: pull the map-shaped field out, patch the leaf,
            // push the whole field back through the typed setter.
            let Some(mut field_value) = component.get_field(head) else {
                return false;
            };
            if !patch_dotted(&mut field_value, dotted, value) {
                return false;
            }
            component.set_field(head, &field_value)
        }
        field if segs.len() == 1 => match NodeField::from_str(field) {
            Some(f) => f.set(node, value),
            None => false,
        },
        _ => false,
    }
}

/// Node-local write that skips child traversal (the caller already resolved
/// the owning node). Same best-effort contract as [`set`].
pub(crate) fn set_local(graph: &mut SceneGraph, id: NodeID, local: &str, value: &Value) -> bool {
    let segs: Vec<String> = local.split('/').map(str::to_string).collect();
    if segs.is_empty() {
        return false;
    }
    local_set(graph, id, &segs, value)
}

/// Component selection by path segment: all-digit segments index into the
/// node's component list, anything else matches a type tag.
fn select_component<'a>(components: &'a [Component], segment: &str) -> Option<&'a Component> {
    select_component_index(components, segment).map(|i| &components[i])
}

fn select_component_index(components: &[Component], segment: &str) -> Option<usize> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = segment.parse::<usize>() {
            if index < components.len() {
                return Some(index);
            }
        }
    }
    components.iter().position(|c| c.tag() == segment)
}

fn split_dotted(segment: &str) -> (&str, Vec<&str>) {
    let mut parts = segment.split('.');
    let head = parts.next().unwrap_or("");
    (head, parts.collect())
}

fn descend_dotted(mut value: Value, dotted: Vec<&str>, full: &str) -> SceneResult<Value> {
    for key in dotted {
        let next = match value.as_map() {
            Some(map) => map.get(key).cloned(),
            None => {
                return Err(SceneError::TypeMismatch {
                    path: full.to_string(),
                    expected: "map",
                    got: value.shape_name(),
                });
            }
        };
        value = next.ok_or_else(|| SceneError::PathNotFound(full.to_string()))?;
    }
    Ok(value)
}

/// Walk the dotted keys down to the leaf and replace it. `dotted` is never
/// empty here.
fn patch_dotted(value: &mut Value, dotted: Vec<&str>, leaf: &Value) -> bool {
    let mut current = value;
    for key in dotted {
        let here = current;
        let Some(entry) = here.as_map_mut().and_then(|m| m.get_mut(key)) else {
            return false;
        };
        current = entry;
    }
    *current = leaf.clone();
    true
}

// ---------------- enumeration ----------------

/// The addressable paths local to one node, in canonical order: node fields,
/// transform, then components with their table-order fields. Values come at
/// field granularity (map-shaped fields are not expanded into dotted leaves).
pub(crate) fn local_pairs(graph: &SceneGraph, id: NodeID) -> Vec<(String, Value)> {
    let Some(node) = graph.get(id) else {
        return Vec::new();
    };
    let mut pairs = Vec::new();

    for field in NodeField::ALL {
        pairs.push((field.as_str().to_string(), field.get(node)));
    }
    pairs.push((
        "transform/position".to_string(),
        node.transform.position.to_value(),
    ));
    pairs.push((
        "transform/rotation".to_string(),
        node.transform.rotation.to_value(),
    ));
    pairs.push((
        "transform/scale".to_string(),
        node.transform.scale.to_value(),
    ));
    for component in &node.components {
        let tag = component.tag();
        for accessor in field_table(component.ty()) {
            if let Some(value) = component.get_field(accessor.name) {
                pairs.push((format!("components/{tag}/{}", accessor.name), value));
            }
        }
    }
    pairs
}

/// Canonical path segment addressing `child` from `parent`: the child's name
/// when no sibling shares it, otherwise its positional index.
pub fn child_segment(graph: &SceneGraph, parent: NodeID, child: NodeID) -> String {
    let children = graph.children(parent);
    let name = graph.get(child).map(|n| n.name.clone()).unwrap_or_default();
    let same_name = children
        .iter()
        .filter(|&&c| graph.get(c).is_some_and(|n| n.name == name))
        .count();
    if same_name == 1 && !name.is_empty() {
        return name.into_owned();
    }
    children
        .iter()
        .position(|&c| c == child)
        .map_or_else(|| name.into_owned(), |i| i.to_string())
}

/// Lazy depth-first enumeration of every addressable path under `root`.
///
/// Within a node the order matches [`local_pairs`]; children follow their
/// parent, in child order, with canonical `children/<segment>/` prefixes.
pub struct PathIter<'a> {
    graph: &'a SceneGraph,
    include_children: bool,
    stack: Vec<(NodeID, String)>,
    buffer: VecDeque<(String, Value)>,
}

impl<'a> Iterator for PathIter<'a> {
    type Item = (String, Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            let (id, prefix) = self.stack.pop()?;
            for (local, value) in local_pairs(self.graph, id) {
                self.buffer.push_back((format!("{prefix}{local}"), value));
            }
            if self.include_children {
                // Reverse push so the stack pops children in order.
                for &child in self.graph.children(id).iter().rev() {
                    let segment = child_segment(self.graph, id, child);
                    self.stack
                        .push((child, format!("{prefix}children/{segment}/")));
                }
            }
        }
    }
}

pub fn iter_all(graph: &SceneGraph, root: NodeID, include_children: bool) -> PathIter<'_> {
    PathIter {
        graph,
        include_children,
        stack: if graph.contains(root) {
            vec![(root, String::new())]
        } else {
            Vec::new()
        },
        buffer: VecDeque::new(),
    }
}

/// Structural diff of two subtrees by canonical path. An entry appears when
/// a path exists on only one side, or when both values exist but differ
/// beyond the numeric tolerance.
pub fn diff(
    graph_a: &SceneGraph,
    a: NodeID,
    graph_b: &SceneGraph,
    b: NodeID,
) -> IndexMap<String, (Option<Value>, Option<Value>)> {
    let left: IndexMap<String, Value> = iter_all(graph_a, a, true).collect();
    let mut right: IndexMap<String, Value> = iter_all(graph_b, b, true).collect();

    let mut out = IndexMap::new();
    for (path, lv) in left {
        match right.shift_remove(&path) {
            Some(rv) => {
                if !lv.approx_eq(&rv, NUMERIC_TOLERANCE) {
                    out.insert(path, (Some(lv), Some(rv)));
                }
            }
            None => {
                out.insert(path, (Some(lv), None));
            }
        }
    }
    for (path, rv) in right {
        out.insert(path, (None, Some(rv)));
    }
    out
}
