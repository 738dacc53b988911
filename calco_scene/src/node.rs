// node.rs
use std::borrow::Cow;

use calco_ids::{NodeID, Uid};
use calco_variant::Value;

use crate::component::{Component, ComponentType};
use crate::ledger::OverrideLedger;
use crate::structs::Transform3D;

/// A tree element living in the scene arena.
///
/// `id` is the runtime arena handle (index + generation, never serialized);
/// `uid` is the stable identity preserved across save/load. Parent/child
/// links are plain `NodeID`s — the arena holds the only owning references.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeID,
    pub uid: Uid,

    pub name: Cow<'static, str>,

    pub visible: bool,
    pub active: bool,
    pub pickable: bool,
    pub selectable: bool,
    pub layer: u32,
    pub flags: u64,
    pub priority: i32,

    pub transform: Transform3D,

    pub components: Vec<Component>,

    pub parent: NodeID,
    pub children: Vec<NodeID>,
}

impl SceneNode {
    pub fn new<S: Into<Cow<'static, str>>>(name: S) -> Self {
        Self {
            id: NodeID::nil(),
            uid: Uid::new(),
            name: name.into(),
            visible: true,
            active: true,
            pickable: true,
            selectable: true,
            layer: 0,
            flags: 0,
            priority: 0,
            transform: Transform3D::IDENTITY,
            components: Vec::new(),
            parent: NodeID::nil(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: NodeID) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn remove_child(&mut self, child: NodeID) {
        self.children.retain(|c| *c != child);
    }

    pub fn component(&self, ty: ComponentType) -> Option<&Component> {
        self.components.iter().find(|c| c.ty() == ty)
    }

    pub fn component_mut(&mut self, ty: ComponentType) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.ty() == ty)
    }

    pub fn has_component(&self, ty: ComponentType) -> bool {
        self.component(ty).is_some()
    }

    /// The override ledger, if this node is an instantiated template root.
    pub fn ledger(&self) -> Option<&OverrideLedger> {
        match self.component(ComponentType::Instance) {
            Some(Component::Instance(ledger)) => Some(ledger),
            _ => None,
        }
    }

    pub fn ledger_mut(&mut self) -> Option<&mut OverrideLedger> {
        match self.component_mut(ComponentType::Instance) {
            Some(Component::Instance(ledger)) => Some(ledger),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.ledger().is_some()
    }
}

/// The fixed set of directly addressable node fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    Name,
    Visible,
    Active,
    Pickable,
    Selectable,
    Layer,
    Flags,
    Priority,
}

impl NodeField {
    /// Declaration order; also the enumeration order in path iteration.
    pub const ALL: [NodeField; 8] = [
        NodeField::Name,
        NodeField::Visible,
        NodeField::Active,
        NodeField::Pickable,
        NodeField::Selectable,
        NodeField::Layer,
        NodeField::Flags,
        NodeField::Priority,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(NodeField::Name),
            "visible" => Some(NodeField::Visible),
            "active" => Some(NodeField::Active),
            "pickable" => Some(NodeField::Pickable),
            "selectable" => Some(NodeField::Selectable),
            "layer" => Some(NodeField::Layer),
            "flags" => Some(NodeField::Flags),
            "priority" => Some(NodeField::Priority),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NodeField::Name => "name",
            NodeField::Visible => "visible",
            NodeField::Active => "active",
            NodeField::Pickable => "pickable",
            NodeField::Selectable => "selectable",
            NodeField::Layer => "layer",
            NodeField::Flags => "flags",
            NodeField::Priority => "priority",
        }
    }

    pub fn get(self, node: &SceneNode) -> Value {
        match self {
            NodeField::Name => Value::string(node.name.as_ref()),
            NodeField::Visible => Value::from(node.visible),
            NodeField::Active => Value::from(node.active),
            NodeField::Pickable => Value::from(node.pickable),
            NodeField::Selectable => Value::from(node.selectable),
            NodeField::Layer => Value::from(node.layer),
            NodeField::Flags => Value::from(node.flags),
            NodeField::Priority => Value::from(node.priority as i64),
        }
    }

    /// Typed write; `false` when `value` cannot be coerced to the field's
    /// shape (the field keeps its current value).
    pub fn set(self, node: &mut SceneNode, value: &Value) -> bool {
        match self {
            NodeField::Name => match value.as_str() {
                Some(s) => {
                    node.name = Cow::Owned(s.to_string());
                    true
                }
                None => false,
            },
            NodeField::Visible => match value.as_bool() {
                Some(b) => {
                    node.visible = b;
                    true
                }
                None => false,
            },
            NodeField::Active => match value.as_bool() {
                Some(b) => {
                    node.active = b;
                    true
                }
                None => false,
            },
            NodeField::Pickable => match value.as_bool() {
                Some(b) => {
                    node.pickable = b;
                    true
                }
                None => false,
            },
            NodeField::Selectable => match value.as_bool() {
                Some(b) => {
                    node.selectable = b;
                    true
                }
                None => false,
            },
            NodeField::Layer => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(v) => {
                    node.layer = v;
                    true
                }
                None => false,
            },
            NodeField::Flags => match value.as_u64() {
                Some(v) => {
                    node.flags = v;
                    true
                }
                None => false,
            },
            NodeField::Priority => match value.as_i64().and_then(|v| i32::try_from(v).ok()) {
                Some(v) => {
                    node.priority = v;
                    true
                }
                None => false,
            },
        }
    }
}
