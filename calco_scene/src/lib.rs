//! Scene graph with template instancing.
//!
//! Nodes live in a generational arena and are addressed two ways: `NodeID`
//! (runtime handle, index + generation) and `Uid` (stable identity that
//! survives save/load). Property paths address values inside a subtree;
//! templates stamp pristine copies whose instances carry an override ledger
//! recording everything the instance changed.

pub mod arena;
pub mod component;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod node;
pub mod path;
pub mod registry;
pub mod structs;
pub mod template;
pub mod wire;

pub use arena::NodeArena;
pub use component::{Camera, Component, ComponentType, FieldAccessor, Light, Sprite, field_table};
pub use error::{SceneError, SceneResult};
pub use graph::SceneGraph;
pub use ledger::OverrideLedger;
pub use node::{NodeField, SceneNode};
pub use structs::{Color, Quaternion, Transform3D, Vector3};
pub use template::{
    Template, TemplateLibrary, TemplateProvider, notify_template_changed, refresh_from_template,
};
pub use wire::{FullRecord, InstanceRecord, NodeRecord, Pose, load_node, load_node_from_str,
    save_node, save_node_to_string};

pub use calco_ids::{NodeID, Uid};
pub use calco_variant::{NUMERIC_TOLERANCE, Number, RefKind, SymbolicRef, Value};
