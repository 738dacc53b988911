//! Typed components and their field-capability tables.
//!
//! Every component type registers a stable tag (the `type` field in the wire
//! format) and a fixed table mapping field name to a typed get/set pair.
//! Path resolution dispatches through these tables, so unknown field names
//! fail closed instead of silently defaulting.

use calco_variant::{SymbolicRef, Value};
use serde::{Deserialize, Serialize};

use crate::ledger::OverrideLedger;
use crate::structs::Color;

/// Stable component tags. Path segments carry the tag, dispatch is a table
/// lookup, never type-name introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Light,
    Camera,
    Sprite,
    Instance,
}

impl ComponentType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Light" => Some(ComponentType::Light),
            "Camera" => Some(ComponentType::Camera),
            "Sprite" => Some(ComponentType::Sprite),
            "Instance" => Some(ComponentType::Instance),
            _ => None,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            ComponentType::Light => "Light",
            ComponentType::Camera => "Camera",
            ComponentType::Sprite => "Sprite",
            ComponentType::Instance => "Instance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub intensity: f32,
    pub range: f32,
    pub color: Color,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            range: 10.0,
            color: Color::WHITE,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub current: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 70.0,
            near: 0.05,
            far: 4000.0,
            current: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    /// Shared texture resource; stored as a symbolic reference because the
    /// resource itself cannot be embedded in the wire format.
    pub texture: Option<SymbolicRef>,
    pub modulate: Color,
    pub centered: bool,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            texture: None,
            modulate: Color::WHITE,
            centered: true,
        }
    }
}

/// A node holds at most one component of a given concrete type, several of
/// different types, in declaration order. The override ledger rides along as
/// the `Instance` variant so an instantiated root owns its delta record the
/// same way it owns any other component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Component {
    Light(Light),
    Camera(Camera),
    Sprite(Sprite),
    Instance(OverrideLedger),
}

impl Component {
    pub const fn ty(&self) -> ComponentType {
        match self {
            Component::Light(_) => ComponentType::Light,
            Component::Camera(_) => ComponentType::Camera,
            Component::Sprite(_) => ComponentType::Sprite,
            Component::Instance(_) => ComponentType::Instance,
        }
    }

    pub const fn tag(&self) -> &'static str {
        self.ty().tag()
    }

    /// Field lookup through the capability table; `None` for unknown names.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        let accessor = field_table(self.ty())
            .iter()
            .find(|accessor| accessor.name == name)?;
        (accessor.get)(self)
    }

    /// Typed write through the capability table. Returns `false` for unknown
    /// names or when `value` cannot be coerced to the field's shape.
    pub fn set_field(&mut self, name: &str, value: &Value) -> bool {
        let Some(accessor) = field_table(self.ty())
            .iter()
            .find(|accessor| accessor.name == name)
        else {
            return false;
        };
        (accessor.set)(self, value)
    }
}

/// One typed get/set pair in a component's capability table.
pub struct FieldAccessor {
    pub name: &'static str,
    pub get: fn(&Component) -> Option<Value>,
    pub set: fn(&mut Component, &Value) -> bool,
}

/// Fixed per-type field table, built at registration time (compile time
/// here). Iteration order is the declared field order.
pub fn field_table(ty: ComponentType) -> &'static [FieldAccessor] {
    match ty {
        ComponentType::Light => LIGHT_FIELDS,
        ComponentType::Camera => CAMERA_FIELDS,
        ComponentType::Sprite => SPRITE_FIELDS,
        // The ledger is not value-addressable; it contributes no paths.
        ComponentType::Instance => &[],
    }
}

static LIGHT_FIELDS: &[FieldAccessor] = &[
    FieldAccessor {
        name: "intensity",
        get: |c| match c {
            Component::Light(l) => Some(Value::from(l.intensity)),
            _ => None,
        },
        set: |c, v| match (c, v.as_f32()) {
            (Component::Light(l), Some(f)) => {
                l.intensity = f;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "range",
        get: |c| match c {
            Component::Light(l) => Some(Value::from(l.range)),
            _ => None,
        },
        set: |c, v| match (c, v.as_f32()) {
            (Component::Light(l), Some(f)) => {
                l.range = f;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "color",
        get: |c| match c {
            Component::Light(l) => Some(l.color.to_value()),
            _ => None,
        },
        set: |c, v| match (c, Color::from_value(v)) {
            (Component::Light(l), Some(color)) => {
                l.color = color;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "enabled",
        get: |c| match c {
            Component::Light(l) => Some(Value::from(l.enabled)),
            _ => None,
        },
        set: |c, v| match (c, v.as_bool()) {
            (Component::Light(l), Some(b)) => {
                l.enabled = b;
                true
            }
            _ => false,
        },
    },
];

static CAMERA_FIELDS: &[FieldAccessor] = &[
    FieldAccessor {
        name: "fov",
        get: |c| match c {
            Component::Camera(cam) => Some(Value::from(cam.fov)),
            _ => None,
        },
        set: |c, v| match (c, v.as_f32()) {
            (Component::Camera(cam), Some(f)) => {
                cam.fov = f;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "near",
        get: |c| match c {
            Component::Camera(cam) => Some(Value::from(cam.near)),
            _ => None,
        },
        set: |c, v| match (c, v.as_f32()) {
            (Component::Camera(cam), Some(f)) => {
                cam.near = f;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "far",
        get: |c| match c {
            Component::Camera(cam) => Some(Value::from(cam.far)),
            _ => None,
        },
        set: |c, v| match (c, v.as_f32()) {
            (Component::Camera(cam), Some(f)) => {
                cam.far = f;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "current",
        get: |c| match c {
            Component::Camera(cam) => Some(Value::from(cam.current)),
            _ => None,
        },
        set: |c, v| match (c, v.as_bool()) {
            (Component::Camera(cam), Some(b)) => {
                cam.current = b;
                true
            }
            _ => false,
        },
    },
];

static SPRITE_FIELDS: &[FieldAccessor] = &[
    FieldAccessor {
        name: "texture",
        get: |c| match c {
            Component::Sprite(s) => Some(match &s.texture {
                Some(r) => Value::Ref(r.clone()),
                None => Value::Null,
            }),
            _ => None,
        },
        set: |c, v| match c {
            Component::Sprite(s) => match v {
                Value::Null => {
                    s.texture = None;
                    true
                }
                Value::Ref(r) => {
                    s.texture = Some(r.clone());
                    true
                }
                _ => false,
            },
            _ => false,
        },
    },
    FieldAccessor {
        name: "modulate",
        get: |c| match c {
            Component::Sprite(s) => Some(s.modulate.to_value()),
            _ => None,
        },
        set: |c, v| match (c, Color::from_value(v)) {
            (Component::Sprite(s), Some(color)) => {
                s.modulate = color;
                true
            }
            _ => false,
        },
    },
    FieldAccessor {
        name: "centered",
        get: |c| match c {
            Component::Sprite(s) => Some(Value::from(s.centered)),
            _ => None,
        },
        set: |c, v| match (c, v.as_bool()) {
            (Component::Sprite(s), Some(b)) => {
                s.centered = b;
                true
            }
            _ => false,
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for ty in [
            ComponentType::Light,
            ComponentType::Camera,
            ComponentType::Sprite,
            ComponentType::Instance,
        ] {
            assert_eq!(ComponentType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(ComponentType::from_tag("Rigidbody"), None);
    }

    #[test]
    fn field_get_set() {
        let mut light = Component::Light(Light::default());
        assert_eq!(light.get_field("intensity").unwrap().as_f32(), Some(1.0));

        assert!(light.set_field("intensity", &Value::from(3.5f32)));
        assert_eq!(light.get_field("intensity").unwrap().as_f32(), Some(3.5));

        // Unknown fields fail closed.
        assert_eq!(light.get_field("brightness"), None);
        assert!(!light.set_field("brightness", &Value::from(1.0f32)));

        // Shape mismatch is rejected, value untouched.
        assert!(!light.set_field("intensity", &Value::from("high")));
        assert_eq!(light.get_field("intensity").unwrap().as_f32(), Some(3.5));
    }

    #[test]
    fn color_field_is_nested_map() {
        let light = Component::Light(Light::default());
        let color = light.get_field("color").unwrap();
        assert_eq!(color.as_map().unwrap().get("r").and_then(|v| v.as_f32()), Some(1.0));
    }

    #[test]
    fn sprite_texture_ref() {
        let mut sprite = Component::Sprite(Sprite::default());
        assert!(sprite.get_field("texture").unwrap().is_null());

        let r = Value::Ref(SymbolicRef::uuid("4f3a"));
        assert!(sprite.set_field("texture", &r));
        assert_eq!(sprite.get_field("texture").unwrap(), r);

        // A bare string is not a valid resource reference.
        assert!(!sprite.set_field("texture", &Value::from("4f3a")));
    }

    #[test]
    fn instance_has_no_addressable_fields() {
        assert!(field_table(ComponentType::Instance).is_empty());
    }

    #[test]
    fn component_serde_carries_type_tag() {
        let camera = Component::Camera(Camera::default());
        let json = serde_json::to_value(&camera).unwrap();
        assert_eq!(json["type"], "Camera");

        let back: Component = serde_json::from_value(json).unwrap();
        assert_eq!(back, camera);
    }
}
