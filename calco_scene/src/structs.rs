//! Plain math/value structs shared by nodes and components.
//! These carry serde impls because they appear verbatim in the wire format.

use calco_variant::{NUMERIC_TOLERANCE, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A simple 3D vector struct that holds (x,y,z) values
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Vector3 {
    /// Zero vector3 constant (0, 0, 0)
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// One vector3 constant (1, 1, 1)
    pub const ONE: Self = Self {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };

    /// Creates a new 3D vector
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_value(self) -> Value {
        Value::vec3(self.x, self.y, self.z)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let seq = value.as_seq()?;
        if seq.len() != 3 {
            return None;
        }
        Some(Self::new(seq[0] as f32, seq[1] as f32, seq[2] as f32))
    }

    pub fn approx_eq(self, other: Self) -> bool {
        let tol = NUMERIC_TOLERANCE as f32;
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
    }
}

/// A quaternion representing rotation in 3D space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quaternion({}, {}, {}, {})",
            self.x, self.y, self.z, self.w
        )
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn to_value(self) -> Value {
        Value::vec4(self.x, self.y, self.z, self.w)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let seq = value.as_seq()?;
        if seq.len() != 4 {
            return None;
        }
        Some(Self::new(
            seq[0] as f32,
            seq[1] as f32,
            seq[2] as f32,
            seq[3] as f32,
        ))
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

impl Transform3D {
    pub const IDENTITY: Self = Self {
        position: Vector3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vector3::ONE,
    };

    #[inline]
    pub const fn new(position: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// RGBA color, components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Colors normalize to a nested mapping so single channels stay
    /// addressable (`color.r`).
    pub fn to_value(self) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert(std::sync::Arc::<str>::from("r"), Value::from(self.r));
        map.insert(std::sync::Arc::<str>::from("g"), Value::from(self.g));
        map.insert(std::sync::Arc::<str>::from("b"), Value::from(self.b));
        map.insert(std::sync::Arc::<str>::from("a"), Value::from(self.a));
        Value::Map(map)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        Some(Self::new(
            map.get("r")?.as_f32()?,
            map.get("g")?.as_f32()?,
            map.get("b")?.as_f32()?,
            map.get("a")?.as_f32()?,
        ))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector3_value_roundtrip() {
        let v = Vector3::new(1.5, -2.0, 0.25);
        let back = Vector3::from_value(&v.to_value()).unwrap();
        assert!(v.approx_eq(back));

        assert!(Vector3::from_value(&Value::from("nope")).is_none());
        assert!(Vector3::from_value(&Value::Seq(vec![1.0, 2.0])).is_none());
    }

    #[test]
    fn quaternion_value_roundtrip() {
        let q = Quaternion::new(0.0, 0.707, 0.0, 0.707);
        let back = Quaternion::from_value(&q.to_value()).unwrap();
        assert_eq!(q, back);
    }

    #[test]
    fn color_value_is_nested_map() {
        let c = Color::new(0.5, 0.25, 0.125, 1.0);
        let v = c.to_value();
        let map = v.as_map().expect("color should normalize to a map");
        assert_eq!(map.get("g").and_then(|x| x.as_f32()), Some(0.25));
        assert_eq!(Color::from_value(&v), Some(c));
    }

    #[test]
    fn transform_serde_shape() {
        let t = Transform3D::IDENTITY;
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("position").is_some());
        assert!(json.get("rotation").is_some());
        assert!(json.get("scale").is_some());
        assert_eq!(json["rotation"]["w"], 1.0);
    }
}
