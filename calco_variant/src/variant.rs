// calco_variant/src/variant.rs

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

/// Tolerance used when comparing numeric values for equality.
pub const NUMERIC_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl Number {
    #[inline]
    pub const fn is_int(&self) -> bool {
        matches!(self, Number::I64(_) | Number::U64(_))
    }

    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::F64(_))
    }

    pub fn as_i64_lossy(&self) -> Option<i64> {
        match *self {
            Number::I64(v) => Some(v),
            Number::U64(v) => i64::try_from(v).ok(),
            Number::F64(_) => None,
        }
    }

    pub fn as_u64_lossy(&self) -> Option<u64> {
        match *self {
            Number::I64(v) => u64::try_from(v).ok(),
            Number::U64(v) => Some(v),
            Number::F64(_) => None,
        }
    }

    pub fn as_f64_lossy(&self) -> f64 {
        match *self {
            Number::I64(v) => v as f64,
            Number::U64(v) => v as f64,
            Number::F64(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(v) => write!(f, "{v}"),
            Number::U64(v) => write!(f, "{v}"),
            Number::F64(v) => write!(f, "{v}"),
        }
    }
}

/// Which namespace a [`SymbolicRef`] resolves in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Uuid,
    Name,
}

/// A stand-in for an object that cannot be embedded verbatim in the wire
/// format (a shared resource, another node). Serialized as
/// `{"kind": "uuid" | "name", "value": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolicRef {
    pub kind: RefKind,
    pub value: Arc<str>,
}

impl SymbolicRef {
    pub fn uuid<S: AsRef<str>>(value: S) -> Self {
        Self {
            kind: RefKind::Uuid,
            value: Arc::<str>::from(value.as_ref()),
        }
    }

    pub fn name<S: AsRef<str>>(value: S) -> Self {
        Self {
            kind: RefKind::Name,
            value: Arc::<str>::from(value.as_ref()),
        }
    }
}

/// The normalized, wire-safe value shape used for override snapshots.
///
/// Every override entry is one of these; anything richer (a texture handle,
/// a node pointer) must be normalized to a [`SymbolicRef`] before storage.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    // --- Nullary ---
    Null,

    // --- Primitives ---
    Bool(bool),
    Number(Number),

    // --- Text ---
    Str(Arc<str>),

    // --- Numeric sequence (vectors, quaternions, matrices) ---
    Seq(Vec<f64>),

    // Deterministic ordering by default (better diffs, stable serialization).
    Map(BTreeMap<Arc<str>, Value>),

    // --- Symbolic reference to an external object ---
    Ref(SymbolicRef),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{:?}", v.as_ref()),
            Value::Seq(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key.as_ref(), value)?;
                }
                write!(f, "}}")
            }
            Value::Ref(r) => write!(f, "<ref {:?} {:?}>", r.kind, r.value.as_ref()),
        }
    }
}

// -------------------- Constructors --------------------

impl Value {
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        Value::Str(Arc::<str>::from(s.as_ref()))
    }

    #[inline]
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// A 3-component numeric sequence.
    #[inline]
    pub fn vec3(x: f32, y: f32, z: f32) -> Self {
        Value::Seq(vec![x as f64, y as f64, z as f64])
    }

    /// A 4-component numeric sequence (quaternion/color component order is
    /// whatever the field table declares).
    #[inline]
    pub fn vec4(x: f32, y: f32, z: f32, w: f32) -> Self {
        Value::Seq(vec![x as f64, y as f64, z as f64, w as f64])
    }
}

// -------------------- Accessors --------------------

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(|n| n.as_f64_lossy())
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::I64(v)) => Some(*v),
            Value::Number(Number::U64(v)) => i64::try_from(*v).ok(),
            Value::Number(Number::F64(v)) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(Number::U64(v)) => Some(*v),
            Value::Number(Number::I64(v)) => u64::try_from(*v).ok(),
            Value::Number(Number::F64(v)) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[f64]> {
        match self {
            Value::Seq(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Arc<str>, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<Arc<str>, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_symbolic_ref(&self) -> Option<&SymbolicRef> {
        match self {
            Value::Ref(v) => Some(v),
            _ => None,
        }
    }

    /// The declared shape name, used in mismatch diagnostics.
    pub const fn shape_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Ref(_) => "reference",
        }
    }
}

// -------------------- Deep equality --------------------

impl Value {
    /// Deep equality with `tolerance` on every numeric comparison.
    /// Values of different declared shapes never compare equal.
    pub fn approx_eq(&self, other: &Value, tolerance: f64) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                (a.as_f64_lossy() - b.as_f64_lossy()).abs() <= tolerance
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.get(key).is_some_and(|v| value.approx_eq(v, tolerance))
                    })
            }
            (Value::Ref(a), Value::Ref(b)) => a == b,
            _ => false,
        }
    }
}

// -------------------- From impls --------------------

impl From<bool> for Value {
    #[inline]
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Number> for Value {
    #[inline]
    fn from(v: Number) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(v: i32) -> Self {
        Value::Number(Number::I64(v as i64))
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(v: i64) -> Self {
        Value::Number(Number::I64(v))
    }
}

impl From<u32> for Value {
    #[inline]
    fn from(v: u32) -> Self {
        Value::Number(Number::U64(v as u64))
    }
}

impl From<u64> for Value {
    #[inline]
    fn from(v: u64) -> Self {
        Value::Number(Number::U64(v))
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(v: f32) -> Self {
        Value::Number(Number::F64(v as f64))
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(v: f64) -> Self {
        Value::Number(Number::F64(v))
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(v: String) -> Self {
        Value::Str(Arc::<str>::from(v))
    }
}

impl From<SymbolicRef> for Value {
    #[inline]
    fn from(v: SymbolicRef) -> Self {
        Value::Ref(v)
    }
}

impl From<Vec<f64>> for Value {
    #[inline]
    fn from(v: Vec<f64>) -> Self {
        Value::Seq(v)
    }
}

impl From<BTreeMap<Arc<str>, Value>> for Value {
    #[inline]
    fn from(v: BTreeMap<Arc<str>, Value>) -> Self {
        Value::Map(v)
    }
}

// -------------------- JSON conversion --------------------

impl Value {
    /// Convert from a serde_json tree. Fails on shapes outside the closed
    /// wire-safe set (e.g. arrays with non-numeric elements), so malformed
    /// records surface as load errors rather than mangled values.
    pub fn from_json_value(value: JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(v) => Ok(Value::Bool(v)),
            JsonValue::Number(v) => {
                if let Some(i) = v.as_i64() {
                    Ok(Value::from(i))
                } else if let Some(u) = v.as_u64() {
                    Ok(Value::from(u))
                } else if let Some(f) = v.as_f64() {
                    Ok(Value::from(f))
                } else {
                    Ok(Value::Null)
                }
            }
            JsonValue::String(v) => Ok(Value::from(v)),
            JsonValue::Array(values) => {
                let mut seq = Vec::with_capacity(values.len());
                for entry in values {
                    match entry.as_f64() {
                        Some(f) => seq.push(f),
                        None => {
                            return Err(format!("sequence element is not numeric: {entry}"));
                        }
                    }
                }
                Ok(Value::Seq(seq))
            }
            JsonValue::Object(object) => {
                if let Some(r) = symbolic_ref_from_object(&object) {
                    return Ok(Value::Ref(r));
                }
                let mut map = BTreeMap::new();
                for (k, v) in object {
                    map.insert(Arc::<str>::from(k), Value::from_json_value(v)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(v) => JsonValue::Bool(*v),
            Value::Number(v) => number_to_json_value(*v),
            Value::Str(v) => JsonValue::String(v.as_ref().to_string()),
            Value::Seq(v) => JsonValue::Array(v.iter().map(|f| float_to_json(*f)).collect()),
            Value::Map(v) => JsonValue::Object(
                v.iter()
                    .map(|(k, v)| (k.as_ref().to_string(), v.to_json_value()))
                    .collect::<JsonMap<String, JsonValue>>(),
            ),
            Value::Ref(r) => {
                let mut map = JsonMap::new();
                map.insert(
                    "kind".to_string(),
                    JsonValue::String(
                        match r.kind {
                            RefKind::Uuid => "uuid",
                            RefKind::Name => "name",
                        }
                        .to_string(),
                    ),
                );
                map.insert(
                    "value".to_string(),
                    JsonValue::String(r.value.as_ref().to_string()),
                );
                JsonValue::Object(map)
            }
        }
    }
}

/// A JSON object is a symbolic reference iff it is exactly
/// `{"kind": "uuid"|"name", "value": <string>}`.
fn symbolic_ref_from_object(object: &JsonMap<String, JsonValue>) -> Option<SymbolicRef> {
    if object.len() != 2 {
        return None;
    }
    let kind = match object.get("kind")?.as_str()? {
        "uuid" => RefKind::Uuid,
        "name" => RefKind::Name,
        _ => return None,
    };
    let value = object.get("value")?.as_str()?;
    Some(SymbolicRef {
        kind,
        value: Arc::<str>::from(value),
    })
}

fn number_to_json_value(number: Number) -> JsonValue {
    match number {
        Number::I64(v) => JsonValue::Number(JsonNumber::from(v)),
        Number::U64(v) => JsonValue::Number(JsonNumber::from(v)),
        Number::F64(v) => float_to_json(v),
    }
}

fn float_to_json(value: f64) -> JsonValue {
    match JsonNumber::from_f64(value) {
        Some(v) => JsonValue::Number(v),
        None => JsonValue::Null,
    }
}

// -------------------- Serde --------------------

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Value::from_json_value(json).map_err(serde::de::Error::custom)
    }
}
