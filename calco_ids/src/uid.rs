//! Stable 32-bit node identities with an atomic allocation counter.
//! Unlike [`NodeID`](crate::NodeID) handles, a `Uid` survives save/load: it is
//! serialized as an 8-char lowercase hex string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static UID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Stable unique identifier assigned at node creation, preserved across save/load.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(u32);

impl Uid {
    /// Allocate a fresh process-unique identifier.
    pub fn new() -> Self {
        let value = UID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(if value == 0 { 1 } else { value })
    }

    pub const fn nil() -> Self {
        Self(0)
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Deterministic identifier from a string (FNV-1a). Used for synthetic uids.
    pub fn from_string(s: &str) -> Self {
        const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
        const FNV_PRIME: u32 = 0x01000193;

        let mut hash = FNV_OFFSET_BASIS;
        for byte in s.as_bytes() {
            hash ^= *byte as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
        }

        Self(if hash == 0 { 1 } else { hash })
    }

    /// Parse a hex string (optional `0x` prefix).
    pub fn parse_str(s: &str) -> Result<Self, String> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| format!("Invalid Uid string: {}", e))
    }

    /// Bump the allocation counter past `value` so a loaded uid is never reissued.
    pub fn reserve(value: u32) {
        UID_COUNTER.fetch_max(value.wrapping_add(1).max(1), Ordering::Relaxed);
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({:08x})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl Serialize for Uid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:08x}", self.0))
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UidVisitor;

        impl<'de> serde::de::Visitor<'de> for UidVisitor {
            type Value = Uid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hex string or u32")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let uid = Uid::parse_str(v).map_err(E::custom)?;
                Uid::reserve(uid.as_u32());
                Ok(uid)
            }

            fn visit_u32<E: serde::de::Error>(self, v: u32) -> Result<Self::Value, E> {
                Uid::reserve(v);
                Ok(Uid::from_u32(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                self.visit_u32(v as u32)
            }
        }

        deserializer.deserialize_any(UidVisitor)
    }
}
