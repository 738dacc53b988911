//! Per-instance override/structural-delta record.
//!
//! One ledger lives on every instantiated template root, owned by that node
//! exactly like any other component (see [`Component::Instance`]). It records
//! what this instance changed relative to its template: property overrides
//! keyed by property path, plus the added/removed child sets.
//!
//! [`Component::Instance`]: crate::component::Component::Instance

use calco_ids::Uid;
use calco_variant::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Override/structural-delta state for one instantiated template root.
///
/// `added_children` and `removed_children` live in disjoint identifier
/// spaces: added uids are this instance's own node uids, removed uids are
/// uids as stored in the template. The mark methods still clear the opposite
/// set so one uid can never sit in both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideLedger {
    pub template_id: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    overrides: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    added_children: IndexSet<Uid>,

    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    removed_children: IndexSet<Uid>,
}

impl OverrideLedger {
    pub fn new<S: Into<String>>(template_id: S) -> Self {
        Self {
            template_id: template_id.into(),
            overrides: IndexMap::new(),
            added_children: IndexSet::new(),
            removed_children: IndexSet::new(),
        }
    }

    // ---------------- overrides ----------------

    /// Store a normalized value snapshot for `path`. Re-setting the same
    /// path replaces the entry in place (insertion order is kept).
    pub fn set_override<P: Into<String>>(&mut self, path: P, value: Value) {
        self.overrides.insert(path.into(), value);
    }

    pub fn clear_override(&mut self, path: &str) -> bool {
        self.overrides.shift_remove(path).is_some()
    }

    pub fn clear_all_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn is_overridden(&self, path: &str) -> bool {
        self.overrides.contains_key(path)
    }

    pub fn get_override(&self, path: &str) -> Option<&Value> {
        self.overrides.get(path)
    }

    /// Paths in first-set insertion order.
    pub fn list_overridden_paths(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }

    pub fn overrides(&self) -> &IndexMap<String, Value> {
        &self.overrides
    }

    /// Replace the whole override map (used when re-populating from a saved
    /// record; entries are kept verbatim even if they no longer resolve).
    pub fn restore_overrides(&mut self, overrides: IndexMap<String, Value>) {
        self.overrides = overrides;
    }

    // ---------------- structural deltas ----------------

    /// Mark `uid` (an instance-side uid) as a child added on top of the
    /// template. Idempotent; clears a stale removed-mark for the same uid.
    pub fn mark_child_added(&mut self, uid: Uid) {
        self.removed_children.shift_remove(&uid);
        self.added_children.insert(uid);
    }

    /// Mark `uid` (a template-side uid) as a child this instance deleted.
    /// Idempotent; clears a stale added-mark for the same uid.
    pub fn mark_child_removed(&mut self, uid: Uid) {
        self.added_children.shift_remove(&uid);
        self.removed_children.insert(uid);
    }

    pub fn unmark_child_added(&mut self, uid: Uid) -> bool {
        self.added_children.shift_remove(&uid)
    }

    pub fn unmark_child_removed(&mut self, uid: Uid) -> bool {
        self.removed_children.shift_remove(&uid)
    }

    pub fn is_child_added(&self, uid: Uid) -> bool {
        self.added_children.contains(&uid)
    }

    pub fn is_child_removed(&self, uid: Uid) -> bool {
        self.removed_children.contains(&uid)
    }

    pub fn added_children(&self) -> &IndexSet<Uid> {
        &self.added_children
    }

    pub fn removed_children(&self) -> &IndexSet<Uid> {
        &self.removed_children
    }

    pub fn restore_removed_children(&mut self, uids: impl IntoIterator<Item = Uid>) {
        self.removed_children = uids.into_iter().collect();
    }
}
