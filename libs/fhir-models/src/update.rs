//! Immutable updates
//!
//! `with` and `apply_transform` never touch the receiver: they take its
//! canonical view, merge a patch over it and construct a fresh instance.
//! The merge is shallow. A patch entry replaces the whole value under its
//! key, so patching `name` replaces every name rather than merging into the
//! first one.

use crate::choice::set_choice_variant;
use crate::table::PropertyTable;
use serde_json::{Map, Value};

/// Merge `patch` over `view`.
///
/// - a key bound to `null` removes the key from the result
/// - a key that is a choice variant clears its siblings (and their shadows)
///   so switching a choice through a patch yields a single variant
/// - every other key overwrites
pub fn merge_shallow(
    mut view: Map<String, Value>,
    patch: Map<String, Value>,
    table: &PropertyTable,
) -> Map<String, Value> {
    for (key, value) in patch {
        if value.is_null() {
            view.remove(&key);
            continue;
        }

        let siblings = table.choice_siblings(&key);
        if siblings.is_empty() {
            view.insert(key, value);
        } else {
            set_choice_variant(&mut view, &key, value, &siblings);
        }
    }
    view
}
