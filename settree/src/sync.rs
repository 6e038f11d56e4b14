//! Incremental synchronization of a display tree with a settings store.
//!
//! Each level is rebuilt in two passes. The existing children are first moved
//! into a map keyed by label, then a new child list is assembled in store
//! order (groups followed by keys), reusing a node from the map whenever one
//! with the same label exists. The new list replaces the old one in a single
//! assignment and whatever is left in the map is stale.
//!
//! Reused nodes keep their UI state (expansion) and their subtrees are
//! synchronized recursively, so an unchanged store leaves the tree untouched.

use std::collections::{HashMap, HashSet};

use crate::{
    store::{SettingsStore, document::split_path},
    tree::{Node, NodeKind},
    value::{SettingValue, guess_string_type},
};

/// Knobs for how values are presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Show strings that look like booleans or integers as those types.
    /// Only the type and value columns change; nodes keep the stored string.
    pub guess_string_types: bool,
}

/// Structural changes made by one synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Nodes created for new groups or keys.
    pub created: usize,
    /// Stale nodes dropped, counting their descendants.
    pub removed: usize,
    /// Reused nodes that ended up at a different index.
    pub moved: usize,
    /// Reused nodes whose kind, type or value text changed.
    pub updated: usize,
}

impl SyncStats {
    pub fn is_unchanged(&self) -> bool {
        *self == SyncStats::default()
    }
}

/// Reconcile `children` with the current group of `store`.
///
/// The store's group scope is restored before returning.
pub fn synchronize(
    store: &mut dyn SettingsStore,
    children: &mut Vec<Node>,
    options: &SyncOptions,
) -> SyncStats {
    let mut stats = SyncStats::default();
    sync_level(store, children, options, &mut stats);
    stats
}

fn sync_level(
    store: &mut dyn SettingsStore,
    children: &mut Vec<Node>,
    options: &SyncOptions,
    stats: &mut SyncStats,
) {
    let groups = store.child_groups();
    let keys = store.child_keys();
    let key_names: HashSet<&str> = keys.iter().map(String::as_str).collect();

    let mut pool: HashMap<String, (usize, Node)> = HashMap::with_capacity(children.len());
    for (idx, node) in std::mem::take(children).into_iter().enumerate() {
        if let Some((_, dup)) = pool.insert(node.label.clone(), (idx, node)) {
            stats.removed += 1 + dup.descendant_count();
        }
    }

    let mut next: Vec<Node> = Vec::with_capacity(groups.len() + keys.len());

    for name in &groups {
        // Entering such a group would not leave the current scope.
        if split_path(name).is_empty() {
            warn!("skipping group with empty name in {:?}", store.group());
            continue;
        }
        let mut node = take_or_create(&mut pool, name, next.len(), NodeKind::Group, stats);
        if node.kind != NodeKind::Group {
            node.kind = NodeKind::Group;
            stats.updated += 1;
        }
        // A key of the same name fills the value columns below.
        if !key_names.contains(name.as_str()) && clear_value(&mut node) {
            stats.updated += 1;
        }
        store.begin_group(name);
        sync_level(store, &mut node.children, options, stats);
        store.end_group();
        next.push(node);
    }

    for name in &keys {
        let value = store.value(name).unwrap_or_default();

        if let Some(node) = next.iter_mut().find(|n| n.label == *name) {
            if show_value(node, value, options) {
                stats.updated += 1;
            }
            continue;
        }

        let mut node = take_or_create(&mut pool, name, next.len(), NodeKind::Key, stats);
        if node.kind != NodeKind::Key {
            node.kind = NodeKind::Key;
            stats.updated += 1;
        }
        if !node.children.is_empty() {
            stats.removed += node.descendant_count();
            node.children.clear();
            node.expanded = false;
        }
        let fresh = node.value.is_none() && node.type_text.is_empty();
        if show_value(&mut node, value, options) && !fresh {
            stats.updated += 1;
        }
        next.push(node);
    }

    for (_, (_, stale)) in pool {
        trace!("dropping stale node {:?}", stale.label);
        stats.removed += 1 + stale.descendant_count();
    }
    *children = next;
}

fn take_or_create(
    pool: &mut HashMap<String, (usize, Node)>,
    name: &str,
    index: usize,
    kind: NodeKind,
    stats: &mut SyncStats,
) -> Node {
    match pool.remove(name) {
        Some((old_index, node)) => {
            if old_index != index {
                stats.moved += 1;
            }
            node
        }
        None => {
            stats.created += 1;
            Node::new(name, kind)
        }
    }
}

/// Clear the value columns. Returns whether anything was shown before.
fn clear_value(node: &mut Node) -> bool {
    let had_value =
        node.value.is_some() || !node.type_text.is_empty() || !node.value_text.is_empty();
    node.value = None;
    node.type_text.clear();
    node.value_text.clear();
    had_value
}

/// Show the stored `value` in the node. Returns whether the visible text
/// changed.
pub(crate) fn show_value(node: &mut Node, value: SettingValue, options: &SyncOptions) -> bool {
    let guessed = match &value {
        SettingValue::String(s) if options.guess_string_types => guess_string_type(s),
        _ => None,
    };
    let shown = guessed.as_ref().unwrap_or(&value);
    let type_text = shown.type_name();
    let value_text = shown.display_text();
    let changed = node.type_text != type_text || node.value_text != value_text;
    if changed {
        node.type_text = type_text.to_string();
        node.value_text = value_text;
    }
    node.value = Some(value);
    changed
}
