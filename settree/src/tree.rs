//! Display tree mirrored from a settings store.

use serde::Serialize;

use crate::value::SettingValue;

/// Whether a node mirrors a group or a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Key,
}

/// One row of the display tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Group or key name.
    pub label: String,
    pub kind: NodeKind,
    /// Type column, empty for groups.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_text: String,
    /// Value column, empty for groups.
    #[serde(rename = "value", skip_serializing_if = "String::is_empty")]
    pub value_text: String,
    /// Typed value backing the value column, used to seed editors.
    #[serde(skip)]
    pub value: Option<SettingValue>,
    /// Expansion state, kept across refreshes.
    #[serde(skip)]
    pub expanded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            label: label.into(),
            kind,
            type_text: String::new(),
            value_text: String::new(),
            value: None,
            expanded: false,
            children: Vec::new(),
        }
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Labels of the direct children, in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.label.as_str()).collect()
    }
}

/// A visible row produced by [`DisplayTree::flatten_visible`].
#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub depth: usize,
    /// Labels from the top level down to this node.
    pub path: Vec<String>,
    pub node: &'a Node,
}

/// Ordered tree of nodes owned by the settings view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DisplayTree {
    pub roots: Vec<Node>,
}

impl DisplayTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.roots.iter().map(|n| 1 + n.descendant_count()).sum()
    }

    /// Labels of the top-level nodes.
    pub fn labels(&self) -> Vec<&str> {
        self.roots.iter().map(|c| c.label.as_str()).collect()
    }

    /// Node reached by following `path` labels from the top level.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.iter().find(|n| n.label == first.as_ref())?;
        for label in rest {
            node = node.children.iter().find(|n| n.label == label.as_ref())?;
        }
        Some(node)
    }

    pub fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.iter_mut().find(|n| n.label == first.as_ref())?;
        for label in rest {
            node = node
                .children
                .iter_mut()
                .find(|n| n.label == label.as_ref())?;
        }
        Some(node)
    }

    /// Expand or collapse the node at `path`. Returns whether it exists.
    pub fn set_expanded<S: AsRef<str>>(&mut self, path: &[S], expanded: bool) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Depth-first rows, descending only into expanded nodes.
    pub fn flatten_visible(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        let mut path = Vec::new();
        for node in &self.roots {
            flatten_into(node, 0, &mut path, &mut rows);
        }
        rows
    }
}

fn flatten_into<'a>(node: &'a Node, depth: usize, path: &mut Vec<String>, rows: &mut Vec<Row<'a>>) {
    path.push(node.label.clone());
    rows.push(Row {
        depth,
        path: path.clone(),
        node,
    });
    if node.expanded {
        for child in &node.children {
            flatten_into(child, depth + 1, path, rows);
        }
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DisplayTree {
        let mut a = Node::new("a", NodeKind::Group);
        a.children.push(Node::new("x", NodeKind::Key));
        let mut b = Node::new("b", NodeKind::Group);
        let mut c = Node::new("c", NodeKind::Group);
        c.children.push(Node::new("y", NodeKind::Key));
        b.children.push(c);
        DisplayTree {
            roots: vec![a, b, Node::new("k", NodeKind::Key)],
        }
    }

    #[test]
    fn flatten_honors_expansion() {
        let mut tree = sample();
        let labels = |t: &DisplayTree| {
            t.flatten_visible()
                .iter()
                .map(|r| r.path.join("/"))
                .collect::<Vec<_>>()
        };
        assert_eq!(labels(&tree), ["a", "b", "k"]);

        assert!(tree.set_expanded(&["b"], true));
        assert!(tree.set_expanded(&["b", "c"], true));
        assert_eq!(labels(&tree), ["a", "b", "b/c", "b/c/y", "k"]);
        assert_eq!(tree.flatten_visible()[3].depth, 2);

        assert!(!tree.set_expanded(&["missing"], true));
    }

    #[test]
    fn find_and_count() {
        let tree = sample();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.find(&["b", "c", "y"]).unwrap().kind, NodeKind::Key);
        assert!(tree.find(&["b", "y"]).is_none());
        assert!(tree.find::<&str>(&[]).is_none());
    }

    #[test]
    fn serializes_without_ui_state() {
        let mut tree = DisplayTree::new();
        let mut key = Node::new("x", NodeKind::Key);
        key.type_text = "int".into();
        key.value_text = "1".into();
        key.value = Some(SettingValue::Int(1));
        tree.roots.push(Node::new("A", NodeKind::Group));
        tree.roots.push(key);

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "label": "A", "kind": "group" },
                { "label": "x", "kind": "key", "type": "int", "value": "1" }
            ])
        );
    }
}
