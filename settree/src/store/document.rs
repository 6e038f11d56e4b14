//! Insertion-ordered settings hierarchy shared by every store.

use crate::value::SettingValue;

/// File value a key was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Toml(toml::Value),
    Json(serde_json::Value),
}

/// One level of the settings hierarchy.
///
/// Groups and keys keep the order in which they were first inserted. A key
/// and a group may share a name; names are unique within each kind.
///
/// Equality looks at names and values only. Key sources and the table array
/// flag describe the file layout.
#[derive(Debug, Clone, Default)]
pub struct Group {
    groups: Vec<(String, Group)>,
    keys: Vec<(String, SettingValue)>,
    sources: Vec<(String, Source)>,
    table_array: bool,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups && self.keys == other.keys
    }
}

/// Split a `/` separated path, ignoring empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Store name for a name read from a file.
///
/// `%` and `/` are percent-encoded so the name stays one path segment, and
/// the empty name becomes a lone `%`.
pub fn escape_name(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_name`]. Unknown `%` sequences are kept as they are.
pub fn unescape_name(name: &str) -> String {
    if name == "%" {
        return String::new();
    }
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        match tail.get(..3) {
            Some("%2F" | "%2f") => out.push('/'),
            Some("%25") => out.push('%'),
            _ => {
                out.push('%');
                rest = &tail[1..];
                continue;
            }
        }
        rest = &tail[3..];
    }
    out.push_str(rest);
    out
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the direct child groups in insertion order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Names of the direct keys in insertion order.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(name, _)| name.as_str())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(name, g)| (name.as_str(), g))
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.keys.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.keys.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    /// Child group `name`, appended when missing.
    pub fn child_mut(&mut self, name: &str) -> &mut Group {
        let idx = match self.groups.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.groups.push((name.to_string(), Group::new()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx].1
    }

    /// Group reached by following `segments`.
    pub fn descend<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Group> {
        segments
            .iter()
            .try_fold(self, |group, seg| group.child(seg.as_ref()))
    }

    /// Group reached by following `segments`, creating missing levels.
    pub fn descend_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> &mut Group {
        segments
            .iter()
            .fold(self, |group, seg| group.child_mut(seg.as_ref()))
    }

    /// Direct key lookup.
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.keys.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Insert or replace a direct key, keeping its position when replaced.
    pub fn insert(&mut self, name: &str, value: SettingValue) {
        match self.keys.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.keys.push((name.to_string(), value)),
        }
    }

    /// Insert a key decoded from `source`. The source is written back as long
    /// as the key still holds the value it decodes to.
    pub fn insert_with_source(&mut self, name: &str, value: SettingValue, source: Source) {
        self.insert(name, value);
        match self.sources.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = source,
            None => self.sources.push((name.to_string(), source)),
        }
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Whether this group was read from an array of tables.
    pub fn is_table_array(&self) -> bool {
        self.table_array
    }

    pub fn set_table_array(&mut self, table_array: bool) {
        self.table_array = table_array;
    }

    /// Insert a group subtree, replacing any group of the same name.
    pub fn insert_group(&mut self, name: &str, group: Group) {
        *self.child_mut(name) = group;
    }

    /// Value at a `/` separated path relative to this group.
    pub fn value(&self, path: &str) -> Option<&SettingValue> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;
        self.descend(parents)?.get(last)
    }

    /// Store `value` at a `/` separated path, creating intermediate groups.
    /// Returns `false` when the path is empty.
    pub fn set_value(&mut self, path: &str, value: SettingValue) -> bool {
        let segments = split_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };
        self.descend_mut(parents).insert(last, value);
        true
    }

    /// Remove the key and the group named by `path`. An empty path clears
    /// this group. Returns whether anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let segments = split_path(path);
        let Some((last, parents)) = segments.split_last() else {
            let changed = !self.is_empty();
            self.groups.clear();
            self.keys.clear();
            self.sources.clear();
            return changed;
        };
        let Some(parent) = self.descend_mut_existing(parents) else {
            return false;
        };
        let before = parent.groups.len() + parent.keys.len();
        parent.groups.retain(|(n, _)| n != last);
        parent.keys.retain(|(n, _)| n != last);
        parent.sources.retain(|(n, _)| n != last);
        before != parent.groups.len() + parent.keys.len()
    }

    fn descend_mut_existing<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut Group> {
        let mut group = self;
        for seg in segments {
            group = group
                .groups
                .iter_mut()
                .find(|(n, _)| n == seg.as_ref())
                .map(|(_, g)| g)?;
        }
        Some(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut root = Group::new();
        root.set_value("b/x", 1.into());
        root.set_value("a/y", 2.into());
        root.set_value("z", "last".into());
        root.set_value("b/x", 3.into());

        assert_eq!(root.group_names().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(root.key_names().collect::<Vec<_>>(), ["z"]);
        assert_eq!(root.value("b/x"), Some(&SettingValue::Int(3)));
        assert_eq!(root.value("/a//y"), Some(&SettingValue::Int(2)));
    }

    #[test]
    fn key_and_group_may_share_a_name() {
        let mut root = Group::new();
        root.set_value("z", true.into());
        root.set_value("z/inner", 1.into());

        assert_eq!(root.value("z"), Some(&SettingValue::Bool(true)));
        assert_eq!(root.value("z/inner"), Some(&SettingValue::Int(1)));

        assert!(root.remove("z"));
        assert!(root.is_empty());
        assert!(!root.remove("z"));
    }

    #[test]
    fn file_names_stay_one_segment() {
        for name in ["a/b", "", "50%", "%2F", "/", "plain", "ü/%"] {
            let escaped = escape_name(name);
            assert_eq!(split_path(&escaped), [escaped.as_str()], "{name:?}");
            assert_eq!(unescape_name(&escaped), name);
        }
        assert_eq!(escape_name("a/b"), "a%2Fb");
        assert_eq!(unescape_name("100%x"), "100%x");

        let mut root = Group::new();
        root.set_value(&escape_name("a/b"), 1.into());
        assert_eq!(root.key_names().collect::<Vec<_>>(), ["a%2Fb"]);
        assert_eq!(root.value("a%2Fb"), Some(&SettingValue::Int(1)));
        assert!(root.group_names().next().is_none());
    }

    #[test]
    fn sources_follow_their_key() {
        let mut root = Group::new();
        let source = Source::Json(serde_json::json!(7));
        root.insert_with_source("n", 7.into(), source.clone());
        root.insert("n", 8.into());
        assert_eq!(root.source("n"), Some(&source));

        let mut plain = Group::new();
        plain.insert("n", 8.into());
        assert_eq!(root, plain);

        assert!(root.remove("n"));
        assert_eq!(root.source("n"), None);
    }

    #[test]
    fn remove_missing_parent_is_noop() {
        let mut root = Group::new();
        root.set_value("a/b", 1.into());
        assert!(!root.remove("missing/b"));
        assert!(root.remove("a/b"));
        assert_eq!(root.group_names().collect::<Vec<_>>(), ["a"]);
    }
}
