//! Hierarchical settings backing stores.
//!
//! A store is a tree of groups and typed keys that is navigated with a group
//! scope, in the style of a settings object: `begin_group` enters a group,
//! `child_groups`/`child_keys` enumerate the current level and `value` reads
//! keys relative to it.
//!
//! - [`memory`] - In-memory store
//! - [`file`] - Single TOML or JSON file
//! - [`scoped`] - Organization/application settings with fallback layers
//! - [`codec`] - Conversion between documents and file formats

use std::{cell::RefCell, path::Path, rc::Rc};

use crate::{
    error::{Result, SettingsError},
    value::SettingValue,
};

pub mod codec;
pub mod document;
pub mod file;
pub mod memory;
pub mod scoped;

pub use document::Group;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use scoped::{Scope, ScopedStore};

/// Shared handle to a store. The display tree and its host window both hold
/// one.
pub type SettingsHandle = Rc<RefCell<dyn SettingsStore>>;

/// Wrap a store into a [`SettingsHandle`].
pub fn handle<S: SettingsStore + 'static>(store: S) -> SettingsHandle {
    Rc::new(RefCell::new(store))
}

/// Operations the display tree needs from a settings backing store.
pub trait SettingsStore {
    /// Child groups of the current scope, in the store's own order.
    fn child_groups(&self) -> Vec<String>;

    /// Keys of the current scope, in the store's own order.
    fn child_keys(&self) -> Vec<String>;

    /// Enter the group `prefix` (may contain `/`).
    fn begin_group(&mut self, prefix: &str);

    /// Leave the group entered by the matching `begin_group`.
    fn end_group(&mut self);

    /// Current scope as a `/` separated path.
    fn group(&self) -> String;

    /// Value of `key` relative to the current scope.
    fn value(&self, key: &str) -> Option<SettingValue>;

    /// Store `value` at `key` relative to the current scope.
    fn set_value(&mut self, key: &str, value: SettingValue) -> Result<()>;

    /// Remove `key` and every setting below it.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Write pending changes and pick up changes made by others.
    fn sync(&mut self) -> Result<()>;

    /// Whether writes can be persisted.
    fn is_writable(&self) -> bool;

    fn fallbacks_enabled(&self) -> bool {
        false
    }

    fn set_fallbacks_enabled(&mut self, _enabled: bool) {}

    /// Human readable name of the store, used in window titles.
    fn location(&self) -> String;
}

/// Nested group scope shared by the store implementations.
#[derive(Debug, Clone, Default)]
pub struct GroupStack {
    segments: Vec<String>,
    pushed: Vec<usize>,
}

impl GroupStack {
    pub fn begin(&mut self, prefix: &str) {
        let parts = document::split_path(prefix);
        self.pushed.push(parts.len());
        self.segments.extend(parts.into_iter().map(str::to_string));
    }

    pub fn end(&mut self) {
        match self.pushed.pop() {
            Some(n) => {
                let keep = self.segments.len() - n;
                self.segments.truncate(keep);
            }
            None => warn!("end_group called without matching begin_group"),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// `key` prefixed with the current scope.
    pub fn qualify(&self, key: &str) -> String {
        if self.segments.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.path(), key)
        }
    }
}

/// File formats a [`FileStore`] can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Format named by the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" | "tml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            _ => Err(SettingsError::UnsupportedFormat(ext)),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn group_stack_nests_multi_segment_prefixes() {
        let mut stack = GroupStack::default();
        stack.begin("a/b");
        stack.begin("c");
        assert_eq!(stack.path(), "a/b/c");
        assert_eq!(stack.qualify("k"), "a/b/c/k");
        stack.end();
        assert_eq!(stack.path(), "a/b");
        stack.end();
        assert_eq!(stack.qualify("k"), "k");
        stack.end();
        assert!(stack.segments().is_empty());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            Format::from_path(&PathBuf::from("x/app.TOML")).unwrap(),
            Format::Toml
        );
        assert_eq!(
            Format::from_path(&PathBuf::from("app.json")).unwrap(),
            Format::Json
        );
        assert!(matches!(
            Format::from_path(&PathBuf::from("app.ini")),
            Err(SettingsError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }
}
