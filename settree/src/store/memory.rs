use crate::{
    error::{Result, SettingsError},
    store::{GroupStack, SettingsStore, document::Group},
    value::SettingValue,
};

/// Settings held only in memory.
///
/// Groups and keys are enumerated in insertion order, which makes this store
/// handy for driving the synchronizer in tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: Group,
    scope: GroupStack,
    writable: bool,
    fallbacks: bool,
    name: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Group::new(),
            scope: GroupStack::default(),
            writable: true,
            fallbacks: false,
            name: name.into(),
        }
    }

    pub fn from_document(name: impl Into<String>, root: Group) -> Self {
        Self {
            root,
            ..Self::new(name)
        }
    }

    /// Builder-style insert used to seed stores.
    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.root.set_value(key, value.into());
        self
    }

    /// Reject further writes.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.writable = !read_only;
    }

    pub fn document(&self) -> &Group {
        &self.root
    }

    fn current(&self) -> Option<&Group> {
        self.root.descend(self.scope.segments())
    }
}

impl SettingsStore for MemoryStore {
    fn child_groups(&self) -> Vec<String> {
        self.current()
            .map(|g| g.group_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn child_keys(&self) -> Vec<String> {
        self.current()
            .map(|g| g.key_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn begin_group(&mut self, prefix: &str) {
        self.scope.begin(prefix);
    }

    fn end_group(&mut self) {
        self.scope.end();
    }

    fn group(&self) -> String {
        self.scope.path()
    }

    fn value(&self, key: &str) -> Option<SettingValue> {
        self.current()?.value(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: SettingValue) -> Result<()> {
        if !self.writable {
            return Err(SettingsError::ReadOnly(self.name.clone()));
        }
        let full = self.scope.qualify(key);
        if !self.root.set_value(&full, value) {
            return Err(SettingsError::NotFound(full));
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if !self.writable {
            return Err(SettingsError::ReadOnly(self.name.clone()));
        }
        let full = self.scope.qualify(key);
        self.root.remove(&full);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn fallbacks_enabled(&self) -> bool {
        self.fallbacks
    }

    fn set_fallbacks_enabled(&mut self, enabled: bool) {
        self.fallbacks = enabled;
    }

    fn location(&self) -> String {
        self.name.clone()
    }
}
