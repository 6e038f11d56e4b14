//! Settings persisted in a single TOML or JSON file.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::{
    error::{Result, SettingsError},
    store::{Format, GroupStack, SettingsStore, codec, document::Group},
    value::SettingValue,
};

/// A settings file loaded into memory.
///
/// Writes are kept in memory until [`SettingsStore::sync`], which writes the
/// whole document back when it changed and otherwise reloads the file if it
/// was modified on disk since the last load.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    format: Format,
    root: Group,
    scope: GroupStack,
    dirty: bool,
    modified: Option<SystemTime>,
    writable: bool,
}

impl FileStore {
    /// Open `path`, with the format taken from its extension.
    ///
    /// A missing file is an empty store that is created on the first
    /// successful sync after a write.
    ///
    /// # Errors
    ///
    /// Fails on unsupported extensions, unreadable files and malformed
    /// content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        Self::open_with_format(path, format)
    }

    /// Open `path` with an explicit format.
    pub fn open_with_format(path: impl AsRef<Path>, format: Format) -> Result<Self> {
        let mut store = FileStore {
            path: path.as_ref().to_path_buf(),
            format,
            root: Group::new(),
            scope: GroupStack::default(),
            dirty: false,
            modified: None,
            writable: true,
        };
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Parsed content, including writes not yet flushed.
    pub fn document(&self) -> &Group {
        &self.root
    }

    /// Whether there are writes not yet flushed to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn reload(&mut self) -> Result<()> {
        self.writable = probe_writable(&self.path);
        if !self.path.exists() {
            self.root = Group::new();
            self.modified = None;
            return Ok(());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| SettingsError::io(&self.path, e))?;
        self.root = codec::parse(self.format, &content)?;
        self.modified = modified_time(&self.path);
        debug!("loaded settings from {}", self.path.display());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
            }
        }
        let content = codec::render(self.format, &self.root)?;
        fs::write(&self.path, content).map_err(|e| SettingsError::io(&self.path, e))?;
        self.dirty = false;
        self.modified = modified_time(&self.path);
        info!("saved settings to {}", self.path.display());
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(SettingsError::ReadOnly(self.path.display().to_string()))
        }
    }

    fn current(&self) -> Option<&Group> {
        self.root.descend(self.scope.segments())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// An existing file is writable unless marked read only. A missing file is
/// writable when its nearest existing ancestor directory is.
fn probe_writable(path: &Path) -> bool {
    if let Ok(meta) = fs::metadata(path) {
        return !meta.permissions().readonly();
    }
    let mut dir = path.parent();
    while let Some(d) = dir {
        let probe = if d.as_os_str().is_empty() {
            Path::new(".")
        } else {
            d
        };
        if let Ok(meta) = fs::metadata(probe) {
            return meta.is_dir() && !meta.permissions().readonly();
        }
        dir = d.parent();
    }
    false
}

impl SettingsStore for FileStore {
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
        self.check_writable()?;
        let full = self.scope.qualify(key);
        if !self.root.set_value(&full, value) {
            return Err(SettingsError::NotFound(full));
        }
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        let full = self.scope.qualify(key);
        if self.root.remove(&full) {
            self.dirty = true;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        if self.dirty {
            if self.writable {
                return self.flush();
            }
            warn!(
                "dropping unsaved changes to read-only {}",
                self.path.display()
            );
            self.dirty = false;
        }
        let on_disk = modified_time(&self.path);
        if on_disk != self.modified {
            self.reload()?;
        } else {
            self.writable = probe_writable(&self.path);
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_flushed_on_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.toml");
        let mut store = FileStore::open(&path).unwrap();
        assert!(store.child_keys().is_empty());
        assert!(store.is_writable());

        store.set_value("editor/font", "mono".into()).unwrap();
        assert!(store.is_dirty());
        assert!(!path.exists());

        store.sync().unwrap();
        assert!(!store.is_dirty());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[editor]"));

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.value("editor/font"),
            Some(SettingValue::String("mono".into()))
        );
    }

    #[test]
    fn sync_picks_up_external_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, r#"{ "a": 1 }"#).unwrap();
        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.value("a"), Some(SettingValue::Int(1)));

        fs::write(&path, r#"{ "a": 2, "b": { "c": true } }"#).unwrap();
        // Force a different timestamp even on coarse file systems.
        store.modified = None;
        store.sync().unwrap();

        assert_eq!(store.value("a"), Some(SettingValue::Int(2)));
        assert_eq!(store.child_groups(), ["b"]);
    }

    #[test]
    fn read_only_file_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.toml");
        fs::write(&path, "a = 1\n").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert!(!store.is_writable());
        assert!(matches!(
            store.set_value("a", 2.into()),
            Err(SettingsError::ReadOnly(_))
        ));
    }

    #[test]
    fn unsupported_extension() {
        assert!(matches!(
            FileStore::open("settings.ini"),
            Err(SettingsError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn malformed_content_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "a = = 1").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(SettingsError::TomlDe(_))
        ));
    }
}
