//! Organization and application settings with fallback layers.
//!
//! Settings for an application are looked up in up to four files, most
//! specific first:
//!
//! 1. user scope, application file: `<user config dir>/<org>/<app>.<ext>`
//! 2. user scope, organization file: `<user config dir>/<org>.<ext>`
//! 3. system scope, application file: `<system dir>/<org>/<app>.<ext>`
//! 4. system scope, organization file: `<system dir>/<org>.<ext>`
//!
//! With fallbacks disabled only the first layer is visible. Writes always go
//! to the first layer.

use std::{
    env,
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::{
    error::{Result, SettingsError},
    store::{FileStore, Format, GroupStack, SettingsStore, document::Group},
    value::SettingValue,
};

/// Which set of locations a [`ScopedStore`] starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Per-user settings, falling back to system-wide ones.
    #[default]
    User,
    /// System-wide settings only.
    System,
}

/// Per-user configuration directory.
pub fn user_config_dir() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => {
            warn!("no home directory, using ./.config for user settings");
            PathBuf::from(".config")
        }
    }
}

/// System-wide configuration directory.
pub fn system_config_dir() -> PathBuf {
    env::var("XDG_CONFIG_DIRS")
        .ok()
        .and_then(|dirs| dirs.split(':').find(|d| !d.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/etc/xdg"))
}

/// Settings of an organization/application pair.
#[derive(Debug)]
pub struct ScopedStore {
    organization: String,
    application: Option<String>,
    scope: Scope,
    layers: Vec<FileStore>,
    fallbacks: bool,
    group: GroupStack,
}

impl ScopedStore {
    /// Open the standard locations for `organization`/`application`.
    pub fn open(
        scope: Scope,
        organization: &str,
        application: Option<&str>,
        format: Format,
    ) -> Result<Self> {
        Self::open_in(
            &user_config_dir(),
            &system_config_dir(),
            scope,
            organization,
            application,
            format,
        )
    }

    /// Open with explicit user and system directories.
    pub fn open_in(
        user_dir: &Path,
        system_dir: &Path,
        scope: Scope,
        organization: &str,
        application: Option<&str>,
        format: Format,
    ) -> Result<Self> {
        if organization.is_empty() {
            return Err(SettingsError::NotFound(
                "organization name is empty".to_string(),
            ));
        }
        let ext = format.extension();
        let dirs = match scope {
            Scope::User => vec![user_dir, system_dir],
            Scope::System => vec![system_dir],
        };

        let mut layers = Vec::new();
        for dir in dirs {
            if let Some(app) = application {
                let path = dir.join(organization).join(format!("{app}.{ext}"));
                layers.push(FileStore::open_with_format(path, format)?);
            }
            let path = dir.join(format!("{organization}.{ext}"));
            layers.push(FileStore::open_with_format(path, format)?);
        }
        debug!(
            "opened {} settings layers for {organization}/{}",
            layers.len(),
            application.unwrap_or("*")
        );

        Ok(ScopedStore {
            organization: organization.to_string(),
            application: application.map(str::to_string),
            scope,
            layers,
            fallbacks: true,
            group: GroupStack::default(),
        })
    }

    /// Files consulted for reads, most specific first.
    pub fn paths(&self) -> Vec<&Path> {
        self.visible().map(FileStore::path).collect()
    }

    fn visible(&self) -> impl Iterator<Item = &FileStore> {
        let n = if self.fallbacks { self.layers.len() } else { 1 };
        self.layers.iter().take(n)
    }

    fn current_groups(&self) -> impl Iterator<Item = &Group> {
        let segments = self.group.segments();
        self.visible()
            .filter_map(move |layer| layer.document().descend(segments))
    }

    fn primary(&mut self) -> &mut FileStore {
        &mut self.layers[0]
    }
}

fn ordered_union<'a>(lists: impl Iterator<Item = Vec<&'a str>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in lists.flatten() {
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

impl SettingsStore for ScopedStore {
    fn child_groups(&self) -> Vec<String> {
        ordered_union(self.current_groups().map(|g| g.group_names().collect()))
    }

    fn child_keys(&self) -> Vec<String> {
        ordered_union(self.current_groups().map(|g| g.key_names().collect()))
    }

    fn begin_group(&mut self, prefix: &str) {
        self.group.begin(prefix);
    }

    fn end_group(&mut self) {
        self.group.end();
    }

    fn group(&self) -> String {
        self.group.path()
    }

    fn value(&self, key: &str) -> Option<SettingValue> {
        self.current_groups()
            .find_map(|g| g.value(key))
            .cloned()
    }

    fn set_value(&mut self, key: &str, value: SettingValue) -> Result<()> {
        let full = self.group.qualify(key);
        self.primary().set_value(&full, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let full = self.group.qualify(key);
        self.primary().remove(&full)
    }

    fn sync(&mut self) -> Result<()> {
        let mut first_err = None;
        for layer in &mut self.layers {
            if let Err(e) = layer.sync() {
                warn!("failed to sync {}: {e}", layer.path().display());
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_writable(&self) -> bool {
        self.layers[0].is_writable()
    }

    fn fallbacks_enabled(&self) -> bool {
        self.fallbacks
    }

    fn set_fallbacks_enabled(&mut self, enabled: bool) {
        self.fallbacks = enabled;
    }

    fn location(&self) -> String {
        let scope = match self.scope {
            Scope::User => "user",
            Scope::System => "system",
        };
        match &self.application {
            Some(app) => format!("{}/{app} ({scope})", self.organization),
            None => format!("{} ({scope})", self.organization),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn fallbacks_merge_layers_in_order() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        write(user.path().join("acme/editor.toml"), "theme = \"dark\"\n");
        write(
            system.path().join("acme.toml"),
            "theme = \"light\"\nlicense = \"site\"\n[proxy]\nhost = \"gw\"\n",
        );

        let mut store = ScopedStore::open_in(
            user.path(),
            system.path(),
            Scope::User,
            "acme",
            Some("editor"),
            Format::Toml,
        )
        .unwrap();

        assert_eq!(store.child_keys(), ["theme", "license"]);
        assert_eq!(store.child_groups(), ["proxy"]);
        assert_eq!(
            store.value("theme"),
            Some(SettingValue::String("dark".into()))
        );

        store.set_fallbacks_enabled(false);
        assert_eq!(store.child_keys(), ["theme"]);
        assert!(store.child_groups().is_empty());
        assert_eq!(store.value("license"), None);
    }

    #[test]
    fn writes_go_to_the_most_specific_file() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        let mut store = ScopedStore::open_in(
            user.path(),
            system.path(),
            Scope::User,
            "acme",
            Some("editor"),
            Format::Json,
        )
        .unwrap();

        store.begin_group("window");
        store.set_value("width", 1024.into()).unwrap();
        store.end_group();
        store.sync().unwrap();

        let text = fs::read_to_string(user.path().join("acme/editor.json")).unwrap();
        assert!(text.contains("1024"));
        assert!(!system.path().join("acme.json").exists());
    }

    #[test]
    fn system_scope_skips_user_layers() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        let store = ScopedStore::open_in(
            user.path(),
            system.path(),
            Scope::System,
            "acme",
            None,
            Format::Toml,
        )
        .unwrap();
        assert_eq!(store.paths(), [system.path().join("acme.toml")]);
        assert_eq!(store.location(), "acme (system)");
    }
}
