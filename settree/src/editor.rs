//! The settings view controller.
//!
//! [`SettingsTree`] ties a display tree to a shared settings store. It decides
//! when the tree is refreshed (manually, on a timer, or when the window is
//! activated), suppresses refreshes while a value is being edited, and writes
//! committed edits back to the store.
//!
//! Refresh scheduling is an explicit state machine:
//!
//! ```text
//!            begin_edit                 refresh()
//!   Idle  ---------------> Editing     Idle ---> Refreshing ---> Idle
//!    ^                        |
//!    +-- commit / cancel -----+
//! ```
//!
//! Timer ticks and activation events are ignored while editing, and a
//! refresh never writes to the store.

use std::time::Duration;

use crate::{
    error::{Result, SettingsError},
    store::SettingsHandle,
    sync::{SyncOptions, SyncStats, show_value, synchronize},
    tree::DisplayTree,
    value::{SettingValue, parse_edit},
};

/// Period of the auto-refresh timer.
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Where the controller is in its refresh/edit cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    /// A value editor is open on the node at this label path.
    Editing(Vec<String>),
    Refreshing,
}

/// External triggers for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The auto-refresh timer fired.
    TimerTick,
    /// The host window became active.
    WindowActivated,
    /// The user asked for a refresh.
    ManualRefresh,
}

/// Why a refresh did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Detached,
    Editing,
    AutoRefreshOff,
}

/// Result of a refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(SyncStats),
    Skipped(SkipReason),
}

/// Display tree bound to a settings store.
#[derive(Default)]
pub struct SettingsTree {
    settings: Option<SettingsHandle>,
    tree: DisplayTree,
    state: RefreshState,
    auto_refresh: bool,
    timer_active: bool,
    options: SyncOptions,
    last_sync_error: Option<String>,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a store, or detach with `None`.
    ///
    /// The tree is rebuilt from scratch for the new store.
    pub fn set_settings_object(&mut self, settings: Option<SettingsHandle>) {
        self.tree.clear();
        self.state = RefreshState::Idle;
        self.last_sync_error = None;
        self.settings = settings;
        if self.settings.is_some() {
            self.refresh();
            self.timer_active = self.auto_refresh;
        } else {
            self.timer_active = false;
        }
    }

    pub fn settings(&self) -> Option<&SettingsHandle> {
        self.settings.as_ref()
    }

    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DisplayTree {
        &mut self.tree
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, RefreshState::Editing(_))
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Whether the host should be running the auto-refresh timer.
    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    /// Error reported by the last store sync, if it failed.
    pub fn last_sync_error(&self) -> Option<&str> {
        self.last_sync_error.as_deref()
    }

    pub fn is_writable(&self) -> bool {
        self.settings
            .as_ref()
            .is_some_and(|s| s.borrow().is_writable())
    }

    pub fn fallbacks_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .is_some_and(|s| s.borrow().fallbacks_enabled())
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync the store and bring the tree up to date.
    ///
    /// An edit in progress is abandoned. Store sync failures are logged and
    /// kept in [`last_sync_error`](Self::last_sync_error); the tree is still
    /// refreshed from the store's cached state.
    pub fn refresh(&mut self) -> RefreshOutcome {
        let Some(settings) = self.settings.clone() else {
            return RefreshOutcome::Skipped(SkipReason::Detached);
        };
        if let RefreshState::Editing(path) = &self.state {
            debug!("refresh abandons edit of {}", path.join("/"));
        }
        self.state = RefreshState::Refreshing;

        let mut store = settings.borrow_mut();
        self.last_sync_error = match store.sync() {
            Ok(()) => None,
            Err(e) => {
                warn!("failed to sync {}: {e}", store.location());
                Some(e.to_string())
            }
        };
        let stats = synchronize(&mut *store, &mut self.tree.roots, &self.options);
        drop(store);

        self.state = RefreshState::Idle;
        debug!("refreshed settings tree: {stats:?}");
        RefreshOutcome::Refreshed(stats)
    }

    /// Refresh unless a value is being edited.
    pub fn maybe_refresh(&mut self) -> RefreshOutcome {
        if self.is_editing() {
            return RefreshOutcome::Skipped(SkipReason::Editing);
        }
        self.refresh()
    }

    /// React to a refresh trigger.
    pub fn handle(&mut self, event: RefreshEvent) -> RefreshOutcome {
        match event {
            RefreshEvent::TimerTick if !self.timer_active => {
                RefreshOutcome::Skipped(SkipReason::AutoRefreshOff)
            }
            RefreshEvent::WindowActivated if !self.auto_refresh => {
                RefreshOutcome::Skipped(SkipReason::AutoRefreshOff)
            }
            _ => self.maybe_refresh(),
        }
    }

    pub fn set_auto_refresh(&mut self, auto_refresh: bool) {
        self.auto_refresh = auto_refresh;
        if self.settings.is_none() {
            return;
        }
        if auto_refresh {
            self.maybe_refresh();
            self.timer_active = true;
        } else {
            self.timer_active = false;
        }
    }

    /// Switch fallback lookups on the store and refresh.
    pub fn set_fallbacks_enabled(&mut self, enabled: bool) {
        if let Some(settings) = &self.settings {
            settings.borrow_mut().set_fallbacks_enabled(enabled);
            self.refresh();
        }
    }

    /// Change value presentation and refresh.
    pub fn set_options(&mut self, options: SyncOptions) {
        if self.options != options {
            self.options = options;
            self.maybe_refresh();
        }
    }

    /// Fully qualified store key of the node at `path`.
    pub fn key_path<S: AsRef<str>>(path: &[S]) -> String {
        path.iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Open an editor on the node at `path` and return its current value.
    ///
    /// # Errors
    ///
    /// [`SettingsError::NotFound`] if there is no such node and
    /// [`SettingsError::NotEditable`] if it holds no value of an editable
    /// type.
    pub fn begin_edit<S: AsRef<str>>(&mut self, path: &[S]) -> Result<SettingValue> {
        let key = Self::key_path(path);
        let node = self
            .tree
            .find(path)
            .ok_or_else(|| SettingsError::NotFound(key.clone()))?;
        let value = match &node.value {
            Some(v) if v.kind().is_editable() => v.clone(),
            _ => return Err(SettingsError::NotEditable(key)),
        };
        self.state = RefreshState::Editing(path.iter().map(|s| s.as_ref().to_string()).collect());
        Ok(value)
    }

    pub fn cancel_edit(&mut self) {
        if self.is_editing() {
            self.state = RefreshState::Idle;
        }
    }

    /// Validate `text`, write it to the store and close the editor.
    ///
    /// Text rejected by the type's validator keeps the editor open. A failed
    /// store write closes it.
    pub fn commit_edit(&mut self, text: &str) -> Result<SettingValue> {
        let RefreshState::Editing(path) = &self.state else {
            return Err(SettingsError::NoEditInProgress);
        };
        let owned = path.clone();
        let path = owned.as_slice();
        let key = Self::key_path(path);

        let Some(kind) = self
            .tree
            .find(path)
            .and_then(|n| n.value.as_ref())
            .map(SettingValue::kind)
        else {
            self.state = RefreshState::Idle;
            return Err(SettingsError::NotFound(key));
        };
        let value = parse_edit(kind, text)?;

        let Some(settings) = self.settings.clone() else {
            self.state = RefreshState::Idle;
            return Err(SettingsError::NotFound(key));
        };
        self.state = RefreshState::Idle;
        settings.borrow_mut().set_value(&key, value.clone())?;
        info!("set {key} = {value}");

        if let Some(node) = self.tree.find_mut(path) {
            show_value(node, value.clone(), &self.options);
        }
        if self.auto_refresh {
            self.refresh();
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SettingsStore, handle};

    fn attached(store: MemoryStore) -> SettingsTree {
        let mut tree = SettingsTree::new();
        tree.set_settings_object(Some(handle(store)));
        tree
    }

    #[test]
    fn attach_builds_and_detach_clears() {
        let mut tree = attached(MemoryStore::default().with("a", 1));
        assert_eq!(tree.tree().labels(), ["a"]);
        assert!(!tree.timer_active());

        tree.set_settings_object(None);
        assert!(tree.tree().is_empty());
        assert_eq!(
            tree.refresh(),
            RefreshOutcome::Skipped(SkipReason::Detached)
        );
    }

    #[test]
    fn timer_follows_auto_refresh() {
        let mut tree = SettingsTree::new();
        tree.set_auto_refresh(true);
        assert!(!tree.timer_active());

        tree.set_settings_object(Some(handle(MemoryStore::default())));
        assert!(tree.timer_active());
        assert!(matches!(
            tree.handle(RefreshEvent::TimerTick),
            RefreshOutcome::Refreshed(_)
        ));

        tree.set_auto_refresh(false);
        assert_eq!(
            tree.handle(RefreshEvent::TimerTick),
            RefreshOutcome::Skipped(SkipReason::AutoRefreshOff)
        );
        assert_eq!(
            tree.handle(RefreshEvent::WindowActivated),
            RefreshOutcome::Skipped(SkipReason::AutoRefreshOff)
        );
        assert!(matches!(
            tree.handle(RefreshEvent::ManualRefresh),
            RefreshOutcome::Refreshed(_)
        ));
    }

    #[test]
    fn editing_suppresses_automatic_refresh() {
        let mut tree = attached(MemoryStore::default().with("a", 1));
        tree.set_auto_refresh(true);

        tree.begin_edit(&["a"]).unwrap();
        assert!(tree.is_editing());
        for event in [
            RefreshEvent::TimerTick,
            RefreshEvent::WindowActivated,
            RefreshEvent::ManualRefresh,
        ] {
            assert_eq!(
                tree.handle(event),
                RefreshOutcome::Skipped(SkipReason::Editing)
            );
        }

        tree.cancel_edit();
        assert_eq!(tree.state(), &RefreshState::Idle);
        assert!(matches!(
            tree.handle(RefreshEvent::TimerTick),
            RefreshOutcome::Refreshed(_)
        ));
    }

    #[test]
    fn commit_writes_fully_qualified_key() {
        let store = handle(MemoryStore::default().with("net/proxy/port", 8080));
        let mut tree = SettingsTree::new();
        tree.set_settings_object(Some(store.clone()));

        let path = ["net", "proxy", "port"];
        assert_eq!(tree.begin_edit(&path).unwrap(), SettingValue::Int(8080));
        tree.commit_edit("3128").unwrap();

        assert_eq!(
            store.borrow().value("net/proxy/port"),
            Some(SettingValue::Int(3128))
        );
        assert_eq!(tree.tree().find(&path).unwrap().value_text, "3128");
        assert_eq!(tree.state(), &RefreshState::Idle);
    }

    #[test]
    fn guessed_strings_are_edited_as_strings() {
        let store = handle(MemoryStore::default().with("port", "80"));
        let mut tree = SettingsTree::new();
        tree.set_options(SyncOptions {
            guess_string_types: true,
        });
        tree.set_settings_object(Some(store.clone()));
        assert_eq!(tree.tree().find(&["port"]).unwrap().type_text, "int");

        assert_eq!(
            tree.begin_edit(&["port"]).unwrap(),
            SettingValue::String("80".into())
        );
        tree.commit_edit("81").unwrap();

        assert_eq!(
            store.borrow().value("port"),
            Some(SettingValue::String("81".into()))
        );
        let node = tree.tree().find(&["port"]).unwrap();
        assert_eq!(node.type_text, "int");
        assert_eq!(node.value_text, "81");
    }

    #[test]
    fn rejected_text_keeps_editor_open() {
        let store = handle(MemoryStore::default().with("n", 1));
        let mut tree = SettingsTree::new();
        tree.set_settings_object(Some(store.clone()));

        tree.begin_edit(&["n"]).unwrap();
        assert!(matches!(
            tree.commit_edit("one"),
            Err(SettingsError::InvalidInput { .. })
        ));
        assert!(tree.is_editing());
        assert_eq!(store.borrow().value("n"), Some(SettingValue::Int(1)));
    }

    #[test]
    fn groups_and_invalid_values_are_not_editable() {
        let mut tree = attached(
            MemoryStore::default()
                .with("g/k", 1)
                .with("nothing", SettingValue::Invalid),
        );
        assert!(matches!(
            tree.begin_edit(&["g"]),
            Err(SettingsError::NotEditable(_))
        ));
        assert!(matches!(
            tree.begin_edit(&["nothing"]),
            Err(SettingsError::NotEditable(_))
        ));
        assert!(matches!(
            tree.begin_edit(&["missing"]),
            Err(SettingsError::NotFound(_))
        ));
        assert!(matches!(
            tree.commit_edit("x"),
            Err(SettingsError::NoEditInProgress)
        ));
    }

    #[test]
    fn read_only_store_closes_the_editor() {
        let mut store = MemoryStore::default().with("a", 1);
        store.set_read_only(true);
        let mut tree = attached(store);
        assert!(!tree.is_writable());

        tree.begin_edit(&["a"]).unwrap();
        assert!(matches!(
            tree.commit_edit("2"),
            Err(SettingsError::ReadOnly(_))
        ));
        assert!(!tree.is_editing());
    }

    #[test]
    fn fallbacks_toggle_reaches_the_store() {
        let mut tree = attached(MemoryStore::default());
        assert!(!tree.fallbacks_enabled());
        tree.set_fallbacks_enabled(true);
        assert!(tree.fallbacks_enabled());
    }
}
