//! # settree
//!
//! Hierarchical settings stores mirrored into a display tree.
//!
//! `settree` reads a tree of groups and typed keys from a settings store and
//! keeps an ordered display tree in step with it. Refreshes are incremental:
//! existing nodes are reused by name, so expansion and selection survive, and
//! an unchanged store leaves the tree untouched.
//!
//! ## Features
//!
//! - **Stores**: in-memory, single TOML/JSON file, and organization/application
//!   settings with user and system fallback layers
//! - **Typed values**: booleans, numbers, strings, string lists, colors,
//!   dates, geometry, with per-type edit validation
//! - **Refresh control**: manual refresh, an auto-refresh timer and window
//!   activation, all suppressed while a value is being edited
//!
//! ## Modules
//!
//! - [`store`] - Settings stores and the store trait
//! - [`value`] - Typed setting values, formatting and edit parsing
//! - [`tree`] - Display tree nodes
//! - [`sync`] - Incremental tree synchronization
//! - [`editor`] - Refresh and edit controller
//! - [`error`] - Error type
//!
//! ## Example
//!
//! ```rust
//! use settree::{SettingsTree, store::{MemoryStore, handle}};
//!
//! let store = MemoryStore::default()
//!     .with("window/width", 800)
//!     .with("title", "demo");
//!
//! let mut tree = SettingsTree::new();
//! tree.set_settings_object(Some(handle(store)));
//! assert_eq!(tree.tree().labels(), ["window", "title"]);
//! ```

#[macro_use]
extern crate log;

/// Refresh and edit controller.
///
/// Decides when the display tree is resynchronized and writes committed
/// edits back to the store.
pub mod editor;

pub mod error;

/// Settings stores.
pub mod store;

/// Incremental synchronization of the display tree with a store.
pub mod sync;

pub mod tree;

/// Typed setting values.
pub mod value;

pub use editor::{
    AUTO_REFRESH_INTERVAL, RefreshEvent, RefreshOutcome, RefreshState, SettingsTree, SkipReason,
};
pub use error::{Result, SettingsError};
pub use store::{SettingsHandle, SettingsStore};
pub use sync::{SyncOptions, SyncStats, synchronize};
pub use tree::{DisplayTree, Node, NodeKind, Row};
pub use value::{Color, SettingValue, ValueKind};
