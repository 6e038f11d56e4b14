//! # settings-editor
//!
//! Terminal browser and editor for hierarchical settings.
//!
//! Opens a TOML/JSON settings file or the settings of an
//! organization/application pair and shows them as an expandable tree with
//! type and value columns. Values can be edited in place, and the view can
//! refresh itself periodically or whenever the terminal regains focus.
//!
//! ## Modules
//!
//! - [`cli`] - Command line arguments and store selection
//! - [`app`] - Application state and key handling
//! - [`ui`] - Frame rendering
//! - [`term`] - Terminal setup and the event loop
//! - [`dump`] - Non-interactive tree printing

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

/// Application state and key handling.
pub mod app;

/// Command line arguments.
pub mod cli;

pub mod dump;

/// Terminal setup, teardown and the event loop.
pub mod term;

pub mod ui;
