use std::{fs::File, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use settree::{
    SettingsHandle, SettingsTree, SyncOptions,
    store::{FileStore, Format, Scope, ScopedStore, handle},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    User,
    System,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::User => Scope::User,
            ScopeArg::System => Scope::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Toml,
    Json,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Toml => Format::Toml,
            FormatArg::Json => Format::Json,
        }
    }
}

/// Browse and edit hierarchical settings.
#[derive(Debug, Parser)]
#[command(name = "settings-editor", version, about)]
pub struct Cli {
    /// Settings file to open (.toml or .json)
    #[arg(conflicts_with = "organization")]
    pub file: Option<PathBuf>,

    /// Organization whose settings to open
    #[arg(short = 'O', long)]
    pub organization: Option<String>,

    /// Application within the organization
    #[arg(short = 'A', long, requires = "organization")]
    pub application: Option<String>,

    /// Settings scope for --organization
    #[arg(long, value_enum, default_value_t = ScopeArg::User)]
    pub scope: ScopeArg,

    /// File format for --organization
    #[arg(long, value_enum, default_value_t = FormatArg::Toml)]
    pub format: FormatArg,

    /// Read organization-wide and system-wide fallbacks (default)
    #[arg(long, overrides_with = "no_fallbacks")]
    pub fallbacks: bool,

    /// Only read the most specific settings file
    #[arg(long, overrides_with = "fallbacks")]
    pub no_fallbacks: bool,

    /// Refresh every two seconds and when the terminal regains focus
    #[arg(short, long)]
    pub auto_refresh: bool,

    /// Show strings that look like booleans or integers as those types
    #[arg(short, long)]
    pub guess_types: bool,

    /// Print the settings tree and exit
    #[arg(short, long)]
    pub dump: bool,

    /// With --dump, print JSON instead of a tree
    #[arg(long, requires = "dump")]
    pub json: bool,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn fallbacks_enabled(&self) -> bool {
        !self.no_fallbacks
    }

    /// Open the store named on the command line, if any.
    pub fn open_store(&self) -> anyhow::Result<Option<SettingsHandle>> {
        if let Some(path) = &self.file {
            let store = FileStore::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            return Ok(Some(handle(store)));
        }
        if let Some(org) = &self.organization {
            let store = ScopedStore::open(
                self.scope.into(),
                org,
                self.application.as_deref(),
                self.format.into(),
            )
            .with_context(|| format!("failed to open settings of {org}"))?;
            return Ok(Some(handle(store)));
        }
        Ok(None)
    }

    /// Settings tree configured from the flags and attached to the store.
    pub fn build_tree(&self) -> anyhow::Result<SettingsTree> {
        let settings = self.open_store()?;
        if self.dump && settings.is_none() {
            bail!("--dump needs a FILE or --organization");
        }
        if let Some(settings) = &settings {
            settings
                .borrow_mut()
                .set_fallbacks_enabled(self.fallbacks_enabled());
        }

        let mut tree = SettingsTree::new();
        tree.set_options(SyncOptions {
            guess_string_types: self.guess_types,
        });
        tree.set_auto_refresh(self.auto_refresh);
        tree.set_settings_object(settings);
        Ok(tree)
    }

    pub fn init_logging(&self) -> anyhow::Result<()> {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        if let Some(path) = &self.log_file {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        builder.init();
        Ok(())
    }
}
