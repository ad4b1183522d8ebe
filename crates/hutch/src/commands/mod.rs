//! CLI command handlers.

pub mod check;
pub mod gc;
pub mod show;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use hutch_config::HutchConfig;
use hutch_session::{FileSessionContainer, SessionStorage};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration from all layers.
    pub config: HutchConfig,
    /// Base directory that relative session dirnames resolve against.
    pub data_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Open the configured session store, creating its directory if needed.
    pub fn storage(&self) -> Result<SessionStorage<FileSessionContainer>> {
        let section = self.config.session_or_default();
        Ok(hutch_session::storage_from_config(&section, &self.data_dir)?)
    }

    /// Open the configured session directory without creating it.
    pub fn existing_container(&self) -> Result<FileSessionContainer> {
        let dir = self.config.session_or_default().storage_dir(&self.data_dir);
        Ok(FileSessionContainer::new(dir)?)
    }

    /// Configured freshness window.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.config.session_or_default().effective_max_age())
    }
}
