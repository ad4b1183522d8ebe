//! Configuration system for the Hutch session store.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section (storage directory, cookie name, max-age, GC odds)
//! - A `[paths]` section for the data directory
//! - A `[logging]` section for the optional JSON log file
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
