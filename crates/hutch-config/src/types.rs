//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [paths]
//! data_dir = "/var/lib/hutch"
//!
//! [session]
//! dirname = "sessions"
//! keyname = "PHPSESSID"
//! max_age = 1440
//! gc_numerator = 1
//! gc_divisor = 100
//! cookie_path = "/"
//!
//! [logging]
//! dir = "/var/log/hutch"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default storage directory name, relative to the data directory.
pub const DEFAULT_DIRNAME: &str = "sessions";

/// Default cookie name, following the common session-cookie convention.
pub const DEFAULT_KEYNAME: &str = "PHPSESSID";

/// Default session lifetime in seconds.
pub const DEFAULT_MAX_AGE: u64 = 1440;

/// Bounds applied to a configured `max_age`.
pub const MIN_MAX_AGE: u64 = 60;
pub const MAX_MAX_AGE: u64 = 7200;

/// Default GC odds: `DEFAULT_GC_NUMERATOR / DEFAULT_GC_DIVISOR`.
pub const DEFAULT_GC_NUMERATOR: i64 = 1;
pub const DEFAULT_GC_DIVISOR: i64 = 100;

/// Default cookie path.
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HUTCH_DATA_DIR";

const APP_NAME: &str = "hutch";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HutchConfig {
    /// Session storage configuration.
    pub session: Option<SessionSection>,

    /// Path configuration.
    pub paths: Option<PathsSection>,

    /// Log output configuration.
    pub logging: Option<LoggingSection>,
}

impl HutchConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections merge field by field, so an override file only needs to
    /// name the values it changes.
    pub fn merge(&mut self, other: HutchConfig) {
        if let Some(session) = other.session {
            match self.session.as_mut() {
                Some(current) => current.merge(session),
                None => self.session = Some(session),
            }
        }

        if let Some(paths) = other.paths {
            match self.paths.as_mut() {
                Some(current) => {
                    if paths.data_dir.is_some() {
                        current.data_dir = paths.data_dir;
                    }
                }
                None => self.paths = Some(paths),
            }
        }

        if let Some(logging) = other.logging {
            match self.logging.as_mut() {
                Some(current) => {
                    if logging.dir.is_some() {
                        current.dir = logging.dir;
                    }
                }
                None => self.logging = Some(logging),
            }
        }
    }

    /// The `[session]` section, or defaults when absent.
    pub fn session_or_default(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Effective data directory (see [`PathsSection::effective_data_dir`]).
    pub fn data_dir(&self) -> PathBuf {
        self.paths.clone().unwrap_or_default().effective_data_dir()
    }

    /// Directory for the JSON log file, if configured.
    pub fn log_dir(&self) -> Option<&Path> {
        self.logging.as_ref().and_then(|l| l.dir.as_deref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// The `[session]` section.
///
/// Raw values are kept as written; the `effective_*` accessors apply
/// defaults and clamping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Storage directory, relative to the data directory unless absolute.
    pub dirname: Option<String>,

    /// Cookie name carrying the session identifier.
    pub keyname: Option<String>,

    /// Session lifetime in seconds.
    pub max_age: Option<i64>,

    /// Explicit GC probability in `0.0..=1.0`.
    pub gc_probability: Option<f64>,

    /// Numerator of the fallback GC odds.
    #[serde(alias = "gc_probability_numerator")]
    pub gc_numerator: Option<i64>,

    /// Divisor of the fallback GC odds.
    pub gc_divisor: Option<i64>,

    /// Path attribute of the emitted session cookie.
    pub cookie_path: Option<String>,
}

impl SessionSection {
    fn merge(&mut self, other: SessionSection) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            dirname,
            keyname,
            max_age,
            gc_probability,
            gc_numerator,
            gc_divisor,
            cookie_path
        );
    }

    pub fn effective_dirname(&self) -> &str {
        match self.dirname.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => DEFAULT_DIRNAME,
        }
    }

    /// Cookie name; empty falls back to [`DEFAULT_KEYNAME`].
    pub fn effective_keyname(&self) -> &str {
        match self.keyname.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => DEFAULT_KEYNAME,
        }
    }

    /// Lifetime in seconds, clamped to `MIN_MAX_AGE..=MAX_MAX_AGE`.
    pub fn effective_max_age(&self) -> u64 {
        match self.max_age {
            Some(secs) => secs.clamp(MIN_MAX_AGE as i64, MAX_MAX_AGE as i64) as u64,
            None => DEFAULT_MAX_AGE,
        }
    }

    /// GC probability in `0.0..=1.0`.
    ///
    /// An explicit `gc_probability` wins. Otherwise the odds are
    /// `gc_numerator / gc_divisor`, and 0.0 if either is non-positive.
    pub fn effective_gc_probability(&self) -> f64 {
        let p = match self.gc_probability {
            Some(p) if !p.is_nan() => p,
            _ => {
                let numerator = self.gc_numerator.unwrap_or(DEFAULT_GC_NUMERATOR);
                let divisor = self.gc_divisor.unwrap_or(DEFAULT_GC_DIVISOR);
                if numerator > 0 && divisor > 0 {
                    numerator as f64 / divisor as f64
                } else {
                    0.0
                }
            }
        };
        p.clamp(0.0, 1.0)
    }

    pub fn effective_cookie_path(&self) -> &str {
        match self.cookie_path.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_COOKIE_PATH,
        }
    }

    /// Resolve the storage directory against `data_dir`.
    pub fn storage_dir(&self, data_dir: &Path) -> PathBuf {
        let dirname = Path::new(self.effective_dirname());
        if dirname.is_absolute() {
            dirname.to_path_buf()
        } else {
            data_dir.join(dirname)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paths / Logging
// ─────────────────────────────────────────────────────────────────────────────

/// The `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Base directory for persisted data.
    pub data_dir: Option<PathBuf>,
}

impl PathsSection {
    /// Resolution order:
    /// 1. `HUTCH_DATA_DIR` environment variable
    /// 2. Configured `data_dir`
    /// 3. Platform data directory + `hutch`
    /// 4. `./data`
    pub fn effective_data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }

        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_NAME))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for the daily-rolling JSON log file.
    pub dir: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
