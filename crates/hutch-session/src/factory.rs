//! Build a file-backed [`SessionStorage`] from the `[session]` config section.

use std::fs;
use std::path::Path;
use std::time::Duration;

use hutch_config::SessionSection;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::file_container::FileSessionContainer;
use crate::storage::SessionStorage;

/// Create the storage directory if needed and wire up a storage over it.
///
/// `data_dir` anchors a relative `dirname`.
pub fn storage_from_config(
    section: &SessionSection,
    data_dir: &Path,
) -> Result<SessionStorage<FileSessionContainer>> {
    let dir = section.storage_dir(data_dir);
    if !dir.is_dir() {
        fs::create_dir_all(&dir).map_err(|source| Error::Io {
            path: dir.clone(),
            source,
        })?;
        info!(dir = %dir.display(), "Created session directory");
    }

    let config = StorageConfig::new(section.effective_keyname())
        .with_max_age(Duration::from_secs(section.effective_max_age()))
        .with_gc_probability(section.effective_gc_probability());
    debug!(
        dir = %dir.display(),
        key = %config.key,
        max_age_secs = config.max_age.as_secs(),
        gc_probability = config.gc_probability,
        "Session storage configured"
    );

    SessionStorage::new(FileSessionContainer::new(dir)?, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_create_directory() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_from_config(&SessionSection::default(), tmp.path()).unwrap();

        assert_eq!(storage.container().dir(), tmp.path().join("sessions"));
        assert!(tmp.path().join("sessions").is_dir());
        assert_eq!(storage.key(), "PHPSESSID");
        assert_eq!(storage.max_age(), Duration::from_secs(1440));
        assert_eq!(storage.gc_probability(), 0.01);
    }

    #[test]
    fn test_explicit_values_and_clamping() {
        let tmp = TempDir::new().unwrap();
        let section = SessionSection {
            dirname: Some("nested/store".into()),
            keyname: Some("sid".into()),
            max_age: Some(99_999),
            gc_probability: Some(0.5),
            ..Default::default()
        };
        let storage = storage_from_config(&section, tmp.path()).unwrap();

        assert!(tmp.path().join("nested/store").is_dir());
        assert_eq!(storage.key(), "sid");
        assert_eq!(storage.max_age(), Duration::from_secs(7200));
        assert_eq!(storage.gc_probability(), 0.5);
    }

    #[test]
    fn test_absolute_dirname_ignores_data_dir() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let section = SessionSection {
            dirname: Some(elsewhere.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        let storage = storage_from_config(&section, tmp.path()).unwrap();
        assert_eq!(storage.container().dir(), elsewhere.path());
    }

    #[test]
    fn test_invalid_keyname_rejected() {
        let tmp = TempDir::new().unwrap();
        let section = SessionSection {
            keyname: Some("bad key".into()),
            ..Default::default()
        };
        let err = storage_from_config(&section, tmp.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_uncreatable_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "").unwrap();
        let section = SessionSection {
            dirname: Some("file/sessions".into()),
            ..Default::default()
        };
        let err = storage_from_config(&section, tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
