//! File-per-session storage backend.
//!
//! Each session lives in `<dir>/sess_<id>`. The file's mtime is the
//! freshness marker: `load` sets it to the clock's "now" before reading,
//! and `save` stamps the rewritten file with the same clock.

use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use hutch_types::{SharedClock, SystemClock};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::codec;
use crate::container::{SessionContainer, max_age_delta};
use crate::error::{Error, Result};
use crate::session::validate_id;
use crate::value::Payload;

/// File name prefix of session records. Other entries in the directory are
/// never read or removed.
pub const FILE_PREFIX: &str = "sess_";

/// Number of lock stripes serializing same-identifier reads and writes.
const LOCK_STRIPES: usize = 16;

/// Session container backed by a directory of files.
pub struct FileSessionContainer {
    dir: PathBuf,
    clock: SharedClock,
    locks: [Mutex<()>; LOCK_STRIPES],
}

impl std::fmt::Debug for FileSessionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionContainer")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FileSessionContainer {
    /// Create a container on an existing directory, using the system clock.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    /// Create a container with an explicit clock.
    ///
    /// Fails with [`Error::DirectoryNotFound`] if `dir` is not a directory.
    pub fn with_clock(dir: impl Into<PathBuf>, clock: SharedClock) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::DirectoryNotFound(dir));
        }
        Ok(Self {
            dir,
            clock,
            locks: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`.
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}"))
    }

    /// Read and decode a record without touching its freshness marker.
    ///
    /// Unlike [`SessionContainer::load`], decode and I/O failures are
    /// returned. A missing record is `Ok(None)`.
    pub fn peek(&self, id: &str) -> Result<Option<Payload>> {
        if !validate_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }
        let path = self.record_path(id);
        let _guard = self.stripe(id).lock();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(Error::Io { path, source }),
        };
        Ok(Some(codec::decode(raw.trim_ascii())?))
    }

    fn stripe(&self, id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.locks[(hasher.finish() as usize) % LOCK_STRIPES]
    }

    fn modified(path: &Path) -> Option<DateTime<Utc>> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        meta.modified().ok().map(DateTime::<Utc>::from)
    }

    fn touch(&self, path: &Path) -> std::io::Result<()> {
        let now = SystemTime::from(self.clock.now());
        fs::File::options().write(true).open(path)?.set_modified(now)
    }

    /// Write through a temp file in the same directory, then rename over the
    /// record so readers never observe a partial write. The record's mtime is
    /// the clock's "now".
    fn write_record(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp_")
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o666))?;
        }
        tmp.as_file()
            .set_modified(SystemTime::from(self.clock.now()))?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SessionContainer for FileSessionContainer {
    fn contains(&self, id: &str, max_age: Duration) -> bool {
        if !validate_id(id) {
            return false;
        }
        let Some(modified) = Self::modified(&self.record_path(id)) else {
            return false;
        };
        match modified.checked_add_signed(max_age_delta(max_age)) {
            Some(deadline) => self.clock.now() <= deadline,
            None => true,
        }
    }

    fn load(&self, id: &str) -> Payload {
        if !validate_id(id) {
            return Payload::new();
        }
        let path = self.record_path(id);
        if !path.is_file() {
            return Payload::new();
        }

        let _guard = self.stripe(id).lock();
        if let Err(e) = self.touch(&path) {
            warn!(session_id = %id, error = %e, "Failed to refresh session mtime");
        }
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                error!(session_id = %id, error = %e, "Failed to read session");
                return Payload::new();
            }
        };

        match codec::decode(raw.trim_ascii()) {
            Ok(payload) => payload,
            Err(e) => {
                error!(session_id = %id, error = %e, "Failed to parse session for ID '{id}'");
                Payload::new()
            }
        }
    }

    fn save(&self, id: &str, payload: &Payload) -> Result<()> {
        if !validate_id(id) {
            error!(session_id = %id, "Refusing to save session with invalid ID");
            return Err(Error::InvalidId(id.to_string()));
        }
        let path = self.record_path(id);
        let bytes = codec::encode(payload).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to encode session");
            Error::from(e)
        })?;

        let _guard = self.stripe(id).lock();
        self.write_record(&path, &bytes).map_err(|source| {
            error!(error = %source, "Failed to save session to '{}'", path.display());
            Error::Io {
                path: path.clone(),
                source,
            }
        })
    }

    fn clean_expired_sessions(&self, max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Failed to scan session directory");
                return 0;
            }
        };

        let now = self.clock.now();
        let ttl = max_age_delta(max_age);
        let mut removed = 0;

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.starts_with(FILE_PREFIX) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let expired = DateTime::<Utc>::from(modified)
                .checked_add_signed(ttl)
                .is_some_and(|deadline| deadline < now);
            if !expired {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    removed += 1;
                    debug!(file = %name, "Session removed");
                }
                Err(e) => warn!(file = %name, error = %e, "Failed to remove expired session"),
            }
        }

        if removed > 0 {
            debug!(count = removed, "Cleaned up expired sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hutch_types::FixedClock;
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    use crate::value::Value;

    const NOW: i64 = 1_500_010_000;

    fn set_mtime(path: &Path, secs: i64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs as u64))
            .unwrap();
    }

    fn mtime(path: &Path) -> i64 {
        let modified = fs::metadata(path).unwrap().modified().unwrap();
        modified.duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let records: [(&str, &str, i64); 3] = [
            (
                "1234567890abcdef",
                "hoge|i:123;fuga|s:4:\"asdf\";\n",
                1_500_009_000,
            ),
            (
                "1357924680bbbbbb",
                r#"a|a:3:{i:0;s:1:"x";i:1;s:2:"yy";i:2;s:3:"zzz";}b|a:2:{s:4:"hoge";i:12;s:4:"fuga";i:345;}"#,
                1_500_005_000,
            ),
            ("9876543210aaaaaa", "hoge;fuga;", 1_500_008_000),
        ];
        for (id, body, secs) in records {
            let path = dir.path().join(format!("sess_{id}"));
            fs::write(&path, body).unwrap();
            set_mtime(&path, secs);
        }
        let unrelated = dir.path().join("notes.txt");
        fs::write(&unrelated, "keep me").unwrap();
        set_mtime(&unrelated, 1_000);
        dir
    }

    fn container(dir: &TempDir) -> FileSessionContainer {
        FileSessionContainer::with_clock(dir.path(), Arc::new(FixedClock::from_timestamp(NOW)))
            .unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_construct_fails_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("notfound");
        let err = FileSessionContainer::new(&missing).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(ref p) if *p == missing));
    }

    #[test]
    fn test_clean_expired_sessions() {
        for (max_age, expected) in [(7200, 0), (1800, 2), (3600, 1)] {
            let dir = fixture();
            let obj = container(&dir);
            assert_eq!(
                obj.clean_expired_sessions(secs(max_age)),
                expected,
                "max_age {max_age}"
            );
            assert!(dir.path().join("notes.txt").exists());
        }
    }

    #[test]
    fn test_clean_removes_exactly_the_stale_records() {
        let dir = fixture();
        let obj = container(&dir);
        assert_eq!(obj.clean_expired_sessions(secs(3600)), 1);
        assert!(dir.path().join("sess_1234567890abcdef").exists());
        assert!(!dir.path().join("sess_1357924680bbbbbb").exists());
        assert!(dir.path().join("sess_9876543210aaaaaa").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_counts_only_successful_removals() {
        use std::os::unix::fs::PermissionsExt;

        let dir = fixture();
        let obj = container(&dir);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions; nothing to exercise then.
        let writable = fs::write(dir.path().join(".write_check"), "").is_ok();
        let removed = (!writable).then(|| obj.clean_expired_sessions(secs(1800)));
        let stale_left = ["sess_1357924680bbbbbb", "sess_9876543210aaaaaa"]
            .map(|name| dir.path().join(name).exists());

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        if writable {
            return;
        }
        assert_eq!(removed, Some(0));
        assert_eq!(stale_left, [true, true]);
        assert!(dir.path().join("sess_1234567890abcdef").exists());
    }

    #[test]
    fn test_save_rejects_keys_lost_to_trimming() {
        let dir = fixture();
        let obj = container(&dir);
        let original = obj.peek("1234567890abcdef").unwrap();

        for key in [" ", "  name"] {
            let payload: Payload = [(key, Value::from(1)), ("user", Value::from(2))]
                .into_iter()
                .collect();
            let err = obj.save("1234567890abcdef", &payload).unwrap_err();
            assert!(matches!(err, Error::Encode(_)), "{key:?}");
        }
        // The stored record is untouched by the rejected saves.
        assert_eq!(obj.peek("1234567890abcdef").unwrap(), original);

        let payload: Payload = [("name ", Value::from("x")), ("user", Value::from(2))]
            .into_iter()
            .collect();
        obj.save("abc", &payload).unwrap();
        assert_eq!(obj.load("abc"), payload);
    }

    #[test]
    fn test_contains() {
        let dir = fixture();
        let obj = container(&dir);
        let cases = [
            ("1234567890abcdef", 1800, true),
            ("9876543210aaaaaa", 1800, false),
            ("9876543210aaaaaa", 3600, true),
            ("xxxxxxxxxxxxxxxx", 1800, false),
            ("../sess_1234567890abcdef", 1800, false),
        ];
        for (id, max_age, expected) in cases {
            assert_eq!(obj.contains(id, secs(max_age)), expected, "{id} / {max_age}");
        }
    }

    #[test]
    fn test_freshness_boundary() {
        let dir = fixture();
        let obj = container(&dir);
        // Record is exactly 1000s old.
        assert!(obj.contains("1234567890abcdef", secs(1000)));
        assert!(!obj.contains("1234567890abcdef", secs(999)));

        assert_eq!(obj.clean_expired_sessions(secs(1000) + secs(5000)), 0);
        assert!(obj.contains("1234567890abcdef", secs(1000)));
    }

    #[test]
    fn test_load_success_refreshes_mtime() {
        let dir = fixture();
        let obj = container(&dir);

        let expected: Payload = [("hoge", Value::from(123)), ("fuga", Value::from("asdf"))]
            .into_iter()
            .collect();
        assert_eq!(obj.load("1234567890abcdef"), expected);
        assert_eq!(mtime(&dir.path().join("sess_1234567890abcdef")), NOW);

        let nested = obj.load("1357924680bbbbbb");
        assert_eq!(nested.get("a"), Some(&Value::list(["x", "yy", "zzz"])));
        assert_eq!(
            nested.get("b"),
            Some(&Value::map([("hoge", 12), ("fuga", 345)]))
        );
        assert_eq!(mtime(&dir.path().join("sess_1357924680bbbbbb")), NOW);
    }

    #[test]
    fn test_load_missing_id_is_empty() {
        let dir = fixture();
        let obj = container(&dir);
        assert!(obj.load("xxxxxxxxxxxxxxxx").is_empty());
        assert!(!dir.path().join("sess_xxxxxxxxxxxxxxxx").exists());
    }

    #[test]
    fn test_load_malformed_record_is_empty() {
        let dir = fixture();
        let obj = container(&dir);
        assert!(obj.load("9876543210aaaaaa").is_empty());
        // The record still exists and was touched.
        assert_eq!(mtime(&dir.path().join("sess_9876543210aaaaaa")), NOW);
    }

    #[test]
    fn test_save() {
        let dir = fixture();
        let obj = container(&dir);
        let payload: Payload = [
            ("hoge", Value::from(456)),
            ("fuga", Value::from("asdf")),
            ("piyo", Value::from(true)),
        ]
        .into_iter()
        .collect();

        obj.save("1234567890abcdef", &payload).unwrap();

        let path = dir.path().join("sess_1234567890abcdef");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"hoge|i:456;fuga|s:4:"asdf";piyo|b:1;"#
        );
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o666);
        }
        assert_eq!(mtime(&path), NOW);
        assert_eq!(obj.load("1234567890abcdef"), payload);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = fixture();
        let obj = container(&dir);
        obj.save("abc", &Payload::new()).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.starts_with(".tmp_")), "{names:?}");
        assert!(names.contains(&"sess_abc".to_string()));
    }

    #[test]
    fn test_save_fails_when_directory_vanishes() {
        let dir = TempDir::new().unwrap();
        let del_dir = dir.path().join("deldir");
        fs::create_dir(&del_dir).unwrap();
        let obj = FileSessionContainer::new(&del_dir).unwrap();
        fs::remove_dir(&del_dir).unwrap();

        let payload: Payload = [("hoge", 456)].into_iter().collect();
        let err = obj.save("1234567890abcdef", &payload).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("deldir"));
    }

    #[test]
    fn test_save_rejects_invalid_id_and_key() {
        let dir = fixture();
        let obj = container(&dir);
        let err = obj.save("../escape", &Payload::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));

        let bad_key: Payload = [("a|b", 1)].into_iter().collect();
        let err = obj.save("abc", &bad_key).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
        assert!(!dir.path().join("sess_abc").exists());
    }

    #[test]
    fn test_peek_does_not_touch() {
        let dir = fixture();
        let obj = container(&dir);

        let payload = obj.peek("1234567890abcdef").unwrap().unwrap();
        assert_eq!(payload.get("hoge"), Some(&Value::Int(123)));
        assert_eq!(mtime(&dir.path().join("sess_1234567890abcdef")), 1_500_009_000);

        assert!(obj.peek("xxxxxxxxxxxxxxxx").unwrap().is_none());
        assert!(matches!(
            obj.peek("9876543210aaaaaa"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(obj.peek("bad id"), Err(Error::InvalidId(_))));
    }
}
