//! Session lookup, minting and persistence over a [`SessionContainer`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hutch_types::{RANDOM_MAX, SharedClock, SharedRandom, SystemClock, ThreadRandom};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::config::StorageConfig;
use crate::container::SessionContainer;
use crate::cookie::SessionCookie;
use crate::error::{Error, Result};
use crate::file_container::FileSessionContainer;
use crate::session::{Session, SessionHandle, validate_id};
use crate::value::Payload;

/// Resolves inbound identifiers to sessions.
///
/// Each instance owns a cache from inbound identifier to the handle it last
/// produced, so repeated lookups within one instance's lifetime (typically a
/// request) return the same session. Expired records are swept with
/// probability [`StorageConfig::gc_probability`] on each cache miss.
pub struct SessionStorage<C: SessionContainer = FileSessionContainer> {
    container: C,
    config: StorageConfig,
    clock: SharedClock,
    random: SharedRandom,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl<C: SessionContainer> std::fmt::Debug for SessionStorage<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("config", &self.config)
            .field("cached", &self.sessions.lock().len())
            .finish_non_exhaustive()
    }
}

impl<C: SessionContainer> SessionStorage<C> {
    /// Create a storage using the system clock and thread-local randomness.
    pub fn new(container: C, config: StorageConfig) -> Result<Self> {
        Self::with_sources(
            container,
            config,
            Arc::new(SystemClock),
            Arc::new(ThreadRandom),
        )
    }

    /// Create a storage with explicit clock and random sources.
    ///
    /// Fails if `config` does not validate.
    pub fn with_sources(
        container: C,
        config: StorageConfig,
        clock: SharedClock,
        random: SharedRandom,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            container,
            config,
            clock,
            random,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Cookie / lookup key name.
    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn max_age(&self) -> Duration {
        self.config.max_age
    }

    pub fn gc_probability(&self) -> f64 {
        self.config.gc_probability
    }

    /// Session for an inbound identifier, typically a cookie value.
    ///
    /// A missing or malformed identifier yields a new session under a freshly
    /// minted identifier. A well-formed one is served from the cache, or
    /// fetched from the container and cached under the inbound identifier
    /// even when the record was gone and a new identifier had to be minted.
    pub fn get_session(&self, inbound_id: Option<&str>) -> SessionHandle {
        let Some(inbound_id) = inbound_id.filter(|id| validate_id(id)) else {
            let id = self.generate_id();
            debug!(session_id = %id, "Starting new session");
            let session = Session::from_parts(id.clone(), Payload::new(), true);
            return self.cache(id, session);
        };

        if let Some(handle) = self.sessions.lock().get(inbound_id) {
            trace!(session_id = %inbound_id, "Session found in cache");
            return Arc::clone(handle);
        }

        if self.should_collect() {
            self.container.clean_expired_sessions(self.config.max_age);
        }
        let session = self.fetch_session(inbound_id);
        self.cache(inbound_id.to_string(), session)
    }

    /// Session for an explicit identifier, bypassing the cache.
    ///
    /// Always sweeps expired records first. The result keeps `id` even when
    /// no live record exists, in which case it is new and empty.
    pub fn get_session_by_id(&self, id: &str) -> Result<Session> {
        if !validate_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }
        self.container.clean_expired_sessions(self.config.max_age);

        let exists = self.container.contains(id, self.config.max_age);
        let data = if exists {
            self.container.load(id)
        } else {
            Payload::new()
        };
        Ok(Session::from_parts(id.to_string(), data, !exists))
    }

    /// Persist a session's payload under its identifier.
    pub fn save(&self, session: &Session) -> Result<()> {
        self.container.save(session.id(), session.all())
    }

    /// End-of-request persistence.
    ///
    /// A new session nobody wrote to is not stored. Otherwise the session is
    /// saved, and a new one yields the cookie the client must receive.
    pub fn commit(&self, session: &Session, cookie_path: &str) -> Result<Option<SessionCookie>> {
        if session.is_new() && !session.is_changed() {
            trace!(session_id = %session.id(), "Skipping save of untouched new session");
            return Ok(None);
        }

        self.save(session)?;
        if !session.is_new() {
            return Ok(None);
        }
        Ok(Some(SessionCookie::new(
            self.key(),
            session.id(),
            cookie_path,
        )))
    }

    fn fetch_session(&self, id: &str) -> Session {
        let max_age = self.config.max_age;
        if self.container.contains(id, max_age) {
            let data = self.container.load(id);
            return Session::from_parts(id.to_string(), data, false);
        }

        let fresh_id = self.generate_id();
        debug!(inbound_id = %id, session_id = %fresh_id, "No live session, minted new ID");
        Session::from_parts(fresh_id, Payload::new(), true)
    }

    /// Insert unless another caller got there first; either way return the
    /// handle now cached under `key`.
    fn cache(&self, key: String, session: Session) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        Arc::clone(
            sessions
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(session))),
        )
    }

    fn should_collect(&self) -> bool {
        let p = self.config.gc_probability;
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        f64::from(self.random.next()) / f64::from(RANDOM_MAX) < p
    }

    /// Hash of key name, current time and one random draw.
    ///
    /// Unpredictable enough to avoid collisions between clients; not a
    /// cryptographic token.
    fn generate_id(&self) -> String {
        let seed = format!(
            "{}{}{}",
            self.config.key,
            self.clock.now().timestamp(),
            self.random.next()
        );
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hex::encode(hasher.finalize())
    }
}
