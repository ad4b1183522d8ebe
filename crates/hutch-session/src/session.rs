//! The in-memory session entity.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::value::{Payload, Value};

/// Shared, lockable session as handed out by [`crate::SessionStorage`].
///
/// The mutex gives callers per-session exclusion around a
/// load/modify/save sequence when the storage is used from several threads.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Check an identifier against `^[0-9A-Za-z,-]+$`.
pub fn validate_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b',' || b == b'-')
}

/// One client's session: identifier, payload and lifecycle flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    data: Payload,
    is_new: bool,
    is_changed: bool,
}

impl Session {
    /// Fails with [`Error::InvalidId`] unless `id` passes [`validate_id`].
    pub fn new(id: impl Into<String>, data: Payload, is_new: bool) -> Result<Self> {
        let id = id.into();
        if !validate_id(&id) {
            return Err(Error::InvalidId(id));
        }
        Ok(Self::from_parts(id, data, is_new))
    }

    /// Caller guarantees `id` is valid.
    pub(crate) fn from_parts(id: String, data: Payload, is_new: bool) -> Self {
        debug_assert!(validate_id(&id));
        Self {
            id,
            data,
            is_new,
            is_changed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set a value, marking the session changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key, value);
        self.is_changed = true;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Value for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.data.get(key).unwrap_or(default)
    }

    /// Remove a value. Marks the session changed only if the key existed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.is_changed = true;
        }
        removed
    }

    pub fn all(&self) -> &Payload {
        &self.data
    }

    /// True if no record existed for this identifier when it was created.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True once any mutation happened since construction. Never resets.
    pub fn is_changed(&self) -> bool {
        self.is_changed
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
