//! Cookie emitted when a new session is first persisted.

use std::fmt;

/// A `Set-Cookie` directive: key name, session identifier and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
}

impl SessionCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: path.into(),
        }
    }
}

/// Renders the header value, e.g. `PHPSESSID=abc; Path=/`.
impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)
    }
}
