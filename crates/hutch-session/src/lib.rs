//! Server-side session persistence.
//!
//! This crate assigns opaque identifiers to clients and keeps a typed
//! key/value payload for each of them across requests:
//! - [`codec`] turns a [`Payload`] into the flat `key|value` text format and back
//! - [`FileSessionContainer`] keeps one `sess_<id>` file per session, using the
//!   file's mtime as a sliding freshness marker
//! - [`SessionStorage`] validates inbound identifiers, caches sessions per
//!   instance, samples garbage collection and mints new identifiers
//!
//! # Example
//!
//! ```rust,ignore
//! use hutch_session::{FileSessionContainer, SessionStorage, StorageConfig};
//!
//! let container = FileSessionContainer::new("/var/lib/hutch/sessions")?;
//! let storage = SessionStorage::new(container, StorageConfig::new("sid"))?;
//!
//! let handle = storage.get_session(cookie_value);
//! handle.lock().set("visits", 1);
//! if let Some(cookie) = storage.commit(&handle.lock(), "/")? {
//!     response.set_header("Set-Cookie", cookie.to_string());
//! }
//! ```

pub mod codec;
mod config;
mod container;
mod cookie;
mod error;
mod factory;
mod file_container;
mod session;
mod storage;
mod value;

pub use codec::{DecodeError, DecodeErrorKind, EncodeError};
pub use config::{DEFAULT_GC_PROBABILITY, DEFAULT_MAX_AGE, StorageConfig, validate_key};
pub use container::SessionContainer;
pub use cookie::SessionCookie;
pub use error::{Error, Result};
pub use factory::storage_from_config;
pub use file_container::{FILE_PREFIX, FileSessionContainer};
pub use session::{Session, SessionHandle, validate_id};
pub use storage::SessionStorage;
pub use value::{Payload, Value};
