// shared/src/lib.rs

use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store: {0}")]
    Store(String),
    #[error("change feed: {0}")]
    Stream(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Business-rule rejections are the caller's problem, not the server's
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// How a change-feed listener reacts to an update of a backing row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListenerMode {
    /// Drop the cached entry, next reader goes to the store
    #[default]
    Invalidate,
    /// Write the value carried by the event straight into the cache
    DirectUpdate,
}

impl FromStr for ListenerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invalidate" | "delete" => Ok(ListenerMode::Invalidate),
            "direct" | "direct-update" | "update" => Ok(ListenerMode::DirectUpdate),
            other => Err(Error::Internal(format!("unknown listener mode '{}'", other))),
        }
    }
}

/// Which in-memory store backs a server's cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Ttl,
    Moka,
}

impl FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ttl" => Ok(CacheBackend::Ttl),
            "moka" => Ok(CacheBackend::Moka),
            other => Err(Error::Internal(format!("unknown cache backend '{}'", other))),
        }
    }
}

pub mod config;
