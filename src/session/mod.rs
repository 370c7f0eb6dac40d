//! # Session Management
//!
//! Every upload and export is scoped by a server-issued session identifier.
//! The identifier is obtained lazily, persisted in durable client-local
//! storage and reused until that storage is cleared.
//!
//! Consumers depend on [`SessionProvider`] and receive the identifier as an
//! explicit value; nothing reads ambient storage directly.

pub mod provider;
pub mod store;

use std::fmt;

pub use provider::{SessionProvider, SessionState, StoredSessionProvider};
pub use store::{FileStore, KeyValueStore, MemoryStore, SESSION_KEY};

/// Opaque, non-empty session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// `None` for empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(SessionId::new("").is_none());
        assert!(SessionId::new("   ").is_none());
        assert_eq!(SessionId::new("s-1").unwrap().as_str(), "s-1");
    }
}
