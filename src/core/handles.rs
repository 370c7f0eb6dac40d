//! # Revocable Object Handles
//!
//! In-process equivalent of `blob:` object URLs. A handle references
//! shared bytes until it is revoked; after that it resolves to nothing.
//!
//! Preview images and the downscaler's transient source buffer are
//! published through a [`HandleRegistry`], so a leak shows up as a growing
//! [`HandleRegistry::live_count`]. Exports go straight to a temporary file
//! and never hold a handle.
//!
//! ```rust
//! use std::sync::Arc;
//! use srscan::core::HandleRegistry;
//!
//! let registry = Arc::new(HandleRegistry::new());
//! {
//!     let scoped = registry.scoped(Arc::new(vec![1, 2, 3]), "image/jpeg");
//!     assert!(registry.resolve(scoped.handle()).is_some());
//! }
//! assert_eq!(registry.live_count(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque reference into a [`HandleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    id: u64,
}

impl ObjectHandle {
    /// `blob:`-style locator for display layers.
    pub fn url(&self) -> String {
        format!("blob:srscan/{}", self.id)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:srscan/{}", self.id)
    }
}

struct Entry {
    bytes: Arc<Vec<u8>>,
    mime: &'static str,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    live: HashMap<u64, Entry>,
    revoked: u64,
}

/// Issues and revokes [`ObjectHandle`]s.
#[derive(Default)]
pub struct HandleRegistry {
    inner: Mutex<Inner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `bytes` and return a fresh handle to them.
    pub fn create(&self, bytes: Arc<Vec<u8>>, mime: &'static str) -> ObjectHandle {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.live.insert(id, Entry { bytes, mime });
        ObjectHandle { id }
    }

    /// Bytes behind a live handle.
    pub fn resolve(&self, handle: &ObjectHandle) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().live.get(&handle.id).map(|e| Arc::clone(&e.bytes))
    }

    /// MIME type recorded at creation.
    pub fn mime(&self, handle: &ObjectHandle) -> Option<&'static str> {
        self.inner.lock().live.get(&handle.id).map(|e| e.mime)
    }

    /// Release a handle. Returns false if it was already revoked.
    pub fn revoke(&self, handle: &ObjectHandle) -> bool {
        let mut inner = self.inner.lock();
        if inner.live.remove(&handle.id).is_some() {
            inner.revoked += 1;
            true
        } else {
            false
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Total successful revocations over the registry's lifetime.
    pub fn revoked_count(&self) -> u64 {
        self.inner.lock().revoked
    }

    /// Create a handle that is revoked when the guard drops.
    pub fn scoped(self: &Arc<Self>, bytes: Arc<Vec<u8>>, mime: &'static str) -> ScopedHandle {
        let handle = self.create(bytes, mime);
        ScopedHandle {
            registry: Arc::clone(self),
            handle,
        }
    }
}

/// Handle revoked on drop, whichever path the owning scope exits by.
pub struct ScopedHandle {
    registry: Arc<HandleRegistry>,
    handle: ObjectHandle,
}

impl ScopedHandle {
    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_is_idempotent() {
        let registry = HandleRegistry::new();
        let h = registry.create(Arc::new(vec![7]), "image/jpeg");
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.mime(&h), Some("image/jpeg"));
        assert!(registry.revoke(&h));
        assert!(!registry.revoke(&h));
        assert_eq!(registry.revoked_count(), 1);
        assert!(registry.resolve(&h).is_none());
    }

    #[test]
    fn handles_are_unique() {
        let registry = HandleRegistry::new();
        let a = registry.create(Arc::new(vec![]), "image/jpeg");
        let b = registry.create(Arc::new(vec![]), "image/jpeg");
        assert_ne!(a, b);
        assert_ne!(a.url(), b.url());
        assert_eq!(a.to_string(), a.url());
    }

    #[test]
    fn scoped_handle_revokes_on_early_return() {
        fn fails(registry: &Arc<HandleRegistry>) -> Result<(), &'static str> {
            let _guard = registry.scoped(Arc::new(vec![1]), "image/jpeg");
            Err("decode failed")
        }
        let registry = Arc::new(HandleRegistry::new());
        assert!(fails(&registry).is_err());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.revoked_count(), 1);
    }
}
