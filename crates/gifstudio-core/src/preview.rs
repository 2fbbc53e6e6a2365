//! Locally resolvable preview locators for staged media and produced artifacts.
//!
//! A locator is a `blob:gifstudio/<id>` URI backed by an entry in a shared
//! [`PreviewRegistry`]. The [`PreviewLocator`] handle owns the entry: dropping
//! the handle releases it, so replacing a staged file or resetting the session
//! frees the buffer without any explicit bookkeeping by the caller.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

const URI_PREFIX: &str = "blob:gifstudio/";

#[derive(Debug)]
struct Entry {
    mime: String,
    data: Bytes,
}

/// Shared table of live preview buffers.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Entry>>,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `data` and return the owning handle.
    pub fn acquire(self: &Arc<Self>, mime: &str, data: Bytes) -> PreviewLocator {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(
            id,
            Entry {
                mime: mime.to_string(),
                data,
            },
        );
        tracing::trace!(id, "preview locator acquired");
        PreviewLocator {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Resolve a locator URI to its mime type and bytes, if it is still live.
    pub fn resolve(&self, uri: &str) -> Option<(String, Bytes)> {
        let id = uri.strip_prefix(URI_PREFIX)?.parse::<u64>().ok()?;
        self.lock()
            .get(&id)
            .map(|e| (e.mime.clone(), e.data.clone()))
    }

    /// Number of locators not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            tracing::trace!(id, "preview locator released");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Entry>> {
        // Poisoning is ignored; map operations are single calls.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owning handle to one registry entry. Not `Clone`: exactly one owner releases it.
#[derive(Debug)]
pub struct PreviewLocator {
    id: u64,
    registry: Weak<PreviewRegistry>,
}

impl PreviewLocator {
    pub fn uri(&self) -> String {
        format!("{}{}", URI_PREFIX, self.id)
    }
}

impl Drop for PreviewLocator {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.id);
        }
    }
}
