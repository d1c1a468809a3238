//! Whole-response cache for the index listing.
//!
//! One global entry: the serialized bytes of the default index page. Readers inside
//! the TTL window get those bytes back verbatim, even if posts changed underneath.
//! There is no read-your-writes guarantee for the index route; staleness is bounded
//! by the TTL or an explicit clear from the admin surface.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub struct PageCache {
    ttl: Duration,
    entry: Mutex<Option<Entry>>,
}

struct Entry {
    body: Vec<u8>,
    stored_at: Instant,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The cached body, if one is stored and still inside the TTL window.
    pub fn get(&self) -> Option<Vec<u8>> {
        let mut slot = self.slot();
        match &*slot {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn put(&self, body: &[u8]) {
        *self.slot() = Some(Entry {
            body: body.to_vec(),
            stored_at: Instant::now(),
        });
    }

    /// Drop the entry, forcing the next request to render fresh data.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> MutexGuard<'_, Option<Entry>> {
        // A panic while holding the lock leaves nothing half-written; the stale entry
        // is still usable, so recover it instead of poisoning every later request.
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
