//! # Resource Buffer Registry
//!
//! Keeps asset bytes alive between the engine's load request and its matching
//! free call.
//!
//! ## Id Policy
//!
//! - Ids start at 1 and increase strictly; 0 is the empty sentinel
//! - An id is never handed out twice over the registry's lifetime
//! - Releasing an unknown id is a no-op (engines free defensively)
//!
//! ## Threading
//!
//! ```text
//!   engine loader thread ──┐
//!                          ├──> [Mutex<Slots>] ──> id -> bytes
//!   host command thread ───┘
//! ```
//!
//! The registry lock is independent of the renderer lifecycle lock; loader
//! callbacks never touch swapchains.

use crate::resource::ResourceBuffer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Statistics for a registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Buffers currently registered.
    pub live: usize,
    /// Bytes currently held.
    pub live_bytes: usize,
    /// Total successful registrations.
    pub total_registered: u64,
    /// Total releases of known ids.
    pub total_released: u64,
    /// Releases of ids that were not registered.
    pub unknown_releases: u64,
    /// Loads answered with the empty sentinel.
    pub empty_answers: u64,
}

struct Slots {
    /// `None` once `u32::MAX` has been issued.
    next_id: Option<u32>,
    buffers: HashMap<u32, Arc<[u8]>>,
    stats: RegistryStats,
}

/// Per-instance map of live resource buffers.
pub struct ResourceRegistry {
    slots: Mutex<Slots>,
}

impl ResourceRegistry {
    /// Creates an empty registry whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a registry whose next id is `first_id` (at least 1).
    #[must_use]
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            slots: Mutex::new(Slots {
                next_id: Some(first_id.max(1)),
                buffers: HashMap::new(),
                stats: RegistryStats::default(),
            }),
        }
    }

    /// Stores `bytes` under a fresh id.
    ///
    /// Returns the empty sentinel once the id space is exhausted.
    pub fn register(&self, bytes: impl Into<Arc<[u8]>>) -> ResourceBuffer {
        let data = bytes.into();
        let mut slots = self.slots.lock();

        let Some(id) = slots.next_id else {
            slots.stats.empty_answers += 1;
            drop(slots);
            tracing::error!("resource id space exhausted, answering empty buffer");
            return ResourceBuffer::empty();
        };
        slots.next_id = id.checked_add(1);

        slots.stats.total_registered += 1;
        slots.stats.live_bytes += data.len();
        slots.buffers.insert(id, Arc::clone(&data));
        slots.stats.live = slots.buffers.len();

        ResourceBuffer::new(id, data)
    }

    /// Registers the bytes of a load attempt, or answers the sentinel on failure.
    pub fn register_result<E: std::fmt::Display>(
        &self,
        loaded: Result<Vec<u8>, E>,
    ) -> ResourceBuffer {
        match loaded {
            Ok(bytes) => self.register(bytes),
            Err(e) => {
                self.note_empty_answer();
                tracing::warn!(error = %e, "resource load failed, answering empty buffer");
                ResourceBuffer::empty()
            }
        }
    }

    /// Records that a load was answered with the sentinel.
    pub fn note_empty_answer(&self) {
        self.slots.lock().stats.empty_answers += 1;
    }

    /// Drops the bytes held for `id`. Returns false if `id` was unknown.
    pub fn release(&self, id: u32) -> bool {
        let mut slots = self.slots.lock();
        match slots.buffers.remove(&id) {
            Some(data) => {
                slots.stats.total_released += 1;
                slots.stats.live_bytes -= data.len();
                slots.stats.live = slots.buffers.len();
                true
            }
            None => {
                slots.stats.unknown_releases += 1;
                drop(slots);
                tracing::debug!(id, "release of unknown resource id ignored");
                false
            }
        }
    }

    /// Returns the buffer registered under `id`.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<ResourceBuffer> {
        self.slots
            .lock()
            .buffers
            .get(&id)
            .map(|data| ResourceBuffer::new(id, Arc::clone(data)))
    }

    /// Returns true if `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.slots.lock().buffers.contains_key(&id)
    }

    /// Number of live buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().buffers.len()
    }

    /// Returns true if no buffer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every live buffer. Ids keep increasing afterwards.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let released = slots.buffers.len();
        slots.buffers.clear();
        slots.stats.total_released += released as u64;
        slots.stats.live = 0;
        slots.stats.live_bytes = 0;
        released
    }

    /// Returns a snapshot of the statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.slots.lock().stats.clone()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("ResourceRegistry")
            .field("next_id", &slots.next_id)
            .field("live", &slots.buffers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let registry = ResourceRegistry::new();
        let a = registry.register(vec![1, 2, 3]);
        let b = registry.register(vec![4]);
        assert_eq!(a.id(), 1);
        assert_eq!(a.size(), 3);
        assert_eq!(b.id(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ids_not_reused_after_release() {
        let registry = ResourceRegistry::new();
        let a = registry.register(vec![0u8; 8]);
        assert!(registry.release(a.id()));
        let b = registry.register(vec![0u8; 8]);
        assert!(b.id() > a.id());
        assert!(!registry.contains(a.id()));
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let registry = ResourceRegistry::new();
        let a = registry.register(vec![9u8; 4]);
        assert!(!registry.release(42));
        assert!(!registry.release(0));
        assert!(registry.contains(a.id()));
        assert_eq!(registry.stats().unknown_releases, 2);
    }

    #[test]
    fn test_failed_load_answers_sentinel() {
        let registry = ResourceRegistry::new();
        let buffer = registry.register_result::<&str>(Err("missing"));
        assert!(buffer.is_empty());
        assert_eq!(buffer.id(), 0);
        assert_eq!(buffer.size(), 0);
        assert!(registry.is_empty());
        assert_eq!(registry.stats().empty_answers, 1);
    }

    #[test]
    fn test_exhausted_id_space_answers_sentinel() {
        let registry = ResourceRegistry::starting_at(u32::MAX);
        let last = registry.register(vec![1u8]);
        assert_eq!(last.id(), u32::MAX);
        assert!(registry.register(vec![2u8]).is_empty());
        assert_eq!(registry.len(), 1);

        assert!(registry.release(u32::MAX));
        assert!(registry.register(vec![3u8]).is_empty());
        assert_eq!(registry.stats().empty_answers, 2);
    }

    #[test]
    fn test_bytes_outlive_caller_until_release() {
        let registry = ResourceRegistry::new();
        let id = registry.register(vec![7u8; 16]).id();
        let held = registry.get(id).unwrap();
        assert_eq!(held.data(), &[7u8; 16][..]);
        assert_eq!(registry.stats().live_bytes, 16);
        registry.release(id);
        assert_eq!(registry.stats().live_bytes, 0);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_concurrent_register_distinct_ids() {
        let registry = Arc::new(ResourceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let mut ids = Vec::with_capacity(500);
                    for i in 0..500u32 {
                        ids.push(registry.register(i.to_le_bytes().to_vec()).id());
                    }
                    ids
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "per-thread ids must increase");
            for id in ids {
                assert!(id > 0);
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(registry.len(), 4000);
    }
}
