//! Per-path staging of range writes.
//!
//! Object stores cannot patch an object in place, so `upload_range` calls are
//! queued here and merged onto the committed object when the path is flushed.
//! Each path has its own async lock; the map that finds those locks is held
//! only long enough to clone an `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub offset: u64,
    pub data: Vec<u8>,
}

/// Pending segments for a single path, in arrival order.
#[derive(Debug, Default)]
pub struct PendingWrites {
    segments: Vec<Segment>,
    /// Set once the buffer is dropped from the map; writers must re-register.
    retired: bool,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Highest byte offset any staged segment reaches.
    pub fn end(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.offset.saturating_add(s.data.len() as u64))
            .max()
            .unwrap_or(0)
    }

    /// Apply every segment, in order, on top of `base`. Gaps are zero-filled.
    ///
    /// Returns `None` when a segment ends past what this platform can address.
    pub fn apply(&self, mut base: Vec<u8>) -> Option<Vec<u8>> {
        for segment in &self.segments {
            let start = usize::try_from(segment.offset).ok()?;
            let end = start.checked_add(segment.data.len())?;
            if base.len() < end {
                base.resize(end, 0);
            }
            base[start..end].copy_from_slice(&segment.data);
        }
        Some(base)
    }
}

type Slot = Arc<AsyncMutex<PendingWrites>>;

#[derive(Debug, Default)]
pub struct WriteBuffers {
    slots: Mutex<HashMap<String, Slot>>,
}

impl WriteBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, path: &str) -> Option<Slot> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(path).cloned()
    }

    fn slot_or_insert(&self, path: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(path.to_string()).or_default().clone()
    }

    /// Queue `data` at `offset` for `path`.
    pub async fn stage(&self, path: &str, offset: u64, data: &[u8]) {
        loop {
            let slot = self.slot_or_insert(path);
            let mut pending = slot.lock().await;
            if pending.retired {
                // Lost a race with `release`; the map now holds a fresh slot.
                continue;
            }
            pending.segments.push(Segment { offset, data: data.to_vec() });
            return;
        }
    }

    /// Lock the pending writes for `path`, if any exist.
    ///
    /// The guard serializes against `stage` on the same path, so everything
    /// staged before this call returned is visible through it.
    pub async fn lock(&self, path: &str) -> Option<OwnedMutexGuard<PendingWrites>> {
        loop {
            let slot = self.slot(path)?;
            let guard = slot.lock_owned().await;
            if guard.retired {
                continue;
            }
            return Some(guard);
        }
    }

    /// Retire an emptied (or discarded) buffer while its guard is still held.
    pub fn release(&self, path: &str, mut guard: OwnedMutexGuard<PendingWrites>) {
        guard.clear();
        guard.retired = true;
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(path);
    }

    /// Drop everything staged for `path`.
    pub async fn discard(&self, path: &str) {
        if let Some(guard) = self.lock(path).await {
            self.release(path, guard);
        }
    }

    /// Paths with staged, unflushed writes.
    pub fn pending_paths(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = slots.keys().cloned().collect();
        paths.sort();
        paths
    }
}
