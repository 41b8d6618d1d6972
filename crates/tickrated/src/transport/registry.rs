//! Fixed-capacity pool of connection slots.
//!
//! Slots live in one array with a stack of free indices, so allocation and
//! release are O(1). A [`SlotHandle`] is the only way to hold a slot and
//! releases it when dropped, which rules out double or foreign release.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::errors::RegistryError;

/// Position of a slot in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(usize);

impl SlotIndex {
    /// Zero-based position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata stored for an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    /// Remote address of the client.
    pub peer: SocketAddr,
    /// When the slot was allocated.
    pub connected_at: Instant,
}

#[derive(Debug)]
struct Slots {
    entries: Vec<Option<SlotRecord>>,
    free: Vec<usize>,
}

/// Thread-safe slot arena shared by the listener and the workers.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    slots: Arc<Mutex<Slots>>,
    capacity: usize,
}

impl ConnectionRegistry {
    /// Creates a registry with `capacity` free slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: vec![None; capacity],
                // Reversed so the lowest index is handed out first.
                free: (0..capacity).rev().collect(),
            })),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims a free slot for a client at `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Exhausted`] when every slot is in use. The
    /// call never blocks and the registry never grows.
    pub fn allocate(&self, peer: SocketAddr) -> Result<SlotHandle, RegistryError> {
        let mut slots = self.lock();
        let index = slots.free.pop().ok_or(RegistryError::Exhausted {
            capacity: self.capacity,
        })?;
        if let Some(entry) = slots.entries.get_mut(index) {
            *entry = Some(SlotRecord {
                peer,
                connected_at: Instant::now(),
            });
        }
        Ok(SlotHandle {
            index: SlotIndex(index),
            registry: self.clone(),
        })
    }

    fn release(&self, index: SlotIndex) {
        let mut slots = self.lock();
        if let Some(entry) = slots.entries.get_mut(index.0)
            && entry.take().is_some()
        {
            slots.free.push(index.0);
        }
    }

    /// Total number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn live(&self) -> usize {
        self.capacity - self.lock().free.len()
    }

    /// Metadata of the slot at `index`, if occupied.
    #[must_use]
    pub fn record(&self, index: SlotIndex) -> Option<SlotRecord> {
        self.lock().entries.get(index.0).copied().flatten()
    }
}

/// Exclusive ownership of one slot; releases it on drop.
#[derive(Debug)]
pub struct SlotHandle {
    index: SlotIndex,
    registry: ConnectionRegistry,
}

impl SlotHandle {
    /// Position of the held slot.
    #[must_use]
    pub const fn index(&self) -> SlotIndex {
        self.index
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        self.registry.release(self.index);
    }
}
