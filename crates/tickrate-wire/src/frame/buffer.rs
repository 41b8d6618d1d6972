//! Growable accumulation buffer for partial frames.

/// Capacity a fresh buffer starts with and never shrinks below.
pub const BASELINE_CAPACITY: usize = 1024;
/// Capacity above which a sparsely used buffer is shrunk.
pub const SHRINK_FLOOR: usize = 4096;

/// Owned byte buffer with doubling growth and explicit shrinking.
///
/// The buffer tracks its own logical capacity so the growth policy is
/// deterministic: appends double the capacity until the data fits, and
/// [`MessageBuffer::shrink_if_sparse`] returns it towards the baseline once
/// utilisation drops below a quarter of a capacity larger than
/// [`SHRINK_FLOOR`].
#[derive(Debug)]
pub struct MessageBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    /// Creates an empty buffer with [`BASELINE_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(BASELINE_CAPACITY),
            capacity: BASELINE_CAPACITY,
        }
    }

    /// Appends `chunk`, doubling the capacity as often as needed.
    pub fn append(&mut self, chunk: &[u8]) {
        let needed = self.bytes.len() + chunk.len();
        if needed > self.capacity {
            let mut capacity = self.capacity.max(1);
            while capacity < needed {
                capacity = capacity.saturating_mul(2);
            }
            self.bytes.reserve_exact(capacity - self.bytes.len());
            self.capacity = capacity;
        }
        self.bytes.extend_from_slice(chunk);
    }

    /// Discards the first `count` bytes, keeping any remainder at the front.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.bytes.len());
        self.bytes.drain(..count);
    }

    /// Shrinks the buffer when it is large and mostly empty.
    ///
    /// Returns `true` when the capacity changed.
    pub fn shrink_if_sparse(&mut self) -> bool {
        if self.capacity <= SHRINK_FLOOR || self.bytes.len() >= self.capacity / 4 {
            return false;
        }
        let target = self.bytes.len().max(BASELINE_CAPACITY);
        self.bytes.shrink_to(target);
        self.capacity = target;
        true
    }

    /// Returns the buffered bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Logical capacity governed by the growth policy.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops the buffered bytes and returns to the baseline capacity.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.bytes.shrink_to(BASELINE_CAPACITY);
        self.capacity = BASELINE_CAPACITY;
    }
}
