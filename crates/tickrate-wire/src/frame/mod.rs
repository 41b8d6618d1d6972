//! Delimiter-based framing.
//!
//! Frames carry no length prefix: each message is terminated by a single
//! [`DELIMITER`] byte, and payloads must never contain that byte.

mod buffer;

#[cfg(test)]
mod tests;

pub use self::buffer::MessageBuffer;

/// Byte terminating every message in both directions (ASCII record separator).
pub const DELIMITER: u8 = 0x1E;

/// Returns `message` followed by the [`DELIMITER`].
#[must_use]
pub fn frame(message: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(message.len() + 1);
    bytes.extend_from_slice(message.as_bytes());
    bytes.push(DELIMITER);
    bytes
}

/// Reassembles delimited frames from arbitrarily split reads.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: MessageBuffer,
}

impl FrameReader {
    /// Creates a reader with an empty baseline buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every frame it completes.
    ///
    /// Empty frames (consecutive delimiters) are skipped. Bytes after the last
    /// delimiter stay buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.append(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        let buffered = self.buffer.as_slice();
        for (index, byte) in buffered.iter().enumerate() {
            if *byte != DELIMITER {
                continue;
            }
            if let Some(body) = buffered.get(consumed..index)
                && !body.is_empty()
            {
                frames.push(body.to_vec());
            }
            consumed = index + 1;
        }

        self.buffer.consume(consumed);
        self.buffer.shrink_if_sparse();
        frames
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Logical capacity of the accumulation buffer.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Releases buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
