//! Per-message chunk collection and reassembly.

use std::collections::BTreeMap;
use std::time::Instant;

use bytes::Bytes;

/// Chunks seen so far for one inbound logical message.
///
/// Chunks arrive in arbitrary order; duplicates are ignored. The buffer is
/// complete once it holds `chunk_count` distinct indexes, and carries its
/// creation time so abandoned partials can be swept.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    chunk_count: u16,
    chunks: BTreeMap<u16, Bytes>,
    created: Instant,
}

impl ReassemblyBuffer {
    /// Start a buffer for a message of `chunk_count` chunks.
    pub fn new(chunk_count: u16, now: Instant) -> Self {
        Self {
            chunk_count,
            chunks: BTreeMap::new(),
            created: now,
        }
    }

    /// Insert one chunk; a duplicate index is a no-op returning `false`.
    pub fn insert(&mut self, index: u16, payload: Bytes) -> bool {
        if self.chunks.contains_key(&index) {
            return false;
        }
        self.chunks.insert(index, payload);
        true
    }

    /// Whether every chunk has arrived.
    pub fn is_complete(&self) -> bool {
        self.chunks.len() == self.chunk_count as usize
    }

    /// When the first chunk arrived.
    pub fn created(&self) -> Instant {
        self.created
    }

    /// Concatenate the chunks in index order.
    pub fn assemble(self) -> Vec<u8> {
        let mut message =
            Vec::with_capacity(self.chunks.values().map(|chunk| chunk.len()).sum());
        for chunk in self.chunks.into_values() {
            message.extend_from_slice(&chunk);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_assembly() {
        let mut buffer = ReassemblyBuffer::new(3, Instant::now());
        assert!(buffer.insert(2, Bytes::from_static(b"!")));
        assert!(buffer.insert(0, Bytes::from_static(b"mesh")));
        assert!(!buffer.is_complete());
        assert!(buffer.insert(1, Bytes::from_static(b" up")));
        assert!(buffer.is_complete());

        assert_eq!(buffer.assemble(), b"mesh up!");
    }

    #[test]
    fn test_duplicate_chunk_ignored() {
        let mut buffer = ReassemblyBuffer::new(2, Instant::now());
        assert!(buffer.insert(0, Bytes::from_static(b"first")));
        assert!(!buffer.insert(0, Bytes::from_static(b"second")));
        assert!(!buffer.is_complete());

        buffer.insert(1, Bytes::from_static(b"!"));
        assert_eq!(buffer.assemble(), b"first!");
    }
}
