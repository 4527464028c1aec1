//! Accumulator for device output.
//!
//! Keeps every byte read during one operation and remembers where the most
//! recent chunk starts, so callers can test either the whole response or only
//! the newest data.

use super::patterns::PromptMatcher;

/// Buffer for accumulating output and searching it for patterns.
#[derive(Debug, Default)]
pub struct PatternBuffer {
    /// Everything read so far.
    buffer: Vec<u8>,

    /// Offset where the latest chunk begins.
    chunk_start: usize,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            chunk_start: 0,
        }
    }

    /// Append a freshly read chunk.
    pub fn extend(&mut self, data: &[u8]) {
        self.chunk_start = self.buffer.len();
        self.buffer.extend_from_slice(data);
    }

    /// The most recently appended chunk.
    pub fn last_chunk(&self) -> &[u8] {
        &self.buffer[self.chunk_start..]
    }

    /// Check the whole buffer for a match.
    pub fn contains(&self, pattern: &impl PromptMatcher) -> bool {
        pattern.is_match(&self.buffer)
    }

    /// Check only the latest chunk for a match.
    pub fn chunk_contains(&self, pattern: &impl PromptMatcher) -> bool {
        pattern.is_match(self.last_chunk())
    }

    /// Move the contents out, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        self.chunk_start = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Everything read so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes read so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use regex::bytes::Regex;

    use super::*;

    #[test]
    fn test_extend_tracks_last_chunk() {
        let mut buffer = PatternBuffer::new();
        buffer.extend(b"show ");
        buffer.extend(b"clock\r\n");
        assert_eq!(buffer.as_slice(), b"show clock\r\n");
        assert_eq!(buffer.last_chunk(), b"clock\r\n");
    }

    #[test]
    fn test_chunk_search_ignores_older_data() {
        let mut buffer = PatternBuffer::new();
        buffer.extend(b"show version\r\nrouter#");
        buffer.extend(b"more output\r\n");

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.contains(&pattern));
        assert!(!buffer.chunk_contains(&pattern));
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = PatternBuffer::new();
        buffer.extend(b"router#");
        assert_eq!(buffer.take(), b"router#");
        assert!(buffer.is_empty());
        assert!(buffer.last_chunk().is_empty());
    }
}
