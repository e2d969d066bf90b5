//! Looping window over audio content

use crate::content::AudioContent;

/// Walks content in fixed-size windows, wrapping to offset 0 when exhausted
///
/// Per pass the window sizes are `C, C, …, S mod C`; the remainder window is
/// omitted when the content length is an exact multiple of the chunk size.
#[derive(Debug, Clone)]
pub struct ChunkCursor {
    content: AudioContent,
    chunk_size: usize,
    offset: usize,
    passes_completed: u64,
}

impl ChunkCursor {
    /// Create a cursor at offset 0
    ///
    /// A zero chunk size is raised to 1.
    pub fn new(content: AudioContent, chunk_size: usize) -> Self {
        Self {
            content,
            chunk_size: chunk_size.max(1),
            offset: 0,
            passes_completed: 0,
        }
    }

    /// Current read offset into the content
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of times the content has been exhausted and restarted
    pub fn passes_completed(&self) -> u64 {
        self.passes_completed
    }

    /// Return the next window, restarting from the beginning if needed
    pub fn next_window(&mut self) -> &[u8] {
        let len = self.content.len();

        if self.offset >= len {
            self.offset = 0;
            self.passes_completed += 1;
        }

        let start = self.offset;
        let end = (start + self.chunk_size).min(len);
        self.offset = end;

        &self.content.as_bytes()[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(len: usize) -> AudioContent {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        AudioContent::from_bytes("test", data).unwrap()
    }

    fn window_sizes(cursor: &mut ChunkCursor, count: usize) -> Vec<usize> {
        (0..count).map(|_| cursor.next_window().len()).collect()
    }

    #[test]
    fn test_remainder_window() {
        let mut cursor = ChunkCursor::new(content(10_000), 4096);

        assert_eq!(
            window_sizes(&mut cursor, 6),
            vec![4096, 4096, 1808, 4096, 4096, 1808]
        );
        assert_eq!(cursor.passes_completed(), 1);
    }

    #[test]
    fn test_exact_multiple_has_no_remainder() {
        let mut cursor = ChunkCursor::new(content(8192), 4096);

        assert_eq!(window_sizes(&mut cursor, 4), vec![4096, 4096, 4096, 4096]);
        assert_eq!(cursor.passes_completed(), 1);
    }

    #[test]
    fn test_content_smaller_than_chunk() {
        let mut cursor = ChunkCursor::new(content(100), 4096);

        assert_eq!(window_sizes(&mut cursor, 3), vec![100, 100, 100]);
        assert_eq!(cursor.passes_completed(), 2);
    }

    #[test]
    fn test_restart_yields_content_start() {
        let source = content(10_000);
        let mut cursor = ChunkCursor::new(source.clone(), 4096);

        for _ in 0..3 {
            cursor.next_window();
        }
        assert_eq!(cursor.offset(), 10_000);

        let window = cursor.next_window();
        assert_eq!(window, &source.as_bytes()[..4096]);
        assert_eq!(cursor.offset(), 4096);
    }
}
