//! Fixed-size split of a logical file into chunk spans.

use crate::error::{ManifestError, Result};

/// One span of a [`ChunkPlan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: u64,
    pub offset: u64,
    pub size: u64,
}

/// Spans of `chunk_size` bytes covering `[0, total_size)`; the last one may be short.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ManifestError::InvalidChunkSize);
        }
        Ok(Self { total_size, chunk_size })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn len(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    pub fn spans(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        (0..self.len()).map(move |index| {
            let offset = index * self.chunk_size;
            let size = self.chunk_size.min(self.total_size - offset);
            ChunkSpan { index, offset, size }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(matches!(ChunkPlan::new(10, 0), Err(ManifestError::InvalidChunkSize)));
    }

    #[test]
    fn empty_file_has_no_spans() {
        let plan = ChunkPlan::new(0, 4096).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.spans().count(), 0);
    }

    #[test]
    fn last_span_is_short() {
        let plan = ChunkPlan::new(10_000, 4096).unwrap();
        let spans: Vec<ChunkSpan> = plan.spans().collect();
        assert_eq!(plan.len(), 3);
        assert_eq!(spans[2], ChunkSpan { index: 2, offset: 8192, size: 1808 });
        assert_eq!(spans.iter().map(|s| s.size).sum::<u64>(), 10_000);
    }

    #[test]
    fn exact_multiple_has_full_spans() {
        let plan = ChunkPlan::new(8192, 4096).unwrap();
        let sizes: Vec<u64> = plan.spans().map(|s| s.size).collect();
        assert_eq!(sizes, vec![4096, 4096]);
    }

    #[test]
    fn huge_sizes_do_not_overflow() {
        let plan = ChunkPlan::new(u64::MAX, u64::MAX / 2).unwrap();
        let spans: Vec<ChunkSpan> = plan.spans().collect();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans.last().unwrap().offset + spans.last().unwrap().size, u64::MAX);
    }
}
