//! Layout checks: do the chunks tile `[0, size)` exactly once?

use tracing::debug;

use crate::error::{ManifestError, Result};
use crate::manifest::ChunkManifest;

/// A way in which a manifest's chunks fail to partition `[0, size)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityFault {
    #[error("bytes {start}..{end} are not covered by any chunk")]
    Gap { start: u64, end: u64 },
    #[error("chunk {fid} at offset {offset} overlaps data ending at {previous_end}")]
    Overlap { fid: String, offset: u64, previous_end: u64 },
    #[error("chunks extend to {covered_end}, past declared size {declared}")]
    SizeMismatch { declared: u64, covered_end: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub chunks: usize,
    /// Highest chunk end seen.
    pub covered_end: u64,
    faults: Vec<IntegrityFault>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn faults(&self) -> &[IntegrityFault] {
        &self.faults
    }

    /// First fault as an error, if any.
    pub fn into_result(self) -> Result<()> {
        match self.faults.into_iter().next() {
            Some(fault) => Err(ManifestError::Integrity(fault)),
            None => Ok(()),
        }
    }
}

/// Check that the chunks tile the file without gaps or overlaps.
///
/// Works on a stably sorted view, so locally built (unsorted) manifests can
/// be checked too. A declared size of zero means "unknown": only the chunks
/// themselves are checked and no trailing gap is reported.
pub fn validate(manifest: &ChunkManifest) -> ValidationReport {
    let mut faults = Vec::new();
    let mut cursor = 0u64;
    for chunk in manifest.sorted_chunks() {
        if chunk.offset > cursor {
            faults.push(IntegrityFault::Gap { start: cursor, end: chunk.offset });
        } else if chunk.offset < cursor {
            faults.push(IntegrityFault::Overlap {
                fid: chunk.fid.clone(),
                offset: chunk.offset,
                previous_end: cursor,
            });
        }
        cursor = cursor.max(chunk.end());
    }

    if manifest.size > 0 {
        if cursor < manifest.size {
            faults.push(IntegrityFault::Gap { start: cursor, end: manifest.size });
        } else if cursor > manifest.size {
            faults.push(IntegrityFault::SizeMismatch {
                declared: manifest.size,
                covered_end: cursor,
            });
        }
    }

    debug!(chunks = manifest.chunks.len(), faults = faults.len(), "validated manifest layout");
    ValidationReport { chunks: manifest.chunks.len(), covered_end: cursor, faults }
}
