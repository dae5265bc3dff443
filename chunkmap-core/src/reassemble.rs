//! Reassembly of a logical file from its chunks.
//!
//! The core does no network I/O: chunk bytes come from a caller-provided
//! [`ChunkSource`], typically an HTTP client pointed at the storage nodes.

use std::collections::HashMap;
use std::io::{self, Write};
use tracing::{debug, trace};

use crate::error::{ManifestError, Result};
use crate::manifest::{ChunkInfo, ChunkManifest};
use crate::validate::validate;

/// Something that can produce the bytes of a chunk by its identifier.
///
/// Implementations must be shareable across threads; one source usually
/// serves many concurrent readers.
pub trait ChunkSource: Send + Sync {
    fn fetch(&self, chunk: &ChunkInfo) -> io::Result<Vec<u8>>;
}

/// In-memory source keyed by fid.
impl ChunkSource for HashMap<String, Vec<u8>> {
    fn fetch(&self, chunk: &ChunkInfo) -> io::Result<Vec<u8>> {
        self.get(&chunk.fid)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "chunk not found"))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ReassembleOptions {
    /// Reject manifests with gaps, overlaps or size mismatches before fetching anything.
    pub verify_layout: bool,
}

impl Default for ReassembleOptions {
    fn default() -> Self {
        Self { verify_layout: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassembleReport {
    pub chunks_written: u64,
    pub bytes_written: u64,
}

/// Write the file's bytes to `out` by concatenating chunks in offset order.
pub fn reassemble<S, W>(
    manifest: &ChunkManifest,
    source: &S,
    out: &mut W,
    opts: ReassembleOptions,
) -> Result<ReassembleReport>
where
    S: ChunkSource + ?Sized,
    W: Write + ?Sized,
{
    if opts.verify_layout {
        validate(manifest).into_result()?;
    }

    let mut report = ReassembleReport::default();
    for chunk in manifest.sorted_chunks() {
        let data = source
            .fetch(chunk)
            .map_err(|e| ManifestError::Source { fid: chunk.fid.clone(), source: e })?;
        if data.len() as u64 != chunk.size {
            return Err(ManifestError::ChunkLength {
                fid: chunk.fid.clone(),
                expected: chunk.size,
                actual: data.len() as u64,
            });
        }
        out.write_all(&data).map_err(ManifestError::Output)?;
        report.chunks_written += 1;
        report.bytes_written += chunk.size;
        trace!(fid = %chunk.fid, offset = chunk.offset, size = chunk.size, "chunk written");
    }
    out.flush().map_err(ManifestError::Output)?;

    debug!(
        name = %manifest.name,
        chunks = report.chunks_written,
        bytes = report.bytes_written,
        "reassembled file"
    );
    Ok(report)
}
