//! JSON codec for [`ChunkManifest`] with an optional gzip wrapper.
//!
//! Compression is never sniffed from the payload: the caller says whether the
//! bytes are gzipped (it learns that from the metadata it fetched them with).

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use std::io::{self, Read, Write};
use tracing::{debug, trace};

use crate::error::{ManifestError, Result};
use crate::manifest::ChunkManifest;

/// Bounds applied while decoding manifests from sources that are not trusted.
#[derive(Clone, Copy, Debug)]
pub struct DecodeLimits {
    /// Largest JSON document accepted, measured after decompression.
    ///
    /// This is the memory bound: it is enforced while inflating, before
    /// anything is parsed.
    pub max_manifest_bytes: u64,
    /// Checked after parsing, so it caps what callers iterate over rather
    /// than what the parser allocates.
    pub max_chunks: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_manifest_bytes: 64 * 1024 * 1024, max_chunks: 10_000_000 }
    }
}

/// Serialize a manifest to compact JSON. Empty optional fields are omitted.
pub fn encode(manifest: &ChunkManifest) -> Result<Vec<u8>> {
    serde_json::to_vec(manifest).map_err(ManifestError::Encode)
}

/// Serialize and gzip a manifest in one step.
pub fn encode_compressed(manifest: &ChunkManifest) -> Result<Vec<u8>> {
    compress(&encode(manifest)?)
}

/// Decode a manifest with [`DecodeLimits::default`].
pub fn decode(buf: &[u8], is_compressed: bool) -> Result<ChunkManifest> {
    decode_with_limits(buf, is_compressed, &DecodeLimits::default())
}

/// Decompress (when flagged), parse, then stably sort chunks by offset.
///
/// The layout is not validated here; see [`crate::validate::validate`].
pub fn decode_with_limits(
    buf: &[u8],
    is_compressed: bool,
    limits: &DecodeLimits,
) -> Result<ChunkManifest> {
    let inflated;
    let json: &[u8] = if is_compressed {
        inflated = decompress_bounded(buf, limits.max_manifest_bytes)?;
        &inflated
    } else {
        check_limit("manifest", buf.len() as u64, limits.max_manifest_bytes)?;
        buf
    };

    let mut manifest: ChunkManifest = serde_json::from_slice(json).map_err(ManifestError::Parse)?;
    check_limit("chunk count", manifest.chunks.len() as u64, limits.max_chunks as u64)?;
    manifest.sort_chunks();

    debug!(
        chunks = manifest.chunks.len(),
        size = manifest.size,
        compressed = is_compressed,
        payload_bytes = buf.len(),
        "decoded manifest"
    );
    Ok(manifest)
}

/// Decode independent payloads in parallel. Results keep the input order.
pub fn decode_batch(payloads: &[(&[u8], bool)]) -> Vec<Result<ChunkManifest>> {
    payloads.par_iter().map(|(buf, is_compressed)| decode(buf, *is_compressed)).collect()
}

/// Inflate a gzip stream fully into memory.
///
/// Concatenated members are inflated back to back. Bytes after the last
/// member that do not start another member are an error.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    decompress_bounded(input, u64::MAX)
}

/// Wrap `input` in a single-member gzip stream.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::with_capacity(input.len() / 2 + 32), Compression::default());
    enc.write_all(input).map_err(ManifestError::Compression)?;
    enc.finish().map_err(ManifestError::Compression)
}

fn decompress_bounded(input: &[u8], max_out: u64) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Err(ManifestError::Decompression(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty gzip stream",
        )));
    }
    let mut out = Vec::new();
    {
        // One extra byte so an exactly-at-limit payload is distinguishable from an oversized one.
        let mut reader = MultiGzDecoder::new(input).take(max_out.saturating_add(1));
        reader.read_to_end(&mut out).map_err(ManifestError::Decompression)?;
    }
    check_limit("decompressed manifest", out.len() as u64, max_out)?;
    trace!(compressed = input.len(), inflated = out.len(), "gunzip");
    Ok(out)
}

fn check_limit(what: &'static str, actual: u64, limit: u64) -> Result<()> {
    if actual > limit {
        return Err(ManifestError::LimitExceeded { what, limit, actual });
    }
    Ok(())
}
