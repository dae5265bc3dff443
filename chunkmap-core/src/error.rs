//! Error types for manifest encoding, decoding and reassembly.

use crate::validate::IntegrityFault;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors that can occur while handling a chunk manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Payload was flagged as compressed but is not a complete gzip stream.
    #[error("decompress manifest: {0}")]
    Decompression(#[source] std::io::Error),

    /// The structured document is malformed.
    #[error("parse manifest: {0}")]
    Parse(#[source] serde_json::Error),

    /// The manifest could not be serialized.
    #[error("encode manifest: {0}")]
    Encode(#[source] serde_json::Error),

    /// The gzip encoder failed.
    #[error("compress manifest: {0}")]
    Compression(#[source] std::io::Error),

    /// A decode bound from [`DecodeLimits`](crate::codec::DecodeLimits) was exceeded.
    #[error("{what} exceeds limit ({actual} > {limit})")]
    LimitExceeded {
        /// Which bound tripped.
        what: &'static str,
        /// Configured maximum.
        limit: u64,
        /// Observed value (a lower bound when reading was cut short).
        actual: u64,
    },

    /// The chunk layout does not partition the file.
    #[error("manifest layout: {0}")]
    Integrity(IntegrityFault),

    /// A chunk source failed to produce a chunk.
    #[error("fetch chunk {fid}: {source}")]
    Source {
        fid: String,
        #[source]
        source: std::io::Error,
    },

    /// A fetched chunk did not have the size recorded in the manifest.
    #[error("chunk {fid}: expected {expected} bytes, got {actual}")]
    ChunkLength { fid: String, expected: u64, actual: u64 },

    /// Writing reassembled bytes failed.
    #[error("write reassembled output: {0}")]
    Output(#[source] std::io::Error),

    /// Chunk plans need a positive chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

impl ManifestError {
    /// True for the errors a caller may cure by fetching the bytes again.
    ///
    /// Parse failures are deterministic for a given payload; a truncated or
    /// corrupt gzip stream may come from a broken transfer.
    pub fn is_transport_related(&self) -> bool {
        matches!(self, ManifestError::Decompression(_) | ManifestError::Source { .. })
    }
}
