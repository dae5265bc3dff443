//! Chunk manifests for large files split across storage nodes.
//!
//! A manifest lists the chunks of one logical file. This crate builds,
//! encodes and decodes manifests (JSON, optionally gzipped), keeps chunks in
//! offset order, validates their layout, and reassembles files through a
//! caller-provided [`ChunkSource`]. It performs no network I/O.

pub mod codec;
pub mod error;
pub mod manifest;
pub mod plan;
pub mod reassemble;
pub mod validate;

pub use codec::{
    compress, decode, decode_batch, decode_with_limits, decompress, encode, encode_compressed,
    DecodeLimits,
};
pub use error::{ManifestError, Result};
pub use manifest::{ChunkInfo, ChunkManifest};
pub use plan::{ChunkPlan, ChunkSpan};
pub use reassemble::{reassemble, ChunkSource, ReassembleOptions, ReassembleReport};
pub use validate::{validate, IntegrityFault, ValidationReport};
