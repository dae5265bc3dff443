//! The chunk manifest data model.
//!
//! A [`ChunkManifest`] maps a logical file onto the chunks that hold its
//! bytes. Chunk order inside the struct carries no meaning on its own:
//! [`decode`](crate::codec::decode) always sorts by offset, and locally built
//! manifests are sorted with [`ChunkManifest::sort_chunks`] or through a
//! sorted view ([`ChunkManifest::sorted_chunks`]).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::Result;

/// One physical chunk of a logical file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkInfo {
    /// Opaque storage identifier, resolved to a node by the orchestrator.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub offset: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
}

impl ChunkInfo {
    pub fn new(fid: impl Into<String>, offset: u64, size: u64) -> Self {
        Self { fid: fid.into(), offset, size }
    }

    /// Exclusive end of the byte range this chunk covers.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkManifest {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub mime: String,
    /// Declared total size of the logical file; zero when unknown.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkInfo>,
}

impl ChunkManifest {
    /// Empty manifest shell; chunks are appended as the upload stores them.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), mime: mime.into(), size, chunks: Vec::new() }
    }

    pub fn push_chunk(&mut self, chunk: ChunkInfo) {
        self.chunks.push(chunk);
    }

    /// Stable sort by offset. Chunks sharing an offset keep their relative order.
    pub fn sort_chunks(&mut self) {
        self.chunks.sort_by_key(|c| c.offset);
    }

    /// Borrowed view of the chunks in reassembly order, without touching `self`.
    pub fn sorted_chunks(&self) -> Vec<&ChunkInfo> {
        let mut view: Vec<&ChunkInfo> = self.chunks.iter().collect();
        view.sort_by_key(|c| c.offset);
        view
    }

    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// Sum of all chunk sizes. Saturates instead of wrapping on hostile input.
    pub fn covered_size(&self) -> u64 {
        self.chunks.iter().fold(0u64, |acc, c| acc.saturating_add(c.size))
    }

    /// Distinct chunk identifiers to delete when the file goes away.
    ///
    /// First occurrence order, empty identifiers skipped. Each entry is an
    /// independent storage object; deletion order is irrelevant.
    pub fn deletion_set(&self) -> Vec<&str> {
        let mut seen = HashSet::with_capacity(self.chunks.len());
        self.chunks
            .iter()
            .map(|c| c.fid.as_str())
            .filter(|fid| !fid.is_empty() && seen.insert(*fid))
            .collect()
    }

    /// Remove every chunk stored under `fid`, returning how many were dropped.
    pub fn remove_chunks(&mut self, fid: &str) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.fid != fid);
        before - self.chunks.len()
    }

    /// Copy of this manifest without the chunks stored under `fid`.
    pub fn without_chunks(&self, fid: &str) -> Self {
        let mut copy = self.clone();
        copy.remove_chunks(fid);
        copy
    }

    /// Hex blake3 digest of the encoded (uncompressed) manifest.
    pub fn digest(&self) -> Result<String> {
        let bytes = crate::codec::encode(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

// Explicit `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
