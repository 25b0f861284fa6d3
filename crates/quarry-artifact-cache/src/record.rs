//! Cached resolution outcomes and their wire codec

use std::fmt;
use std::path::{Path, PathBuf};

use crate::codec::{BinaryCodec, Decoder, Encoder};
use crate::error::{CacheError, Result};

/// Digest of the module descriptor that produced a resolution
///
/// The hashing algorithm lives upstream; the cache treats the digest as an
/// opaque fixed-length value. Callers detect a stale entry by comparing
/// this hash against the descriptor's current hash, never by age.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DescriptorHash(Vec<u8>);

impl DescriptorHash {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Digest arbitrary descriptor content with blake3
    pub fn of(content: &[u8]) -> Self {
        Self(blake3::hash(content).as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl fmt::Debug for DescriptorHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorHash({})", self.to_hex())
    }
}

/// One stored resolution outcome
///
/// A slot holds either a successful resolution with the local file it
/// produced, or a confirmed failure with the locations that were tried.
/// Exactly one variant is ever active; both carry the descriptor hash and
/// the provenance timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedArtifact {
    /// Successful resolution
    Hit {
        cached_file: PathBuf,
        cached_at: i64,
        descriptor_hash: DescriptorHash,
    },
    /// Confirmed failure; locations are kept in attempt order for
    /// diagnostics
    Miss {
        attempted_locations: Vec<String>,
        cached_at: i64,
        descriptor_hash: DescriptorHash,
    },
}

impl CachedArtifact {
    pub fn is_missing(&self) -> bool {
        matches!(self, CachedArtifact::Miss { .. })
    }

    pub fn cached_at(&self) -> i64 {
        match self {
            CachedArtifact::Hit { cached_at, .. } | CachedArtifact::Miss { cached_at, .. } => {
                *cached_at
            }
        }
    }

    pub fn descriptor_hash(&self) -> &DescriptorHash {
        match self {
            CachedArtifact::Hit {
                descriptor_hash, ..
            }
            | CachedArtifact::Miss {
                descriptor_hash, ..
            } => descriptor_hash,
        }
    }

    /// The resolved file, when this is a hit
    pub fn cached_file(&self) -> Option<&Path> {
        match self {
            CachedArtifact::Hit { cached_file, .. } => Some(cached_file),
            CachedArtifact::Miss { .. } => None,
        }
    }

    /// Locations tried before the failure was confirmed; empty for a hit
    pub fn attempted_locations(&self) -> &[String] {
        match self {
            CachedArtifact::Hit { .. } => &[],
            CachedArtifact::Miss {
                attempted_locations,
                ..
            } => attempted_locations,
        }
    }
}

/// Serializer for [`CachedArtifact`]
///
/// Layout: `[bool is_missing][i64 cached_at][bytes descriptor_hash]`, then
/// the hit's file path string, or the miss's varint location count
/// followed by that many strings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CachedArtifactCodec;

impl BinaryCodec<CachedArtifact> for CachedArtifactCodec {
    fn encode(&self, value: &CachedArtifact, out: &mut Encoder) {
        out.write_bool(value.is_missing());
        out.write_i64(value.cached_at());
        out.write_bytes(value.descriptor_hash().as_bytes());
        match value {
            CachedArtifact::Hit { cached_file, .. } => {
                // Paths are validated as UTF-8 before a record is built
                out.write_string(&cached_file.to_string_lossy());
            }
            CachedArtifact::Miss {
                attempted_locations,
                ..
            } => {
                out.write_varint(attempted_locations.len() as u64);
                for location in attempted_locations {
                    out.write_string(location);
                }
            }
        }
    }

    fn decode(&self, input: &mut Decoder<'_>) -> Result<CachedArtifact> {
        let is_missing = input.read_bool()?;
        let cached_at = input.read_i64()?;
        let descriptor_hash = DescriptorHash::from_bytes(input.read_byte_array()?);
        if !is_missing {
            let cached_file = PathBuf::from(input.read_string()?);
            Ok(CachedArtifact::Hit {
                cached_file,
                cached_at,
                descriptor_hash,
            })
        } else {
            let count = input.read_varint()?;
            // Every location costs at least its length prefix, so a count
            // beyond the remaining bytes cannot be honest.
            if count > input.remaining() as u64 {
                return Err(CacheError::corrupt(format!(
                    "location count {count} exceeds remaining buffer ({})",
                    input.remaining()
                )));
            }
            let mut attempted_locations = Vec::with_capacity(count as usize);
            for _ in 0..count {
                attempted_locations.push(input.read_string()?);
            }
            Ok(CachedArtifact::Miss {
                attempted_locations,
                cached_at,
                descriptor_hash,
            })
        }
    }
}
