//! Cache keys addressing one (repository, artifact) slot

use std::fmt;

use crate::codec::{BinaryCodec, Decoder, Encoder};
use crate::error::Result;

/// Opaque artifact identifier
///
/// Produced by the upstream identifier codec, which owns the byte layout
/// and guarantees it is bijective. This subsystem never inspects the
/// bytes; it only stores, compares, and hashes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId(Vec<u8>);

impl ArtifactId {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ArtifactId {
    /// Readable form for diagnostics: the identifier text when the bytes
    /// happen to be UTF-8, hex otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => f.write_str(text),
            Err(_) => {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Key for one cache slot: which artifact, resolved against which repository
///
/// Identity is structural equality of both fields. Keys are immutable once
/// constructed and are used only for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    repository_id: String,
    artifact_id: ArtifactId,
}

impl ArtifactKey {
    pub fn new(repository_id: impl Into<String>, artifact_id: ArtifactId) -> Self {
        Self {
            repository_id: repository_id.into(),
            artifact_id,
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.artifact_id, self.repository_id)
    }
}

/// Serializer for [`ArtifactKey`]
///
/// Layout: length-prefixed repository id string, then the artifact
/// identifier bytes running to the end of the buffer. Keys are encoded
/// standalone, so trailing-bytes framing keeps the encoding bijective
/// without this codec knowing anything about the identifier layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactKeyCodec;

impl BinaryCodec<ArtifactKey> for ArtifactKeyCodec {
    fn encode(&self, value: &ArtifactKey, out: &mut Encoder) {
        out.write_string(&value.repository_id);
        out.write_raw(value.artifact_id.as_bytes());
    }

    fn decode(&self, input: &mut Decoder<'_>) -> Result<ArtifactKey> {
        let repository_id = input.read_string()?;
        let artifact_id = ArtifactId::from_bytes(input.take_remaining());
        Ok(ArtifactKey {
            repository_id,
            artifact_id,
        })
    }
}
