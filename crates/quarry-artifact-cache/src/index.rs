//! Artifact-resolution index: the domain wrapper over the persistent store
//!
//! Binds the key and record codecs to one [`PersistentIndex`], stamps new
//! records with the injected time source, and runs every operation inside
//! a scope from the locking manager. Distinguishing "never attempted"
//! (empty lookup) from "attempted and confirmed absent" (a stored miss)
//! is what lets the resolver skip redundant remote lookups until the
//! owning descriptor hash changes.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::codec::{BinaryCodec, Decoder, Encoder};
use crate::error::{CacheError, Result};
use crate::key::{ArtifactKey, ArtifactKeyCodec};
use crate::layout::CacheLayout;
use crate::lock::{CacheLockingManager, FileLockManager};
use crate::record::{CachedArtifact, CachedArtifactCodec, DescriptorHash};
use crate::store::PersistentIndex;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Persistent cache of artifact-resolution outcomes
///
/// Shared within a process behind `Arc`; shared across processes through
/// the locking manager. Stateless between calls apart from the store and
/// the time source. Entries persist until overwritten; staleness policy
/// (comparing descriptor hashes) belongs entirely to the caller.
pub struct ArtifactResolutionIndex<L = FileLockManager> {
    store: Mutex<PersistentIndex>,
    lock_manager: L,
    time_provider: Arc<dyn TimeProvider>,
    key_codec: ArtifactKeyCodec,
    record_codec: CachedArtifactCodec,
}

impl ArtifactResolutionIndex<FileLockManager> {
    /// Open the index for a cache location with the wall clock
    pub fn open(layout: &CacheLayout) -> Result<Self> {
        Self::with_parts(
            PersistentIndex::open(&layout.index_path())?,
            FileLockManager::new(layout.lock_path()),
            Arc::new(SystemTimeProvider),
        )
    }
}

impl<L: CacheLockingManager> ArtifactResolutionIndex<L> {
    /// Assemble an index from an opened store, a locking manager, and a
    /// time source. The index owns its codec instances.
    pub fn with_parts(
        store: PersistentIndex,
        lock_manager: L,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        Ok(Self {
            store: Mutex::new(store),
            lock_manager,
            time_provider,
            key_codec: ArtifactKeyCodec,
            record_codec: CachedArtifactCodec,
        })
    }

    /// Record a successful resolution, overwriting any prior record for
    /// the key
    pub fn store(
        &self,
        key: &ArtifactKey,
        artifact_file: &Path,
        descriptor_hash: DescriptorHash,
    ) -> Result<()> {
        validate_key(key)?;
        validate_artifact_file(artifact_file)?;
        let record = CachedArtifact::Hit {
            cached_file: artifact_file.to_path_buf(),
            cached_at: self.time_provider.current_time(),
            descriptor_hash,
        };
        self.store_record(key, &record)?;
        debug!("cached resolved artifact for {key}");
        Ok(())
    }

    /// Record a confirmed failure, keeping the attempted locations in
    /// order for diagnostics. An empty location list is allowed.
    pub fn store_missing(
        &self,
        key: &ArtifactKey,
        attempted_locations: Vec<String>,
        descriptor_hash: DescriptorHash,
    ) -> Result<()> {
        validate_key(key)?;
        let record = CachedArtifact::Miss {
            attempted_locations,
            cached_at: self.time_provider.current_time(),
            descriptor_hash,
        };
        self.store_record(key, &record)?;
        debug!("cached missing artifact for {key}");
        Ok(())
    }

    /// Most recently stored record for the key, or `None` if the key has
    /// never been stored
    ///
    /// No file-existence or freshness validation happens here; an empty
    /// result is a normal outcome, never an error.
    pub fn lookup(&self, key: &ArtifactKey) -> Result<Option<CachedArtifact>> {
        validate_key(key)?;
        let key_bytes = self.encode_key(key);
        self.lock_manager.with_lock(|| {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.refresh().map_err(|error| error.for_key(key))?;
            match store.get(&key_bytes) {
                Some(bytes) => {
                    let mut decoder = Decoder::new(bytes);
                    let record = self
                        .record_codec
                        .decode(&mut decoder)
                        .map_err(|error| error.for_key(key))?;
                    decoder.finish().map_err(|error| error.for_key(key))?;
                    Ok(Some(record))
                }
                None => Ok(None),
            }
        })
    }

    /// Number of distinct keys currently stored, for diagnostics
    pub fn len(&self) -> Result<usize> {
        self.lock_manager.with_lock(|| {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.refresh()?;
            Ok(store.len())
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn store_record(&self, key: &ArtifactKey, record: &CachedArtifact) -> Result<()> {
        let key_bytes = self.encode_key(key);
        let mut encoder = Encoder::new();
        self.record_codec.encode(record, &mut encoder);
        let record_bytes = encoder.into_bytes();

        self.lock_manager.with_lock(|| {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.refresh().map_err(|error| error.for_key(key))?;
            store
                .put(&key_bytes, &record_bytes)
                .map_err(|error| error.for_key(key))
        })
    }

    fn encode_key(&self, key: &ArtifactKey) -> Vec<u8> {
        let mut encoder = Encoder::new();
        self.key_codec.encode(key, &mut encoder);
        encoder.into_bytes()
    }
}

fn validate_key(key: &ArtifactKey) -> Result<()> {
    if key.repository_id().is_empty() {
        return Err(CacheError::invalid("repository id must not be empty"));
    }
    if key.artifact_id().is_empty() {
        return Err(CacheError::invalid("artifact id must not be empty"));
    }
    Ok(())
}

fn validate_artifact_file(artifact_file: &Path) -> Result<()> {
    if artifact_file.as_os_str().is_empty() {
        return Err(CacheError::invalid("artifact file must not be empty"));
    }
    // The wire format stores the path as a string
    if artifact_file.to_str().is_none() {
        return Err(CacheError::invalid(format!(
            "artifact file {} is not valid UTF-8",
            artifact_file.display()
        )));
    }
    Ok(())
}
