//! Persistent artifact-resolution cache for Quarry's dependency layer
//!
//! Remembers, per (repository, artifact) pair, either a successful
//! resolution (the local file and the hash of the module descriptor that
//! produced it) or a confirmed failure (the locations attempted and the
//! same hash), persisted across build invocations. Many build processes
//! share one cache file safely through an exclusive cross-process lock;
//! every operation runs inside a lock scope.
//!
//! Entries live until overwritten. Staleness is the caller's decision,
//! made by comparing descriptor hashes, never by entry age.

pub mod codec;
pub mod error;
pub mod index;
pub mod key;
pub mod layout;
pub mod lock;
pub mod record;
pub mod store;
pub mod time;

pub use codec::{BinaryCodec, Decoder, Encoder};
pub use error::{CacheError, Result};
pub use index::ArtifactResolutionIndex;
pub use key::{ArtifactId, ArtifactKey, ArtifactKeyCodec};
pub use layout::CacheLayout;
pub use lock::{CacheLockingManager, FileLockManager, FileLockScope};
pub use record::{CachedArtifact, CachedArtifactCodec, DescriptorHash};
pub use store::PersistentIndex;
pub use time::{FixedTimeProvider, SystemTimeProvider, TimeProvider};

/// Index format version - increment when the wire format changes
pub const FORMAT_VERSION: u32 = 1;

/// Magic bytes at the head of every index file
pub const INDEX_MAGIC: [u8; 4] = *b"qidx";

/// Default index file name within a cache directory
pub const INDEX_FILE_NAME: &str = "artifact-at-repository.bin";

/// Default lock file name within a cache directory
pub const LOCK_FILE_NAME: &str = "artifact-at-repository.lock";
