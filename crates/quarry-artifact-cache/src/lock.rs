//! Cross-process locking for the shared cache file
//!
//! Every index operation runs inside a scope acquired here. The file lock
//! serializes writers system-wide: a fresh handle is opened per
//! acquisition, so the kernel arbitrates between threads of one process
//! and between processes the same way. Release happens on drop, on every
//! exit path.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Serializes access to one cache location
///
/// Implementations must guarantee exclusive mutual exclusion between
/// writers system-wide and release the lock on every exit path of `work`,
/// success or failure. A caller blocked on the lock may wait indefinitely;
/// bounded waits are layered outside this crate.
pub trait CacheLockingManager: Send + Sync {
    /// Run `work` under the exclusive lock for this cache location
    fn with_lock<R>(&self, work: impl FnOnce() -> Result<R>) -> Result<R>
    where
        Self: Sized;
}

/// Exclusive lock scope over a sidecar lock file
///
/// Holds the locked handle; dropping the scope releases the lock.
#[derive(Debug)]
pub struct FileLockScope {
    file: File,
    path: PathBuf,
}

impl Drop for FileLockScope {
    fn drop(&mut self) {
        // Closing the handle also releases the flock
        let _ = self.file.unlock();
        debug!("released cache lock {}", self.path.display());
    }
}

/// Locking manager backed by an exclusive flock on a sidecar `.lock` file
#[derive(Debug, Clone)]
pub struct FileLockManager {
    lock_path: PathBuf,
}

impl FileLockManager {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Block until the exclusive lock is held
    ///
    /// Any filesystem failure while obtaining the lock surfaces as
    /// [`CacheError::LockAcquisition`]; there is no retry or backoff here.
    pub fn acquire(&self) -> Result<FileLockScope> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::LockAcquisition {
                path: self.lock_path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| CacheError::LockAcquisition {
                path: self.lock_path.clone(),
                source,
            })?;
        file.lock_exclusive()
            .map_err(|source| CacheError::LockAcquisition {
                path: self.lock_path.clone(),
                source,
            })?;
        debug!("acquired cache lock {}", self.lock_path.display());
        Ok(FileLockScope {
            file,
            path: self.lock_path.clone(),
        })
    }
}

impl CacheLockingManager for FileLockManager {
    fn with_lock<R>(&self, work: impl FnOnce() -> Result<R>) -> Result<R> {
        let _scope = self.acquire()?;
        work()
    }
}
