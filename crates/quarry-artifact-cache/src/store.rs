//! Generic on-disk store of serialized key/value byte pairs
//!
//! One index file per cache location, opened once per process lifetime.
//! The file is a versioned header followed by an append log of
//! length-prefixed `[key][value]` entries; a later entry for a key
//! replaces the earlier one, so last-write-wins falls out of replay
//! order. There is no delete.
//!
//! The store itself adds no cross-process atomicity: callers run every
//! `refresh`/`get`/`put` inside a scope from the locking manager. `put`
//! syncs the appended bytes before returning, so a writer's change is on
//! disk before its lock releases; `refresh` replays entries other
//! processes appended since the last scan.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::codec::{Decoder, Encoder};
use crate::error::{CacheError, Result};
use crate::{FORMAT_VERSION, INDEX_MAGIC};

/// On-disk associative store mapping key bytes to record bytes
#[derive(Debug)]
pub struct PersistentIndex {
    path: PathBuf,
    file: File,
    entries: FxHashMap<Vec<u8>, Vec<u8>>,
    /// File offset up to which the log has been replayed. Under the lock
    /// this equals the end of file after `refresh`.
    scanned: u64,
}

impl PersistentIndex {
    /// Open or create the index file at `path`, validating the format
    /// header and replaying any existing entries.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                CacheError::io(format!("creating cache directory {}", parent.display()), source)
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|source| {
                CacheError::io(format!("opening cache index {}", path.display()), source)
            })?;

        let len = file
            .metadata()
            .map_err(|source| {
                CacheError::io(format!("reading metadata of {}", path.display()), source)
            })?
            .len();

        let header_len = if len == 0 {
            write_header(&mut file, path)?
        } else {
            validate_header(&mut file, path)?
        };

        let mut index = Self {
            path: path.to_path_buf(),
            file,
            entries: FxHashMap::default(),
            scanned: header_len,
        };
        index.refresh()?;
        info!(
            "opened artifact cache index {} with {} entries",
            index.path.display(),
            index.entries.len()
        );
        Ok(index)
    }

    /// Replay entries appended since the last scan
    ///
    /// Called at the top of every lock scope so that writes other
    /// processes completed before we took the lock become visible.
    pub fn refresh(&mut self) -> Result<()> {
        let end = self
            .file
            .metadata()
            .map_err(|source| {
                CacheError::io(format!("reading metadata of {}", self.path.display()), source)
            })?
            .len();
        if end == self.scanned {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start(self.scanned))
            .map_err(|source| {
                CacheError::io(format!("seeking in {}", self.path.display()), source)
            })?;
        let mut tail = Vec::with_capacity((end - self.scanned) as usize);
        Read::by_ref(&mut self.file)
            .take(end - self.scanned)
            .read_to_end(&mut tail)
            .map_err(|source| {
                CacheError::io(format!("reading {}", self.path.display()), source)
            })?;

        let mut decoder = Decoder::new(&tail);
        while decoder.remaining() > 0 {
            let entry = read_entry(&mut decoder);
            let (key, value) = match entry {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(
                        "corrupt entry in cache index {} at offset {}: {error}",
                        self.path.display(),
                        self.scanned + decoder.position() as u64
                    );
                    return Err(error);
                }
            };
            self.entries.insert(key, value);
        }
        self.scanned = end;
        Ok(())
    }

    /// Latest record bytes stored for `key`, if any
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Append a `key -> value` entry, replacing any prior record for the
    /// key. The bytes are synced before this returns.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut encoder = Encoder::new();
        encoder.write_bytes(key);
        encoder.write_bytes(value);
        let frame = encoder.into_bytes();

        self.file.write_all(&frame).map_err(|source| {
            CacheError::io(format!("appending to cache index {}", self.path.display()), source)
        })?;
        self.file.sync_data().map_err(|source| {
            CacheError::io(format!("syncing cache index {}", self.path.display()), source)
        })?;

        // The handle is in append mode and callers refresh under the
        // lock first, so the frame landed exactly at `scanned`.
        self.scanned += frame.len() as u64;
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Number of distinct keys currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_entry(decoder: &mut Decoder<'_>) -> Result<(Vec<u8>, Vec<u8>)> {
    let key = decoder.read_byte_array()?;
    let value = decoder.read_byte_array()?;
    Ok((key, value))
}

fn write_header(file: &mut File, path: &Path) -> Result<u64> {
    let mut encoder = Encoder::new();
    encoder.write_raw(&INDEX_MAGIC);
    encoder.write_varint(u64::from(FORMAT_VERSION));
    let header = encoder.into_bytes();
    file.write_all(&header).map_err(|source| {
        CacheError::io(format!("writing header of {}", path.display()), source)
    })?;
    file.sync_data().map_err(|source| {
        CacheError::io(format!("syncing header of {}", path.display()), source)
    })?;
    Ok(header.len() as u64)
}

fn validate_header(file: &mut File, path: &Path) -> Result<u64> {
    file.seek(SeekFrom::Start(0)).map_err(|source| {
        CacheError::io(format!("seeking in {}", path.display()), source)
    })?;
    // Magic plus the longest possible version varint
    let mut head = [0u8; 14];
    let read = read_up_to(file, &mut head).map_err(|source| {
        CacheError::io(format!("reading header of {}", path.display()), source)
    })?;

    let mut decoder = Decoder::new(&head[..read]);
    let magic = decoder.read_raw(INDEX_MAGIC.len()).map_err(|_| {
        CacheError::corrupt(format!("cache index {} has no header", path.display()))
    })?;
    if magic != INDEX_MAGIC.as_slice() {
        return Err(CacheError::corrupt(format!(
            "cache index {} has unrecognized magic bytes",
            path.display()
        )));
    }
    let version = decoder.read_varint().map_err(|_| {
        CacheError::corrupt(format!(
            "cache index {} has a truncated version marker",
            path.display()
        ))
    })?;
    if version != u64::from(FORMAT_VERSION) {
        warn!(
            "cache index version mismatch in {}: expected {}, found {version}",
            path.display(),
            FORMAT_VERSION
        );
        return Err(CacheError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: version.try_into().unwrap_or(u32::MAX),
        });
    }
    Ok(decoder.position() as u64)
}

/// Fill as much of `buf` as the file allows, returning the bytes read
fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = file.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
