//! Filesystem backend
//!
//! One file per key.
//!
//! ## On-Disk Layout
//! ```text
//! {root}/
//!   ├── a/
//!   │   └── b/
//!   │       └── c.data      (key /a/b/c)
//!   └── top.data            (key /top)
//! ```
//!
//! Values are written to a uniquely named temp file in the target
//! directory and renamed over the destination, so readers never observe a
//! partially written value.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::config::FsConfig;
use crate::datastore::{Batch, Datastore};
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::query::{self, Entry, Query, QueryStream};

/// Name prefix of in-flight temp files; never decoded as keys
const TEMP_PREFIX: &str = ".atlasds-tmp-";

/// Batch writes in flight at once (bounds open file handles)
const MAX_CONCURRENT_WRITES: usize = 32;

/// Datastore backed by a directory tree
///
/// Keys are written to the filesystem as-is (after normalization), so
/// each namespace must be a valid file name on the host. A key whose last
/// namespace starts with `.atlasds-tmp-` collides with in-flight temp
/// files and is rejected by `put`.
pub struct FsDatastore {
    /// Absolute root directory
    root: PathBuf,

    config: FsConfig,

    /// Uniquifier for temp file names
    next_temp_id: AtomicU64,
}

impl FsDatastore {
    /// Open a store rooted at `path`
    ///
    /// - Missing root: created when `create_if_missing`, otherwise an error
    /// - Existing root: an error when `error_if_exists`
    pub async fn open(path: impl AsRef<Path>, config: FsConfig) -> Result<Self> {
        let path = path.as_ref();
        let exists = fs::try_exists(path).await?;

        if exists && config.error_if_exists {
            return Err(AtlasError::Config(format!(
                "Datastore directory: {} already exists",
                path.display()
            )));
        }

        if !exists {
            if !config.create_if_missing {
                return Err(AtlasError::Config(format!(
                    "Datastore directory: {} does not exist",
                    path.display()
                )));
            }
            fs::create_dir_all(path).await?;
            debug!(root = %path.display(), "Created datastore directory");
        }

        let root = fs::canonicalize(path).await?;
        debug!(root = %root.display(), extension = %config.extension, "Opened filesystem datastore");

        Ok(Self {
            root,
            config,
            next_temp_id: AtomicU64::new(0),
        })
    }

    /// Open with default options
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, FsConfig::default()).await
    }

    /// The absolute root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    // =========================================================================
    // Key <-> Path
    // =========================================================================

    /// Directory and file path for `key`
    ///
    /// `/a/b/c` → (`{root}/a/b`, `{root}/a/b/c.data`)
    pub fn encode(&self, key: &Key) -> (PathBuf, PathBuf) {
        let mut dir = self.root.clone();
        for ns in key.parent().list() {
            dir.push(ns);
        }
        let file = dir.join(format!("{}{}", key.base_namespace(), self.config.extension));
        (dir, file)
    }

    /// Recover the key for a value file path
    pub fn decode(&self, file: &Path) -> Result<Key> {
        let relative = file.strip_prefix(&self.root).map_err(|_| {
            AtlasError::InvalidKey(format!("{} is outside {}", file.display(), self.root.display()))
        })?;

        let mut namespaces = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(s) => namespaces.push(s),
                    None => {
                        return Err(AtlasError::InvalidKey(format!(
                            "Non UTF-8 path: {}",
                            file.display()
                        )))
                    }
                },
                _ => {
                    return Err(AtlasError::InvalidKey(format!(
                        "Unexpected path component in {}",
                        file.display()
                    )))
                }
            }
        }

        let ext = self.config.extension.as_str();
        let leaf = namespaces
            .pop()
            .and_then(|name| name.strip_suffix(ext))
            .ok_or_else(|| {
                AtlasError::InvalidKey(format!(
                    "Invalid extension: {} (expected {})",
                    file.display(),
                    ext
                ))
            })?;
        namespaces.push(leaf);

        Ok(Key::with_namespaces(&namespaces))
    }

    fn is_value_file(&self, path: &Path) -> bool {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => !name.starts_with(TEMP_PREFIX) && name.ends_with(&self.config.extension),
            None => false,
        }
    }

    // =========================================================================
    // Atomic Write
    // =========================================================================

    async fn write_atomic(&self, dir: &Path, file: &Path, value: &[u8]) -> Result<()> {
        let id = self.next_temp_id.fetch_add(1, Ordering::Relaxed);
        let temp = dir.join(format!("{}{}-{}", TEMP_PREFIX, std::process::id(), id));

        let written = async {
            let mut handle = fs::File::create(&temp).await?;
            handle.write_all(value).await?;
            handle.sync_all().await?;
            drop(handle);
            fs::rename(&temp, file).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Datastore for FsDatastore {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        if key.base_namespace().starts_with(TEMP_PREFIX) {
            return Err(AtlasError::InvalidKey(format!(
                "{} uses the reserved prefix {}",
                key, TEMP_PREFIX
            )));
        }
        let (dir, file) = self.encode(key);
        fs::create_dir_all(&dir).await?;
        self.write_atomic(&dir, &file, &value).await?;
        trace!(%key, bytes = value.len(), "put");
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        let (_, file) = self.encode(key);
        match fs::read(&file).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AtlasError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        let (_, file) = self.encode(key);
        match fs::metadata(&file).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let (_, file) = self.encode(key);
        match fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        let (puts, deletes) = batch.into_parts();
        debug!(puts = puts.len(), deletes = deletes.len(), "Committing batch");

        stream::iter(puts)
            .map(|(key, value)| async move { self.put(&key, value).await })
            .buffer_unordered(MAX_CONCURRENT_WRITES)
            .try_collect::<()>()
            .await?;
        stream::iter(deletes)
            .map(|key| async move { self.delete(&key).await })
            .buffer_unordered(MAX_CONCURRENT_WRITES)
            .try_collect::<()>()
            .await
    }

    fn query(&self, q: Query) -> QueryStream<'_> {
        let keys_only = q.keys_only;
        let prefix_query = q.clone();

        let source = walk_files(self.root.clone())
            .map_err(AtlasError::from)
            .try_filter_map(move |path| {
                let decoded = if self.is_value_file(&path) {
                    self.decode(&path).map(|key| Some((key, path)))
                } else {
                    Ok(None)
                };
                let candidate = decoded.map(|found| {
                    found.filter(|(key, _)| query::prefix_matches(key, &prefix_query))
                });
                async move { candidate }
            })
            .try_filter_map(move |(key, path)| async move {
                if keys_only {
                    return Ok(Some(Entry::key_only(key)));
                }
                match fs::read(&path).await {
                    Ok(data) => Ok(Some(Entry::new(key, Bytes::from(data)))),
                    // Removed since it was listed
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(AtlasError::from(e)),
                }
            });

        query::execute(source, q)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for FsDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDatastore")
            .field("root", &self.root)
            .field("extension", &self.config.extension)
            .finish()
    }
}

// =============================================================================
// Directory Walk
// =============================================================================

struct WalkState {
    /// Directories still to visit
    pending: Vec<PathBuf>,

    /// The one directory handle open at a time
    current: Option<fs::ReadDir>,
}

/// Lazily yield every regular file below `root`, depth first
///
/// At most one directory handle is open at once; dropping the stream
/// closes it.
fn walk_files(root: PathBuf) -> impl Stream<Item = std::io::Result<PathBuf>> + Send {
    let state = WalkState {
        pending: vec![root],
        current: None,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(dir) = state.current.as_mut() {
                match dir.next_entry().await? {
                    Some(entry) => {
                        let file_type = entry.file_type().await?;
                        if file_type.is_dir() {
                            state.pending.push(entry.path());
                        } else if file_type.is_file() {
                            return Ok(Some((entry.path(), state)));
                        }
                        continue;
                    }
                    None => state.current = None,
                }
            }

            match state.pending.pop() {
                Some(dir) => match fs::read_dir(&dir).await {
                    Ok(handle) => state.current = Some(handle),
                    // Removed since it was listed
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                },
                None => return Ok(None),
            }
        }
    })
}
