//! BlobStore: image payloads kept as flat files beneath a single root
//! directory. There is no cache: every listing re-reads the directory.

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut, stream};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_IDENTIFIER_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("invalid blob identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("blob `{0}` not found")]
    NotFound(String),
    #[error("blob `{0}` already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BlobResult<T> = Result<T, BlobStoreError>;

/// An opened blob ready to be streamed out.
#[derive(Debug)]
pub struct BlobHandle {
    pub identifier: String,
    pub file: File,
    pub len: u64,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    /// Directory holding every blob.
    pub root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject identifiers that could escape `root` or collide with the
    /// hidden temporary files used while writing.
    fn ensure_identifier_safe(identifier: &str) -> BlobResult<()> {
        let invalid = identifier.is_empty()
            || identifier.len() > MAX_IDENTIFIER_LEN
            || identifier.starts_with('.')
            || identifier.contains("..")
            || identifier
                .bytes()
                .any(|b| b == b'/' || b == b'\\' || b == b'\0' || b.is_ascii_control());
        if invalid {
            return Err(BlobStoreError::InvalidIdentifier(identifier.to_string()));
        }
        Ok(())
    }

    /// Canonical on-disk path for `identifier`. The blob need not exist.
    pub fn get_path(&self, identifier: &str) -> BlobResult<PathBuf> {
        Self::ensure_identifier_safe(identifier)?;
        Ok(self.root.join(identifier))
    }

    /// Stream bytes into `identifier`.
    ///
    /// Data lands in a hidden temp file first, is fsynced and then linked
    /// into place, so a failed write never leaves a partial blob visible.
    /// Blobs are immutable: an existing identifier is refused, never
    /// overwritten. Returns the number of bytes written.
    pub async fn store<S>(&self, identifier: &str, stream: S) -> BlobResult<u64>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let file_path = self.get_path(identifier)?;
        fs::create_dir_all(&self.root).await?;
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(BlobStoreError::Io(err));
                }
            };
            size += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BlobStoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }

        // hard_link fails on an existing target, unlike rename.
        let linked = fs::hard_link(&tmp_path, &file_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match linked {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobStoreError::AlreadyExists(identifier.to_string()));
            }
            Err(err) => return Err(BlobStoreError::Io(err)),
        }

        debug!("stored blob {} ({} bytes)", file_path.display(), size);
        Ok(size)
    }

    /// Convenience wrapper around [`BlobStore::store`] for in-memory payloads.
    pub async fn store_bytes(&self, identifier: &str, bytes: impl Into<Bytes>) -> BlobResult<u64> {
        let bytes = bytes.into();
        self.store(identifier, stream::iter([Ok::<_, io::Error>(bytes)]))
            .await
    }

    /// Enumerate every stored identifier.
    ///
    /// The directory is opened afresh on each call and read lazily as the
    /// stream is polled. Order follows the filesystem. Hidden files are
    /// skipped, and a missing root yields an empty listing.
    pub fn load_all(&self) -> impl Stream<Item = BlobResult<String>> + Send + 'static {
        enum State {
            Unopened(PathBuf),
            Reading(fs::ReadDir),
            Done,
        }

        stream::unfold(State::Unopened(self.root.clone()), |state| async move {
            let mut dir = match state {
                State::Unopened(root) => match fs::read_dir(&root).await {
                    Ok(dir) => dir,
                    Err(err) if err.kind() == ErrorKind::NotFound => return None,
                    Err(err) => return Some((Err(BlobStoreError::Io(err)), State::Done)),
                },
                State::Reading(dir) => dir,
                State::Done => return None,
            };

            loop {
                match dir.next_entry().await {
                    Ok(Some(entry)) => {
                        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                            continue;
                        };
                        if name.starts_with('.') {
                            continue;
                        }
                        match entry.file_type().await {
                            Ok(kind) if kind.is_file() => {
                                return Some((Ok(name), State::Reading(dir)));
                            }
                            Ok(_) => continue,
                            Err(err) => {
                                return Some((Err(BlobStoreError::Io(err)), State::Reading(dir)));
                            }
                        }
                    }
                    Ok(None) => return None,
                    Err(err) => return Some((Err(BlobStoreError::Io(err)), State::Done)),
                }
            }
        })
    }

    /// Open `identifier` for reading.
    pub async fn load_as_resource(&self, identifier: &str) -> BlobResult<BlobHandle> {
        let file_path = self.get_path(identifier)?;
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BlobStoreError::NotFound(identifier.to_string())
            } else {
                BlobStoreError::Io(err)
            }
        })?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(BlobStoreError::NotFound(identifier.to_string()));
        }

        Ok(BlobHandle {
            identifier: identifier.to_string(),
            file,
            len: metadata.len(),
        })
    }
}
