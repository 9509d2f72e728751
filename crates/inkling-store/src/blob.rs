//! Drawing image storage.
//!
//! A put must never expose a half-written file. [`FsBlobStore`] writes to
//! a uniquely named temporary file next to the destination, syncs it, and
//! renames it into place; the temporary file is removed on every failure
//! path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use inkling_protocol::{GameId, PlayerId, RoomCode};
use parking_lot::Mutex;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::BlobError;

/// File name used when an upload arrives without a usable one.
pub const DEFAULT_FILE_NAME: &str = "drawing.png";

/// Where a drawing lives: one directory per room and round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobKey {
    pub room_code: RoomCode,
    pub game_id: GameId,
    pub player_id: PlayerId,
    file_name: String,
}

impl BlobKey {
    /// `file_name` is reduced to its final path component; an empty or
    /// dot-only name falls back to [`DEFAULT_FILE_NAME`].
    pub fn new(
        room_code: RoomCode,
        game_id: GameId,
        player_id: PlayerId,
        file_name: Option<&str>,
    ) -> Self {
        Self {
            room_code,
            game_id,
            player_id,
            file_name: sanitize_file_name(file_name.unwrap_or_default()),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `{code}/{game}/{player}_{file}`, always with `/` separators.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}_{}",
            self.room_code, self.game_id.0, self.player_id.0, self.file_name
        )
    }
}

fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last.chars().all(|c| c == '.') {
        DEFAULT_FILE_NAME.to_string()
    } else {
        last.to_string()
    }
}

/// The blob store collaborator.
pub trait BlobStore: Send + Sync + 'static {
    /// Publishes `bytes` under `key` and returns the stored relative path.
    ///
    /// Readers see either the previous content or all of `bytes`, never a
    /// prefix.
    fn put(&self, key: BlobKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, BlobError>>;

    /// The URL a client should fetch `path` from.
    fn resolve(&self, path: &str) -> String;
}

// ---------------------------------------------------------------------------
// FsBlobStore
// ---------------------------------------------------------------------------

/// Stores blobs under a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl FsBlobStore {
    /// `public_prefix` is prepended by [`resolve`](BlobStore::resolve),
    /// e.g. `/uploads`.
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

async fn write_then_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, dest).await
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: BlobKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, BlobError>> {
        Box::pin(async move {
            let relative = key.relative_path();
            let dest = self.root.join(&relative);
            let dir = dest.parent().unwrap_or(&self.root).to_path_buf();
            tokio::fs::create_dir_all(&dir).await?;

            let nonce: u64 = rand::rng().random();
            let tmp = dir.join(format!(".{}.{nonce:016x}.tmp", key.file_name()));

            if let Err(e) = write_then_rename(&tmp, &dest, &bytes).await {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                    tracing::debug!(path = %tmp.display(), error = %cleanup, "temp file cleanup failed");
                }
                tracing::warn!(path = %relative, error = %e, "blob write failed");
                return Err(BlobError::Io(e));
            }

            tracing::debug!(path = %relative, size = bytes.len(), "blob stored");
            Ok(relative)
        })
    }

    fn resolve(&self, path: &str) -> String {
        format!("{}/{}", self.public_prefix, path.trim_start_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

/// Keeps blobs in a map. Used by tests and ephemeral servers.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: BlobKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, BlobError>> {
        Box::pin(async move {
            let path = key.relative_path();
            self.blobs.lock().insert(path.clone(), bytes);
            Ok(path)
        })
    }

    fn resolve(&self, path: &str) -> String {
        format!("/uploads/{path}")
    }
}
