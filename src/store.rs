//! Riff catalog storage
//!
//! Owns the audio files and the JSON metadata catalog. The similarity core
//! only ever reads from the store, through the [`AudioCatalog`] contract;
//! all mutation (upload, delete, persistence) lives here.
//!
//! Persistence is a pretty-printed `riffs.json` next to a `riffs/` directory
//! of audio files. This is deliberately simple: no durability or multi-process
//! safety is promised beyond the in-process lock.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::Riff;

const CATALOG_FILE: &str = "riffs.json";
const AUDIO_DIR: &str = "riffs";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("riff not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read-only view of the catalog consumed by the similarity core.
#[async_trait]
pub trait AudioCatalog: Send + Sync {
    /// All known riff ids, in catalog order (newest first).
    async fn list_ids(&self) -> Vec<String>;

    /// Raw audio bytes for one riff.
    async fn audio_bytes(&self, id: &str) -> Result<Vec<u8>, StoreError>;
}

/// Filesystem-backed riff store.
pub struct RiffStore {
    data_dir: PathBuf,
    riffs: RwLock<Vec<Riff>>,
}

impl RiffStore {
    /// Open (or initialize) a store rooted at `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(data_dir.join(AUDIO_DIR)).await?;

        let catalog_path = data_dir.join(CATALOG_FILE);
        let riffs: Vec<Riff> = if catalog_path.exists() {
            let content = tokio::fs::read(&catalog_path).await?;
            serde_json::from_slice(&content)?
        } else {
            Vec::new()
        };

        info!(
            data_dir = %data_dir.display(),
            riff_count = riffs.len(),
            "riff store opened"
        );

        Ok(Self {
            data_dir,
            riffs: RwLock::new(riffs),
        })
    }

    /// Directory holding the stored audio files (served statically).
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join(AUDIO_DIR)
    }

    /// All riffs, newest first.
    pub async fn list(&self) -> Vec<Riff> {
        self.riffs.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Riff> {
        self.riffs.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Store a new riff: write the audio file, then prepend the metadata
    /// entry and persist the catalog.
    pub async fn add(
        &self,
        id: String,
        name: String,
        date: String,
        original_filename: &str,
        bytes: &[u8],
        duration: f64,
    ) -> Result<Riff, StoreError> {
        let filename = stored_filename(&id, original_filename);
        tokio::fs::write(self.audio_dir().join(&filename), bytes).await?;

        let riff = Riff {
            id,
            name,
            date,
            audio_url: format!("/audio_files/{filename}"),
            duration,
        };

        let mut riffs = self.riffs.write().await;
        riffs.insert(0, riff.clone());
        self.persist(&riffs).await?;

        info!(riff_id = %riff.id, file = %filename, "riff stored");
        Ok(riff)
    }

    /// Delete a riff's metadata and audio file.
    ///
    /// A missing audio file is logged but does not fail the delete; the
    /// metadata entry is removed either way.
    pub async fn delete(&self, id: &str) -> Result<Riff, StoreError> {
        let mut riffs = self.riffs.write().await;
        let position = riffs
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let riff = riffs.remove(position);

        let path = self.audio_path(&riff);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(riff_id = %id, path = %path.display(), "audio file already missing");
            }
            Err(e) => return Err(e.into()),
        }

        self.persist(&riffs).await?;
        info!(riff_id = %id, "riff deleted");
        Ok(riff)
    }

    fn audio_path(&self, riff: &Riff) -> PathBuf {
        let filename = Path::new(&riff.audio_url)
            .file_name()
            .unwrap_or_default()
            .to_owned();
        self.audio_dir().join(filename)
    }

    async fn persist(&self, riffs: &[Riff]) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(riffs)?;
        tokio::fs::write(self.data_dir.join(CATALOG_FILE), content).await?;
        Ok(())
    }
}

#[async_trait]
impl AudioCatalog for RiffStore {
    async fn list_ids(&self) -> Vec<String> {
        self.riffs.read().await.iter().map(|r| r.id.clone()).collect()
    }

    async fn audio_bytes(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let riff = self
            .get(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let bytes = tokio::fs::read(self.audio_path(&riff)).await?;
        Ok(bytes)
    }
}

/// Build the on-disk filename for an upload: `<id>_<sanitized stem>.<ext>`.
///
/// Everything non-alphanumeric in the client-supplied stem becomes `_`; the
/// extension is kept (lowercased) when it is plain alphanumeric.
fn stored_filename(id: &str, original: &str) -> String {
    let path = Path::new(original);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("riff");
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    match path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("{id}_{sanitized}.{}", ext.to_ascii_lowercase()),
        None => format!("{id}_{sanitized}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_with_riff(dir: &TempDir) -> (RiffStore, Riff) {
        let store = RiffStore::open(dir.path()).await.unwrap();
        let riff = store
            .add(
                "riff-1".to_string(),
                "My Riff".to_string(),
                "2026-08-01".to_string(),
                "take one.wav",
                b"fake audio bytes",
                2.5,
            )
            .await
            .unwrap();
        (store, riff)
    }

    #[tokio::test]
    async fn add_persists_and_lists_newest_first() {
        let dir = TempDir::new().unwrap();
        let (store, first) = store_with_riff(&dir).await;

        store
            .add(
                "riff-2".to_string(),
                "Second".to_string(),
                "2026-08-02".to_string(),
                "second.wav",
                b"more bytes",
                1.0,
            )
            .await
            .unwrap();

        let riffs = store.list().await;
        assert_eq!(riffs.len(), 2);
        assert_eq!(riffs[0].id, "riff-2");
        assert_eq!(riffs[1].id, first.id);

        // Reopen from disk; catalog must survive.
        drop(store);
        let reopened = RiffStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list().await.len(), 2);
    }

    #[tokio::test]
    async fn audio_bytes_round_trip() {
        let dir = TempDir::new().unwrap();
        let (store, riff) = store_with_riff(&dir).await;

        let bytes = store.audio_bytes(&riff.id).await.unwrap();
        assert_eq!(bytes, b"fake audio bytes");

        assert!(matches!(
            store.audio_bytes("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_metadata_and_file() {
        let dir = TempDir::new().unwrap();
        let (store, riff) = store_with_riff(&dir).await;

        let audio_path = store.audio_path(&riff);
        assert!(audio_path.exists());

        store.delete(&riff.id).await.unwrap();
        assert!(!audio_path.exists());
        assert!(store.list().await.is_empty());

        assert!(matches!(
            store.delete(&riff.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_with_missing_audio_file_still_removes_entry() {
        let dir = TempDir::new().unwrap();
        let (store, riff) = store_with_riff(&dir).await;

        tokio::fs::remove_file(store.audio_path(&riff)).await.unwrap();
        store.delete(&riff.id).await.unwrap();
        assert!(store.list().await.is_empty());
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(
            stored_filename("abc", "my riff (final)!.WAV"),
            "abc_my_riff__final__.wav"
        );
        assert_eq!(stored_filename("abc", "noext"), "abc_noext");
        assert_eq!(stored_filename("abc", "weird.e{x}t"), "abc_weird");
    }
}
