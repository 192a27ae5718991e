//! File-backed secret store.
//!
//! The whole store is one JSON object mapping hex-encoded keys to
//! base64-encoded values. Every mutation rewrites the document into a
//! sibling temp file and renames it over the target, so readers never
//! observe a half-written file. Clones of one [`FileStore`] share a lock and
//! serialize their read-modify-write cycles; separate processes pointed at
//! the same path remain last-writer-wins.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{ensure_key, SecretStore, StorageError, StoreKind};

type Document = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Opens the store at `path`, creating an empty document if the file is missing.
    ///
    /// Fails if the existing file is not a valid store document.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let store = Self { path, lock: Arc::new(Mutex::new(())) };

        match fs::metadata(&store.path).await {
            Ok(meta) if meta.is_file() => {
                let entries = store.load().await?.len();
                info!(entries, "Opened file store");
            }
            Ok(_) => {
                return Err(StorageError::io(
                    io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                    format!("Cannot use {} as a secret file", store.path.display()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        StorageError::io(e, format!("Failed to create {}", parent.display()))
                    })?;
                }
                store.persist(&Document::new()).await?;
                info!("Created empty file store");
            }
            Err(e) => {
                return Err(StorageError::io(
                    e,
                    format!("Failed to stat {}", store.path.display()),
                ));
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, StorageError> {
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::io(e, format!("Failed to read {}", self.path.display())))?;

        if raw.trim().is_empty() {
            return Ok(Document::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            StorageError::serialization(e, format!("Invalid store document in {}", self.path.display()))
        })
    }

    async fn persist(&self, document: &Document) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(document)
            .map_err(|e| StorageError::serialization(e, "Failed to encode store document"))?;

        let temp = self.temp_path();
        if let Err(e) = write_synced(&temp, &bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::io(e, format!("Failed to write {}", temp.display())));
        }

        if let Err(e) = fs::rename(&temp, &self.path).await {
            warn!(error = %e, "Rename of temp file failed");
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::io(
                e,
                format!("Failed to replace {}", self.path.display()),
            ));
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "secrets".to_string());
        self.path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait]
impl SecretStore for FileStore {
    #[instrument(skip_all, fields(backend = "file", value_len = value.len()))]
    async fn save_data(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        ensure_key(key)?;
        let _guard = self.lock.lock().await;

        let mut document = self.load().await?;
        let field = hex::encode(key);
        if value.is_empty() {
            let removed = document.remove(&field).is_some();
            debug!(removed, "Deleting record");
        } else {
            document.insert(field, STANDARD.encode(value));
        }

        self.persist(&document).await
    }

    #[instrument(skip_all, fields(backend = "file"))]
    async fn read_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        ensure_key(key)?;
        let _guard = self.lock.lock().await;

        let document = self.load().await?;
        match document.get(&hex::encode(key)) {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(|_| StorageError::corrupted(StoreKind::File, "value is not valid base64")),
            None => Ok(None),
        }
    }

    fn kind(&self) -> StoreKind {
        StoreKind::File
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.load().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_in(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("secrets.json")).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "{}");
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("nested/deeper/file.txt")).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_open_accepts_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.read_data(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_open_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = FileStore::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn test_save_then_read() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.save_data(b"key", b"value").await.unwrap();
        assert_eq!(store.read_data(b"key").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_record() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.save_data(b"key", b"first").await.unwrap();
        store.save_data(b"key", b"second").await.unwrap();

        assert_eq!(store.read_data(b"key").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_value_deletes() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.save_data(b"key", b"value").await.unwrap();
        store.save_data(b"key", b"").await.unwrap();

        assert_eq!(store.read_data(b"key").await.unwrap(), None);
        // deleting something that is already gone is not an error
        store.save_data(b"key", b"").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        assert_eq!(store.read_data(b"absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        assert!(matches!(store.save_data(b"", b"v").await, Err(StorageError::InvalidKey)));
        assert!(matches!(store.read_data(b"").await, Err(StorageError::InvalidKey)));
    }

    #[tokio::test]
    async fn test_document_layout_uses_hex_keys_and_base64_values() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        store.save_data(&[0x00, 0xff], b"hello").await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["00ff"], "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");

        FileStore::open(&path).await.unwrap().save_data(b"k", b"v").await.unwrap();
        let reopened = FileStore::open(&path).await.unwrap();

        assert_eq!(reopened.read_data(b"k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, r#"{"6b":"***"}"#).unwrap();

        let store = FileStore::open(&path).await.unwrap();
        let err = store.read_data(b"k").await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { backend: StoreKind::File, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save_data(&[b'k', i], &[i + 1]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 16);
        for i in 0..16u8 {
            assert_eq!(store.read_data(&[b'k', i]).await.unwrap(), Some(vec![i + 1]));
        }
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        store.save_data(b"a", b"1").await.unwrap();
        store.save_data(b"a", b"").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["secrets.json".to_string()]);
    }
}
