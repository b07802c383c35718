//! FileStore — thin wrapper over the single flat upload directory.
//!
//! The directory is the system of record: no index is kept across requests,
//! so every listing is a fresh scan and reflects concurrent external changes.
//! Filenames are always `<uuid>.<ext>` with the extension drawn from the
//! configured allow-list.

use chrono::{DateTime, Utc};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("invalid filename `{0}`")]
    InvalidFilename(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Extract the extension as the lowercase substring after the last `.`.
/// A name with no dot yields an empty string.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Direct filesystem operations over one flat directory.
///
/// Stateless between calls; safe to clone into every request handler.
#[derive(Clone, Debug)]
pub struct FileStore {
    base_path: PathBuf,
    allowed_extensions: Vec<String>,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>, allowed_extensions: Vec<String>) -> Self {
        Self {
            base_path: base_path.into(),
            allowed_extensions,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Basic filename validation to avoid trivial path traversal vectors.
    ///
    /// Stored names are generated UUIDs, so anything with separators,
    /// parent references, or control bytes is hostile input.
    fn ensure_name_safe(&self, filename: &str) -> StoreResult<()> {
        if filename.is_empty()
            || filename.contains("..")
            || filename
                .bytes()
                .any(|b| b == b'/' || b == b'\\' || b == b'\0' || b.is_ascii_control())
        {
            return Err(StoreError::InvalidFilename(filename.to_string()));
        }
        Ok(())
    }

    /// Resolve a stored filename to its on-disk path.
    fn path_of(&self, filename: &str) -> StoreResult<PathBuf> {
        self.ensure_name_safe(filename)?;
        Ok(self.base_path.join(filename))
    }

    /// Persist `bytes` under a freshly generated unique name and return it.
    ///
    /// Directory creation is lazy and idempotent. The write is a single
    /// buffered write with no partial-write recovery; on failure the partial
    /// file is removed best-effort and the I/O error is surfaced.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> StoreResult<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        fs::create_dir_all(&self.base_path).await?;

        let path = self.base_path.join(&filename);
        let mut file = File::create(&path).await?;
        if let Err(err) = file.write_all(bytes).await {
            let _ = fs::remove_file(&path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&path).await;
            return Err(StoreError::Io(err));
        }

        debug!("stored {} ({} bytes)", path.display(), bytes.len());
        Ok(filename)
    }

    /// Scan the directory and return every regular file whose extension is
    /// allow-listed. Order is whatever the filesystem yields. A directory
    /// that does not exist yet lists as empty.
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.allowed_extensions.contains(&file_extension(&name)) {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_of(filename) {
            Ok(path) => fs::metadata(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Byte length and creation time of a stored file.
    ///
    /// Falls back to mtime on filesystems without birth-time support, so the
    /// timestamp is an approximation of the upload instant, not a replay.
    pub async fn stat(&self, filename: &str) -> StoreResult<(u64, DateTime<Utc>)> {
        let path = self.path_of(filename)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|err| self.map_not_found(err, filename))?;
        let created = meta.created().or_else(|_| meta.modified())?;
        Ok((meta.len(), DateTime::<Utc>::from(created)))
    }

    /// Open a stored file for streaming out.
    pub async fn open(&self, filename: &str) -> StoreResult<File> {
        let path = self.path_of(filename)?;
        File::open(&path)
            .await
            .map_err(|err| self.map_not_found(err, filename))
    }

    /// Remove a stored file. `NotFound` if it is already absent.
    pub async fn delete(&self, filename: &str) -> StoreResult<()> {
        let path = self.path_of(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(())
            }
            Err(err) => Err(self.map_not_found(err, filename)),
        }
    }

    fn map_not_found(&self, err: io::Error, filename: &str) -> StoreError {
        if err.kind() == ErrorKind::NotFound {
            StoreError::NotFound(filename.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileStore {
        FileStore::new(
            dir.path(),
            vec!["jpg".into(), "jpeg".into(), "png".into(), "gif".into(), "webp".into()],
        )
    }

    #[test]
    fn extension_is_lowercased_substring_after_last_dot() {
        assert_eq!(file_extension("photo.JPG"), "jpg");
        assert_eq!(file_extension("a.b.png"), "png");
        assert_eq!(file_extension("no_extension"), "");
    }

    #[tokio::test]
    async fn save_generates_distinct_names_and_preserves_bytes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = store.save(b"first", "png").await.unwrap();
        let second = store.save(b"first", "png").await.unwrap();
        assert_ne!(first, second);

        let (size, _) = store.stat(&first).await.unwrap();
        assert_eq!(size, 5);
    }

    #[tokio::test]
    async fn list_skips_subdirectories_and_unrecognized_extensions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let kept = store.save(b"x", "gif").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"nope").await.unwrap();
        fs::create_dir(dir.path().join("sub.png")).await.unwrap();

        let names = store.list().await.unwrap();
        assert_eq!(names, vec![kept]);
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("never-created"), vec!["png".into()]);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_not_found_for_absent_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let name = store.save(b"bytes", "jpg").await.unwrap();
        store.delete(&name).await.unwrap();
        assert!(matches!(
            store.delete(&name).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_filenames_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(matches!(
            store.stat("../outside.png").await,
            Err(StoreError::InvalidFilename(_))
        ));
        assert!(matches!(
            store.delete("a/b.png").await,
            Err(StoreError::InvalidFilename(_))
        ));
        assert!(!store.exists("..").await);
    }
}
