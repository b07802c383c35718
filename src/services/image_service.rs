//! ImageService — upload validation, record building, and the operations
//! behind the image endpoints.
//!
//! The service owns no state of its own: every operation is request-in,
//! response-out against whatever files the [`FileStore`] directory holds.
//! Validation is a pure function of the original filename and payload
//! length; the filename extension is the authoritative gate, with any
//! content-type sniffing left to the calling handler as a coarse pre-check.

use crate::{
    config::ImagePolicy,
    models::image::ImageRecord,
    services::file_store::{FileStore, StoreError, file_extension},
};
use bytes::Bytes;
use chrono::Utc;
use std::io;
use thiserror::Error;
use tokio::fs::File;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0}")]
    Validation(String),
    #[error("image `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<StoreError> for ImageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => ImageError::NotFound(name),
            // A hostile filename can never name a stored file.
            StoreError::InvalidFilename(name) => ImageError::NotFound(name),
            StoreError::Io(err) => ImageError::Io(err),
        }
    }
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Core operations over stored images. Cheap to clone; carried as the
/// router state and shared by every handler.
#[derive(Clone, Debug)]
pub struct ImageService {
    store: FileStore,
    policy: ImagePolicy,
}

impl ImageService {
    pub fn new(store: FileStore, policy: ImagePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Gate an upload on extension and size. Returns the lowercase
    /// extension on success. Pure; no filesystem access.
    pub fn validate_upload(
        &self,
        original_filename: &str,
        byte_length: u64,
    ) -> ImageResult<String> {
        let extension = file_extension(original_filename);
        if !self.policy.allowed_extensions.contains(&extension) {
            return Err(ImageError::Validation(format!(
                "unsupported file type, allowed: {}",
                self.policy.allowed_extensions.join(", ")
            )));
        }
        if byte_length > self.policy.max_upload_bytes {
            return Err(ImageError::Validation(format!(
                "file exceeds the size limit of {} MiB",
                self.policy.max_upload_mib()
            )));
        }
        Ok(extension)
    }

    /// Validate and persist an upload, returning the record echoed to the
    /// client. The record carries the client-supplied filename; once the
    /// response is gone that name is unrecoverable from disk.
    pub async fn upload(&self, original_filename: &str, bytes: Bytes) -> ImageResult<ImageRecord> {
        let extension = self.validate_upload(original_filename, bytes.len() as u64)?;
        let stored = self.store.save(&bytes, &extension).await?;
        debug!("uploaded `{}` as {}", original_filename, stored);

        Ok(ImageRecord {
            id: stem(&stored).to_string(),
            filename: original_filename.to_string(),
            url: self.url_for(&stored),
            size_bytes: bytes.len() as u64,
            mime_type: mime_for(&extension).to_string(),
            created_at: Utc::now(),
        })
    }

    /// Records for every stored file. Files that vanish between the
    /// directory scan and the stat are silently skipped.
    pub async fn list(&self) -> ImageResult<Vec<ImageRecord>> {
        let mut records = Vec::new();
        for filename in self.store.list().await? {
            match self.build_record(&filename).await {
                Ok(record) => records.push(record),
                Err(ImageError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> ImageResult<ImageRecord> {
        let filename = self.resolve(id).await?;
        self.build_record(&filename).await
    }

    /// Record plus an open read handle, for the download endpoint.
    pub async fn open_download(&self, id: &str) -> ImageResult<(ImageRecord, File)> {
        let filename = self.resolve(id).await?;
        let record = self.build_record(&filename).await?;
        let file = self.store.open(&filename).await?;
        Ok((record, file))
    }

    pub async fn delete(&self, id: &str) -> ImageResult<()> {
        let filename = self.resolve(id).await?;
        self.store.delete(&filename).await?;
        Ok(())
    }

    /// Resolve a public id to a stored filename by scanning the directory
    /// and comparing filename stems for equality. First match wins when two
    /// extensions share a stem; tokens are UUIDs so that is theoretical.
    async fn resolve(&self, id: &str) -> ImageResult<String> {
        for filename in self.store.list().await? {
            if stem(&filename) == id {
                return Ok(filename);
            }
        }
        Err(ImageError::NotFound(id.to_string()))
    }

    /// Derive a record from a stored filename and its filesystem metadata.
    /// The stored filename stands in for the original, which is not kept.
    async fn build_record(&self, filename: &str) -> ImageResult<ImageRecord> {
        let (size_bytes, created_at) = self.store.stat(filename).await?;
        Ok(ImageRecord {
            id: stem(filename).to_string(),
            filename: filename.to_string(),
            url: self.url_for(filename),
            size_bytes,
            mime_type: mime_for(&file_extension(filename)).to_string(),
            created_at,
        })
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.policy.url_prefix, filename)
    }
}

/// Stored filename without its extension: the public id.
fn stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => filename,
    }
}

/// Fixed four-way MIME mapping; anything else is treated as jpeg.
pub fn mime_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImagePolicy;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ImageService {
        let policy = ImagePolicy::default();
        let store = FileStore::new(dir.path(), policy.allowed_extensions.clone());
        ImageService::new(store, policy)
    }

    #[test]
    fn validator_accepts_allowed_extensions_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert_eq!(svc.validate_upload("photo.JPG", 1024).unwrap(), "jpg");
        assert_eq!(svc.validate_upload("a.b.webp", 1024).unwrap(), "webp");
    }

    #[test]
    fn validator_rejects_disallowed_extension() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert!(matches!(
            svc.validate_upload("virus.exe", 10),
            Err(ImageError::Validation(_))
        ));
        // no dot means an empty extension, which is never allow-listed
        assert!(matches!(
            svc.validate_upload("README", 10),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn validator_rejects_oversized_payload_with_limit_in_message() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc
            .validate_upload("big.png", 11 * 1024 * 1024)
            .unwrap_err();
        match err {
            ImageError::Validation(msg) => assert!(msg.contains("10 MiB"), "message: {msg}"),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn mime_defaults_to_jpeg() {
        assert_eq!(mime_for("png"), "image/png");
        assert_eq!(mime_for("jpg"), "image/jpeg");
        assert_eq!(mime_for("jpeg"), "image/jpeg");
        assert_eq!(mime_for("anything"), "image/jpeg");
    }

    #[tokio::test]
    async fn upload_then_list_contains_exactly_that_record() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let record = svc.upload("cat.png", Bytes::from_static(b"pngbytes")).await.unwrap();
        assert_eq!(record.filename, "cat.png");
        assert_eq!(record.size_bytes, 8);
        assert_eq!(record.mime_type, "image/png");
        assert!(record.url.ends_with(&format!("{}.png", record.id)));

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
        assert_eq!(listed[0].size_bytes, 8);
    }

    #[tokio::test]
    async fn rejected_upload_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let result = svc.upload("virus.exe", Bytes::from_static(b"mz")).await;
        assert!(matches!(result, Err(ImageError::Validation(_))));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_original_filename_yields_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let first = svc.upload("dup.gif", Bytes::from_static(b"a")).await.unwrap();
        let second = svc.upload("dup.gif", Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(svc.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_and_download_resolve_by_id() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let uploaded = svc.upload("dog.webp", Bytes::from_static(b"webp!")).await.unwrap();
        let fetched = svc.get(&uploaded.id).await.unwrap();
        assert_eq!(fetched.id, uploaded.id);
        assert_eq!(fetched.mime_type, "image/webp");
        // reads substitute the stored filename for the lost original
        assert_eq!(fetched.filename, format!("{}.webp", uploaded.id));

        let (record, _file) = svc.open_download(&uploaded.id).await.unwrap();
        assert_eq!(record.size_bytes, 5);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let uploaded = svc.upload("gone.jpg", Bytes::from_static(b"x")).await.unwrap();
        svc.delete(&uploaded.id).await.unwrap();

        assert!(matches!(
            svc.get(&uploaded.id).await,
            Err(ImageError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(&uploaded.id).await,
            Err(ImageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_without_panicking() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert!(matches!(
            svc.get("no-such-token").await,
            Err(ImageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn id_resolution_requires_full_stem_match() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let uploaded = svc.upload("p.png", Bytes::from_static(b"p")).await.unwrap();
        let prefix = &uploaded.id[..8];
        assert!(matches!(
            svc.get(prefix).await,
            Err(ImageError::NotFound(_))
        ));
    }
}
