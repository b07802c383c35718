//! Represents a stored image as seen by API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata view of one stored image file.
///
/// Derived on demand from the filename and filesystem attributes; the bytes
/// themselves live on disk and are never carried by this struct.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImageRecord {
    /// Public identifier: the generated token, i.e. the stored filename
    /// without its extension.
    pub id: String,

    /// Original filename at upload time; later reads substitute the stored
    /// filename since the original is not recoverable from disk.
    pub filename: String,

    /// Public path at which the raw file is served.
    pub url: String,

    /// Current byte length of the stored file.
    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// MIME type inferred from the stored extension.
    pub mime_type: String,

    /// Upload instant when freshly uploaded; on later reads the filesystem
    /// creation timestamp, which is a platform-dependent approximation.
    pub created_at: DateTime<Utc>,
}
