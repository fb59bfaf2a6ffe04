//! Blob storage for uploads and derived artifacts.
//!
//! For an upload stored at key `K` the pipeline writes:
//!
//! | Key | Content |
//! |-----|---------|
//! | `K_raw.json` | combined raw analysis blocks |
//! | `K_parsed.txt` | flattened text |
//! | `K_LM_info.txt` | model-restructured text, the Q&A context |
//!
//! The restructuring instructions are read from [`PROMPT_KEY`].

mod fs;
mod memory;
#[cfg(feature = "remote")]
mod s3;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
#[cfg(feature = "remote")]
pub use s3::S3BlobStore;

use crate::error::{Error, Result};

/// Key of the process-wide restructuring prompt template.
pub const PROMPT_KEY: &str = "PROMPT.txt";

/// Key prefix under which uploads are stored.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// MIME type used for text artifacts.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// MIME type used for JSON artifacts.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A flat key/value object store.
pub trait BlobStore: Send + Sync {
    /// Name of the bucket (or directory) this store writes to.
    fn bucket(&self) -> &str;

    /// Read an object. Missing keys yield [`Error::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or replace an object.
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Check if an object exists.
    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read an object as UTF-8 text.
    fn get_text(&self, key: &str) -> Result<String> {
        let bytes = self.get(key)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Storage(format!("{} is not valid UTF-8: {}", key, e)))
    }

    /// Store UTF-8 text.
    fn put_text(&self, key: &str, text: &str) -> Result<()> {
        self.put(key, text.as_bytes(), TEXT_CONTENT_TYPE)
    }
}

/// Keys of the artifacts derived from one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    upload: String,
}

impl ArtifactKeys {
    /// Keys for the upload stored at `key`.
    pub fn for_upload(key: impl Into<String>) -> Self {
        Self { upload: key.into() }
    }

    /// The upload key itself.
    pub fn upload(&self) -> &str {
        &self.upload
    }

    /// Combined raw block JSON.
    pub fn raw(&self) -> String {
        format!("{}_raw.json", self.upload)
    }

    /// Flattened text.
    pub fn parsed(&self) -> String {
        format!("{}_parsed.txt", self.upload)
    }

    /// Restructured document context used for questions.
    pub fn context(&self) -> String {
        format!("{}_LM_info.txt", self.upload)
    }
}

/// Storage key for an uploaded file name.
///
/// Only the final path component of `name` is kept, so directory parts of
/// a client-supplied name never leak into the key.
pub fn upload_key(name: &str) -> Result<String> {
    let file_name = std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::UnsupportedFormat(format!("invalid file name: {:?}", name)))?;
    Ok(format!("{}{}", UPLOAD_PREFIX, file_name))
}
