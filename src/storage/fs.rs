//! Directory-backed blob store.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::BlobStore;
use crate::error::{Error, Result};

/// A blob store that maps keys to files under a root directory.
///
/// Keys use `/` as separator and may not escape the root.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    bucket: String,
}

impl FsBlobStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let bucket = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Ok(Self { root, bucket })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(Error::Storage(format!("invalid key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(key.to_string()),
            _ => Error::Storage(format!("reading {}: {}", path.display(), e)),
        })
    }

    fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)
            .map_err(|e| Error::Storage(format!("writing {}: {}", path.display(), e)))?;
        log::debug!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("bucket")).unwrap();

        store.put_text("uploads/form.pdf_parsed.txt", "Name:").unwrap();
        assert_eq!(store.get_text("uploads/form.pdf_parsed.txt").unwrap(), "Name:");
        assert!(dir.path().join("bucket/uploads/form.pdf_parsed.txt").exists());
        assert_eq!(store.bucket(), "bucket");
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("PROMPT.txt"), Err(Error::NotFound(_))));
        assert!(!store.exists("PROMPT.txt").unwrap());
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(store.path_for("../outside").is_err());
        assert!(store.path_for("/etc/passwd").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.put("a/../../b", b"x", "text/plain").is_err());
    }
}
