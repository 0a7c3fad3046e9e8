//! Bucketed object storage for uploaded files.
//!
//! Objects live under `<root>/<bucket>/<path>` and are written atomically:
//! temp file, fsync, rename. Public URLs are `file://` URLs of the stored
//! object.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Metadata returned by an upload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub size: u64,
    /// SHA256 of the object bytes, lowercase hex.
    pub sha256: String,
}

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` at `path` inside `bucket`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unsafe bucket or path, or an I/O
    /// error if the write fails.
    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<StoredObject> {
        let target = self.resolve(bucket, path)?;
        atomic_write(&target, bytes)?;

        tracing::debug!(bucket, path, size = bytes.len(), "Uploaded object");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: bytes.len() as u64,
            sha256: content_hash(bytes),
        })
    }

    /// Read an object back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unsafe path or an I/O error if the
    /// object does not exist.
    pub fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.resolve(bucket, path)?)?)
    }

    /// Public URL of an object. The object need not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unsafe bucket or path.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        let target = self.resolve(bucket, path)?;
        Ok(format!("file://{}", target.display()))
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        validate_relative(bucket, "bucket")?;
        validate_relative(path, "object path")?;
        if Path::new(bucket).components().count() != 1 {
            return Err(Error::InvalidArgument(format!(
                "bucket must be a single name: {bucket}"
            )));
        }
        Ok(self.root.join(bucket).join(path))
    }
}

/// Reject empty, absolute, or parent-traversing paths.
fn validate_relative(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    let ok = Path::new(value)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{what} must be relative without '..': {value}"
        )))
    }
}

/// Compute the SHA256 of raw bytes as lowercase hex.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write bytes to a file atomically.
///
/// Writes to a sibling `.tmp` file, syncs it, then renames over the target,
/// so a failed write leaves any previous object untouched.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
