//! Abstract file store.
//!
//! Uploaded data tables and lookup files live in a blob store keyed by
//! `(dataset_id, filename)`; writes are idempotent and last-writer-wins.
//! The engine only sees this trait - object storage lives with the
//! caller. `LocalFileStore` backs tests and the CLI harness.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{BuildError, BuildResult};

/// Abstract blob store contract. `dir` is the dataset id.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, dir: &str, filename: &str, bytes: &[u8]) -> BuildResult<()>;
    async fn load(&self, dir: &str, filename: &str) -> BuildResult<Vec<u8>>;
    async fn delete(&self, dir: &str, filename: &str) -> BuildResult<()>;
    async fn list(&self, dir: &str) -> BuildResult<Vec<String>>;
}

/// SHA-256 content hash of an upload, hex-encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        write!(out, "{byte:02x}").expect("writing to String");
    }
    out
}

/// Directory-backed file store.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, dir: &str, filename: &str) -> BuildResult<PathBuf> {
        // Store keys are ids and hashed names; path separators in either
        // are a caller bug, not a traversal to honour.
        if dir.contains(['/', '\\']) || filename.contains(['/', '\\']) {
            return Err(BuildError::UnknownError(format!(
                "invalid file store key: {dir}/{filename}"
            )));
        }
        Ok(self.root.join(dir).join(filename))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, dir: &str, filename: &str, bytes: &[u8]) -> BuildResult<()> {
        let path = self.entry_path(dir, filename)?;
        let parent = path.parent().expect("entry path has a parent");
        tokio::fs::create_dir_all(parent).await?;

        // Write-then-rename keeps a concurrent reader from seeing a
        // half-written blob; last writer wins.
        let tmp = path.with_extension("part");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, dir: &str, filename: &str) -> BuildResult<Vec<u8>> {
        let path = self.entry_path(dir, filename)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn delete(&self, dir: &str, filename: &str) -> BuildResult<()> {
        let path = self.entry_path(dir, filename)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn list(&self, dir: &str) -> BuildResult<Vec<String>> {
        let path = self.entry_path(dir, "x")?;
        let parent = path.parent().expect("entry path has a parent").to_path_buf();
        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&parent).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                entries.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        entries.sort();
        Ok(entries)
    }
}

/// A downloaded blob staged on local disk for the columnar engine.
///
/// The file is removed when the value drops, on every path including
/// panic unwinds.
pub struct StagedFile {
    file: tempfile::NamedTempFile,
}

impl StagedFile {
    /// Write bytes into a scratch file with the given extension (the
    /// columnar engine's readers take a path, not a buffer).
    pub fn with_extension(bytes: &[u8], extension: &str) -> BuildResult<Self> {
        let file = tempfile::Builder::new()
            .prefix("cubewright-stage-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        std::fs::write(file.path(), bytes)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Path as a UTF-8 string for SQL literal embedding.
    pub fn path_str(&self) -> BuildResult<&str> {
        self.file
            .path()
            .to_str()
            .ok_or_else(|| BuildError::UnknownError("non-UTF-8 scratch path".into()))
    }
}
