//! File capabilities.
//!
//! Import reads through a [`FileSource`] and export writes through a
//! [`FileSink`], so the session never touches a concrete file system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

/// A readable file handed to the import pipeline.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// File name, used to infer the format.
    fn name(&self) -> &str;

    /// Declared MIME type, if known.
    fn mime(&self) -> Option<&str> {
        None
    }

    /// Read the whole file.
    async fn read(&self) -> std::io::Result<Vec<u8>>;
}

/// A destination for exported files.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Write a file under the given name.
    async fn write(&self, name: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    name: String,
}

impl PathSource {
    /// Wrap a path; the name is its final component.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// The wrapped path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for PathSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// An in-memory file, e.g. an upload body or a dropped file.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl BytesSource {
    /// Create a source from a name and contents.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    /// Attach a MIME type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

#[async_trait]
impl FileSource for BytesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Writes exported files into a directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    /// Write into `dir`, creating it on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a file name maps to. Directory components are discarded.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name = Path::new(name)
            .file_name()
            .map_or_else(|| "export".to_string(), |n| n.to_string_lossy().into_owned());
        self.dir.join(file_name)
    }
}

#[async_trait]
impl FileSink for DirSink {
    async fn write(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(name), bytes).await
    }
}

/// Collects exported files in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents written under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names written so far, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FileSink for MemorySink {
    async fn write(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}
