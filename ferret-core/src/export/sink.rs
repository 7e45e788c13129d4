//! Destinations for rendered export bytes.

use crate::error::ExportError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Persists rendered files under a name, never overwriting an earlier one.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Store `bytes` as `file_name` and return where it ended up.
    ///
    /// If the name is taken, `{stem}_2.{ext}`, `{stem}_3.{ext}`, ... are tried.
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// The `n`-th candidate name for `file_name`: the name itself, then `{stem}_{n}.{ext}`.
pub fn candidate_name(file_name: &str, n: usize) -> String {
    if n <= 1 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{file_name}_{n}"),
    }
}

/// Writes files into a directory, creating it on first use.
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportSink for FsSink {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let write_error = |path: &Path, e: std::io::Error| ExportError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_error(&self.dir, e))?;

        let mut n = 1;
        loop {
            let path = self.dir.join(candidate_name(file_name, n));
            // create_new makes the existence check and the creation one atomic step.
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .await
                        .map_err(|e| write_error(&path, e))?;
                    file.flush().await.map_err(|e| write_error(&path, e))?;
                    debug!(path = %path.display(), bytes = bytes.len(), "Export written");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(write_error(&path, e)),
            }
        }
    }
}

/// Keeps files in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored files, sorted.
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Contents of one stored file.
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(file_name)
            .cloned()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let name = (1..)
            .map(|n| candidate_name(file_name, n))
            .find(|name| !files.contains_key(name))
            .unwrap_or_else(|| file_name.to_string());
        files.insert(name.clone(), bytes.to_vec());
        Ok(PathBuf::from(name))
    }
}
