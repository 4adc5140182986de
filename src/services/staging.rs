use crate::utils::validation::declared_extension;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stage {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove staged file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A payload that has been written to the staging directory.
#[derive(Debug, Clone)]
pub struct StagedObject {
    pub path: PathBuf,
    /// `{nanos}_{uuid}{ext}`, also used as the attachment name upstream.
    pub file_name: String,
    pub size: u64,
}

/// Local transient storage for uploads awaiting relay.
///
/// Names are collision-free by construction, so concurrent uploads need no
/// coordination here.
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the staging directory (and parents) if it is missing.
    pub async fn ensure_dir(&self) -> Result<(), StagingError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StagingError::CreateDir {
                path: self.dir.clone(),
                source,
            })
    }

    /// `{unix-nanos}_{uuid-v4}{extension of declared_name}`
    pub fn staged_name(declared_name: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!(
            "{}_{}{}",
            nanos,
            Uuid::new_v4(),
            declared_extension(declared_name)
        )
    }

    /// Writes `payload` under a fresh name.
    ///
    /// Bytes land in a temporary sibling first and are renamed into place, so
    /// the final path never holds a partial write.
    pub async fn stage(
        &self,
        payload: Bytes,
        declared_name: &str,
    ) -> Result<StagedObject, StagingError> {
        let file_name = Self::staged_name(declared_name);
        let path = self.dir.join(&file_name);
        let size = payload.len() as u64;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &payload))
            .await
            .map_err(std::io::Error::other)
            .and_then(|res| res)
            .map_err(|source| StagingError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), size, "📝 Staged upload");

        Ok(StagedObject {
            path,
            file_name,
            size,
        })
    }

    /// Deletes a staged file. Callers treat failure as non-fatal.
    pub async fn remove(&self, path: &Path) -> Result<(), StagingError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| StagingError::Remove {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn write_atomic(dir: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(payload)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(())
}
