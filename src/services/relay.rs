use crate::models::{ContainerId, ObjectHandle, ResolvedUrl};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The platform was unreachable, refused our credentials or rejected the call.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The handle does not point at a message carrying an attachment.
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Failed to read staged file {path}: {source}")]
    StagedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Relay session is closed")]
    SessionClosed,
}

/// Remote blob store backed by a chat platform.
///
/// Implementations are shared by every in-flight request and must be safe to
/// call concurrently.
#[async_trait]
pub trait BlobRelay: Send + Sync {
    /// Sends the file at `path` as an attachment to `container`, returning the
    /// identifier the platform assigned to the message.
    async fn put_object(
        &self,
        container: &ContainerId,
        path: &Path,
        display_name: &str,
    ) -> Result<ObjectHandle, RelayError>;

    /// Looks the message up again and returns the URL of its first attachment.
    async fn resolve_object(
        &self,
        container: &ContainerId,
        handle: &ObjectHandle,
    ) -> Result<ResolvedUrl, RelayError>;

    /// Whether the session can still serve calls.
    fn is_open(&self) -> bool;
}
