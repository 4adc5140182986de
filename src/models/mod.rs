use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Platform-assigned identifier of a relayed object (the Discord message id).
///
/// This is the only public reference to an uploaded object. Nothing maps it
/// back to local state; the remote platform is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ObjectHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The single destination channel every object is relayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signed CDN location of an object, as handed back by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    /// When the signature stops being honoured, if the platform told us.
    pub expires_at: Option<DateTime<Utc>>,
}

/// An uploaded payload as received from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Bytes,
    /// Client-declared file name. Only its extension is kept.
    pub file_name: String,
}

impl UploadRequest {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the relayed object
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
