use thiserror::Error;

/// Maximum accepted payload: 25 MiB, the platform's attachment ceiling.
pub const MAX_UPLOAD_SIZE: usize = 25 * 1024 * 1024;

/// Multipart form field that carries the payload.
pub const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No 'image' field found in the upload form")]
    MissingPayload,

    #[error("File size {size} bytes exceeds maximum allowed {limit} bytes ({} MB)", .limit / 1024 / 1024)]
    TooLarge { size: usize, limit: usize },
}

/// Validates payload size against the upload ceiling
pub fn validate_payload_size(size: usize, limit: usize) -> Result<(), ValidationError> {
    if size > limit {
        return Err(ValidationError::TooLarge { size, limit });
    }
    Ok(())
}

/// Extension of the final path element, leading dot included.
///
/// Returns `""` when the name has no dot after its last separator.
/// `"archive.tar.gz"` yields `".gz"`, `".bashrc"` yields `".bashrc"`.
pub fn declared_extension(file_name: &str) -> &str {
    for (idx, ch) in file_name.char_indices().rev() {
        match ch {
            '/' | '\\' => return "",
            '.' => return &file_name[idx..],
            _ => {}
        }
    }
    ""
}
