use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ErrorResponse, ObjectHandle, UploadRequest, UploadResponse};
use crate::utils::validation::{UPLOAD_FIELD, ValidationError};
use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, Uri, header},
    response::Response,
};
use utoipa::ToSchema;

/// Multipart form accepted by `POST /upload`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Binary payload; the client file name only contributes its extension
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// The literal inbound host: the `Host` header, else the URI authority.
///
/// Forwarding headers are not consulted, so clients cannot choose the host
/// that ends up in the returned URL.
fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Object relayed", body = UploadResponse),
        (status = 400, description = "Missing or oversize payload", body = ErrorResponse),
        (status = 500, description = "Staging or relay failed", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut request: Option<UploadRequest> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if request.is_some() || field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let payload = field.bytes().await.map_err(multipart_error)?;
        request = Some(UploadRequest { payload, file_name });
    }

    let request = request.ok_or(ValidationError::MissingPayload)?;
    let host = request_host(&headers, &uri);

    let url = state.ingress.upload(request, host.as_deref()).await?;

    Ok(Json(UploadResponse { url }))
}

#[utoipa::path(
    get,
    path = "/file/{handle}",
    params(
        ("handle" = String, Path, description = "Object handle returned by /upload")
    ),
    responses(
        (status = 302, description = "Redirect to the signed object URL"),
        (status = 404, description = "Handle does not name an attachment", body = ErrorResponse),
        (status = 502, description = "Platform unavailable", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Response, AppError> {
    let handle = ObjectHandle::new(handle);
    let resolved = state.ingress.retrieve(&handle).await?;

    tracing::info!(
        handle = %handle,
        expires_at = ?resolved.expires_at,
        "📎 Redirecting to resolved object"
    );

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, &resolved.url)
        .body(Body::empty())
        .map_err(|e| AppError::Internal(format!("Invalid redirect target: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_host_ignores_forwarding_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("host"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("evil.example"));
        headers.insert("forwarded", HeaderValue::from_static("host=evil.example"));

        let uri: Uri = "/upload".parse().unwrap();
        assert_eq!(request_host(&headers, &uri).as_deref(), Some("host"));
    }

    #[test]
    fn test_request_host_falls_back_to_uri_authority() {
        let uri: Uri = "http://10.0.0.1:8080/upload".parse().unwrap();
        assert_eq!(
            request_host(&HeaderMap::new(), &uri).as_deref(),
            Some("10.0.0.1:8080")
        );
        assert!(request_host(&HeaderMap::new(), &"/upload".parse().unwrap()).is_none());
    }
}
