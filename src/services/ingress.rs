use crate::api::error::AppError;
use crate::models::{ContainerId, ObjectHandle, ResolvedUrl, UploadRequest};
use crate::services::relay::{BlobRelay, RelayError};
use crate::services::resolver::ObjectResolver;
use crate::services::staging::StagingStore;
use crate::utils::public_url::public_object_url;
use crate::utils::validation::validate_payload_size;
use std::sync::Arc;

/// Per-request policy that does not change while the process runs.
#[derive(Debug, Clone)]
pub struct IngressPolicy {
    pub container: ContainerId,
    pub max_upload_size: usize,
    pub auto_delete: bool,
    /// Advertised host for public URLs; the request `Host` is used when unset.
    pub public_host: Option<String>,
    /// Operator domain that replaces the CDN origin on retrieval.
    pub proxy_host: Option<String>,
}

/// Drives uploads (validate, stage, relay, cleanup, respond) and retrievals.
pub struct IngressService {
    staging: StagingStore,
    relay: Arc<dyn BlobRelay>,
    resolver: ObjectResolver,
    policy: IngressPolicy,
}

impl IngressService {
    pub fn new(
        staging: StagingStore,
        relay: Arc<dyn BlobRelay>,
        cdn_origin: impl Into<String>,
        policy: IngressPolicy,
    ) -> Self {
        let resolver = ObjectResolver::new(relay.clone(), cdn_origin);
        Self {
            staging,
            relay,
            resolver,
            policy,
        }
    }

    pub fn policy(&self) -> &IngressPolicy {
        &self.policy
    }

    /// Relays one payload and returns its public URL.
    ///
    /// `request_host` is the inbound `Host`, only consulted when no public
    /// host is configured.
    pub async fn upload(
        &self,
        request: UploadRequest,
        request_host: Option<&str>,
    ) -> Result<String, AppError> {
        // 1. Validate before touching the disk
        validate_payload_size(request.size(), self.policy.max_upload_size)?;

        let host = self
            .policy
            .public_host
            .as_deref()
            .or(request_host)
            .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?
            .to_string();

        // 2. Stage
        let staged = self
            .staging
            .stage(request.payload, &request.file_name)
            .await?;

        // 3. Relay. On failure the staged copy stays behind for inspection.
        let handle = self
            .relay
            .put_object(&self.policy.container, &staged.path, &staged.file_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    path = %staged.path.display(),
                    "Relay failed, keeping staged file: {}",
                    e
                );
                AppError::Internal(e.to_string())
            })?;

        // 4. Cleanup
        if self.policy.auto_delete {
            if let Err(e) = self.staging.remove(&staged.path).await {
                tracing::warn!("{}", e);
            }
        }

        // 5. Respond
        let url = public_object_url(&host, &handle);
        tracing::info!(handle = %handle, size = staged.size, "✅ Upload relayed: {}", url);
        Ok(url)
    }

    /// Resolves a handle to the URL the client should be redirected to.
    pub async fn retrieve(&self, handle: &ObjectHandle) -> Result<ResolvedUrl, AppError> {
        self.resolver
            .resolve(
                &self.policy.container,
                handle,
                self.policy.proxy_host.as_deref(),
            )
            .await
            .map_err(|e| match e {
                RelayError::NotFound(msg) => AppError::NotFound(msg),
                other => AppError::BadGateway(other.to_string()),
            })
    }
}
