use crate::models::{ContainerId, ObjectHandle, ResolvedUrl};
use crate::services::relay::{BlobRelay, RelayError};
use std::sync::Arc;

/// Turns a handle back into a URL the client can be redirected to.
pub struct ObjectResolver {
    relay: Arc<dyn BlobRelay>,
    cdn_origin: String,
}

impl ObjectResolver {
    pub fn new(relay: Arc<dyn BlobRelay>, cdn_origin: impl Into<String>) -> Self {
        Self {
            relay,
            cdn_origin: cdn_origin.into(),
        }
    }

    pub async fn resolve(
        &self,
        container: &ContainerId,
        handle: &ObjectHandle,
        proxy_host: Option<&str>,
    ) -> Result<ResolvedUrl, RelayError> {
        let mut resolved = self.relay.resolve_object(container, handle).await?;

        if let Some(proxy_host) = proxy_host {
            resolved.url = rewrite_cdn_host(&resolved.url, &self.cdn_origin, proxy_host);
        }

        Ok(resolved)
    }
}

/// Swaps the first occurrence of `cdn_origin` for `https://{proxy_host}`.
///
/// Only the first match is replaced so query parameters that happen to embed
/// the origin stay intact. A URL without the origin is returned as is.
pub fn rewrite_cdn_host(url: &str, cdn_origin: &str, proxy_host: &str) -> String {
    if proxy_host.is_empty() || cdn_origin.is_empty() {
        return url.to_string();
    }
    url.replacen(cdn_origin, &format!("https://{}", proxy_host), 1)
}
