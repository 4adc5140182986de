#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use discord_image::config::RelayConfig;
use discord_image::models::{ContainerId, ObjectHandle, ResolvedUrl};
use discord_image::services::discord::DISCORD_CDN_ORIGIN;
use discord_image::services::ingress::{IngressPolicy, IngressService};
use discord_image::services::relay::{BlobRelay, RelayError};
use discord_image::services::staging::StagingStore;
use discord_image::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

struct StoredObject {
    url: String,
    bytes: Vec<u8>,
}

/// In-memory stand-in for the chat platform.
pub struct MemoryRelay {
    objects: Mutex<HashMap<String, StoredObject>>,
    next_id: AtomicU64,
    pub fail_puts: AtomicBool,
    pub fail_resolves: AtomicBool,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1_227_391_045_870_866_432),
            fail_puts: AtomicBool::new(false),
            fail_resolves: AtomicBool::new(false),
        }
    }

    /// Bytes behind a signed URL previously returned by `resolve_object`.
    pub fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .values()
            .find(|o| o.url == url)
            .map(|o| o.bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobRelay for MemoryRelay {
    async fn put_object(
        &self,
        container: &ContainerId,
        path: &Path,
        display_name: &str,
    ) -> Result<ObjectHandle, RelayError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(RelayError::Upstream(
                "Discord rejected attachment: 503 Service Unavailable".to_string(),
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| RelayError::StagedFile {
                path: path.to_path_buf(),
                source,
            })?;

        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let attachment_id = message_id + 7;
        let url = format!(
            "{}/attachments/{}/{}/{}?ex=66180e3c&is=6605993c&hm=deadbeef",
            DISCORD_CDN_ORIGIN, container, attachment_id, display_name
        );

        self.objects
            .lock()
            .unwrap()
            .insert(message_id.to_string(), StoredObject { url, bytes });

        Ok(ObjectHandle::new(message_id.to_string()))
    }

    async fn resolve_object(
        &self,
        _container: &ContainerId,
        handle: &ObjectHandle,
    ) -> Result<ResolvedUrl, RelayError> {
        if self.fail_resolves.load(Ordering::SeqCst) {
            return Err(RelayError::Upstream(
                "Failed to fetch message: connection reset".to_string(),
            ));
        }

        self.objects
            .lock()
            .unwrap()
            .get(handle.as_str())
            .map(|o| ResolvedUrl {
                url: o.url.clone(),
                expires_at: None,
            })
            .ok_or_else(|| RelayError::NotFound("Image not found".to_string()))
    }

    fn is_open(&self) -> bool {
        true
    }
}

pub fn test_config(upload_dir: &Path) -> RelayConfig {
    RelayConfig {
        bot_token: "test-token".to_string(),
        channel_id: "1100".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        ..RelayConfig::default()
    }
}

pub fn build_app(relay: Arc<MemoryRelay>, config: RelayConfig) -> Router {
    let ingress = Arc::new(IngressService::new(
        StagingStore::new(&config.upload_dir),
        relay.clone(),
        config.cdn_origin.clone(),
        IngressPolicy {
            container: ContainerId::new(config.channel_id.clone()),
            max_upload_size: config.max_upload_size,
            auto_delete: config.auto_delete,
            public_host: config.public_host.clone(),
            proxy_host: config.proxy_host.clone(),
        },
    ));

    create_app(AppState {
        relay,
        ingress,
        config,
    })
}

pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(host: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Host", host)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Host", "host")
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
