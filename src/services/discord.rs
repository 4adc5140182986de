//! Discord-backed [`BlobRelay`].
//!
//! A bot account posts each staged file as an attachment to one channel. The
//! message id becomes the object handle; fetching the message again yields a
//! freshly signed CDN URL for the attachment.

use crate::models::{ContainerId, ObjectHandle, ResolvedUrl};
use crate::services::relay::{BlobRelay, RelayError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::io::ReaderStream;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DISCORD_CDN_ORIGIN: &str = "https://cdn.discordapp.com";

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
struct BotUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    url: String,
}

/// The process-wide authenticated bot session.
pub struct DiscordRelay {
    http: reqwest::Client,
    api_base: String,
    authorization: String,
    bot_user: BotUser,
    open: AtomicBool,
}

impl std::fmt::Debug for DiscordRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRelay")
            .field("api_base", &self.api_base)
            .field("bot_user", &self.bot_user.username)
            .field("open", &self.is_open())
            .finish()
    }
}

impl DiscordRelay {
    /// Opens the session by authenticating the bot token.
    ///
    /// A token the platform does not accept is reported as
    /// [`RelayError::Upstream`]; the caller is expected to abort startup.
    pub async fn connect(token: &str, api_base: &str) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(format!(
                "DiscordBot (https://github.com/missuo/discord-image, {})",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| RelayError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = api_base.trim_end_matches('/').to_string();
        let authorization = format!("Bot {}", token);

        let response = http
            .get(format!("{}/users/@me", api_base))
            .header(AUTHORIZATION, &authorization)
            .send()
            .await
            .map_err(|e| RelayError::Upstream(format!("Failed to reach Discord: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RelayError::Upstream(format!(
                "Discord authentication failed: {} - {}",
                status, error_text
            )));
        }

        let bot_user: BotUser = response
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("Invalid Discord user payload: {}", e)))?;

        tracing::info!(
            bot_id = %bot_user.id,
            bot = %bot_user.username,
            "🤖 Discord session open"
        );

        Ok(Self {
            http,
            api_base,
            authorization,
            bot_user,
            open: AtomicBool::new(true),
        })
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_user.username
    }

    /// Closes the session. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if was_open {
            tracing::info!(bot = %self.bot_user.username, "🔌 Discord session closed");
        }
        was_open
    }

    fn ensure_open(&self) -> Result<(), RelayError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RelayError::SessionClosed)
        }
    }

    fn messages_url(&self, container: &ContainerId) -> String {
        format!("{}/channels/{}/messages", self.api_base, container)
    }
}

impl Drop for DiscordRelay {
    fn drop(&mut self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::info!(bot = %self.bot_user.username, "🔌 Discord session released");
        }
    }
}

#[async_trait]
impl BlobRelay for DiscordRelay {
    async fn put_object(
        &self,
        container: &ContainerId,
        path: &Path,
        display_name: &str,
    ) -> Result<ObjectHandle, RelayError> {
        self.ensure_open()?;

        let staged_err = |source| RelayError::StagedFile {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(staged_err)?;
        let length = file.metadata().await.map_err(staged_err)?.len();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(display_name.to_string());
        let form = Form::new().part("files[0]", part);

        let response = self
            .http
            .post(self.messages_url(container))
            .header(AUTHORIZATION, &self.authorization)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::Upstream(format!("Failed to send attachment: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RelayError::Upstream(format!(
                "Discord rejected attachment: {} - {}",
                status, error_text
            )));
        }

        let message: Message = response
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("Invalid Discord message payload: {}", e)))?;

        tracing::info!(
            channel = %container,
            handle = %message.id,
            size = length,
            "📤 Relayed attachment"
        );

        Ok(ObjectHandle::new(message.id))
    }

    async fn resolve_object(
        &self,
        container: &ContainerId,
        handle: &ObjectHandle,
    ) -> Result<ResolvedUrl, RelayError> {
        self.ensure_open()?;

        // Handles are spliced into the request path; anything that is not a
        // snowflake cannot name a message.
        if !is_snowflake(handle.as_str()) {
            return Err(RelayError::NotFound(format!("Invalid handle '{}'", handle)));
        }

        let response = self
            .http
            .get(format!("{}/{}", self.messages_url(container), handle))
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| RelayError::Upstream(format!("Failed to fetch message: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Err(RelayError::NotFound(format!("Message {} not found", handle)));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RelayError::Upstream(format!(
                "Discord message lookup failed: {} - {}",
                status, error_text
            )));
        }

        let message: Message = response
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("Invalid Discord message payload: {}", e)))?;

        let attachment = message
            .attachments
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::NotFound("Image not found".to_string()))?;

        Ok(ResolvedUrl {
            expires_at: signed_url_expiry(&attachment.url),
            url: attachment.url,
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.len() <= 20 && id.bytes().all(|b| b.is_ascii_digit())
}

/// Reads the `ex` query parameter (hex unix seconds) of a signed CDN URL.
pub fn signed_url_expiry(url: &str) -> Option<DateTime<Utc>> {
    let parsed = url::Url::parse(url).ok()?;
    let (_, ex) = parsed.query_pairs().find(|(key, _)| key == "ex")?;
    let secs = i64::from_str_radix(&ex, 16).ok()?;
    DateTime::from_timestamp(secs, 0)
}
