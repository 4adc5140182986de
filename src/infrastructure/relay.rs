use crate::config::RelayConfig;
use crate::services::discord::DiscordRelay;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Opens the Discord session. Startup aborts if the token is rejected.
pub async fn setup_relay(config: &RelayConfig) -> Result<Arc<DiscordRelay>> {
    info!(
        "📡 Discord API: {} (Channel: {})",
        config.discord_api_base, config.channel_id
    );

    let relay = DiscordRelay::connect(&config.bot_token, &config.discord_api_base)
        .await
        .context("Failed to open Discord session")?;

    info!("✅ Logged in as '{}'", relay.bot_username());
    Ok(Arc::new(relay))
}
