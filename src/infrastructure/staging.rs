use crate::config::RelayConfig;
use crate::services::staging::StagingStore;
use anyhow::{Context, Result};
use tracing::info;

pub async fn setup_staging(config: &RelayConfig) -> Result<StagingStore> {
    let store = StagingStore::new(&config.upload_dir);
    store
        .ensure_dir()
        .await
        .context("Failed to create upload directory")?;

    info!(
        "🗂️  Staging: {} (auto-delete: {})",
        store.dir().display(),
        config.auto_delete
    );
    Ok(store)
}
