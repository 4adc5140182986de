use crate::services::discord::{DISCORD_API_BASE, DISCORD_CDN_ORIGIN};
use crate::utils::validation::MAX_UPLOAD_SIZE;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Default config file, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Relay service configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Discord bot token (required)
    pub bot_token: String,

    /// Channel every upload is posted to (required)
    pub channel_id: String,

    /// Local staging directory (default: "uploads")
    pub upload_dir: PathBuf,

    /// Host advertised in returned URLs instead of the request `Host`
    pub public_host: Option<String>,

    /// Host that replaces the CDN origin in redirects
    pub proxy_host: Option<String>,

    /// Delete staged files once relayed (default: true)
    pub auto_delete: bool,

    /// Maximum payload in bytes. Fixed at 25 MiB.
    pub max_upload_size: usize,

    pub discord_api_base: String,
    pub cdn_origin: String,

    /// Optional directory of static assets served at `/static`
    pub static_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            upload_dir: PathBuf::from("uploads"),
            public_host: None,
            proxy_host: None,
            auto_delete: true,
            max_upload_size: MAX_UPLOAD_SIZE,
            discord_api_base: DISCORD_API_BASE.to_string(),
            cdn_origin: DISCORD_CDN_ORIGIN.to_string(),
            static_dir: None,
        }
    }
}

/// Shape of `config.yaml` (or `.toml`). Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bot: BotSection,
    pub upload: UploadSection,
    pub discord: DiscordSection,
    pub public_host: Option<String>,
    /// Older name for `public_host`
    pub proxy_url: Option<String>,
    pub proxy_host: Option<String>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub token: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub temp_dir: Option<PathBuf>,
    pub auto_delete: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    pub api_base: Option<String>,
    pub cdn_origin: Option<String>,
}

impl FileConfig {
    /// Reads `path`; a missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .build()?
            .try_deserialize()
    }
}

impl RelayConfig {
    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        Self::layered(FileConfig::default(), |key| env::var(key).ok())
    }

    /// Environment variables over `config_file` over built-in defaults
    pub fn load(config_file: &Path) -> Result<Self> {
        let file = FileConfig::load(config_file)?;
        Ok(Self::layered(file, |key| env::var(key).ok()))
    }

    /// Merges the three layers; `lookup` stands in for the process environment.
    pub fn layered(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bot_token: var("BOT_TOKEN")
                .or(file.bot.token)
                .unwrap_or(default.bot_token),

            channel_id: var("CHANNEL_ID")
                .or(file.bot.channel_id)
                .unwrap_or(default.channel_id),

            upload_dir: var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .or(file.upload.temp_dir)
                .unwrap_or(default.upload_dir),

            public_host: var("PUBLIC_HOST")
                .or(file.public_host)
                .or(file.proxy_url)
                .filter(|v| !v.is_empty()),

            proxy_host: var("PROXY_HOST")
                .or(file.proxy_host)
                .filter(|v| !v.is_empty()),

            auto_delete: var("AUTO_DELETE")
                .and_then(|v| {
                    let parsed = parse_flag(&v);
                    if parsed.is_none() {
                        tracing::warn!("Ignoring unrecognised AUTO_DELETE value '{}'", v);
                    }
                    parsed
                })
                .or(file.upload.auto_delete)
                .unwrap_or(default.auto_delete),

            max_upload_size: default.max_upload_size,

            discord_api_base: var("DISCORD_API_BASE")
                .or(file.discord.api_base)
                .unwrap_or(default.discord_api_base),

            cdn_origin: var("DISCORD_CDN_ORIGIN")
                .or(file.discord.cdn_origin)
                .unwrap_or(default.cdn_origin),

            static_dir: var("STATIC_DIR").map(PathBuf::from).or(file.static_dir),
        }
    }

    /// Fails when a value the relay cannot run without is missing.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            bail!("CRITICAL: BOT_TOKEN (bot.token) must be set");
        }
        if self.channel_id.is_empty() {
            bail!("CRITICAL: CHANNEL_ID (bot.channel_id) must be set");
        }
        Ok(())
    }
}

/// `true`/`false` in the usual spellings; anything else is `None`.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.max_upload_size, 25 * 1024 * 1024);
        assert!(config.auto_delete);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.cdn_origin, "https://cdn.discordapp.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_values_apply_over_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "bot:\n  token: file-token\n  channel_id: \"1100\"\nupload:\n  temp_dir: /tmp/staging\n  auto_delete: false\nproxy_url: img.example.com\n",
        );

        let file = FileConfig::load(&path).unwrap();
        let config = RelayConfig::layered(file, env_of(&[]));

        assert_eq!(config.bot_token, "file-token");
        assert_eq!(config.channel_id, "1100");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/staging"));
        assert!(!config.auto_delete);
        assert_eq!(config.public_host.as_deref(), Some("img.example.com"));
        assert!(config.proxy_host.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_wins_over_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "bot:\n  token: file-token\n  channel_id: \"1100\"\nupload:\n  auto_delete: false\n",
        );

        let file = FileConfig::load(&path).unwrap();
        let config = RelayConfig::layered(
            file,
            env_of(&[
                ("BOT_TOKEN", "env-token"),
                ("AUTO_DELETE", "true"),
                ("PROXY_HOST", "media.example.com"),
            ]),
        );

        assert_eq!(config.bot_token, "env-token");
        assert_eq!(config.channel_id, "1100");
        assert!(config.auto_delete);
        assert_eq!(config.proxy_host.as_deref(), Some("media.example.com"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = RelayConfig::layered(
            FileConfig::default(),
            env_of(&[("PROXY_HOST", ""), ("UPLOAD_TEMP_DIR", "  ")]),
        );
        assert!(config.proxy_host.is_none());
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = FileConfig::load(&tmp.path().join("absent.yaml")).unwrap();
        assert!(file.bot.token.is_none());
    }

    #[test]
    fn test_auto_delete_parsing() {
        for (raw, expected) in [
            ("false", false),
            ("FALSE", false),
            ("0", false),
            ("no", false),
            ("off", false),
            (" Off ", false),
            ("1", true),
            ("yes", true),
            ("on", true),
        ] {
            let config =
                RelayConfig::layered(FileConfig::default(), env_of(&[("AUTO_DELETE", raw)]));
            assert_eq!(config.auto_delete, expected, "AUTO_DELETE={}", raw);
        }
    }

    #[test]
    fn test_unrecognised_auto_delete_falls_back_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "upload:\n  auto_delete: false\n");
        let file = FileConfig::load(&path).unwrap();

        let config = RelayConfig::layered(file, env_of(&[("AUTO_DELETE", "maybe")]));
        assert!(!config.auto_delete);

        let config =
            RelayConfig::layered(FileConfig::default(), env_of(&[("AUTO_DELETE", "maybe")]));
        assert!(config.auto_delete);
    }
}
