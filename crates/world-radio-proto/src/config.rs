use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

/// Local control API. Off unless explicitly enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Used when no session file exists yet.
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    /// Where volume and mute survive restarts.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// radio-browser.info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_url")]
    pub base_url: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Falls back to `GEMINI_API_KEY`, then `API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_insight_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_insight_timeout")]
    pub timeout_secs: u64,
}

/// Country boundary dataset, either an https:// URL or a local GeoJSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_boundaries")]
    pub boundaries: String,
    #[serde(default = "default_auto_rotate")]
    pub auto_rotate: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            state_file: default_state_file(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_directory_url(),
            limit: default_limit(),
            timeout_secs: default_directory_timeout(),
        }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_insight_url(),
            model: default_model(),
            timeout_secs: default_insight_timeout(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            boundaries: default_boundaries(),
            auto_rotate: default_auto_rotate(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_volume() -> f32 {
    crate::protocol::DEFAULT_VOLUME
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("session.json")
}

fn default_directory_url() -> String {
    "https://de1.api.radio-browser.info/json".to_string()
}

fn default_limit() -> u32 {
    50
}

fn default_directory_timeout() -> u64 {
    15
}

fn default_insight_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_insight_timeout() -> u64 {
    20
}

fn default_boundaries() -> String {
    "https://raw.githubusercontent.com/vasturiano/react-globe.gl/master/example/datasets/ne_110m_admin_0_countries.geojson"
        .to_string()
}

fn default_auto_rotate() -> bool {
    true
}

impl InsightConfig {
    /// Configured key, else the environment. Blank values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
