//! radio-browser.info station directory client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::protocol::Station;

pub const USER_AGENT: &str = concat!("world-radio/", env!("CARGO_PKG_VERSION"));

/// Anything that can list live stations for a country.
#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// Playable stations for `country_code`, most voted first. Never fails;
    /// an unreachable directory yields an empty list.
    async fn list_stations(&self, country_code: &str) -> Vec<Station>;
}

/// Station record as returned by the directory. Every field is optional on
/// the wire and some mirrors send `null` for blanks.
#[derive(Debug, Deserialize)]
struct RawStation {
    #[serde(default)]
    stationuuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    url_resolved: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    favicon: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    countrycode: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    votes: Option<i64>,
    #[serde(default)]
    codec: Option<String>,
    #[serde(default)]
    bitrate: Option<i64>,
}

impl From<RawStation> for Station {
    fn from(raw: RawStation) -> Self {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        Station {
            id: text(raw.stationuuid),
            name: text(raw.name),
            url: text(raw.url),
            url_resolved: text(raw.url_resolved),
            homepage: text(raw.homepage),
            favicon: text(raw.favicon),
            tags: split_tags(raw.tags.as_deref().unwrap_or_default()),
            country: text(raw.country),
            country_code: text(raw.countrycode),
            region: text(raw.state),
            language: text(raw.language),
            votes: raw.votes.unwrap_or(0).max(0) as u64,
            codec: text(raw.codec),
            bitrate: raw.bitrate.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
        }
    }
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops entries with no playable address. Stations without a uuid borrow
/// their resolved URL as identity.
fn into_playable(raw: Vec<RawStation>) -> Vec<Station> {
    raw.into_iter()
        .map(Station::from)
        .filter(Station::is_playable)
        .map(|mut s| {
            if s.id.is_empty() {
                s.id = s.url_resolved.clone();
            }
            if s.name.is_empty() {
                s.name = s.url_resolved.clone();
            }
            s
        })
        .collect()
}

pub struct StationDirectoryClient {
    http: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl StationDirectoryClient {
    pub fn new(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building directory HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
        })
    }

    async fn try_list_stations(&self, country_code: &str) -> anyhow::Result<Vec<Station>> {
        let url = format!("{}/stations/bycountrycodeexact/{}", self.base_url, country_code);
        let limit = self.limit.to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("limit", limit.as_str()),
                ("order", "votes"),
                ("reverse", "true"),
                ("hidebroken", "true"),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("directory returned {status} for {url}");
        }

        let raw: Vec<RawStation> = resp
            .json()
            .await
            .with_context(|| format!("decoding station list from {url}"))?;
        let total = raw.len();
        let stations = into_playable(raw);
        debug!(
            "directory {}: {} stations, {} playable",
            country_code,
            total,
            stations.len()
        );
        Ok(stations)
    }
}

#[async_trait]
impl StationDirectory for StationDirectoryClient {
    async fn list_stations(&self, country_code: &str) -> Vec<Station> {
        let code = country_code.trim();
        if code.is_empty() {
            return Vec::new();
        }
        match self.try_list_stations(code).await {
            Ok(stations) => stations,
            Err(e) => {
                warn!("station fetch for {} failed: {:#}", code, e);
                Vec::new()
            }
        }
    }
}
