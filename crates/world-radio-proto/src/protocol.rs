use serde::{Deserialize, Serialize};

/// Commands accepted from outside the UI (HTTP API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum RemoteCommand {
    SelectCountry { code: String },
    PlayStation { idx: usize },
    TogglePlay,
    Volume { value: f32 },
    ToggleMute,
}

/// A live radio stream as listed by the station directory.
///
/// Only stations with a playable `url_resolved` make it this far; the
/// directory client filters the rest out at the fetch boundary.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Station {
    /// Directory-assigned unique id (`stationuuid`).
    pub id: String,
    pub name: String,
    /// Stream URL as registered, possibly a playlist or redirect.
    pub url: String,
    /// Final playable stream address.
    pub url_resolved: String,
    #[serde(default)]
    pub homepage: String,
    /// Icon URL. Not fetched by the terminal UI; exposed through the API.
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub codec: String,
    /// kbps, 0 when unknown.
    #[serde(default)]
    pub bitrate: u32,
}

impl Station {
    pub fn is_playable(&self) -> bool {
        is_http_url(&self.url_resolved)
    }

    pub fn bitrate_label(&self) -> String {
        if self.bitrate == 0 {
            "Live".to_string()
        } else {
            format!("{}kbps", self.bitrate)
        }
    }

    /// "Region, Country" with whichever parts are known.
    pub fn location(&self) -> String {
        [self.region.trim(), self.country.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") && url.len() > "http://".len())
        || (lower.starts_with("https://") && url.len() > "https://".len())
}

/// The currently explored country and everything fetched for it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SelectionState {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub stations: Vec<Station>,
    pub insight: Option<String>,
    pub loading_stations: bool,
    pub loading_insight: bool,
}

impl SelectionState {
    pub fn has_selection(&self) -> bool {
        self.country_code.is_some()
    }
}

/// Transport state of the single audio output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackState {
    pub current_station: Option<Station>,
    pub is_playing: bool,
    /// Stored level in 0.0..=1.0, kept while muted.
    pub volume: f32,
    pub is_muted: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_station: None,
            is_playing: false,
            volume: DEFAULT_VOLUME,
            is_muted: false,
        }
    }
}

pub const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn with_volume(volume: f32, is_muted: bool) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            is_muted,
            ..Default::default()
        }
    }

    /// Volume actually applied to the audio output.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        match (&self.current_station, self.is_playing) {
            (None, _) => PlaybackPhase::Idle,
            (Some(_), false) => PlaybackPhase::Paused,
            (Some(_), true) => PlaybackPhase::Playing,
        }
    }

    pub fn is_current(&self, station_id: &str) -> bool {
        self.current_station
            .as_ref()
            .is_some_and(|s| s.id == station_id)
    }
}

/// Health of the mpv process as observed by the player core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum MpvHealth {
    /// Not spawned yet (before first use).
    #[default]
    Absent,
    Running,
    /// Binary not found or the process could not be started.
    Missing,
    /// Process exited or socket closed.
    Dead,
}

impl MpvHealth {
    /// Short label for the player bar badge.
    pub fn badge_label(&self) -> Option<&str> {
        match self {
            MpvHealth::Absent | MpvHealth::Running => None,
            MpvHealth::Missing => Some("NO MPV"),
            MpvHealth::Dead => Some("DEAD"),
        }
    }
}

/// Live metadata of the attached stream. Cleared on every new attach.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StreamInfo {
    pub icy_title: Option<String>,
    pub buffering: bool,
    #[serde(default)]
    pub mpv_health: MpvHealth,
}

/// Snapshot served by `GET /api/state`. `rev` increments on every change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiState {
    #[serde(default)]
    pub rev: u64,
    pub selection: SelectionState,
    pub playback: PlaybackState,
    pub stream: StreamInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(bitrate: u32) -> Station {
        Station {
            id: "s1".into(),
            name: "Radio".into(),
            url_resolved: "https://stream.example/live".into(),
            bitrate,
            ..Default::default()
        }
    }

    #[test]
    fn bitrate_label_uses_live_for_zero() {
        assert_eq!(station(0).bitrate_label(), "Live");
        assert_eq!(station(128).bitrate_label(), "128kbps");
    }

    #[test]
    fn http_url_check() {
        assert!(is_http_url("http://a.b/stream"));
        assert!(is_http_url("HTTPS://a.b"));
        assert!(!is_http_url(""));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("rtmp://a.b/live"));
        assert!(!is_http_url("httpx://a.b"));
    }

    #[test]
    fn mute_zeroes_effective_volume_only() {
        let mut p = PlaybackState::with_volume(0.6, false);
        assert_eq!(p.effective_volume(), 0.6);
        p.is_muted = true;
        assert_eq!(p.effective_volume(), 0.0);
        assert_eq!(p.volume, 0.6);
    }

    #[test]
    fn phase_follows_station_and_flag() {
        let mut p = PlaybackState::default();
        assert_eq!(p.phase(), PlaybackPhase::Idle);
        p.current_station = Some(station(0));
        assert_eq!(p.phase(), PlaybackPhase::Paused);
        p.is_playing = true;
        assert_eq!(p.phase(), PlaybackPhase::Playing);
        assert!(p.is_current("s1"));
    }

    #[test]
    fn location_skips_blank_parts() {
        let mut s = station(0);
        s.country = "France".into();
        assert_eq!(s.location(), "France");
        s.region = "Bretagne".into();
        assert_eq!(s.location(), "Bretagne, France");
    }

    #[test]
    fn remote_command_wire_format() {
        let json = serde_json::to_string(&RemoteCommand::PlayStation { idx: 3 }).unwrap();
        assert_eq!(json, r#"{"cmd":"PlayStation","idx":3}"#);
    }
}
