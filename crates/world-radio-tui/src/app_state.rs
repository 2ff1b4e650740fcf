//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this for selection and playback snapshots, but never
//! mutate it. The App event-loop is the only thing that writes to AppState.

use std::path::PathBuf;
use std::sync::Arc;

use world_radio_proto::geo::CountrySet;
use world_radio_proto::protocol::{PlaybackState, SelectionState, StreamInfo};

use crate::widgets::status_bar::InputMode;

pub struct AppState {
    // ── Controllers (snapshots) ─────────────────────────────────────────────
    pub selection: SelectionState,
    pub playback: PlaybackState,
    pub stream: StreamInfo,

    // ── Globe ───────────────────────────────────────────────────────────────
    /// Empty until the boundary dataset has loaded (or forever, if it failed).
    pub countries: Arc<CountrySet>,
    pub geo_loading: bool,
    /// Country under the globe reticle.
    pub hovered_code: Option<String>,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub input_mode: InputMode,

    // ── Logs ────────────────────────────────────────────────────────────────
    /// Cached tail of the log file (refreshed periodically by App).
    pub tui_log_lines: Vec<String>,
    pub tui_log_path: PathBuf,
}

impl AppState {
    pub fn new(playback: PlaybackState, tui_log_path: PathBuf) -> Self {
        Self {
            selection: SelectionState::default(),
            playback,
            stream: StreamInfo::default(),
            countries: Arc::new(CountrySet::default()),
            geo_loading: true,
            hovered_code: None,
            input_mode: InputMode::Normal,
            tui_log_lines: Vec::new(),
            tui_log_path,
        }
    }

    pub fn selected_code(&self) -> Option<&str> {
        self.selection.country_code.as_deref()
    }

    /// The current station is this one and it is playing.
    pub fn is_playing(&self, station_id: &str) -> bool {
        self.playback.is_playing && self.playback.is_current(station_id)
    }
}
