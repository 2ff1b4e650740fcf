mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod http;
mod mpv;
mod playback;
mod projection;
mod selection;
mod theme;
mod widgets;
mod workspace;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::{broadcast, mpsc};

use world_radio_proto::config::Config;
use world_radio_proto::directory::{StationDirectory, StationDirectoryClient};
use world_radio_proto::geo::GeoDataSource;
use world_radio_proto::insight::{InsightClient, InsightSource};
use world_radio_proto::platform;
use world_radio_proto::protocol::{ApiState, RemoteCommand};
use world_radio_proto::state::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("world-radio.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("world-radio log: {}", log_path.display());
    tracing::info!("world-radio starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {:#}; using defaults", e);
        Config::default()
    });

    // ── Data sources ─────────────────────────────────────────────────────────
    let directory: Arc<dyn StationDirectory> = Arc::new(
        StationDirectoryClient::new(&config.directory).context("building station directory client")?,
    );
    let insight_client =
        InsightClient::new(&config.insight).context("building insight client")?;
    if !insight_client.has_credential() {
        tracing::info!("insight: no API key configured, using fallback text");
    }
    let insight: Arc<dyn InsightSource> = Arc::new(insight_client);
    let geo = GeoDataSource::new(config.geo.boundaries.clone())
        .with_cache(platform::cache_dir().join("countries.geojson"));

    // ── PlayerCore (owns PlaybackController + mpv) ───────────────────────────
    let (updates_tx, updates_rx) = broadcast::channel::<core::PlayerUpdate>(256);
    let (player_tx, player_rx) = mpsc::channel::<core::PlayerEvent>(256);
    let session = SessionStore::new(config.playback.state_file.clone());
    let player_core = core::PlayerCore::new(
        session,
        config.playback.default_volume,
        updates_tx,
        player_tx.clone(),
    );
    let initial_playback = player_core.state().clone();
    let core_handle = tokio::spawn(async move {
        if let Err(e) = player_core.run(player_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── SelectionController ──────────────────────────────────────────────────
    let (selection_tx, selection_rx) = mpsc::unbounded_channel();
    let selection = selection::SelectionController::new(directory, insight, selection_tx);

    // ── HTTP server ──────────────────────────────────────────────────────────
    let api_state: http::SharedApiState = Arc::new(RwLock::new(ApiState::default()));
    let (remote_tx, remote_rx) = mpsc::channel::<RemoteCommand>(64);
    if config.http.enabled {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            api_state.clone(),
            remote_tx,
        );
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(
        log_path,
        initial_playback,
        selection,
        player_tx,
        api_state,
        config.geo.auto_rotate,
    );
    let result = app.run(geo, updates_rx, selection_rx, remote_rx).await;

    // Give the core a moment to stop mpv and flush the session file.
    if tokio::time::timeout(Duration::from_secs(2), core_handle).await.is_err() {
        tracing::warn!("PlayerCore did not stop in time");
    }
    result
}
