//! PlayerCore: single-owner event loop for playback.
//!
//! Runs embedded in the TUI process. The UI and the HTTP API send
//! `PlayerCommand`s; mpv pushes property changes and `end-file` events; a
//! 10-second heartbeat checks process liveness. PlayerCore owns the
//! `PlaybackController` (and through it the mpv output) exclusively and
//! broadcasts a `PlayerUpdate` whenever observable state changes.
//!
//! Volume and mute are written to the session file on every change.
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use async_trait::async_trait;
use world_radio_proto::protocol::{MpvHealth, PlaybackState, Station, StreamInfo};
use world_radio_proto::state::{PersistentState, SessionStore};

use crate::mpv::{
    EndReason, MpvDriver, MpvEvent, MpvHandle, OBS_CORE_IDLE, OBS_ICY_TITLE, OBS_ICY_TITLE_BARE,
    OBS_PAUSE,
};
use crate::playback::{AudioOutput, PlaybackController, PlaybackFailure};

// ── messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Same station toggles, another station switches and plays.
    SelectStation(Station),
    TogglePlay,
    SetVolume(f32),
    /// Relative change, e.g. `+0.05`.
    AdjustVolume(f32),
    ToggleMute,
}

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum PlayerEvent {
    Command(PlayerCommand),
    /// Raw mpv unsolicited event (forwarded from the reader task).
    Mpv(MpvEvent),
    HeartbeatTick,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerUpdate {
    State(PlaybackState),
    Stream(StreamInfo),
    Failed(PlaybackFailure),
}

// ── MpvOutput ─────────────────────────────────────────────────────────────────

/// The mpv process as an `AudioOutput`. Spawned lazily on first attach.
pub struct MpvOutput {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    core_tx: mpsc::Sender<PlayerEvent>,
    /// mpv playlist entry of the attached stream, when mpv reports one.
    current_entry: Option<u64>,
    /// Bumped on every successful attach.
    attach_seq: u64,
    health: MpvHealth,
}

impl MpvOutput {
    pub fn new(core_tx: mpsc::Sender<PlayerEvent>, initial_volume: f32) -> Self {
        let mut driver = MpvDriver::new();
        driver.last_volume = initial_volume;
        Self {
            driver,
            handle: None,
            core_tx,
            current_entry: None,
            attach_seq: 0,
            health: MpvHealth::Absent,
        }
    }

    pub fn health(&self) -> &MpvHealth {
        &self.health
    }

    pub fn current_entry(&self) -> Option<u64> {
        self.current_entry
    }

    pub fn attach_seq(&self) -> u64 {
        self.attach_seq
    }

    pub fn handle(&self) -> Option<MpvHandle> {
        self.handle.clone()
    }

    /// Drops the handle if the process went away. Returns `false` exactly
    /// when a live connection was lost.
    pub fn check_alive(&mut self) -> bool {
        if self.handle.is_some() && !self.driver.process_alive() {
            warn!("PlayerCore: mpv process died, dropping handle");
            self.handle = None;
            self.current_entry = None;
            self.health = MpvHealth::Dead;
            return false;
        }
        true
    }

    async fn ensure_handle(&mut self) -> anyhow::Result<MpvHandle> {
        if self.handle.as_ref().is_some_and(MpvHandle::is_closed) || !self.check_alive() {
            self.handle = None;
        }
        if let Some(h) = &self.handle {
            return Ok(h.clone());
        }

        // One channel and one forwarder task per connection.
        let (event_tx, event_rx) = mpsc::channel::<MpvEvent>(64);
        let core_tx = self.core_tx.clone();
        tokio::spawn(async move {
            let mut rx = event_rx;
            while let Some(evt) = rx.recv().await {
                if core_tx.send(PlayerEvent::Mpv(evt)).await.is_err() {
                    break;
                }
            }
        });

        let handle = match self.driver.try_reconnect(event_tx.clone()).await {
            Some(h) => {
                info!("PlayerCore: reconnected to existing mpv socket");
                h
            }
            None => match self.driver.spawn_and_connect(event_tx).await {
                Ok(h) => h,
                Err(e) => {
                    self.health = if world_radio_proto::platform::find_mpv_binary().is_none() {
                        MpvHealth::Missing
                    } else {
                        MpvHealth::Dead
                    };
                    return Err(e.context("failed to start mpv"));
                }
            },
        };

        self.health = MpvHealth::Running;
        let h = handle.clone();
        tokio::spawn(async move {
            h.observe_all_properties().await;
        });
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    pub async fn kill(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop().await;
        }
        self.driver.kill().await;
    }
}

#[async_trait]
impl AudioOutput for MpvOutput {
    async fn attach(&mut self, url: &str, volume: f32) -> anyhow::Result<()> {
        let handle = self.ensure_handle().await?;
        self.driver.last_volume = volume;
        handle.set_volume(volume).await?;
        handle.set_pause(false).await?;
        self.current_entry = handle.load_stream(url).await?;
        self.attach_seq += 1;
        debug!("mpv: attached entry={:?}", self.current_entry);
        Ok(())
    }

    async fn resume(&mut self) -> anyhow::Result<()> {
        let Some(handle) = self.handle.as_ref() else {
            anyhow::bail!("mpv is not running");
        };
        handle.set_pause(false).await
    }

    async fn pause(&mut self) -> anyhow::Result<()> {
        if let Some(handle) = self.handle.as_ref() {
            handle.set_pause(true).await?;
        }
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> anyhow::Result<()> {
        self.driver.last_volume = volume;
        if let Some(handle) = self.handle.as_ref() {
            handle.set_volume(volume).await?;
        }
        Ok(())
    }

    async fn release(&mut self) {
        self.current_entry = None;
        if let Some(handle) = self.handle.as_ref() {
            if let Err(e) = handle.stop().await {
                warn!("mpv: stop failed: {:#}", e);
            }
        }
    }
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    controller: PlaybackController<MpvOutput>,
    failures: mpsc::UnboundedReceiver<PlaybackFailure>,
    session: SessionStore,
    events_tx: mpsc::Sender<PlayerEvent>,
    updates_tx: broadcast::Sender<PlayerUpdate>,
    stream: StreamInfo,
    obs_core_idle: Option<bool>,
    seen_attach_seq: u64,
}

impl PlayerCore {
    pub fn new(
        session: SessionStore,
        default_volume: f32,
        updates_tx: broadcast::Sender<PlayerUpdate>,
        events_tx: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        let persisted = session.load(default_volume);
        info!(
            "PlayerCore: session volume={:.2} muted={}",
            persisted.volume, persisted.muted
        );
        let initial = PlaybackState::with_volume(persisted.volume, persisted.muted);
        let output = MpvOutput::new(events_tx.clone(), initial.effective_volume());
        let (fail_tx, failures) = mpsc::unbounded_channel();
        Self {
            controller: PlaybackController::new(output, initial, fail_tx),
            failures,
            session,
            events_tx,
            updates_tx,
            stream: StreamInfo::default(),
            obs_core_idle: None,
            seen_attach_seq: 0,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        self.controller.state()
    }

    /// Run the core event loop. Returns on `Shutdown` or when every sender
    /// is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        let heartbeat_tx = self.events_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
                if heartbeat_tx.send(PlayerEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        let _ = self
            .updates_tx
            .send(PlayerUpdate::State(self.controller.state().clone()));

        loop {
            let before = self.controller.state().clone();
            let stream_before = self.stream.clone();

            match event_rx.recv().await {
                None => {
                    info!("PlayerCore: event channel closed, shutting down");
                    break;
                }
                Some(PlayerEvent::Shutdown) => {
                    info!("PlayerCore: shutdown requested");
                    break;
                }
                Some(PlayerEvent::Command(cmd)) => {
                    info!("PlayerCore: command {:?}", cmd);
                    self.handle_command(cmd).await;
                }
                Some(PlayerEvent::Mpv(evt)) => self.handle_mpv_event(evt).await,
                Some(PlayerEvent::HeartbeatTick) => {
                    if !self.controller.output_mut().check_alive() {
                        self.obs_core_idle = None;
                        self.controller
                            .on_stream_failed("mpv process exited".to_string())
                            .await;
                    }
                }
            }

            self.publish(&before, &stream_before).await;
        }

        self.controller.shutdown().await;
        self.controller.output_mut().kill().await;
        Ok(())
    }

    async fn handle_command(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::SelectStation(station) => self.controller.select_station(station).await,
            PlayerCommand::TogglePlay => {
                if !self.controller.toggle_play().await {
                    debug!("PlayerCore: toggle ignored, nothing loaded");
                }
            }
            PlayerCommand::SetVolume(v) => self.controller.set_volume(v).await,
            PlayerCommand::AdjustVolume(delta) => {
                let target = self.controller.state().volume + delta;
                self.controller.set_volume(target).await;
            }
            PlayerCommand::ToggleMute => self.controller.toggle_mute().await,
        }
    }

    // ── mpv event handler ─────────────────────────────────────────────────────

    async fn handle_mpv_event(&mut self, evt: MpvEvent) {
        debug!("mpv event: {:?}", evt.raw);

        if let Some((obs_id, data)) = evt.as_property_change() {
            match obs_id {
                OBS_CORE_IDLE => {
                    let val = data.as_bool();
                    if val != self.obs_core_idle {
                        debug!("mpv: core-idle → {:?}", val);
                        self.obs_core_idle = val;
                    }
                }
                OBS_PAUSE => debug!("mpv: pause → {:?}", data.as_bool()),
                OBS_ICY_TITLE | OBS_ICY_TITLE_BARE => {
                    let val = clean_icy_title(data);
                    if val != self.stream.icy_title {
                        info!("mpv: icy-title {:?} → {:?}", self.stream.icy_title, val);
                        self.stream.icy_title = val;
                    }
                }
                _ => {}
            }
            return;
        }

        if let Some(reason) = evt.end_reason() {
            self.handle_end_file(evt.playlist_entry_id(), reason).await;
            return;
        }

        if evt.event_name() == Some("file-loaded") {
            info!("mpv: file-loaded, re-issuing observe_property");
            // Give mpv a moment to settle on the new file so it pushes current values.
            if let Some(h) = self.controller.output().handle() {
                tokio::spawn(async move {
                    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    h.observe_all_properties().await;
                });
            }
        }
    }

    async fn handle_end_file(&mut self, entry: Option<u64>, reason: EndReason) {
        if !self.controller.source_attached() {
            debug!("mpv: end-file {:?} with nothing attached", reason);
            return;
        }
        if let (Some(got), Some(current)) = (entry, self.controller.output().current_entry()) {
            if got != current {
                debug!("mpv: end-file for old entry {} (current {})", got, current);
                return;
            }
        }
        info!("mpv: end-file reason={:?}", reason);
        match reason {
            EndReason::Eof => {
                self.controller.on_stream_ended().await;
            }
            EndReason::Error(detail) => {
                self.controller
                    .on_stream_failed(format!("stream error: {detail}"))
                    .await;
            }
            EndReason::Quit => {
                self.controller.on_stream_failed("mpv quit".to_string()).await;
            }
            EndReason::Other(other) => {
                self.controller
                    .on_stream_failed(format!("stream ended: {other}"))
                    .await;
            }
            EndReason::Stop | EndReason::Redirect => return,
        }
        self.obs_core_idle = None;
        self.stream.icy_title = None;
    }

    // ── broadcasting ──────────────────────────────────────────────────────────

    async fn publish(&mut self, before: &PlaybackState, stream_before: &StreamInfo) {
        while let Ok(failure) = self.failures.try_recv() {
            let _ = self.updates_tx.send(PlayerUpdate::Failed(failure));
        }

        let output = self.controller.output();
        if output.attach_seq() != self.seen_attach_seq {
            self.seen_attach_seq = output.attach_seq();
            self.stream.icy_title = None;
            self.obs_core_idle = None;
        }
        self.stream.mpv_health = output.health().clone();

        let state = self.controller.state().clone();
        self.stream.buffering = state.is_playing && self.obs_core_idle != Some(false);

        if state != *before {
            if state.volume != before.volume || state.is_muted != before.is_muted {
                self.persist(&state).await;
            }
            let _ = self.updates_tx.send(PlayerUpdate::State(state));
        }
        if self.stream != *stream_before {
            let _ = self.updates_tx.send(PlayerUpdate::Stream(self.stream.clone()));
        }
    }

    async fn persist(&self, state: &PlaybackState) {
        let persistent = PersistentState {
            volume: state.volume,
            muted: state.is_muted,
        };
        if let Err(e) = self.session.save(&persistent).await {
            warn!(
                "PlayerCore: failed to save session {}: {:#}",
                self.session.path().display(),
                e
            );
        }
    }
}

/// ICY titles of only dashes or whitespace mean "nothing".
fn clean_icy_title(data: &Value) -> Option<String> {
    let raw = data.as_str()?;
    if raw.trim().trim_matches('-').trim().is_empty() {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trivial_icy_titles_are_dropped() {
        assert_eq!(clean_icy_title(&json!(null)), None);
        assert_eq!(clean_icy_title(&json!(" - ")), None);
        assert_eq!(clean_icy_title(&json!("")), None);
        assert_eq!(
            clean_icy_title(&json!(" Daft Punk - Aerodynamic ")),
            Some("Daft Punk - Aerodynamic".to_string())
        );
    }

    #[tokio::test]
    async fn core_restores_session_volume() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store
            .save(&PersistentState {
                volume: 0.3,
                muted: true,
            })
            .await
            .unwrap();

        let (updates_tx, _) = broadcast::channel(8);
        let (events_tx, _events_rx) = mpsc::channel(8);
        let core = PlayerCore::new(store, 0.8, updates_tx, events_tx);
        assert!((core.state().volume - 0.3).abs() < 1e-6);
        assert!(core.state().is_muted);
        assert!(core.state().current_station.is_none());
    }

    #[tokio::test]
    async fn volume_commands_persist_without_mpv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let (updates_tx, mut updates_rx) = broadcast::channel(16);
        let (events_tx, events_rx) = mpsc::channel(16);
        let core = PlayerCore::new(SessionStore::new(path.clone()), 0.8, updates_tx, events_tx.clone());
        let task = tokio::spawn(core.run(events_rx));

        events_tx
            .send(PlayerEvent::Command(PlayerCommand::AdjustVolume(-0.3)))
            .await
            .unwrap();
        events_tx
            .send(PlayerEvent::Command(PlayerCommand::ToggleMute))
            .await
            .unwrap();
        events_tx.send(PlayerEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();

        let mut last = None;
        while let Ok(update) = updates_rx.try_recv() {
            if let PlayerUpdate::State(s) = update {
                last = Some(s);
            }
        }
        let last = last.unwrap();
        assert!((last.volume - 0.5).abs() < 1e-6);
        assert!(last.is_muted);

        let saved = SessionStore::new(path).load(0.8);
        assert!((saved.volume - 0.5).abs() < 1e-6);
        assert!(saved.muted);
    }
}
