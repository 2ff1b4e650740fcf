//! PlaybackController: the play/pause state machine over a single audio
//! output.
//!
//! ```text
//!   Idle ──select(s)──▶ Playing ◀──toggle──▶ Paused
//!                         │  ▲                  ▲
//!                         │  └─select(other)────┘ (always force-starts)
//!                         └──start failure / end of stream──▶ Paused
//! ```
//!
//! The controller owns the output exclusively. At most one source is attached
//! at a time; switching stations releases the old source before attaching the
//! new one.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use world_radio_proto::protocol::{PlaybackState, Station};

/// The single streaming audio element.
#[async_trait]
pub trait AudioOutput: Send {
    /// Start streaming `url` from scratch at `volume`.
    async fn attach(&mut self, url: &str, volume: f32) -> anyhow::Result<()>;
    /// Unpause the attached source.
    async fn resume(&mut self) -> anyhow::Result<()>;
    async fn pause(&mut self) -> anyhow::Result<()>;
    async fn set_volume(&mut self, volume: f32) -> anyhow::Result<()>;
    /// Drop the attached source, if any.
    async fn release(&mut self);
}

/// Reported once per failed start on the controller's error channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFailure {
    pub station: Station,
    pub reason: String,
}

pub struct PlaybackController<A> {
    state: PlaybackState,
    output: A,
    /// The output currently holds a source for `state.current_station`.
    source_attached: bool,
    on_error: mpsc::UnboundedSender<PlaybackFailure>,
}

impl<A: AudioOutput> PlaybackController<A> {
    pub fn new(output: A, initial: PlaybackState, on_error: mpsc::UnboundedSender<PlaybackFailure>) -> Self {
        Self {
            state: initial,
            output,
            source_attached: false,
            on_error,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn output(&self) -> &A {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut A {
        &mut self.output
    }

    pub fn source_attached(&self) -> bool {
        self.source_attached
    }

    /// Same station toggles play/pause; any other station replaces the
    /// current one and starts playing.
    pub async fn select_station(&mut self, station: Station) {
        if self.state.is_current(&station.id) {
            self.toggle_play().await;
            return;
        }

        info!("playback: switching to {:?}", station.name);
        if self.source_attached {
            self.output.release().await;
            self.source_attached = false;
        }
        self.state.current_station = Some(station);
        self.state.is_playing = true;
        self.start().await;
    }

    /// Flips play/pause. Returns `false` (and does nothing) when no station
    /// is loaded.
    pub async fn toggle_play(&mut self) -> bool {
        if self.state.current_station.is_none() {
            return false;
        }
        if self.state.is_playing {
            self.state.is_playing = false;
            if self.source_attached {
                if let Err(e) = self.output.pause().await {
                    // Paused in state must mean silent; drop the source.
                    warn!("playback: pause failed, releasing source: {:#}", e);
                    self.output.release().await;
                    self.source_attached = false;
                }
            }
        } else {
            self.state.is_playing = true;
            self.start().await;
        }
        true
    }

    /// Enter `Loaded-Playing`: resume the attached source or attach afresh.
    async fn start(&mut self) {
        let Some(station) = self.state.current_station.clone() else {
            return;
        };
        let result = if self.source_attached {
            self.output.resume().await
        } else {
            self.output
                .attach(&station.url_resolved, self.state.effective_volume())
                .await
        };
        match result {
            Ok(()) => self.source_attached = true,
            Err(e) => self.fail(format!("{e:#}")).await,
        }
    }

    async fn fail(&mut self, reason: String) {
        let Some(station) = self.state.current_station.clone() else {
            return;
        };
        warn!("playback: {:?} failed: {}", station.name, reason);
        if self.source_attached {
            self.output.release().await;
            self.source_attached = false;
        }
        self.state.is_playing = false;
        let _ = self.on_error.send(PlaybackFailure { station, reason });
    }

    /// The stream ran out. Acts as a toggle to paused; the next resume
    /// re-attaches. Ignored while already paused.
    pub async fn on_stream_ended(&mut self) {
        self.source_attached = false;
        if self.state.is_playing {
            debug!("playback: stream ended, pausing");
            self.state.is_playing = false;
        }
    }

    /// The output gave up on the current source after it was attached.
    /// Reported only when playback was wanted, so a burst of errors for one
    /// attempt yields one failure.
    pub async fn on_stream_failed(&mut self, reason: String) {
        if self.state.is_playing {
            self.fail(reason).await;
        } else {
            self.source_attached = false;
        }
    }

    /// Clamps to 0.0..=1.0 and unmutes.
    pub async fn set_volume(&mut self, volume: f32) {
        self.state.volume = volume.clamp(0.0, 1.0);
        self.state.is_muted = false;
        self.apply_volume().await;
    }

    pub async fn toggle_mute(&mut self) {
        self.state.is_muted = !self.state.is_muted;
        self.apply_volume().await;
    }

    async fn apply_volume(&mut self) {
        if let Err(e) = self.output.set_volume(self.state.effective_volume()).await {
            warn!("playback: set_volume failed: {:#}", e);
        }
    }

    /// Release the output for shutdown.
    pub async fn shutdown(&mut self) {
        if self.source_attached {
            self.output.release().await;
            self.source_attached = false;
        }
        self.state.is_playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Attach(String, f32),
        Resume,
        Pause,
        Volume(f32),
        Release,
    }

    /// Records calls; fails `attach` while `fail_attach` is set and `pause`
    /// while `fail_pause` is set.
    #[derive(Default)]
    struct FakeOutput {
        calls: Vec<Call>,
        fail_attach: bool,
        fail_pause: bool,
        attached: usize,
    }

    #[async_trait]
    impl AudioOutput for FakeOutput {
        async fn attach(&mut self, url: &str, volume: f32) -> anyhow::Result<()> {
            self.calls.push(Call::Attach(url.to_string(), volume));
            if self.fail_attach {
                anyhow::bail!("autoplay blocked");
            }
            self.attached += 1;
            Ok(())
        }
        async fn resume(&mut self) -> anyhow::Result<()> {
            self.calls.push(Call::Resume);
            Ok(())
        }
        async fn pause(&mut self) -> anyhow::Result<()> {
            self.calls.push(Call::Pause);
            if self.fail_pause {
                anyhow::bail!("ipc timeout");
            }
            Ok(())
        }
        async fn set_volume(&mut self, volume: f32) -> anyhow::Result<()> {
            self.calls.push(Call::Volume(volume));
            Ok(())
        }
        async fn release(&mut self) {
            self.calls.push(Call::Release);
            self.attached = self.attached.saturating_sub(1);
        }
    }

    fn station(id: &str) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Radio {id}"),
            url_resolved: format!("https://{id}.example/live"),
            ..Default::default()
        }
    }

    fn controller() -> (
        PlaybackController<FakeOutput>,
        mpsc::UnboundedReceiver<PlaybackFailure>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            PlaybackController::new(FakeOutput::default(), PlaybackState::default(), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn reselecting_same_station_toggles() {
        let (mut pc, _rx) = controller();
        let a = station("a");

        pc.select_station(a.clone()).await;
        assert!(pc.state().is_playing);

        pc.select_station(a.clone()).await;
        assert!(!pc.state().is_playing);
        assert_eq!(pc.state().current_station.as_ref(), Some(&a));

        pc.select_station(a.clone()).await;
        assert!(pc.state().is_playing);
        assert_eq!(pc.state().current_station.as_ref(), Some(&a));

        // paused then resumed, never re-attached
        let attaches = pc.output().calls.iter().filter(|c| matches!(c, Call::Attach(..))).count();
        assert_eq!(attaches, 1);
        assert!(pc.output().calls.contains(&Call::Resume));
    }

    #[tokio::test]
    async fn switching_always_force_starts() {
        let (mut pc, _rx) = controller();
        pc.select_station(station("a")).await;
        pc.toggle_play().await;
        assert!(!pc.state().is_playing);

        pc.select_station(station("b")).await;
        assert!(pc.state().is_playing);
        assert!(pc.state().is_current("b"));

        // old source released before the new one is attached
        let calls = &pc.output().calls;
        let release = calls.iter().position(|c| *c == Call::Release).unwrap();
        let attach_b = calls
            .iter()
            .position(|c| matches!(c, Call::Attach(u, _) if u.contains("b.example")))
            .unwrap();
        assert!(release < attach_b);
        assert_eq!(pc.output().attached, 1);
    }

    #[tokio::test]
    async fn toggle_from_idle_is_noop() {
        let (mut pc, _rx) = controller();
        assert!(!pc.toggle_play().await);
        assert!(!pc.state().is_playing);
        assert!(pc.output().calls.is_empty());
    }

    #[tokio::test]
    async fn start_failure_pauses_and_reports_once() {
        let (mut pc, mut rx) = controller();
        pc.output_mut().fail_attach = true;

        pc.select_station(station("a")).await;

        assert!(!pc.state().is_playing);
        assert!(pc.state().is_current("a"));
        let failure = rx.try_recv().unwrap();
        assert_eq!(failure.station.id, "a");
        assert!(failure.reason.contains("autoplay blocked"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_pause_releases_the_source() {
        let (mut pc, mut rx) = controller();
        pc.select_station(station("a")).await;
        pc.output_mut().fail_pause = true;

        assert!(pc.toggle_play().await);
        assert!(!pc.state().is_playing);
        assert!(!pc.source_attached());
        assert_eq!(pc.output().attached, 0);
        assert_eq!(pc.output().calls.last(), Some(&Call::Release));
        assert!(rx.try_recv().is_err());

        pc.toggle_play().await;
        assert!(pc.state().is_playing);
        assert_eq!(pc.output().attached, 1);
    }

    #[tokio::test]
    async fn async_failure_reports_once_per_attempt() {
        let (mut pc, mut rx) = controller();
        pc.select_station(station("a")).await;

        pc.on_stream_failed("loading failed".into()).await;
        pc.on_stream_failed("loading failed".into()).await;

        assert!(!pc.state().is_playing);
        assert!(!pc.source_attached());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // resuming re-attaches
        pc.toggle_play().await;
        assert!(pc.state().is_playing);
        let attaches = pc.output().calls.iter().filter(|c| matches!(c, Call::Attach(..))).count();
        assert_eq!(attaches, 2);
    }

    #[tokio::test]
    async fn end_of_stream_pauses_only_when_playing() {
        let (mut pc, mut rx) = controller();
        pc.select_station(station("a")).await;

        pc.on_stream_ended().await;
        assert!(!pc.state().is_playing);
        assert!(pc.state().is_current("a"));

        pc.on_stream_ended().await;
        assert!(!pc.state().is_playing);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mute_and_volume() {
        let (mut pc, _rx) = controller();
        pc.set_volume(0.5).await;
        pc.toggle_mute().await;
        assert!(pc.state().is_muted);
        assert_eq!(pc.state().effective_volume(), 0.0);
        assert_eq!(pc.state().volume, 0.5);

        // new source starts silent while muted
        pc.select_station(station("a")).await;
        assert!(pc.output().calls.contains(&Call::Attach("https://a.example/live".into(), 0.0)));

        pc.set_volume(1.7).await;
        assert!(!pc.state().is_muted);
        assert_eq!(pc.state().volume, 1.0);
        assert_eq!(pc.output().calls.last(), Some(&Call::Volume(1.0)));
    }
}
