//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns all components, the `SelectionController` and `AppState`
//!   (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (terminal input, player updates, fetch results, HTTP commands).
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Playback commands flow out to the `PlayerCore` task over `player_tx`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use world_radio_proto::geo::{CountrySet, GeoDataSource};
use world_radio_proto::protocol::{PlaybackState, RemoteCommand};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        country_panel, globe::Globe, help_overlay::HelpOverlay, log_panel::LogPanel, player_bar,
        station_list::StationList,
    },
    core::{PlayerCommand, PlayerEvent, PlayerUpdate},
    http::SharedApiState,
    selection::{SelectOutcome, SelectionController, SelectionEvent},
    widgets::{
        status_bar::{self, InputMode},
        toast::{Severity, ToastManager},
    },
    workspace::WorkspaceManager,
};

/// Relative volume step for `+` / `-`.
const VOLUME_STEP: f32 = 0.05;
/// Lines of the log file kept for the log panel.
const LOG_TAIL_LINES: usize = 500;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    Player(PlayerUpdate),
    Selection(SelectionEvent),
    Remote(RemoteCommand),
    GeoLoaded(Result<CountrySet, String>),
}

// ── Pane area tracking ────────────────────────────────────────────────────────

/// Last-drawn layout rects for each focusable pane, for mouse hit-testing.
#[derive(Default, Clone)]
struct PaneAreas {
    globe: Rect,
    station_list: Rect,
    log_panel: Rect,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    tui_log_path: PathBuf,

    // ── Shared state (passed read-only to components) ─────────────────────────
    pub state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    globe: Globe,
    station_list: StationList,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    // ── Workspace / layout ────────────────────────────────────────────────────
    wm: WorkspaceManager,
    toast: ToastManager,
    pane_areas: PaneAreas,

    // ── Controllers and outbound channels ─────────────────────────────────────
    selection: SelectionController,
    player_tx: mpsc::Sender<PlayerEvent>,
    api_state: SharedApiState,

    should_quit: bool,
}

impl App {
    pub fn new(
        tui_log_path: PathBuf,
        initial_playback: PlaybackState,
        selection: SelectionController,
        player_tx: mpsc::Sender<PlayerEvent>,
        api_state: SharedApiState,
        auto_rotate: bool,
    ) -> Self {
        Self {
            state: AppState::new(initial_playback, tui_log_path.clone()),
            tui_log_path,
            globe: Globe::new(auto_rotate),
            station_list: StationList::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            wm: WorkspaceManager::new(),
            toast: ToastManager::new(),
            pane_areas: PaneAreas::default(),
            selection,
            player_tx,
            api_state,
            should_quit: false,
        }
    }

    pub async fn run(
        mut self,
        geo: GeoDataSource,
        mut player_rx: broadcast::Receiver<PlayerUpdate>,
        mut selection_rx: mpsc::UnboundedReceiver<SelectionEvent>,
        mut remote_rx: mpsc::Receiver<RemoteCommand>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: player updates (PlayerCore → AppMessage) ─────────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match player_rx.recv().await {
                    Ok(update) => {
                        if bc_tx.send(AppMessage::Player(update)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("player update receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // ── Background task: selection fetch results ──────────────────────────
        let sel_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = selection_rx.recv().await {
                if sel_tx.send(AppMessage::Selection(ev)).await.is_err() {
                    break;
                }
            }
        });

        // ── Background task: HTTP API commands ────────────────────────────────
        let remote_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(cmd) = remote_rx.recv().await {
                if remote_tx.send(AppMessage::Remote(cmd)).await.is_err() {
                    break;
                }
            }
        });

        // ── Background task: one-shot boundary dataset load ───────────────────
        self.toast.spinner("loading world map…");
        let geo_tx = tx.clone();
        tokio::spawn(async move {
            let result = geo.load().await.map_err(|e| e.to_string());
            let _ = geo_tx.send(AppMessage::GeoLoaded(result)).await;
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry check + spinner animation
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Component tick: globe rotation and camera flights
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // log tail refresh
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.reload_tui_log();
        self.publish_api_state();

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else {
                            break;
                        };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    let tick_actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.globe.tick(s));
                        all.extend(self.station_list.tick(s));
                        all.extend(self.log_panel.tick(s));
                        all
                    };
                    for action in tick_actions {
                        self.dispatch(action).await;
                    }
                    needs_redraw = true;
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }

                _ = log_refresh.tick() => {
                    self.reload_tui_log();
                    needs_redraw = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        info!("world-radio shutting down");
        let _ = self.player_tx.send(PlayerEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    for a in self.handle_key(key) {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Moved {
                        return false;
                    }
                    for a in self.handle_mouse(mouse) {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                }
                _ => return false,
            },

            AppMessage::Player(update) => match update {
                PlayerUpdate::State(playback) => {
                    self.state.playback = playback;
                    self.publish_api_state();
                }
                PlayerUpdate::Stream(stream) => {
                    self.state.stream = stream;
                    self.publish_api_state();
                }
                PlayerUpdate::Failed(failure) => {
                    // Paused state arrives separately; nothing is shown here.
                    warn!(
                        "playback of {} failed: {}",
                        failure.station.name, failure.reason
                    );
                    return false;
                }
            },

            AppMessage::Selection(ev) => {
                let stations_loaded = matches!(ev, SelectionEvent::StationsLoaded { .. });
                if !self.selection.apply(ev) {
                    return false;
                }
                self.state.selection = self.selection.state().clone();
                if stations_loaded
                    && self.station_list.sync_stations(&self.state.selection.stations)
                {
                    self.state.input_mode = InputMode::Normal;
                }
                self.publish_api_state();
            }

            AppMessage::Remote(cmd) => self.on_remote_command(cmd).await,

            AppMessage::GeoLoaded(Ok(countries)) => {
                info!(
                    "world map loaded: {} countries ({} selectable)",
                    countries.len(),
                    countries.selectable().count()
                );
                self.toast.resolve_spinner(
                    Severity::Success,
                    format!("world map loaded · {} countries", countries.len()),
                    Duration::from_secs(3),
                );
                self.state.countries = Arc::new(countries);
                self.state.geo_loading = false;
            }
            AppMessage::GeoLoaded(Err(e)) => {
                error!("world map failed to load: {}", e);
                self.toast.resolve_spinner(
                    Severity::Error,
                    "world map unavailable",
                    Duration::from_secs(6),
                );
                self.state.geo_loading = false;
            }
        }
        true
    }

    async fn on_remote_command(&mut self, cmd: RemoteCommand) {
        debug!("remote command: {:?}", cmd);
        match cmd {
            RemoteCommand::SelectCountry { code } => {
                let Some(country) = self.state.countries.by_code(&code) else {
                    info!("remote: unknown country code {}, ignoring", code);
                    return;
                };
                let name = country.name.clone();
                self.toast.info(format!("remote: exploring {}", name));
                self.dispatch(Action::SelectCountry(code, name)).await;
            }
            RemoteCommand::PlayStation { idx } => self.dispatch(Action::PlayStation(idx)).await,
            RemoteCommand::TogglePlay => self.dispatch(Action::TogglePlay).await,
            RemoteCommand::Volume { value } => {
                self.send_player(PlayerCommand::SetVolume(value)).await;
            }
            RemoteCommand::ToggleMute => self.dispatch(Action::Mute).await,
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let normal = self.state.input_mode == InputMode::Normal;

        // Global keys, active regardless of focus
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE && normal => {
                return vec![Action::Quit];
            }
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if normal => return vec![Action::ToggleHelp],
            KeyCode::Char('L') if normal => return vec![Action::ToggleLogs],
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.wm.show_help {
            let actions = self.help_overlay.handle_key(key, &self.state);
            if !actions.is_empty() {
                return actions;
            }
            return vec![Action::ToggleHelp];
        }

        // Tab / Shift-Tab always cycle focus (closing an open filter first)
        match key.code {
            KeyCode::Tab => {
                if !normal {
                    return vec![Action::CloseFilter, Action::FocusNext];
                }
                return vec![Action::FocusNext];
            }
            KeyCode::BackTab => {
                if !normal {
                    return vec![Action::CloseFilter, Action::FocusPrev];
                }
                return vec![Action::FocusPrev];
            }
            _ => {}
        }

        // Global playback keys (Normal mode only)
        if normal {
            match key.code {
                KeyCode::Char(' ') => return vec![Action::TogglePlay],
                KeyCode::Char('+') | KeyCode::Char('=') => return vec![Action::Volume(VOLUME_STEP)],
                KeyCode::Char('-') => return vec![Action::Volume(-VOLUME_STEP)],
                KeyCode::Char('m') => return vec![Action::Mute],
                KeyCode::Char('K') => return vec![Action::ToggleKeys],
                KeyCode::Char('1') => {
                    self.wm.focus_nth(0);
                    return vec![];
                }
                KeyCode::Char('2') => {
                    self.wm.focus_nth(1);
                    return vec![];
                }
                _ => {}
            }
        }

        // Dispatch to the focused component
        let s = &self.state;
        match self.wm.focused() {
            Some(ComponentId::Globe) => self.globe.handle_key(key, s),
            Some(ComponentId::StationList) => self.station_list.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            Some(ComponentId::HelpOverlay) | None => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click || self.wm.show_help {
            return vec![];
        }

        let col = event.column;
        let row = event.row;

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas.clone();
        let filter_open = self.state.input_mode == InputMode::Filter;
        let s = &self.state;

        // Dispatch to the clicked pane; focus follows the click.
        macro_rules! click_pane {
            ($id:expr, $component:expr, $area:expr) => {{
                let mut actions = $component.handle_mouse(event, $area, s);
                if self.wm.focused() != Some($id) {
                    actions.insert(0, Action::FocusPane($id));
                    if filter_open {
                        actions.insert(0, Action::CloseFilter);
                    }
                }
                return actions;
            }};
        }

        if hit(areas.globe, col, row) {
            click_pane!(ComponentId::Globe, self.globe, areas.globe);
        }
        if hit(areas.station_list, col, row) {
            click_pane!(ComponentId::StationList, self.station_list, areas.station_list);
        }
        if hit(areas.log_panel, col, row) {
            click_pane!(ComponentId::LogPanel, self.log_panel, areas.log_panel);
        }

        vec![]
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast to all components first so they can react (camera flights etc.)
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.globe.on_action(&action, s));
            out.extend(self.station_list.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // depth-limited to one level
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match &action {
            Action::Hover(_) => {}
            _ => debug!("apply_action: {:?}", action),
        }
        match action {
            // ── Selection ─────────────────────────────────────────────────────
            Action::SelectCountry(code, name) => match self.selection.select_country(&code, &name) {
                Ok(SelectOutcome::Started(_)) => {
                    self.state.selection = self.selection.state().clone();
                    if self.station_list.sync_stations(&[]) {
                        self.state.input_mode = InputMode::Normal;
                    }
                    self.publish_api_state();
                }
                Ok(SelectOutcome::Unchanged) => {}
                Err(e) => warn!("select country {:?}/{:?}: {}", code, name, e),
            },
            Action::Hover(code) => self.state.hovered_code = code,

            // ── Playback ──────────────────────────────────────────────────────
            Action::PlayStation(idx) => match self.state.selection.stations.get(idx) {
                Some(station) => {
                    let station = station.clone();
                    self.send_player(PlayerCommand::SelectStation(station)).await;
                }
                None => warn!(
                    "play station {}: only {} stations listed",
                    idx,
                    self.state.selection.stations.len()
                ),
            },
            Action::TogglePlay => self.send_player(PlayerCommand::TogglePlay).await,
            Action::Volume(delta) => self.send_player(PlayerCommand::AdjustVolume(delta)).await,
            Action::Mute => self.send_player(PlayerCommand::ToggleMute).await,

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext => {
                self.wm.focus_next();
            }
            Action::FocusPrev => {
                self.wm.focus_prev();
            }
            Action::FocusPane(id) => self.wm.focus_set(id),

            // ── Filter ────────────────────────────────────────────────────────
            Action::OpenFilter => self.state.input_mode = InputMode::Filter,
            Action::CloseFilter => self.state.input_mode = InputMode::Normal,

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleLogs => {
                if self.wm.toggle_log_panel() {
                    self.reload_tui_log();
                }
            }
            Action::ToggleHelp => self.wm.show_help = !self.wm.show_help,
            Action::ToggleKeys => self.wm.show_keys_bar = !self.wm.show_keys_bar,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text.clone()
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            // ── System ────────────────────────────────────────────────────────
            Action::Quit => self.should_quit = true,
            Action::Resize(_, _) => {}
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        // ── Outer layout: body | log | player bar | keys bar ─────────────────
        let log_h = if self.wm.show_log_panel { 10u16 } else { 1 };
        let player_h = 2u16;
        let keys_h = if self.wm.show_keys_bar { 1u16 } else { 0 };

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(log_h),
                Constraint::Length(player_h),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.draw_body(frame, outer[0]);

        let log_focused = self.wm.focus.is_focused(ComponentId::LogPanel);
        self.log_panel.draw(frame, outer[1], log_focused, &self.state);
        self.pane_areas.log_panel = outer[1];

        player_bar::draw(frame, outer[2], &self.state);

        if self.wm.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[3], self.state.input_mode);
        }

        // ── Help overlay (on top of everything) ──────────────────────────────
        if self.wm.show_help {
            self.help_overlay.draw(frame, area, false, &self.state);
        }

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }

    /// Globe on the left, sidebar (country panel over station list) on the right.
    fn draw_body(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let globe_focused = self.wm.focus.is_focused(ComponentId::Globe);
        self.globe.draw(frame, cols[0], globe_focused, &self.state);
        self.pane_areas.globe = cols[0];

        let header_h = if self.state.selection.has_selection() {
            country_panel::HEIGHT
        } else {
            3
        };
        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(header_h), Constraint::Min(0)])
            .split(cols[1]);

        country_panel::draw(frame, sidebar[0], &self.state);

        let list_focused = self.wm.focus.is_focused(ComponentId::StationList);
        self.station_list
            .draw(frame, sidebar[1], list_focused, &self.state);
        self.pane_areas.station_list = sidebar[1];
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    async fn send_player(&self, cmd: PlayerCommand) {
        if self.player_tx.send(PlayerEvent::Command(cmd)).await.is_err() {
            error!("player core is gone, command dropped");
        }
    }

    /// Refresh the snapshot served by the HTTP API.
    fn publish_api_state(&self) {
        let mut api = match self.api_state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        api.rev += 1;
        api.selection = self.state.selection.clone();
        api.playback = self.state.playback.clone();
        api.stream = self.state.stream.clone();
    }

    /// Read the tail of the log file into state.tui_log_lines.
    fn reload_tui_log(&mut self) {
        if let Ok(content) = std::fs::read_to_string(&self.tui_log_path) {
            let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            let start = lines.len().saturating_sub(LOG_TAIL_LINES);
            self.state.tui_log_lines = lines[start..].to_vec();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;

    use async_trait::async_trait;
    use world_radio_proto::directory::StationDirectory;
    use world_radio_proto::insight::InsightSource;
    use world_radio_proto::protocol::{ApiState, Station};

    use super::*;

    struct OneStation;

    #[async_trait]
    impl StationDirectory for OneStation {
        async fn list_stations(&self, country_code: &str) -> Vec<Station> {
            vec![station(&country_code.to_lowercase())]
        }
    }

    struct Quiet;

    #[async_trait]
    impl InsightSource for Quiet {
        async fn get_insight(&self, country_name: &str) -> String {
            format!("{country_name} has radio")
        }
    }

    fn station(id: &str) -> Station {
        Station {
            id: id.into(),
            name: id.into(),
            url_resolved: format!("https://{id}.example/"),
            ..Default::default()
        }
    }

    fn app() -> (
        App,
        mpsc::Receiver<PlayerEvent>,
        mpsc::UnboundedReceiver<SelectionEvent>,
    ) {
        let (sel_tx, sel_rx) = mpsc::unbounded_channel();
        let selection = SelectionController::new(Arc::new(OneStation), Arc::new(Quiet), sel_tx);
        let (player_tx, player_rx) = mpsc::channel(16);
        let playback = PlaybackState {
            current_station: Some(station("fip")),
            is_playing: true,
            ..Default::default()
        };
        let app = App::new(
            PathBuf::new(),
            playback,
            selection,
            player_tx,
            Arc::new(RwLock::new(ApiState::default())),
            false,
        );
        (app, player_rx, sel_rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn open_station_filter(app: &mut App) {
        let actions = app.station_list.handle_key(key(KeyCode::Char('/')), &app.state);
        for a in actions {
            app.dispatch(a).await;
        }
        assert_eq!(app.state.input_mode, InputMode::Filter);
    }

    #[tokio::test]
    async fn switching_countries_leaves_playback_alone() {
        let (mut app, mut player_rx, mut sel_rx) = app();

        app.dispatch(Action::SelectCountry("FR".into(), "France".into())).await;
        app.dispatch(Action::SelectCountry("DE".into(), "Germany".into())).await;
        for _ in 0..4 {
            if let Some(ev) = sel_rx.recv().await {
                app.handle_message(AppMessage::Selection(ev)).await;
            }
        }

        assert_eq!(app.state.selection.country_code.as_deref(), Some("DE"));
        assert!(player_rx.try_recv().is_err());
        assert!(app.state.playback.is_playing);
        assert_eq!(app.state.playback.current_station, Some(station("fip")));
    }

    #[tokio::test]
    async fn new_selection_leaves_filter_mode() {
        let (mut app, _player_rx, _sel_rx) = app();
        open_station_filter(&mut app).await;

        app.dispatch(Action::SelectCountry("FR".into(), "France".into())).await;
        assert_eq!(app.state.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn stations_arriving_mid_filter_leave_filter_mode() {
        let (mut app, _player_rx, mut sel_rx) = app();
        app.dispatch(Action::SelectCountry("FR".into(), "France".into())).await;
        open_station_filter(&mut app).await;

        while let Some(ev) = sel_rx.recv().await {
            let stations = matches!(ev, SelectionEvent::StationsLoaded { .. });
            app.handle_message(AppMessage::Selection(ev)).await;
            if stations {
                break;
            }
        }
        assert_eq!(app.state.selection.stations.len(), 1);
        assert_eq!(app.state.input_mode, InputMode::Normal);
    }
}
