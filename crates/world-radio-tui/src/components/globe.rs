//! Globe component: the orthographic world map on the left.
//!
//! Countries are drawn as braille outlines. Highlighting is derived from
//! `AppState` at draw time (hovered = under the reticle, selected = the
//! explored country); the component itself only owns the camera and the
//! search box.

use rand::seq::IteratorRandom;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine},
        Block, Borders, Clear, List, ListItem,
    },
    Frame,
};
use tracing::{debug, info};

use world_radio_proto::geo::{Country, CountrySet, GeoPoint};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    projection::Camera,
    theme::{
        C_BG, C_CONNECTING, C_GLOBE_GRID, C_GLOBE_RIM, C_LAND, C_LAND_HOVER, C_LAND_SELECTED,
        C_MUTED, C_PRIMARY, C_SELECTION_BG,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
    },
};

/// Degrees of longitude per tick while auto-rotating.
const AUTO_ROTATE_STEP: f64 = 0.6;
const ROTATE_STEP: f64 = 5.0;
const ROTATE_STEP_FAST: f64 = 20.0;
const ZOOM_STEP: f64 = 1.25;
/// Canvas half-extent around the unit globe at zoom 1.
const VIEW_MARGIN: f64 = 1.08;
const MAX_SEARCH_HITS: usize = 8;

pub struct Globe {
    pub camera: Camera,
    pub auto_rotate: bool,
    search: FilterInput,
    /// (code, name) of the current search matches.
    hits: Vec<(String, String)>,
    hit_cursor: usize,
    last_hover: Option<String>,
}

impl Globe {
    pub fn new(auto_rotate: bool) -> Self {
        Self {
            camera: Camera::default(),
            auto_rotate,
            search: FilterInput::new("country name…"),
            hits: Vec::new(),
            hit_cursor: 0,
            last_hover: None,
        }
    }

    /// Any user-driven camera movement stops the idle spin.
    fn interact(&mut self) {
        if self.auto_rotate {
            debug!("globe: auto-rotation stopped");
        }
        self.auto_rotate = false;
    }

    /// Country under a terminal cell of the pane's inner area.
    fn pick<'c>(&self, inner: Rect, col: u16, row: u16, countries: &'c CountrySet) -> Option<&'c Country> {
        let (x, y) = cell_to_canvas(inner, col, row)?;
        let p = self.camera.unproject(x / self.camera.zoom, y / self.camera.zoom)?;
        countries.country_at(p)
    }

    fn refresh_hits(&mut self, query: &str, countries: &CountrySet) {
        self.hits = countries
            .search(query)
            .into_iter()
            .filter_map(|c| Some((c.code.clone()?, c.name.clone())))
            .take(MAX_SEARCH_HITS)
            .collect();
        self.hit_cursor = 0;
    }

    fn handle_search_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up => {
                self.hit_cursor = self.hit_cursor.saturating_sub(1);
                return vec![];
            }
            KeyCode::Down => {
                self.hit_cursor = (self.hit_cursor + 1).min(self.hits.len().saturating_sub(1));
                return vec![];
            }
            _ => {}
        }
        match self.search.handle_key(key) {
            FilterAction::Changed(q) => {
                self.refresh_hits(&q, &state.countries);
                vec![]
            }
            FilterAction::Confirmed => {
                let mut actions = vec![Action::CloseFilter];
                if let Some((code, name)) = self.hits.get(self.hit_cursor).cloned() {
                    self.interact();
                    actions.push(Action::SelectCountry(code, name));
                }
                self.search.clear();
                self.hits.clear();
                actions
            }
            FilterAction::Cancelled => {
                self.search.clear();
                self.hits.clear();
                vec![Action::CloseFilter]
            }
        }
    }

    fn draw_search(&self, frame: &mut Frame, inner: Rect) {
        if inner.height < 3 || inner.width < 10 {
            return;
        }
        let input_area = Rect {
            y: inner.y + inner.height - 1,
            height: 1,
            ..inner
        };
        self.search.draw(frame, input_area);

        if self.hits.is_empty() {
            return;
        }
        let height = (self.hits.len() as u16 + 2).min(inner.height - 1);
        let width = 32.min(inner.width);
        let popup = Rect {
            x: inner.x,
            y: input_area.y.saturating_sub(height),
            width,
            height,
        };
        let items: Vec<ListItem> = self
            .hits
            .iter()
            .enumerate()
            .map(|(i, (code, name))| {
                let style = if i == self.hit_cursor {
                    Style::default()
                        .fg(C_PRIMARY)
                        .bg(C_SELECTION_BG)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(C_MUTED)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {} ", code), Style::default().fg(C_LAND_HOVER)),
                    Span::styled(name.as_str(), style),
                ]))
            })
            .collect();
        frame.render_widget(Clear, popup);
        frame.render_widget(
            List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_GLOBE_RIM))
                    .style(Style::default().bg(C_BG)),
            ),
            popup,
        );
    }
}

impl Default for Globe {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Emit a selection for `country`, or log and ignore it when the dataset
/// gave it no usable code.
fn select(country: &Country) -> Vec<Action> {
    match &country.code {
        Some(code) => vec![Action::SelectCountry(code.clone(), country.name.clone())],
        None => {
            info!("globe: {} has no usable country code, ignoring", country.name);
            vec![]
        }
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────────

/// Canvas half-extents for an area, keeping the globe round on cells that
/// are about twice as tall as they are wide.
fn view_extent(area: Rect) -> (f64, f64) {
    let w = area.width.max(1) as f64;
    let h = area.height.max(1) as f64;
    let aspect = w / (2.0 * h);
    if aspect >= 1.0 {
        (VIEW_MARGIN * aspect, VIEW_MARGIN)
    } else {
        (VIEW_MARGIN, VIEW_MARGIN / aspect)
    }
}

/// Canvas coordinates of the centre of a terminal cell, `None` outside `area`.
fn cell_to_canvas(area: Rect, col: u16, row: u16) -> Option<(f64, f64)> {
    if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
        return None;
    }
    let (xe, ye) = view_extent(area);
    let fx = ((col - area.x) as f64 + 0.5) / area.width as f64;
    let fy = ((row - area.y) as f64 + 0.5) / area.height as f64;
    Some((-xe + fx * 2.0 * xe, ye - fy * 2.0 * ye))
}

/// Draw a projected polyline, breaking it wherever it dips behind the globe.
fn draw_path(
    ctx: &mut Context,
    camera: &Camera,
    points: impl IntoIterator<Item = GeoPoint>,
    color: Color,
    extent: (f64, f64),
) {
    let (xe, ye) = extent;
    let zoom = camera.zoom;
    let mut prev: Option<(f64, f64)> = None;
    for p in points {
        let cur = camera.project(p).map(|(x, y)| (x * zoom, y * zoom));
        if let (Some((x1, y1)), Some((x2, y2))) = (prev, cur) {
            let off_screen = (x1 > xe && x2 > xe)
                || (x1 < -xe && x2 < -xe)
                || (y1 > ye && y2 > ye)
                || (y1 < -ye && y2 < -ye);
            if !off_screen {
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                });
            }
        }
        prev = cur;
    }
}

fn draw_graticule(ctx: &mut Context, camera: &Camera, extent: (f64, f64)) {
    for lat in (-60..=60).step_by(30) {
        let ring = (-180..=180).step_by(5).map(|lon| GeoPoint::new(lat as f64, lon as f64));
        draw_path(ctx, camera, ring, C_GLOBE_GRID, extent);
    }
    for lon in (-180..180).step_by(30) {
        let meridian = (-90..=90).step_by(5).map(|lat| GeoPoint::new(lat as f64, lon as f64));
        draw_path(ctx, camera, meridian, C_GLOBE_GRID, extent);
    }
}

fn draw_country(ctx: &mut Context, camera: &Camera, country: &Country, color: Color, extent: (f64, f64)) {
    for poly in &country.polygons {
        let ring = poly.exterior();
        // close the ring
        let closed = ring.iter().copied().chain(ring.first().copied());
        draw_path(ctx, camera, closed, color, extent);
    }
}

fn label(ctx: &mut Context, camera: &Camera, country: &Country, color: Color) {
    if let Some((x, y)) = camera.project(country.focus_point()) {
        ctx.print(
            x * camera.zoom,
            y * camera.zoom,
            Span::styled(
                country.name.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        );
    }
}

impl Component for Globe {
    fn id(&self) -> ComponentId {
        ComponentId::Globe
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.search.is_active() {
            return self.handle_search_key(key, state);
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            ROTATE_STEP_FAST
        } else {
            ROTATE_STEP
        } / self.camera.zoom;

        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.interact();
                self.camera.rotate(0.0, -step);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.interact();
                self.camera.rotate(0.0, step);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.interact();
                self.camera.rotate(step, 0.0);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.interact();
                self.camera.rotate(-step, 0.0);
            }
            KeyCode::Char('z') => {
                self.interact();
                self.camera.zoom_by(ZOOM_STEP);
            }
            KeyCode::Char('Z') => {
                self.interact();
                self.camera.zoom_by(1.0 / ZOOM_STEP);
            }
            KeyCode::Char('a') => {
                info!("globe: auto-rotation resumed");
                self.auto_rotate = true;
            }
            KeyCode::Enter => {
                self.interact();
                if let Some(country) = state.countries.country_at(self.camera.centre()) {
                    return select(country);
                }
            }
            KeyCode::Char('r') => {
                self.interact();
                if let Some(country) = state.countries.selectable().choose(&mut rand::thread_rng()) {
                    return select(country);
                }
            }
            KeyCode::Char('/') => {
                self.search.activate();
                self.refresh_hits("", &state.countries);
                return vec![Action::OpenFilter];
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        let inner = area.inner(Margin::new(1, 1));
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.interact();
                if let Some(country) = self.pick(inner, event.column, event.row, &state.countries) {
                    return select(country);
                }
            }
            MouseEventKind::ScrollUp => {
                self.interact();
                self.camera.zoom_by(ZOOM_STEP);
            }
            MouseEventKind::ScrollDown => {
                self.interact();
                self.camera.zoom_by(1.0 / ZOOM_STEP);
            }
            _ => {}
        }
        vec![]
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        let flying = self.camera.step();
        if !flying && self.auto_rotate && !state.countries.is_empty() {
            self.camera.rotate(0.0, AUTO_ROTATE_STEP);
        }

        let hovered = state
            .countries
            .country_at(self.camera.centre())
            .and_then(|c| c.code.clone());
        if hovered != self.last_hover {
            self.last_hover = hovered.clone();
            return vec![Action::Hover(hovered)];
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::SelectCountry(code, _) => {
                if let Some(country) = state.countries.by_code(code) {
                    self.interact();
                    self.camera.fly_to(country.focus_point());
                }
            }
            Action::CloseFilter if self.search.is_active() => {
                self.search.deactivate();
                self.search.clear();
                self.hits.clear();
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let hovered = state
            .hovered_code
            .as_deref()
            .and_then(|code| state.countries.by_code(code));
        let title = match hovered {
            Some(c) => format!("globe · {}", c.name),
            None => "globe".to_string(),
        };
        let badge = state.geo_loading.then_some(Badge {
            text: "LOADING",
            color: C_CONNECTING,
        });
        let block = pane_chrome(&title, Some('1'), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let camera = self.camera;
        let extent = view_extent(inner);
        let (xe, ye) = extent;
        let countries = &state.countries;
        let selected = state
            .selected_code()
            .and_then(|code| countries.by_code(code));
        let empty_msg = match (countries.is_empty(), state.geo_loading) {
            (false, _) => None,
            (true, true) => Some("loading world map…"),
            (true, false) => Some("world map unavailable"),
        };

        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .background_color(C_BG)
            .x_bounds([-xe, xe])
            .y_bounds([-ye, ye])
            .paint(move |ctx| {
                ctx.draw(&Circle {
                    x: 0.0,
                    y: 0.0,
                    radius: camera.zoom,
                    color: C_GLOBE_RIM,
                });
                draw_graticule(ctx, &camera, extent);
                ctx.layer();

                let is_highlighted = |c: &Country| {
                    c.code.is_some()
                        && (c.code == selected.and_then(|s| s.code.clone())
                            || c.code == hovered.and_then(|h| h.code.clone()))
                };
                for country in countries.iter().filter(|c| !is_highlighted(c)) {
                    draw_country(ctx, &camera, country, C_LAND, extent);
                }
                ctx.layer();

                // selected wins over hovered
                if let Some(c) = hovered {
                    draw_country(ctx, &camera, c, C_LAND_HOVER, extent);
                }
                if let Some(c) = selected {
                    draw_country(ctx, &camera, c, C_LAND_SELECTED, extent);
                    label(ctx, &camera, c, C_LAND_SELECTED);
                }

                ctx.print(0.0, 0.0, Span::styled("+", Style::default().fg(C_PRIMARY)));
                if let Some(msg) = empty_msg {
                    ctx.print(-0.4, -0.3, Span::styled(msg, Style::default().fg(C_MUTED)));
                }
            });
        frame.render_widget(canvas, inner);

        if self.search.is_active() {
            self.draw_search(frame, inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use world_radio_proto::geo::{BBox, Polygon};
    use world_radio_proto::protocol::PlaybackState;

    fn square(code: Option<&str>, name: &str, lat: f64, lon: f64, half: f64) -> Country {
        let ring = vec![
            GeoPoint::new(lat - half, lon - half),
            GeoPoint::new(lat - half, lon + half),
            GeoPoint::new(lat + half, lon + half),
            GeoPoint::new(lat + half, lon - half),
            GeoPoint::new(lat - half, lon - half),
        ];
        Country {
            code: code.map(String::from),
            name: name.into(),
            polygons: vec![Polygon { rings: vec![ring] }],
            bbox: BBox {
                min_lon: lon - half,
                min_lat: lat - half,
                max_lon: lon + half,
                max_lat: lat + half,
            },
        }
    }

    fn state_with(countries: Vec<Country>) -> AppState {
        let mut state = AppState::new(PlaybackState::default(), PathBuf::new());
        state.countries = Arc::new(CountrySet::new(countries));
        state.geo_loading = false;
        state
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: col,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn globe_at(lat: f64, lon: f64) -> Globe {
        let mut g = Globe::new(false);
        g.camera.lat = lat;
        g.camera.lon = lon;
        g
    }

    #[test]
    fn cells_outside_the_area_do_not_map() {
        let area = Rect::new(2, 3, 40, 20);
        assert!(cell_to_canvas(area, 1, 5).is_none());
        assert!(cell_to_canvas(area, 10, 23).is_none());
        let (x, y) = cell_to_canvas(area, 22, 13).unwrap();
        assert!(x.abs() < 0.1 && y.abs() < 0.1);
    }

    #[test]
    fn click_selects_country_under_cursor() {
        let state = state_with(vec![square(Some("FR"), "France", 46.0, 2.0, 8.0)]);
        let mut g = globe_at(46.0, 2.0);
        let area = Rect::new(0, 0, 42, 22);
        // centre of the inner (borderless) area
        let actions = g.handle_mouse(click(21, 11), area, &state);
        assert_eq!(
            actions,
            vec![Action::SelectCountry("FR".into(), "France".into())]
        );
    }

    #[test]
    fn click_outside_any_country_does_nothing() {
        let state = state_with(vec![square(Some("FR"), "France", 46.0, 2.0, 8.0)]);
        let mut g = globe_at(-30.0, 120.0);
        let actions = g.handle_mouse(click(21, 11), Rect::new(0, 0, 42, 22), &state);
        assert!(actions.is_empty());
    }

    #[test]
    fn codeless_country_is_ignored() {
        let state = state_with(vec![square(None, "Somaliland", 9.5, 46.0, 5.0)]);
        let mut g = globe_at(9.5, 46.0);
        assert!(g.handle_key(key(KeyCode::Enter), &state).is_empty());
        assert!(g.handle_mouse(click(21, 11), Rect::new(0, 0, 42, 22), &state).is_empty());
    }

    #[test]
    fn enter_selects_country_under_reticle() {
        let state = state_with(vec![
            square(Some("JP"), "Japan", 36.0, 138.0, 6.0),
            square(Some("BR"), "Brazil", -10.0, -52.0, 15.0),
        ]);
        let mut g = globe_at(-10.0, -52.0);
        assert_eq!(
            g.handle_key(key(KeyCode::Enter), &state),
            vec![Action::SelectCountry("BR".into(), "Brazil".into())]
        );
    }

    #[test]
    fn random_pick_only_returns_selectable_countries() {
        let state = state_with(vec![
            square(None, "Northern Cyprus", 35.2, 33.6, 0.5),
            square(Some("KE"), "Kenya", 0.0, 38.0, 4.0),
        ]);
        let mut g = Globe::new(false);
        for _ in 0..10 {
            assert_eq!(
                g.handle_key(key(KeyCode::Char('r')), &state),
                vec![Action::SelectCountry("KE".into(), "Kenya".into())]
            );
        }
    }

    #[test]
    fn first_interaction_stops_auto_rotation() {
        let state = state_with(vec![square(Some("FR"), "France", 46.0, 2.0, 8.0)]);
        let mut g = Globe::new(true);
        let lon = g.camera.lon;
        g.tick(&state);
        assert!(g.camera.lon > lon);

        g.handle_key(key(KeyCode::Char('z')), &state);
        assert!(!g.auto_rotate);
        let lon = g.camera.lon;
        g.tick(&state);
        assert_eq!(g.camera.lon, lon);

        g.handle_key(key(KeyCode::Char('a')), &state);
        g.tick(&state);
        assert!(g.camera.lon > lon);
    }

    #[test]
    fn selection_flies_camera_to_country() {
        let state = state_with(vec![square(Some("AU"), "Australia", -25.0, 134.0, 15.0)]);
        let mut g = Globe::new(true);
        g.on_action(&Action::SelectCountry("AU".into(), "Australia".into()), &state);
        for _ in 0..100 {
            g.tick(&state);
        }
        assert!((g.camera.lat - -25.0).abs() < 1e-9);
        assert!((g.camera.lon - 134.0).abs() < 1e-9);
    }

    #[test]
    fn hover_is_reported_once_per_change() {
        let state = state_with(vec![square(Some("EG"), "Egypt", 26.0, 30.0, 6.0)]);
        let mut g = globe_at(26.0, 30.0);
        assert_eq!(g.tick(&state), vec![Action::Hover(Some("EG".into()))]);
        assert!(g.tick(&state).is_empty());
        g.camera.rotate(0.0, 90.0);
        assert_eq!(g.tick(&state), vec![Action::Hover(None)]);
    }

    #[test]
    fn search_picks_highlighted_match() {
        let state = state_with(vec![
            square(Some("FR"), "France", 46.0, 2.0, 8.0),
            square(Some("FI"), "Finland", 64.0, 26.0, 6.0),
            square(Some("DE"), "Germany", 51.0, 10.0, 5.0),
        ]);
        let mut g = Globe::new(false);
        assert_eq!(g.handle_key(key(KeyCode::Char('/')), &state), vec![Action::OpenFilter]);
        g.handle_key(key(KeyCode::Char('f')), &state);
        g.handle_key(key(KeyCode::Down), &state);
        let actions = g.handle_key(key(KeyCode::Enter), &state);
        // "Finland" < "France" alphabetically
        assert_eq!(
            actions,
            vec![
                Action::CloseFilter,
                Action::SelectCountry("FR".into(), "France".into())
            ]
        );
        assert!(!g.search.is_active());
    }
}
