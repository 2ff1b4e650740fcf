//! StationList component: the focusable "top stations" pane of the sidebar.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use world_radio_proto::protocol::Station;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        C_CONNECTING, C_LOCATION, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_SELECTION_BG,
        C_TAG,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::pane_chrome,
        scrollable_list::ScrollableList,
    },
};

/// Shown in place of a station icon; the terminal never fetches favicons.
const RADIO_GLYPH: &str = "♪";
const DOUBLE_CLICK_MS: u128 = 400;

pub struct StationList {
    pub list: ScrollableList<Station>,
    pub filter_input: FilterInput,
    list_state: ListState,
    /// Last click (row, time) for double-click detection.
    last_click: Option<(usize, Instant)>,
}

impl StationList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(station_matches),
            filter_input: FilterInput::new("name, tag, language…"),
            list_state: ListState::default(),
            last_click: None,
        }
    }

    /// Replace the listing with a fresh fetch result. Clears any filter.
    ///
    /// Returns `true` when an open filter bar was closed, so the caller can
    /// leave filter input mode.
    pub fn sync_stations(&mut self, stations: &[Station]) -> bool {
        let was_filtering = self.filter_input.is_active();
        self.filter_input.clear();
        self.filter_input.deactivate();
        self.list.filter.clear();
        self.list.set_items(stations.to_vec());
        was_filtering
    }

    fn render_item<'a>(
        &self,
        station: &'a Station,
        is_selected: bool,
        name_width: usize,
        state: &AppState,
    ) -> ListItem<'a> {
        let is_current = state.playback.is_current(&station.id);
        let (icon, color): (&str, Color) = if state.is_playing(&station.id) {
            if state.stream.buffering {
                ("◔", C_CONNECTING)
            } else {
                ("▶", C_PLAYING)
            }
        } else if is_current {
            ("⏸", C_CONNECTING)
        } else {
            (" ", C_MUTED)
        };

        let name_color = if is_current {
            color
        } else if is_selected {
            C_PRIMARY
        } else {
            C_SECONDARY
        };
        let mut name_style = Style::default().fg(name_color);
        if is_current || is_selected {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }

        let mut spans: Vec<Span> = vec![
            Span::styled(format!(" {} ", icon), Style::default().fg(color)),
            Span::styled(format!("{} ", RADIO_GLYPH), Style::default().fg(C_MUTED)),
            Span::styled(fit_width(&station.name, name_width), name_style),
        ];

        for tag in station.tags.iter().take(2) {
            spans.push(Span::styled(" · ", Style::default().fg(C_MUTED)));
            spans.push(Span::styled(tag.as_str(), Style::default().fg(C_TAG)));
        }

        let codec = if station.codec.is_empty() {
            station.bitrate_label()
        } else {
            format!("{} {}", station.codec, station.bitrate_label())
        };
        spans.push(Span::styled(format!("  {}", codec), Style::default().fg(C_LOCATION)));
        spans.push(Span::styled(
            format!("  ♥{}", station.votes),
            Style::default().fg(C_MUTED),
        ));

        let bg = if is_selected {
            Style::default().bg(C_SELECTION_BG)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(spans)).style(bg)
    }

    fn placeholder(frame: &mut Frame, area: Rect, msg: &str) {
        frame.render_widget(
            Paragraph::new(Span::styled(format!("  {}", msg), Style::default().fg(C_MUTED))),
            area,
        );
    }
}

impl Default for StationList {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut `s` to at most `max` terminal columns, marking the cut with `…`.
fn fit_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn station_matches(station: &Station, q: &str) -> bool {
    if q.trim().is_empty() {
        return true;
    }
    let text = format!(
        "{} {} {} {}",
        station.name,
        station.tags.join(" "),
        station.language,
        station.region
    )
    .to_lowercase();
    q.to_lowercase().split_whitespace().all(|term| text.contains(term))
}

impl Component for StationList {
    fn id(&self) -> ComponentId {
        ComponentId::StationList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FilterAction::Confirmed => vec![Action::CloseFilter],
                FilterAction::Cancelled => {
                    self.list.set_filter("");
                    vec![Action::CloseFilter]
                }
            };
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(idx) = self.list.selected_original_index() {
                    return vec![Action::PlayStation(idx)];
                }
            }
            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }
            KeyCode::Char('y') => {
                if let Some(st) = self.list.selected_item() {
                    return vec![Action::CopyToClipboard(st.url_resolved.clone())];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        let rel_row = event.row.saturating_sub(area.y + 1) as usize; // +1 for the border
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let is_double = self
                    .last_click
                    .is_some_and(|(row, t)| row == rel_row && t.elapsed().as_millis() < DOUBLE_CLICK_MS);
                if self.list.handle_click(rel_row) && is_double {
                    self.last_click = None;
                    if let Some(idx) = self.list.selected_original_index() {
                        return vec![Action::PlayStation(idx)];
                    }
                } else {
                    self.last_click = Some((rel_row, Instant::now()));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if *action == Action::CloseFilter && self.filter_input.is_active() {
            self.filter_input.deactivate();
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let count = if state.selection.loading_stations || self.list.total_len() == 0 {
            String::new()
        } else if self.list.filter.is_empty() {
            format!(" {}", self.list.total_len())
        } else {
            format!(" {}/{}", self.list.len(), self.list.total_len())
        };
        let title = format!("top stations{}", count);
        let block = pane_chrome(&title, Some('2'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !state.selection.has_selection() {
            return Self::placeholder(frame, inner, "pick a country on the globe");
        }
        if state.selection.loading_stations {
            return Self::placeholder(frame, inner, "scanning frequencies…");
        }
        if self.list.total_len() == 0 {
            return Self::placeholder(frame, inner, "no active streams found for this region");
        }

        let filter_rows = u16::from(self.filter_input.is_active());
        let list_area = Rect {
            height: inner.height.saturating_sub(filter_rows),
            ..inner
        };

        if self.list.is_empty() {
            Self::placeholder(frame, list_area, "no stations match filter");
        } else {
            let height = list_area.height as usize;
            self.list.ensure_visible(height);
            // names get about half the row; CJK names are two columns per glyph
            let name_width = (list_area.width as usize / 2).max(12);
            let selected = self.list.selected;
            let offset = self.list.scroll_offset;
            let items: Vec<ListItem> = self
                .list
                .visible_items(height)
                .into_iter()
                .enumerate()
                .map(|(row, (_, station))| {
                    self.render_item(station, offset + row == selected, name_width, state)
                })
                .collect();
            self.list_state.select(Some(selected.saturating_sub(offset)));
            frame.render_stateful_widget(List::new(items), list_area, &mut self.list_state);
        }

        if self.filter_input.is_active() {
            let filter_area = Rect {
                y: inner.y + inner.height.saturating_sub(1),
                height: 1,
                ..inner
            };
            self.filter_input.draw(frame, filter_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use world_radio_proto::protocol::PlaybackState;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn station(name: &str, tags: &[&str]) -> Station {
        Station {
            id: name.to_lowercase(),
            name: name.into(),
            url_resolved: format!("https://{}.example/", name.to_lowercase()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn filter_matches_name_and_tags() {
        let s = station("FIP", &["jazz", "eclectic"]);
        assert!(station_matches(&s, "fip"));
        assert!(station_matches(&s, "JAZZ fip"));
        assert!(!station_matches(&s, "metal"));
    }

    #[test]
    fn long_names_are_cut_by_display_width() {
        assert_eq!(fit_width("FIP", 10), "FIP");
        assert_eq!(fit_width("Radio Nova Paris", 8), "Radio N…");
        // each kana is two columns wide
        assert_eq!(fit_width("ラジオ日本", 7), "ラジオ…");
    }

    #[test]
    fn new_listing_resets_filter() {
        let mut sl = StationList::new();
        sl.sync_stations(&[station("FIP", &[]), station("Nova", &[])]);
        sl.list.set_filter("nova");
        assert_eq!(sl.list.len(), 1);

        sl.sync_stations(&[station("A", &[]), station("B", &[]), station("C", &[])]);
        assert_eq!(sl.list.len(), 3);
        assert!(sl.list.filter.is_empty());
    }

    #[test]
    fn listing_arriving_mid_filter_reports_closed_bar() {
        let state = AppState::new(PlaybackState::default(), PathBuf::new());
        let mut sl = StationList::new();
        assert!(!sl.sync_stations(&[]));

        assert_eq!(
            sl.handle_key(key(KeyCode::Char('/')), &state),
            vec![Action::OpenFilter]
        );
        assert!(sl.sync_stations(&[station("FIP", &[])]));
        assert!(!sl.filter_input.is_active());
        assert!(!sl.sync_stations(&[station("FIP", &[])]));
    }
}
