//! Player bar: the two-row transport strip at the bottom.
//!
//! Row 1: state icon, station, location, ICY title or buffering, mpv badge.
//! Row 2: volume gauge and codec/bitrate.
//!
//! Not focusable.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use world_radio_proto::protocol::{PlaybackPhase, PlaybackState};

use crate::{
    app_state::AppState,
    theme::{
        C_ACCENT, C_BADGE_ERR, C_CONNECTING, C_LOCATION, C_MUTED, C_PLAYING, C_PRIMARY,
        C_SECONDARY, C_TAG,
    },
};

const GAUGE_WIDTH: usize = 20;

pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Clear, area);
    if area.height < 2 {
        frame.render_widget(Paragraph::new(build_row1(state)), area);
        return;
    }
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    frame.render_widget(Paragraph::new(build_row1(state)), rows[0]);
    frame.render_widget(Paragraph::new(build_row2(state)), rows[1]);
}

fn build_row1(state: &AppState) -> Line<'static> {
    let pb = &state.playback;
    let Some(station) = pb.current_station.as_ref() else {
        return Line::from(Span::styled(
            "  click a country to tune in",
            Style::default().fg(C_MUTED),
        ));
    };

    let (icon, icon_color): (&str, Color) = match pb.phase() {
        PlaybackPhase::Playing if state.stream.buffering => ("◔", C_CONNECTING),
        PlaybackPhase::Playing => ("▶", C_PLAYING),
        _ => ("⏸", C_CONNECTING),
    };

    let mut spans: Vec<Span<'static>> = vec![
        Span::raw(" "),
        Span::styled(icon, Style::default().fg(icon_color)),
        Span::raw(" "),
        Span::styled(
            station.name.clone(),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
    ];

    let location = station.location();
    if !location.is_empty() {
        spans.push(Span::styled(format!("  {}", location), Style::default().fg(C_LOCATION)));
    }

    if pb.is_playing && state.stream.buffering {
        spans.push(Span::styled("  buffering…", Style::default().fg(C_CONNECTING)));
    } else if let Some(title) = state.stream.icy_title.as_deref() {
        spans.push(Span::styled(format!("  ♫ {}", title), Style::default().fg(C_TAG)));
    }

    if let Some(badge) = state.stream.mpv_health.badge_label() {
        spans.push(Span::styled(
            format!("  [{}]", badge),
            Style::default().fg(C_BADGE_ERR).add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn build_row2(state: &AppState) -> Line<'static> {
    let pb = &state.playback;
    let mut spans = vec![Span::styled("  vol ", Style::default().fg(C_MUTED))];
    spans.extend(volume_gauge(pb, GAUGE_WIDTH));

    if let Some(station) = pb.current_station.as_ref() {
        let codec = if station.codec.is_empty() {
            station.bitrate_label()
        } else {
            format!("{} · {}", station.codec, station.bitrate_label())
        };
        spans.push(Span::styled(format!("   {}", codec), Style::default().fg(C_SECONDARY)));
    }
    Line::from(spans)
}

/// Bar plus percentage, or the word `muted` when nothing is audible.
fn volume_gauge(pb: &PlaybackState, width: usize) -> Vec<Span<'static>> {
    if pb.is_muted || pb.volume <= 0.0 {
        return vec![
            Span::styled("░".repeat(width), Style::default().fg(C_MUTED)),
            Span::styled(" muted", Style::default().fg(C_ACCENT)),
        ];
    }
    let filled = ((pb.volume.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    vec![
        Span::styled("█".repeat(filled), Style::default().fg(C_PLAYING)),
        Span::styled("░".repeat(width - filled), Style::default().fg(C_MUTED)),
        Span::styled(
            format!(" {:>3}%", (pb.volume * 100.0).round() as u32),
            Style::default().fg(C_SECONDARY),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn gauge_shows_percentage() {
        let pb = PlaybackState::with_volume(0.5, false);
        assert_eq!(text(&volume_gauge(&pb, 10)), "█████░░░░░  50%");
    }

    #[test]
    fn gauge_says_muted_when_silent() {
        assert!(text(&volume_gauge(&PlaybackState::with_volume(0.7, true), 4)).ends_with("muted"));
        assert!(text(&volume_gauge(&PlaybackState::with_volume(0.0, false), 4)).ends_with("muted"));
    }
}
