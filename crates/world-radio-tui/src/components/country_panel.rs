//! Country panel: sidebar header and insight box for the explored country.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::{
    app_state::AppState,
    theme::{C_ACCENT, C_INSIGHT, C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY},
};

/// Rows the panel wants: header (2) plus a bordered insight box.
pub const HEIGHT: u16 = 8;

pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    let sel = &state.selection;
    let (Some(code), Some(name)) = (sel.country_code.as_deref(), sel.country_name.as_deref()) else {
        let hint = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "  select a country to start listening",
                Style::default().fg(C_MUTED),
            )),
        ]);
        frame.render_widget(hint, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    let header = Paragraph::new(vec![
        Line::from(Span::styled(" now exploring", Style::default().fg(C_SECONDARY))),
        Line::from(vec![
            Span::styled(
                format!(" {}", name),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", code), Style::default().fg(C_ACCENT)),
        ]),
    ]);
    frame.render_widget(header, rows[0]);

    let body = if sel.loading_insight {
        Span::styled("asking about the vibe…", Style::default().fg(C_MUTED))
    } else {
        Span::styled(
            sel.insight.clone().unwrap_or_default(),
            Style::default().fg(C_INSIGHT).add_modifier(Modifier::ITALIC),
        )
    };
    let insight = Paragraph::new(Line::from(body))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_PANEL_BORDER))
                .title(Span::styled(" insight ", Style::default().fg(C_MUTED))),
        );
    frame.render_widget(insight, rows[1]);
}
