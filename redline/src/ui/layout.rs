//! Three-panel layout and status bar.
//!
//! At 120 columns and wider the file list, diff and comments panels share the
//! width by `AppState.left_pct / center_pct / right_pct`; narrower terminals
//! collapse both side panels. `Spacing::Overlap(1)` plus
//! `MergeStrategy::Fuzzy` lets neighbouring borders share one column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use redline_core::lifecycle::Lifecycle;

use crate::app::{AppState, Mode, StatusKind};
use crate::theme::Theme;

/// `[left, center, right, status_bar]` for this frame only.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = if term_width >= 120 {
        Layout::horizontal([
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ])
        .spacing(Spacing::Overlap(1))
    } else {
        Layout::horizontal([Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)])
            .spacing(Spacing::Overlap(1))
    };

    let [left, center, right] = main_area.layout(&horizontal);
    [left, center, right, status_bar]
}

/// Panel area minus the one-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered panel block; thick border when focused.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Mode, view, review verdict and comment count on the left; the status
/// message (or the activation hint) on the right.
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    lifecycle: &Lifecycle,
    theme: &Theme,
) {
    let mode_text = match state.mode {
        Mode::Normal | Mode::HelpOverlay => " NORMAL ",
        Mode::Compose => " COMMENT ",
        Mode::ConfirmDelete => " DELETE? ",
        Mode::Review => " REVIEW ",
    };
    let review = state.review.status;

    let mut spans = vec![
        Span::styled(mode_text, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", state.view.label())),
        Span::styled(
            format!(" {} {} ", review.icon(), review.as_str()),
            Style::default().fg(theme.review_status(review)),
        ),
        Span::raw(format!(" {} comment(s) ", lifecycle.comments().len())),
    ];
    if state.loading || lifecycle.is_painting() {
        spans.push(Span::raw(" loading… "));
    }

    let right = match &state.status {
        Some(msg) => {
            let color = match msg.kind {
                StatusKind::Info => theme.status_info,
                StatusKind::Error => theme.status_error,
            };
            Span::styled(format!(" {} ", msg.text), Style::default().fg(color))
        }
        None => Span::raw(format!(" c: {} · ?: help ", lifecycle.hint())),
    };

    let [left_area, right_area] = area.layout(&Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(right.width() as u16),
    ]));
    let bar = Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg);
    frame.render_widget(Paragraph::new(Line::from(spans)).style(bar), left_area);
    frame.render_widget(Paragraph::new(Line::from(right)).style(bar), right_area);
}
