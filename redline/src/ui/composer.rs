//! Modal overlays: comment composer, review verdict and delete confirmation.
//!
//! Each one clears its area and draws over the panels inside the same
//! `terminal.draw()` call.

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use redline_core::types::{CommentKind, ReviewStatus};

use crate::app::{Composer, ReviewDraft};
use crate::theme::Theme;

fn overlay(frame: &mut Frame, width: u16, height: u16) -> Option<Rect> {
    let area = frame.area();
    if area.width < 40 || area.height < 8 {
        return None;
    }
    let rect = area.centered(
        Constraint::Length(width.min(area.width - 2)),
        Constraint::Length(height.min(area.height - 2)),
    );
    frame.render_widget(Clear, rect);
    Some(rect)
}

fn text_with_cursor(text: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = text.split('\n').map(|l| Line::raw(l.to_owned())).collect();
    if let Some(last) = lines.last_mut() {
        last.push_span(Span::styled("█", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    lines
}

pub fn render_composer(frame: &mut Frame, composer: &Composer, theme: &Theme) {
    let Some(rect) = overlay(frame, 72, 14) else {
        return;
    };

    let mut kinds: Vec<Span> = vec![Span::raw("Type: ")];
    for kind in CommentKind::ALL {
        let style = if kind == composer.kind {
            Style::default().fg(theme.kind(kind)).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(theme.kind(kind))
        };
        kinds.push(Span::styled(format!(" {} {} ", kind.icon(), kind.as_str()), style));
    }

    let mut lines = vec![
        Line::from(Span::styled(composer.file.clone(), Style::default().fg(theme.line_number))),
        Line::from(kinds),
        Line::raw(""),
    ];
    lines.extend(text_with_cursor(&composer.text));

    let block = Block::bordered()
        .title(format!(" {} ", composer.title()))
        .title_bottom(" Tab type · Alt-Enter newline · Enter save · Esc cancel ")
        .border_style(Style::default().fg(theme.border_active));
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

pub fn render_review(frame: &mut Frame, draft: &ReviewDraft, theme: &Theme) {
    let Some(rect) = overlay(frame, 72, 14) else {
        return;
    };

    let mut statuses: Vec<Span> = vec![Span::raw("Status: ")];
    for status in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::ChangesRequested] {
        let color = theme.review_status(status);
        let style = if status == draft.status {
            Style::default().fg(color).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(color)
        };
        statuses.push(Span::styled(format!(" {} {} ", status.icon(), status.as_str()), style));
    }

    let mut lines = vec![Line::from(statuses), Line::raw(""), Line::raw("Summary:")];
    lines.extend(text_with_cursor(&draft.summary));

    let block = Block::bordered()
        .title(" Review ")
        .title_bottom(" Tab status · Alt-Enter newline · Enter save · Esc cancel ")
        .border_style(Style::default().fg(theme.border_active));
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

pub fn render_confirm_delete(frame: &mut Frame, theme: &Theme) {
    let Some(rect) = overlay(frame, 40, 5) else {
        return;
    };
    let block = Block::bordered()
        .title(" Delete comment ")
        .border_style(Style::default().fg(theme.status_error));
    frame.render_widget(
        Paragraph::new(Line::raw("Delete this comment? (y/n)")).block(block),
        rect,
    );
}
