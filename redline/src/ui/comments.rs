//! Comments panel: every known comment grouped by file.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use redline_core::surface::Surface;
use redline_core::types::Comment;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

/// Files in first-appearance order, each with its comments in list order.
pub fn group_by_file(comments: &[Comment]) -> Vec<(&str, Vec<&Comment>)> {
    let mut groups: Vec<(&str, Vec<&Comment>)> = Vec::new();
    for c in comments {
        match groups.iter_mut().find(|(file, _)| *file == c.file_name) {
            Some((_, list)) => list.push(c),
            None => groups.push((c.file_name.as_str(), vec![c])),
        }
    }
    groups
}

pub fn render_comments(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    surface: &Surface,
    comments: &[Comment],
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Comments;
    let title = format!("Comments ({})", comments.len());
    let block = panel_block(title, is_focused, theme);

    let mut lines: Vec<Line> = Vec::new();
    if !state.review.summary.is_empty() {
        let status = state.review.status;
        lines.push(Line::from(Span::styled(
            format!("{} {}", status.icon(), status.as_str()),
            Style::default().fg(theme.review_status(status)).add_modifier(Modifier::BOLD),
        )));
        lines.extend(state.review.summary.lines().map(|l| Line::raw(format!("  {l}"))));
        lines.push(Line::raw(""));
    }

    if comments.is_empty() {
        lines.push(Line::raw("No comments yet. Press c on two lines to add one."));
    }

    for (file, group) in group_by_file(comments) {
        lines.push(Line::from(Span::styled(
            file.to_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for c in group {
            let visible = surface.find_comment(&c.id).is_some();
            let label_style = if visible {
                Style::default().fg(theme.line_number)
            } else {
                Style::default().fg(theme.line_number).add_modifier(Modifier::CROSSED_OUT)
            };
            let first = c.text.lines().next().unwrap_or_default().to_owned();
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", c.kind.icon()), Style::default().fg(theme.kind(c.kind))),
                Span::styled(c.line_label(), label_style),
                Span::raw(format!("  {first}")),
            ]));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.comments_scroll, 0));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::types::CommentKind;

    #[test]
    fn groups_keep_first_appearance_order() {
        let c = |file: &str, line| Comment::new(file, line, line, "x", CommentKind::Issue).unwrap();
        let comments = vec![c("b.rs", 1), c("a.rs", 4), c("b.rs", 9)];
        let groups = group_by_file(&comments);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "b.rs");
        assert_eq!(groups[0].1.iter().map(|c| c.start_line).collect::<Vec<_>>(), [1, 9]);
        assert_eq!(groups[1].0, "a.rs");
    }
}
