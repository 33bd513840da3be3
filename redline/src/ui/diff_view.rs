//! Diff panel.
//!
//! Draws only `lines[diff_scroll..diff_scroll + height]`, so cost follows the
//! viewport rather than the diff size. Rows are drawn from their cells; the
//! gutter shows range markers and threads are drawn inline under their anchor.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
};

use redline_core::surface::{CellKind, DiffRow, Markers, RowKind, Segment, Surface, Thread};

use crate::app::{AppState, DisplayLine, PanelFocus};
use crate::git::types::ViewMode;
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

const NUMBER_WIDTH: usize = 5;

pub fn render_diff(
    frame: &mut Frame,
    area: Rect,
    state: &mut AppState,
    surface: &Surface,
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Diff;
    let title = format!("Diff · {}", state.view.label());
    frame.render_widget(panel_block(title, is_focused, theme), area);

    let mut inner = inner_rect(area);
    if let Some(indicator) = surface.indicator() {
        let [banner, rest] =
            inner.layout(&Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]));
        frame.render_widget(
            Paragraph::new(format!(" {} ", indicator.message))
                .style(Style::default().bg(theme.indicator_bg).fg(theme.indicator_fg)),
            banner,
        );
        inner = rest;
    }
    state.diff_inner = inner;
    state.diff_viewport_height = inner.height;

    if state.lines.is_empty() {
        let msg = if state.loading { "Rendering diff…" } else { "No changes in the working tree." };
        frame.render_widget(Paragraph::new(msg), inner);
        return;
    }

    let total = state.lines.len();
    let start = state.diff_scroll.min(total.saturating_sub(1));
    let end = (start + usize::from(inner.height)).min(total);
    let code_width = code_column_width(inner.width, state.view);

    let items: Vec<ListItem> = state.lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let is_cursor = start + offset == state.diff_cursor && is_focused;
            display_item(*line, surface, is_cursor, code_width, theme)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

/// Width of one code column: the whole remainder in unified view, half of it in split.
fn code_column_width(total: u16, view: ViewMode) -> usize {
    let total = usize::from(total);
    match view {
        ViewMode::Unified => total.saturating_sub(2 + 2 * NUMBER_WIDTH + 2),
        ViewMode::Split => total.saturating_sub(2 + 2 * NUMBER_WIDTH + 2) / 2,
    }
}

fn display_item(
    line: DisplayLine,
    surface: &Surface,
    is_cursor: bool,
    code_width: usize,
    theme: &Theme,
) -> ListItem<'static> {
    let item = match line {
        DisplayLine::Section(idx) => section_item(surface, idx, theme),
        DisplayLine::Row(id) => match surface.row_by_id(id) {
            Some(row) => row_item(row, is_cursor, code_width, theme),
            None => ListItem::new(Line::raw("")),
        },
        DisplayLine::CommentHeader { anchor, entry } => {
            let Some(thread) = surface.thread_after(anchor) else {
                return ListItem::new(Line::raw(""));
            };
            let Some(comment) = thread.entries.get(entry) else {
                return ListItem::new(Line::raw(""));
            };
            let color = theme.kind(comment.kind);
            ListItem::new(Line::from(vec![
                Span::styled(thread_rail(thread, entry), Style::default().fg(theme.thread_border)),
                Span::styled(
                    format!("{} {}", comment.kind.icon(), comment.kind.as_str()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" · {}", comment.line_label()),
                    Style::default().fg(theme.line_number),
                ),
            ]))
        }
        DisplayLine::CommentBody { anchor, entry, line } => {
            let text = surface
                .thread_after(anchor)
                .and_then(|t| t.entries.get(entry))
                .and_then(|c| c.text.lines().nth(line))
                .unwrap_or_default()
                .to_owned();
            ListItem::new(Line::from(vec![
                Span::styled("   │  ", Style::default().fg(theme.thread_border)),
                Span::raw(text),
            ]))
        }
    };
    if is_cursor {
        item.style(Style::default().bg(theme.cursor_bg))
    } else {
        item
    }
}

fn section_item(surface: &Surface, idx: usize, theme: &Theme) -> ListItem<'static> {
    let Some(section) = surface.section(idx) else {
        return ListItem::new(Line::raw(""));
    };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("▌{} ", section.status),
            Style::default().fg(theme.file_status(section.status)),
        ),
        Span::styled(section.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  +{}", section.added), Style::default().fg(theme.diff_added)),
        Span::styled(format!(" -{}", section.removed), Style::default().fg(theme.diff_removed)),
    ]))
}

fn row_item(row: &DiffRow, is_cursor: bool, code_width: usize, theme: &Theme) -> ListItem<'static> {
    let base = match row.kind {
        RowKind::Added => theme.diff_added,
        RowKind::Removed => theme.diff_removed,
        RowKind::Hunk | RowKind::Notice => theme.diff_hunk_header,
        RowKind::Context | RowKind::Changed => theme.diff_context,
    };

    let mut spans = Vec::new();
    for cell in &row.cells {
        match cell.kind {
            CellKind::Gutter => spans.push(gutter_span(row.markers, &cell.text, base, theme)),
            CellKind::OldLineNumber
            | CellKind::LineNumber
            | CellKind::SideLineNumber
            | CellKind::LineNumberContent => spans.push(Span::styled(
                format!("{:>width$} ", cell.text, width = NUMBER_WIDTH - 1),
                Style::default().fg(theme.line_number),
            )),
            CellKind::OldCode => {
                push_code(&mut spans, &cell.segments, theme.diff_removed, Some(code_width), theme)
            }
            CellKind::Code => {
                let color = if row.kind == RowKind::Changed { theme.diff_added } else { base };
                push_code(&mut spans, &cell.segments, color, None, theme);
            }
            CellKind::Info => {
                spans.push(Span::styled(cell.text.clone(), Style::default().fg(base)))
            }
            CellKind::Button => {
                if is_cursor {
                    spans.push(Span::styled(
                        format!(" {}", cell.text),
                        Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD),
                    ));
                }
            }
        }
    }

    let mut item = ListItem::new(Line::from(spans));
    if row.markers.intersects(Markers::SELECTION) {
        item = item.style(Style::default().bg(theme.selection_bg));
    } else if row.markers.contains(Markers::HOVER_PREVIEW) {
        item = item.style(Style::default().bg(theme.preview_bg));
    }
    item
}

/// Range start / middle / end rows get a bracket in the gutter.
fn gutter_span(markers: Markers, text: &str, base: Color, theme: &Theme) -> Span<'static> {
    let marker = if markers.contains(Markers::RANGE_START) && markers.contains(Markers::RANGE_END) {
        Some("[")
    } else if markers.contains(Markers::RANGE_START) {
        Some("┌")
    } else if markers.contains(Markers::RANGE_MIDDLE) {
        Some("│")
    } else if markers.contains(Markers::RANGE_END) {
        Some("└")
    } else {
        None
    };
    match marker {
        Some(m) => Span::styled(format!("{m} "), Style::default().fg(theme.range_marker)),
        None => Span::styled(format!("{text} "), Style::default().fg(base)),
    }
}

/// Range threads get a double rail on their first header.
fn thread_rail(thread: &Thread, entry: usize) -> &'static str {
    if entry == 0 && thread.range {
        "   ╔═ "
    } else {
        "   ╭─ "
    }
}

/// Appends code segments, padded or cut to `width` when given.
fn push_code(
    spans: &mut Vec<Span<'static>>,
    segments: &[Segment],
    base: Color,
    width: Option<usize>,
    theme: &Theme,
) {
    let mut used = 0usize;
    for seg in segments {
        let text = seg.text.replace('\t', "    ");
        let text = match width {
            Some(w) if used >= w => break,
            Some(w) => text.chars().take(w - used).collect::<String>(),
            None => text,
        };
        used += text.chars().count();

        let fg = seg.style.fg.map_or(base, |(r, g, b)| Color::Rgb(r, g, b));
        let mut style = Style::default().fg(fg);
        if seg.style.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if seg.style.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if seg.style.underline {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if seg.style.emphasis {
            style = style.fg(base).bg(theme.emphasis_bg).add_modifier(Modifier::BOLD);
        }
        spans.push(Span::styled(text, style));
    }
    if let Some(w) = width {
        spans.push(Span::raw(format!("{:width$}│", "", width = w.saturating_sub(used))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::types::{Comment, CommentKind};

    fn thread(first: (u32, u32)) -> Thread {
        let (start, end) = first;
        let a = Comment::new("a.rs", start, end, "first", CommentKind::Issue).unwrap();
        let b = Comment::new("a.rs", start, start, "second", CommentKind::Question).unwrap();
        Thread { range: a.is_range(), entries: vec![a, b] }
    }

    #[test]
    fn range_threads_mark_their_first_header() {
        let range = thread((4, 9));
        assert_eq!(thread_rail(&range, 0), "   ╔═ ");
        assert_eq!(thread_rail(&range, 1), "   ╭─ ");

        let single = thread((4, 4));
        assert_eq!(thread_rail(&single, 0), "   ╭─ ");
    }
}
