//! File list panel: one entry per surface section with status and +/- counts.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use redline_core::surface::{FileSection, Surface};
use redline_core::types::Comment;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

const MAX_PATH: usize = 28;

pub fn render_file_list(
    frame: &mut Frame,
    area: Rect,
    state: &mut AppState,
    surface: &Surface,
    comments: &[Comment],
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::FileList;
    let sections = surface.sections();
    let title = if sections.is_empty() {
        "Files".to_owned()
    } else {
        format!("Files ({})", sections.len())
    };

    let items: Vec<ListItem> = if sections.is_empty() {
        let msg = if state.loading { "Loading..." } else { "No files" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        sections
            .iter()
            .map(|s| {
                let count = comments.iter().filter(|c| c.file_name == s.name).count();
                file_item(s, count, theme)
            })
            .collect()
    };

    let list = List::new(items)
        .block(panel_block(title, is_focused, theme))
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut state.file_list_state);
}

/// `[M] src/main.rs  +42 -7  ✎2`
fn file_item(section: &FileSection, comment_count: usize, theme: &Theme) -> ListItem<'static> {
    let badge = Span::styled(
        format!("[{}] ", section.status),
        Style::default().fg(theme.file_status(section.status)),
    );
    let path = if section.name.chars().count() > MAX_PATH {
        let tail: String = {
            let chars: Vec<char> = section.name.chars().collect();
            chars[chars.len() - (MAX_PATH - 3)..].iter().collect()
        };
        format!("...{tail}")
    } else {
        section.name.clone()
    };
    let mut spans = vec![badge, Span::raw(path)];
    if section.added > 0 || section.removed > 0 {
        spans.push(Span::styled(
            format!("  +{}", section.added),
            Style::default().fg(theme.diff_added),
        ));
        spans.push(Span::styled(
            format!(" -{}", section.removed),
            Style::default().fg(theme.diff_removed),
        ));
    }
    if comment_count > 0 {
        spans.push(Span::styled(
            format!("  ✎{comment_count}"),
            Style::default().fg(theme.thread_border),
        ));
    }
    ListItem::new(Line::from(spans))
}
