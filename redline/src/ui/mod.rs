//! Terminal UI.
//!
//! [`render`] is the only thing called inside `terminal.draw()`. Layout
//! arithmetic lives in `layout`, one module per panel, overlays in `composer`
//! and `help`.

pub mod comments;
pub mod composer;
pub mod diff_view;
pub mod file_tree;
pub mod help;
pub mod keybindings;
mod layout;

use ratatui::{Frame, style::Style, widgets::Block};

use redline_core::lifecycle::Lifecycle;
use redline_core::surface::Surface;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Draws one frame. Viewport heights and panel rects are written back into
/// `state` for the next key or mouse event.
pub fn render(
    frame: &mut Frame,
    state: &mut AppState,
    surface: &Surface,
    lifecycle: &Lifecycle,
    theme: &Theme,
) {
    state.refresh_lines(surface);
    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), frame.area());
    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.panel_rects = [left, center, right];
    state.file_list_viewport_height = inner_rect(left).height;
    state.comments_viewport_height = inner_rect(right).height;

    if left.width > 0 {
        file_tree::render_file_list(frame, left, state, surface, lifecycle.comments(), theme);
    }
    diff_view::render_diff(frame, center, state, surface, theme);
    if right.width > 0 {
        comments::render_comments(frame, right, state, surface, lifecycle.comments(), theme);
    }
    render_status_bar(frame, status_bar, state, lifecycle, theme);

    match state.mode {
        Mode::Compose => {
            if let Some(c) = &state.composer {
                composer::render_composer(frame, c, theme);
            }
        }
        Mode::Review => {
            if let Some(d) = &state.review_draft {
                composer::render_review(frame, d, theme);
            }
        }
        Mode::ConfirmDelete => composer::render_confirm_delete(frame, theme),
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::Normal => {}
    }
}
