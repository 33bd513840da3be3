//! Key and mouse dispatcher.
//!
//! Branches on `state.mode` first so each overlay has its own handler.
//! Activations go through [`Lifecycle::dispatch`], the same path a mouse
//! click takes; anything that needs the store or the git thread comes back
//! to the event loop as an [`Effect`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use redline_core::lifecycle::{Lifecycle, Outcome};
use redline_core::selection::Activation;
use redline_core::surface::{RowId, Surface, SurfaceEvent, Target};
use redline_core::types::{Comment, ReviewStatus};

use crate::app::{AppState, DisplayLine, Mode, PanelFocus};
use crate::git::types::ViewMode;

/// Work the event loop performs on behalf of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Render(ViewMode),
    CreateComment(Comment),
    DeleteComment(String),
    SaveReview { status: ReviewStatus, summary: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
    Effect(Effect),
}

pub fn handle_key(
    key: KeyEvent,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) -> KeyAction {
    state.refresh_lines(surface);
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmDelete => handle_confirm_delete(key, state),
        Mode::Compose => handle_compose(key, state, lifecycle, surface),
        Mode::Review => handle_review(key, state),
        Mode::Normal => handle_normal(key, state, lifecycle, surface),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(
    key: KeyEvent,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        if state.focus == PanelFocus::Diff {
            preview_at_cursor(state, lifecycle, surface);
        }
        return action;
    }

    match key.code {
        KeyCode::Enter | KeyCode::Char('l') if state.focus == PanelFocus::FileList => {
            state.jump_to_selected_file();
            KeyAction::Continue
        }
        KeyCode::Enter if state.focus == PanelFocus::Diff => {
            activate_cursor(state, lifecycle, surface, false)
        }
        KeyCode::Char('c') => {
            state.focus = PanelFocus::Diff;
            activate_cursor(state, lifecycle, surface, true)
        }
        KeyCode::Esc => {
            if lifecycle.selection().is_awaiting() {
                lifecycle.dispatch(surface, SurfaceEvent::Cancel);
                state.info("Range selection cancelled");
            } else {
                state.status = None;
            }
            KeyAction::Continue
        }
        KeyCode::Char('d') => {
            match state.comment_at_cursor(surface) {
                Some(id) => {
                    state.pending_delete = Some(id);
                    state.mode = Mode::ConfirmDelete;
                }
                None => state.error("No comment under the cursor"),
            }
            KeyAction::Continue
        }
        KeyCode::Char('v') => {
            state.view = state.view.toggle();
            state.loading = true;
            KeyAction::Effect(Effect::Render(state.view))
        }
        KeyCode::Char('r') => {
            state.loading = true;
            KeyAction::Effect(Effect::Render(state.view))
        }
        KeyCode::Char('R') => {
            state.open_review();
            KeyAction::Continue
        }

        KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }
        KeyCode::Char('L') => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }
        KeyCode::Char('[') => {
            state.jump_hunk(surface, false);
            KeyAction::Continue
        }
        KeyCode::Char(']') => {
            state.jump_hunk(surface, true);
            KeyAction::Continue
        }
        KeyCode::Char('<') => {
            state.shrink_diff_panel();
            KeyAction::Continue
        }
        KeyCode::Char('>') => {
            state.grow_diff_panel();
            KeyAction::Continue
        }
        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }
        KeyCode::Char('q') => KeyAction::Quit,
        _ => KeyAction::Continue,
    }
}

/// j / k / g / G and the Ctrl page keys. `None` when the key is not a scroll key.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        KeyCode::PageDown => state.full_page_down(),
        KeyCode::PageUp => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

/// Activates the row under the cursor, through its comment button when
/// `via_button` is set.
fn activate_cursor(
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
    via_button: bool,
) -> KeyAction {
    let Some(id) = state.cursor_row() else {
        return KeyAction::Continue;
    };
    if !lifecycle.is_attached() {
        state.info("Still loading comments, try again in a moment");
        return KeyAction::Continue;
    }
    let target = row_target(surface, id, via_button);
    let outcomes = lifecycle.dispatch(surface, SurfaceEvent::Activate(target));
    apply_outcomes(outcomes, state);
    KeyAction::Continue
}

fn row_target(surface: &Surface, id: RowId, via_button: bool) -> Target {
    let row = surface.handle(id);
    match surface.row_by_id(id).and_then(|r| r.button_cell()) {
        Some(cell) if via_button => Target::Cell { row, cell },
        _ => Target::Row(row),
    }
}

/// Cursor movement previews the pending range, like mouse motion does.
fn preview_at_cursor(state: &mut AppState, lifecycle: &mut Lifecycle, surface: &mut Surface) {
    if !lifecycle.selection().is_awaiting() {
        return;
    }
    let event = match state.cursor_row() {
        Some(id) => SurfaceEvent::Hover(Target::Row(surface.handle(id))),
        None => SurfaceEvent::HoverEnd,
    };
    lifecycle.dispatch(surface, event);
}

fn apply_outcomes(outcomes: Vec<Outcome>, state: &mut AppState) {
    for outcome in outcomes {
        let Outcome::Activation(activation) = outcome else {
            continue;
        };
        match activation {
            Activation::Started { line } => state.info(format!("Range starts at line {line}")),
            Activation::Completed(range) => {
                state.status = None;
                state.open_composer(&range);
            }
            Activation::Rejected(err) => state.error(err.to_string()),
            Activation::Abandoned => state.info("Range selection dropped after a re-render"),
            Activation::Ignored => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

fn handle_compose(
    key: KeyEvent,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) -> KeyAction {
    let Some(composer) = state.composer.as_mut() else {
        state.mode = Mode::Normal;
        return KeyAction::Continue;
    };
    match key.code {
        KeyCode::Esc => {
            state.close_composer();
            lifecycle.cancel(surface);
            state.info("Comment discarded");
        }
        KeyCode::Tab => composer.kind = composer.kind.next(),
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => composer.text.push('\n'),
        KeyCode::Enter => match composer.build() {
            Ok(comment) => {
                state.close_composer();
                lifecycle.cancel(surface);
                return KeyAction::Effect(Effect::CreateComment(comment));
            }
            Err(e) => state.error(format!("Failed to add comment: {e}")),
        },
        KeyCode::Backspace => {
            composer.text.pop();
        }
        KeyCode::Char(ch) => composer.text.push(ch),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Review overlay
// ---------------------------------------------------------------------------

fn handle_review(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let Some(draft) = state.review_draft.as_mut() else {
        state.mode = Mode::Normal;
        return KeyAction::Continue;
    };
    match key.code {
        KeyCode::Esc => state.close_review(),
        KeyCode::Tab => draft.status = draft.status.next(),
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => draft.summary.push('\n'),
        KeyCode::Enter => {
            let effect = Effect::SaveReview { status: draft.status, summary: draft.summary.clone() };
            state.close_review();
            return KeyAction::Effect(effect);
        }
        KeyCode::Backspace => {
            draft.summary.pop();
        }
        KeyCode::Char(ch) => draft.summary.push(ch),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Delete confirmation
// ---------------------------------------------------------------------------

fn handle_confirm_delete(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            state.mode = Mode::Normal;
            match state.pending_delete.take() {
                Some(id) => KeyAction::Effect(Effect::DeleteComment(id)),
                None => KeyAction::Continue,
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.pending_delete = None;
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Help overlay
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

/// Click focuses a panel and, in the diff, activates the clicked line.
/// Motion over the diff previews a pending range. The wheel scrolls.
pub fn handle_mouse(
    mouse: MouseEvent,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) -> KeyAction {
    if state.mode != Mode::Normal && state.mode != Mode::HelpOverlay {
        return KeyAction::Continue;
    }
    state.refresh_lines(surface);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if state.mode == Mode::Normal => {
            handle_mouse_click(mouse.column, mouse.row, state, lifecycle, surface)
        }
        MouseEventKind::Moved if state.mode == Mode::Normal => {
            handle_mouse_move(mouse.column, mouse.row, state, lifecycle, surface);
            KeyAction::Continue
        }
        MouseEventKind::ScrollUp => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_sub(3);
            } else {
                state.scroll_up(3);
            }
            KeyAction::Continue
        }
        MouseEventKind::ScrollDown => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_add(3);
            } else {
                state.scroll_down(3);
            }
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

fn handle_mouse_click(
    col: u16,
    row: u16,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) -> KeyAction {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::FileList;
        let offset = state.file_list_state.offset();
        let idx = offset + usize::from(row.saturating_sub(left.y + 1));
        if idx < surface.sections().len() {
            state.file_list_state.select(Some(idx));
            state.jump_to_section(idx);
        }
    } else if center.contains(pos) {
        state.focus = PanelFocus::Diff;
        if let Some(idx) = state.line_at(col, row) {
            state.set_cursor(idx);
            if let Some(DisplayLine::Row(_)) = state.cursor_line() {
                return activate_cursor(state, lifecycle, surface, false);
            }
        }
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Comments;
    }
    KeyAction::Continue
}

fn handle_mouse_move(
    col: u16,
    row: u16,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    surface: &mut Surface,
) {
    if !lifecycle.selection().is_awaiting() {
        state.hover = None;
        return;
    }
    let hovered = state.line_at(col, row).and_then(|i| state.lines[i].row());
    if hovered == state.hover {
        return;
    }
    state.hover = hovered;
    let event = match hovered {
        Some(id) => SurfaceEvent::Hover(Target::Row(surface.handle(id))),
        None => SurfaceEvent::HoverEnd,
    };
    lifecycle.dispatch(surface, event);
}
