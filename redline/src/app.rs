//! Application state.
//!
//! Pure state read by `ui` and mutated by `ui::keybindings`. The surface and
//! the annotation lifecycle live elsewhere; this module only keeps a flattened
//! view of the surface ([`DisplayLine`]s) so the cursor and scrolling have
//! something to index.

use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use redline_core::error::CommentError;
use redline_core::row_index::LineRange;
use redline_core::surface::{RowId, RowKind, Surface};
use redline_core::types::{Comment, CommentKind, Review, ReviewStatus};

use crate::git::types::ViewMode;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Comment composer overlay is open.
    Compose,
    /// Waiting for `y` / `n` on a comment delete.
    ConfirmDelete,
    /// Review verdict overlay is open.
    Review,
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    FileList,
    #[default]
    Diff,
    Comments,
}

impl PanelFocus {
    /// Cycle order: `FileList` → `Comments` → `Diff` → `FileList`.
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Comments,
            PanelFocus::Diff => PanelFocus::FileList,
            PanelFocus::Comments => PanelFocus::Diff,
        }
    }

    /// Cycle order: `FileList` → `Diff` → `Comments` → `FileList`.
    pub fn next(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Diff,
            PanelFocus::Diff => PanelFocus::Comments,
            PanelFocus::Comments => PanelFocus::FileList,
        }
    }
}

/// One screen line of the diff panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLine {
    /// File header for `surface.sections()[i]`.
    Section(usize),
    Row(RowId),
    /// First line of the `entry`-th comment in the thread after `anchor`.
    CommentHeader { anchor: RowId, entry: usize },
    /// Line `line` of that comment's text.
    CommentBody { anchor: RowId, entry: usize, line: usize },
}

impl DisplayLine {
    pub fn row(self) -> Option<RowId> {
        match self {
            DisplayLine::Row(id) => Some(id),
            _ => None,
        }
    }

    /// The thread entry this line belongs to.
    pub fn comment(self) -> Option<(RowId, usize)> {
        match self {
            DisplayLine::CommentHeader { anchor, entry }
            | DisplayLine::CommentBody { anchor, entry, .. } => Some((anchor, entry)),
            _ => None,
        }
    }
}

/// Flattens the surface in document order, threads right after their anchor.
pub fn display_lines(surface: &Surface) -> Vec<DisplayLine> {
    let mut out = Vec::with_capacity(surface.row_count() + surface.sections().len());
    for (idx, section) in surface.sections().iter().enumerate() {
        out.push(DisplayLine::Section(idx));
        for &id in &section.rows {
            out.push(DisplayLine::Row(id));
            let Some(thread) = surface.thread_after(id) else {
                continue;
            };
            for (entry, comment) in thread.entries.iter().enumerate() {
                out.push(DisplayLine::CommentHeader { anchor: id, entry });
                for line in 0..comment.text.lines().count() {
                    out.push(DisplayLine::CommentBody { anchor: id, entry, line });
                }
            }
        }
    }
    out
}

/// Draft of a new comment on a completed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub line_count: usize,
    pub kind: CommentKind,
    pub text: String,
}

impl Composer {
    pub fn from_range(range: &LineRange) -> Self {
        Self {
            file: range.file.clone(),
            start_line: range.start_line(),
            end_line: range.end_line(),
            line_count: range.len(),
            kind: CommentKind::default(),
            text: String::new(),
        }
    }

    /// `"Comment on lines 12-15 (4 lines)"` or `"Comment on line 12"`.
    pub fn title(&self) -> String {
        if self.start_line == self.end_line {
            format!("Comment on line {}", self.start_line)
        } else {
            format!(
                "Comment on lines {}-{} ({} lines)",
                self.start_line, self.end_line, self.line_count
            )
        }
    }

    pub fn build(&self) -> Result<Comment, CommentError> {
        Comment::new(self.file.as_str(), self.start_line, self.end_line, &self.text, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub status: ReviewStatus,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Bottom-bar message that expires after a few ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    ticks_left: u8,
}

const STATUS_TICKS: u8 = 16;

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,
    pub view: ViewMode,

    pub file_list_state: ListState,
    /// Index into `lines` of the diff cursor.
    pub diff_cursor: usize,
    pub diff_scroll: usize,
    pub comments_scroll: u16,
    pub help_scroll: u16,

    /// Inner heights after borders, cached by the last draw.
    pub diff_viewport_height: u16,
    pub comments_viewport_height: u16,
    pub file_list_viewport_height: u16,

    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,

    /// Outer panel rects from the last draw, for mouse hit-testing.
    pub panel_rects: [Rect; 3],
    /// Diff panel area inside borders.
    pub diff_inner: Rect,

    pub lines: Vec<DisplayLine>,
    /// True between a render request and the surface being annotated.
    pub loading: bool,
    /// Row the mouse last hovered, to avoid re-dispatching on every motion.
    pub hover: Option<RowId>,

    pub composer: Option<Composer>,
    pub review: Review,
    pub review_draft: Option<ReviewDraft>,
    /// Comment id awaiting delete confirmation.
    pub pending_delete: Option<String>,
    pub status: Option<StatusMessage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            view: ViewMode::default(),
            file_list_state: ListState::default(),
            diff_cursor: 0,
            diff_scroll: 0,
            comments_scroll: 0,
            help_scroll: 0,
            diff_viewport_height: 0,
            comments_viewport_height: 0,
            file_list_viewport_height: 0,
            left_pct: 20,
            center_pct: 55,
            right_pct: 25,
            panel_rects: [Rect::default(); 3],
            diff_inner: Rect::default(),
            lines: Vec::new(),
            loading: true,
            hover: None,
            composer: None,
            review: Review::default(),
            review_draft: None,
            pending_delete: None,
            status: None,
        }
    }
}

impl AppState {
    pub fn new(view: ViewMode) -> Self {
        Self { view, ..Self::default() }
    }

    /// Re-flattens the surface and clamps the cursor.
    pub fn refresh_lines(&mut self, surface: &Surface) {
        self.lines = display_lines(surface);
        self.diff_cursor = self.diff_cursor.min(self.lines.len().saturating_sub(1));
        if self.file_list_state.selected().is_none() && !surface.sections().is_empty() {
            self.file_list_state.select(Some(0));
        }
    }

    pub fn cursor_line(&self) -> Option<DisplayLine> {
        self.lines.get(self.diff_cursor).copied()
    }

    pub fn cursor_row(&self) -> Option<RowId> {
        self.cursor_line().and_then(DisplayLine::row)
    }

    /// Moves the diff cursor by `delta` lines and scrolls it into view.
    pub fn move_cursor(&mut self, delta: isize) {
        if self.lines.is_empty() {
            return;
        }
        let last = self.lines.len() - 1;
        self.diff_cursor = self.diff_cursor.saturating_add_signed(delta).min(last);
        self.follow_cursor();
    }

    pub fn set_cursor(&mut self, idx: usize) {
        self.diff_cursor = idx.min(self.lines.len().saturating_sub(1));
        self.follow_cursor();
    }

    fn follow_cursor(&mut self) {
        let height = usize::from(self.diff_viewport_height.max(1));
        if self.diff_cursor < self.diff_scroll {
            self.diff_scroll = self.diff_cursor;
        } else if self.diff_cursor >= self.diff_scroll + height {
            self.diff_scroll = self.diff_cursor + 1 - height;
        }
    }

    /// Display-line index under screen row `y`, if it is inside the diff panel.
    pub fn line_at(&self, x: u16, y: u16) -> Option<usize> {
        let area = self.diff_inner;
        if x < area.x || x >= area.right() || y < area.y || y >= area.bottom() {
            return None;
        }
        let idx = self.diff_scroll + usize::from(y - area.y);
        (idx < self.lines.len()).then_some(idx)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_down_by(lines),
            PanelFocus::Diff => self.move_cursor(lines as isize),
            PanelFocus::Comments => {
                self.comments_scroll = self.comments_scroll.saturating_add(lines)
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_up_by(lines),
            PanelFocus::Diff => self.move_cursor(-(lines as isize)),
            PanelFocus::Comments => {
                self.comments_scroll = self.comments_scroll.saturating_sub(lines)
            }
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_first(),
            PanelFocus::Diff => self.set_cursor(0),
            PanelFocus::Comments => self.comments_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_last(),
            PanelFocus::Diff => self.set_cursor(usize::MAX),
            PanelFocus::Comments => self.comments_scroll = u16::MAX,
        }
    }

    fn focused_height(&self) -> u16 {
        match self.focus {
            PanelFocus::FileList => self.file_list_viewport_height,
            PanelFocus::Diff => self.diff_viewport_height,
            PanelFocus::Comments => self.comments_viewport_height,
        }
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.focused_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.focused_height().max(1));
    }

    /// Puts the cursor on the header of section `idx` and focuses the diff.
    pub fn jump_to_section(&mut self, idx: usize) {
        if let Some(pos) = self.lines.iter().position(|l| *l == DisplayLine::Section(idx)) {
            self.set_cursor(pos);
            self.diff_scroll = pos;
            self.focus = PanelFocus::Diff;
        }
    }

    pub fn jump_to_selected_file(&mut self) {
        if let Some(idx) = self.file_list_state.selected() {
            self.jump_to_section(idx);
        }
    }

    /// Next (`forward`) or previous hunk header row after the cursor.
    pub fn jump_hunk(&mut self, surface: &Surface, forward: bool) {
        let is_hunk = |l: DisplayLine| {
            l.row()
                .and_then(|id| surface.row_by_id(id))
                .is_some_and(|r| r.kind == RowKind::Hunk)
        };
        let found = if forward {
            self.lines
                .iter()
                .enumerate()
                .skip(self.diff_cursor + 1)
                .find(|(_, l)| is_hunk(**l))
                .map(|(i, _)| i)
        } else {
            self.lines[..self.diff_cursor.min(self.lines.len())]
                .iter()
                .rposition(|l| is_hunk(*l))
        };
        if let Some(i) = found {
            self.set_cursor(i);
        }
    }

    /// Moves the diff cursor onto the first display line of `comment_id`.
    pub fn jump_to_comment(&mut self, surface: &Surface, comment_id: &str) {
        let Some(anchor) = surface.find_comment(comment_id) else {
            return;
        };
        let entry = surface
            .thread_after(anchor)
            .and_then(|t| t.entries.iter().position(|c| c.id == comment_id))
            .unwrap_or(0);
        let target = DisplayLine::CommentHeader { anchor, entry };
        if let Some(pos) = self.lines.iter().position(|l| *l == target) {
            self.set_cursor(pos);
            self.focus = PanelFocus::Diff;
        }
    }

    /// Comment id under the cursor, if the cursor is on a thread entry.
    pub fn comment_at_cursor(&self, surface: &Surface) -> Option<String> {
        let (anchor, entry) = self.cursor_line()?.comment()?;
        let thread = surface.thread_after(anchor)?;
        thread.entries.get(entry).map(|c| c.id.clone())
    }

    /// Centre panel shrinks by 5% (not below 20%), split between the sides.
    pub fn shrink_diff_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(transfer - left_gain);
    }

    /// Centre panel grows by 5% (not above 80%), side panels keep at least 5%.
    pub fn grow_diff_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status =
            Some(StatusMessage { kind: StatusKind::Info, text: text.into(), ticks_left: STATUS_TICKS });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::warn!("{text}");
        self.status =
            Some(StatusMessage { kind: StatusKind::Error, text, ticks_left: STATUS_TICKS });
    }

    /// Counts down the status message; called on every logic tick.
    pub fn tick(&mut self) {
        if let Some(msg) = self.status.as_mut() {
            msg.ticks_left = msg.ticks_left.saturating_sub(1);
            if msg.ticks_left == 0 {
                self.status = None;
            }
        }
    }

    pub fn open_composer(&mut self, range: &LineRange) {
        self.composer = Some(Composer::from_range(range));
        self.mode = Mode::Compose;
    }

    pub fn close_composer(&mut self) {
        self.composer = None;
        self.mode = Mode::Normal;
    }

    pub fn open_review(&mut self) {
        self.review_draft = Some(ReviewDraft {
            status: self.review.status,
            summary: self.review.summary.clone(),
        });
        self.mode = Mode::Review;
    }

    pub fn close_review(&mut self) {
        self.review_draft = None;
        self.mode = Mode::Normal;
    }
}
