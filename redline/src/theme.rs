//! Colour themes.
//!
//! `dark` sticks to the ANSI 16 palette and works everywhere; `catppuccin-mocha`
//! uses RGB and wants a truecolor terminal.

use ratatui::style::Color;

use redline_core::types::{CommentKind, ReviewStatus};

#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Diff rows
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,
    pub diff_hunk_header: Color,
    pub line_number: Color,
    /// Background of the row under the keyboard cursor.
    pub cursor_bg: Color,
    /// Background of selected range rows.
    pub selection_bg: Color,
    /// Gutter bar drawn on range start / middle / end rows.
    pub range_marker: Color,
    /// Background of rows the current hover would select.
    pub preview_bg: Color,
    /// Word-level change emphasis inside paired lines.
    pub emphasis_bg: Color,

    // Comment threads
    pub thread_border: Color,
    pub kind_suggestion: Color,
    pub kind_issue: Color,
    pub kind_question: Color,
    pub kind_praise: Color,

    // File list
    pub file_added: Color,
    pub file_removed: Color,
    pub file_modified: Color,
    pub file_untracked: Color,

    // Status bar and banners
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_info: Color,
    pub status_error: Color,
    pub indicator_bg: Color,
    pub indicator_fg: Color,

    pub background: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,
            diff_hunk_header: Color::Cyan,
            line_number: Color::DarkGray,
            cursor_bg: Color::Indexed(236),
            selection_bg: Color::Indexed(24),
            range_marker: Color::LightBlue,
            preview_bg: Color::Indexed(238),
            emphasis_bg: Color::Indexed(58),

            thread_border: Color::Blue,
            kind_suggestion: Color::Cyan,
            kind_issue: Color::Red,
            kind_question: Color::Yellow,
            kind_praise: Color::Green,

            file_added: Color::Green,
            file_removed: Color::Red,
            file_modified: Color::Yellow,
            file_untracked: Color::Magenta,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_info: Color::Green,
            status_error: Color::LightRed,
            indicator_bg: Color::Blue,
            indicator_fg: Color::White,

            background: Color::Reset,
        }
    }

    /// Catppuccin Mocha (<https://github.com/catppuccin/catppuccin>).
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161);    // #a6e3a1
        let red = Color::Rgb(243, 139, 168);      // #f38ba8
        let yellow = Color::Rgb(249, 226, 175);   // #f9e2af
        let blue = Color::Rgb(137, 180, 250);     // #89b4fa
        let teal = Color::Rgb(148, 226, 213);     // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let mauve = Color::Rgb(203, 166, 247);    // #cba6f7
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68);    // #313244
        let surface1 = Color::Rgb(69, 71, 90);    // #45475a
        let surface2 = Color::Rgb(88, 91, 112);   // #585b70
        let base = Color::Rgb(30, 30, 46);        // #1e1e2e
        let text = Color::Rgb(205, 214, 244);     // #cdd6f4
        let peach = Color::Rgb(250, 179, 135);    // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_added: green,
            diff_removed: red,
            diff_context: text,
            diff_hunk_header: teal,
            line_number: overlay1,
            cursor_bg: surface0,
            selection_bg: Color::Rgb(45, 63, 92),
            range_marker: blue,
            preview_bg: surface1,
            emphasis_bg: surface2,

            thread_border: blue,
            kind_suggestion: teal,
            kind_issue: red,
            kind_question: yellow,
            kind_praise: green,

            file_added: green,
            file_removed: red,
            file_modified: yellow,
            file_untracked: mauve,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_info: green,
            status_error: peach,
            indicator_bg: blue,
            indicator_fg: base,

            background: base,
        }
    }

    /// Unknown names fall back to `dark` with a warning in the log.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                log::warn!("unknown theme '{other}', falling back to 'dark'");
                Self::dark()
            }
        }
    }

    pub fn kind(&self, kind: CommentKind) -> Color {
        match kind {
            CommentKind::Suggestion => self.kind_suggestion,
            CommentKind::Issue => self.kind_issue,
            CommentKind::Question => self.kind_question,
            CommentKind::Praise => self.kind_praise,
        }
    }

    pub fn review_status(&self, status: ReviewStatus) -> Color {
        match status {
            ReviewStatus::Pending => self.kind_question,
            ReviewStatus::Approved => self.kind_praise,
            ReviewStatus::ChangesRequested => self.kind_issue,
        }
    }

    pub fn file_status(&self, status: char) -> Color {
        match status {
            'A' => self.file_added,
            'D' => self.file_removed,
            '?' => self.file_untracked,
            _ => self.file_modified,
        }
    }
}
