//! Owned diff data passed out of the git thread.
//!
//! No borrowed lifetimes: everything here is `Send` so it can leave the thread
//! that owns the `git2::Repository`.

/// One diff line. `origin` follows `git2::DiffLine::origin()`: `'+'`, `'-'` or `' '`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDiffLine {
    pub origin: char,
    /// Line text without the trailing newline.
    pub content: String,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

/// One `@@` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDiffHunk {
    pub header: String,
    pub lines: Vec<OwnedDiffLine>,
}

/// Everything the renderer needs about one changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Repository-relative path (new side; old side for deletions).
    pub path: String,
    /// `'M'` modified, `'A'` added, `'D'` deleted, `'R'` renamed, `'?'` untracked.
    pub status: char,
    pub binary: bool,
    pub hunks: Vec<OwnedDiffHunk>,
}

/// How rows are laid out on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Unified,
    /// Old and new side by side.
    Split,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Unified => ViewMode::Split,
            ViewMode::Split => ViewMode::Unified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Unified => "unified",
            ViewMode::Split => "split",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unified" => Some(ViewMode::Unified),
            "split" | "side-by-side" => Some(ViewMode::Split),
            _ => None,
        }
    }
}

/// Requests from the UI loop to the git thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderRequest {
    /// Re-read the working tree and draw a new surface generation.
    Draw(ViewMode),
}
