use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CommentError;

/// A review session tied to one repository working tree.
///
/// Sessions are keyed by UUID v4 text. The first launch inside a repository
/// creates a session; later launches resume the most recent one for the same path.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,           // UUID v4 text
    pub repo_path: String,
    pub created_at: i64,      // Unix timestamp seconds
    pub updated_at: i64,      // Unix timestamp seconds
}

/// The four comment flavours a reviewer can pick in the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommentKind {
    #[default]
    Suggestion,
    Issue,
    Question,
    Praise,
}

impl CommentKind {
    pub const ALL: [CommentKind; 4] = [
        CommentKind::Suggestion,
        CommentKind::Issue,
        CommentKind::Question,
        CommentKind::Praise,
    ];

    /// Storage spelling, also used as the label in thread headers.
    pub fn as_str(self) -> &'static str {
        match self {
            CommentKind::Suggestion => "suggestion",
            CommentKind::Issue => "issue",
            CommentKind::Question => "question",
            CommentKind::Praise => "praise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn icon(self) -> &'static str {
        match self {
            CommentKind::Suggestion => "💡",
            CommentKind::Issue => "⚠️",
            CommentKind::Question => "❓",
            CommentKind::Praise => "👍",
        }
    }

    /// Next kind in composer cycling order (wraps around).
    pub fn next(self) -> Self {
        match self {
            CommentKind::Suggestion => CommentKind::Issue,
            CommentKind::Issue => CommentKind::Question,
            CommentKind::Question => CommentKind::Praise,
            CommentKind::Praise => CommentKind::Suggestion,
        }
    }
}

/// A comment anchored at a line or an inclusive line range of one file.
///
/// `end_line == start_line` for single-line comments. The anchor is the
/// resolved `(file_name, start_line)` pair, never a row position, so comments
/// survive view-mode switches and diff reloads as long as the line is still shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,           // UUID v4 text
    pub file_name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
    pub kind: CommentKind,
    pub created_at: i64,
}

impl Comment {
    /// Builds a new comment with a fresh id and the current timestamp.
    ///
    /// Text is trimmed; empty text and zero or inverted line numbers are rejected.
    pub fn new(
        file_name: impl Into<String>,
        start_line: u32,
        end_line: u32,
        text: &str,
        kind: CommentKind,
    ) -> Result<Self, CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        if start_line == 0 {
            return Err(CommentError::ZeroLine);
        }
        if end_line < start_line {
            return Err(CommentError::InvertedRange { start: start_line, end: end_line });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            start_line,
            end_line,
            text: text.to_owned(),
            kind,
            created_at: now_secs(),
        })
    }

    pub fn is_range(&self) -> bool {
        self.end_line != self.start_line
    }

    /// `"Lines 12-15"` for ranges, `"Line 12"` otherwise.
    pub fn line_label(&self) -> String {
        if self.is_range() {
            format!("Lines {}-{}", self.start_line, self.end_line)
        } else {
            format!("Line {}", self.start_line)
        }
    }
}

/// Overall verdict for the working-tree review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::ChangesRequested => "changes_requested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "changes_requested" => Some(ReviewStatus::ChangesRequested),
            _ => None,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "🟡",
            ReviewStatus::Approved => "✅",
            ReviewStatus::ChangesRequested => "❌",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ReviewStatus::Pending => ReviewStatus::Approved,
            ReviewStatus::Approved => ReviewStatus::ChangesRequested,
            ReviewStatus::ChangesRequested => ReviewStatus::Pending,
        }
    }
}

/// The overall review written alongside line comments. One per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Review {
    pub status: ReviewStatus,
    pub summary: String,
    pub updated_at: i64,
}

/// Returns the current Unix timestamp in seconds.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
