//! Painting stored comments back onto a freshly rendered surface.
//!
//! A comment is anchored at `(file_name, start_line)`. Its thread sits right
//! after the row showing that line. Painting is idempotent: a comment id that
//! is already in the thread is never added twice, so replaying the full
//! comment list after every render is safe.

use std::collections::HashMap;
use std::ops::AddAssign;

use crate::row_index::RowIndex;
use crate::surface::Surface;
use crate::types::Comment;

/// Batches larger than this are painted in chunks.
pub const BATCH_THRESHOLD: usize = 20;
pub const CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    pub painted: usize,
    /// Already present in their thread.
    pub duplicates: usize,
    /// No row shows the anchor line in this render.
    pub missing: usize,
}

impl AddAssign for PaintReport {
    fn add_assign(&mut self, rhs: PaintReport) {
        self.painted += rhs.painted;
        self.duplicates += rhs.duplicates;
        self.missing += rhs.missing;
    }
}

/// Paints one comment. Returns true if a new thread entry was added.
pub fn paint(comment: &Comment, index: &RowIndex, surface: &mut Surface) -> bool {
    paint_group(&[comment], index, surface).painted == 1
}

/// Paints `comments` grouped by anchor, one pass per group.
///
/// Groups keep first-appearance order, and comments keep their supplied order
/// inside a group.
pub fn paint_many(comments: &[Comment], index: &RowIndex, surface: &mut Surface) -> PaintReport {
    let mut slots: HashMap<(&str, u32), usize> = HashMap::new();
    let mut groups: Vec<Vec<&Comment>> = Vec::new();
    for comment in comments {
        let key = (comment.file_name.as_str(), comment.start_line);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(comment);
    }

    let mut report = PaintReport::default();
    for group in &groups {
        report += paint_group(group, index, surface);
    }
    if report.missing > 0 {
        log::debug!("{} comment(s) have no visible anchor row", report.missing);
    }
    report
}

/// All comments in `group` share one anchor.
fn paint_group(group: &[&Comment], index: &RowIndex, surface: &mut Surface) -> PaintReport {
    let Some(first) = group.first() else {
        return PaintReport::default();
    };
    let row = match index.find(&first.file_name, first.start_line) {
        Some(row) if surface.is_current(row) => row,
        _ => {
            return PaintReport { missing: group.len(), ..PaintReport::default() };
        }
    };

    let thread = surface.ensure_thread(row.id);
    if thread.entries.is_empty() {
        thread.range = first.is_range();
    }
    let mut report = PaintReport::default();
    for comment in group {
        if thread.contains(&comment.id) {
            report.duplicates += 1;
        } else {
            thread.entries.push((*comment).clone());
            report.painted += 1;
        }
    }
    report
}

/// Removes one painted comment; its thread goes too once empty.
pub fn remove(comment_id: &str, surface: &mut Surface) -> bool {
    let Some(row) = surface.find_comment(comment_id) else {
        return false;
    };
    let emptied = match surface.thread_after_mut(row) {
        Some(thread) => {
            thread.entries.retain(|c| c.id != comment_id);
            thread.entries.is_empty()
        }
        None => return false,
    };
    if emptied {
        surface.remove_thread(row);
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintProgress {
    /// More chunks remain; schedule another step.
    Pending { painted: usize, total: usize },
    Done(PaintReport),
}

/// A comment batch painted over several scheduling turns.
///
/// Batches up to [`BATCH_THRESHOLD`] go out in a single step; larger ones in
/// steps of [`CHUNK_SIZE`].
#[derive(Debug, Clone)]
pub struct PaintJob {
    comments: Vec<Comment>,
    cursor: usize,
    chunk: usize,
    report: PaintReport,
}

impl PaintJob {
    pub fn new(comments: Vec<Comment>) -> Self {
        let chunk = if comments.len() > BATCH_THRESHOLD {
            CHUNK_SIZE
        } else {
            comments.len().max(1)
        };
        Self { comments, cursor: 0, chunk, report: PaintReport::default() }
    }

    pub fn is_chunked(&self) -> bool {
        self.comments.len() > BATCH_THRESHOLD
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.comments.len()
    }

    pub fn step(&mut self, index: &RowIndex, surface: &mut Surface) -> PaintProgress {
        if !self.is_done() {
            let end = (self.cursor + self.chunk).min(self.comments.len());
            self.report += paint_many(&self.comments[self.cursor..end], index, surface);
            self.cursor = end;
        }
        if self.is_done() {
            PaintProgress::Done(self.report)
        } else {
            PaintProgress::Pending { painted: self.cursor, total: self.comments.len() }
        }
    }

    /// Steps until done.
    pub fn finish(&mut self, index: &RowIndex, surface: &mut Surface) -> PaintReport {
        loop {
            if let PaintProgress::Done(report) = self.step(index, surface) {
                return report;
            }
        }
    }
}
