//! Two-activation range selection.
//!
//! The first activation on a numbered row sets the anchor; the second one on
//! any numbered row of the same file completes the range. Boundaries are
//! ordered by line number, so clicking bottom-up selects the same range as
//! clicking top-down.

use crate::error::SelectionError;
use crate::row_index::{LineRange, RowEntry, RowIndex};
use crate::surface::{Markers, RowHandle, Surface, Target};

pub const INDICATOR_MESSAGE: &str = "Select another line to complete range selection (Esc cancels)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    AwaitingEnd { anchor: RowHandle, anchor_line: u32 },
}

/// Outcome of [`Selection::on_row_activated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The target has no line number.
    Ignored,
    Started { line: u32 },
    Completed(LineRange),
    /// The anchor row no longer exists; the selection was dropped quietly.
    Abandoned,
    Rejected(SelectionError),
}

impl Selection {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Selection::AwaitingEnd { .. })
    }

    pub fn anchor(&self) -> Option<(RowHandle, u32)> {
        match *self {
            Selection::Idle => None,
            Selection::AwaitingEnd { anchor, anchor_line } => Some((anchor, anchor_line)),
        }
    }

    /// Tooltip for the comment button in the current state.
    pub fn hint(&self) -> &'static str {
        match self {
            Selection::Idle => "start range selection",
            Selection::AwaitingEnd { .. } => "complete range selection",
        }
    }

    pub fn on_row_activated(
        &mut self,
        target: Target,
        surface: &mut Surface,
        index: &RowIndex,
    ) -> Activation {
        let line = index.lookup(surface, target);
        if line == 0 {
            log::debug!("activation on a row without a line number ignored");
            return Activation::Ignored;
        }

        match *self {
            Selection::Idle => {
                let anchor = target.row();
                surface.strip_markers(Markers::ALL);
                if let Some(row) = surface.row_mut(anchor) {
                    row.markers.insert(Markers::SELECTED | Markers::RANGE_START);
                }
                surface.show_indicator(INDICATOR_MESSAGE);
                *self = Selection::AwaitingEnd { anchor, anchor_line: line };
                log::debug!("range selection started at line {line}");
                Activation::Started { line }
            }
            Selection::AwaitingEnd { anchor, anchor_line } => {
                if !surface.is_current(anchor) {
                    log::warn!("selection anchor is stale, cancelling");
                    self.cancel(surface);
                    return Activation::Abandoned;
                }
                match range_between(surface, index, anchor, anchor_line, target.row(), line) {
                    Ok(range) => {
                        surface.strip_markers(Markers::ALL);
                        mark_range(surface, &range.entries);
                        surface.hide_indicator();
                        *self = Selection::Idle;
                        log::debug!("selected {} in {}", range.describe(), range.file);
                        Activation::Completed(range)
                    }
                    Err(err) => {
                        self.cancel(surface);
                        Activation::Rejected(err)
                    }
                }
            }
        }
    }

    /// Drops any selection in progress and clears every selection marker.
    pub fn cancel(&mut self, surface: &mut Surface) {
        *self = Selection::Idle;
        surface.strip_markers(Markers::ALL);
        surface.hide_indicator();
    }

    /// Marks the range that activating `target` would select.
    ///
    /// Returns the number of previewed rows; 0 when idle or when `target`
    /// would not complete a valid range.
    pub fn preview(&self, target: Target, surface: &mut Surface, index: &RowIndex) -> usize {
        Self::clear_preview(surface);
        let Selection::AwaitingEnd { anchor, anchor_line } = *self else {
            return 0;
        };
        if !surface.is_current(anchor) {
            return 0;
        }
        let line = index.lookup(surface, target);
        if line == 0 {
            return 0;
        }
        match range_between(surface, index, anchor, anchor_line, target.row(), line) {
            Ok(range) => {
                for entry in &range.entries {
                    if let Some(row) = surface.row_mut(entry.row) {
                        row.markers.insert(Markers::HOVER_PREVIEW);
                    }
                }
                range.len()
            }
            Err(_) => 0,
        }
    }

    pub fn clear_preview(surface: &mut Surface) {
        surface.strip_markers(Markers::HOVER_PREVIEW);
    }
}

/// Rows of the anchor's file whose line lies between the two boundaries.
fn range_between(
    surface: &Surface,
    index: &RowIndex,
    anchor: RowHandle,
    anchor_line: u32,
    end: RowHandle,
    end_line: u32,
) -> Result<LineRange, SelectionError> {
    let (Some(anchor_file), Some(end_file)) = (surface.file_of(anchor), surface.file_of(end))
    else {
        return Err(SelectionError::EmptyRange);
    };
    if anchor_file != end_file {
        return Err(SelectionError::CrossFile {
            anchor_file: anchor_file.to_owned(),
            end_file: end_file.to_owned(),
        });
    }

    let (lo, hi) = (anchor_line.min(end_line), anchor_line.max(end_line));
    let entries: Vec<RowEntry> = index
        .rows_in_same_file_as(surface, anchor)
        .iter()
        .filter(|e| (lo..=hi).contains(&e.line))
        .copied()
        .collect();
    if entries.is_empty() {
        return Err(SelectionError::EmptyRange);
    }
    Ok(LineRange { file: anchor_file.to_owned(), entries })
}

fn mark_range(surface: &mut Surface, entries: &[RowEntry]) {
    let last = entries.len().saturating_sub(1);
    for (i, entry) in entries.iter().enumerate() {
        let position = if i == 0 {
            Markers::RANGE_START
        } else if i == last {
            Markers::RANGE_END
        } else {
            Markers::RANGE_MIDDLE
        };
        if let Some(row) = surface.row_mut(entry.row) {
            row.markers.insert(Markers::SELECTED | position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Cell, CellKind, RowKind};

    fn surface_with(files: &[(&str, std::ops::RangeInclusive<u32>)]) -> Surface {
        surface_at(1, files)
    }

    fn surface_at(generation: u64, files: &[(&str, std::ops::RangeInclusive<u32>)]) -> Surface {
        let mut s = Surface::new(generation);
        for (name, lines) in files {
            let sec = s.begin_section(*name, 'M');
            for n in lines.clone() {
                s.push_row(
                    sec,
                    RowKind::Context,
                    vec![
                        Cell::new(CellKind::Gutter, " "),
                        Cell::new(CellKind::OldLineNumber, n.to_string()),
                        Cell::new(CellKind::LineNumber, n.to_string()),
                        Cell::new(CellKind::Code, "x"),
                    ],
                );
            }
        }
        s
    }

    fn row(index: &RowIndex, file: &str, line: u32) -> Target {
        Target::Row(index.find(file, line).unwrap())
    }

    #[test]
    fn reversed_clicks_select_the_same_range() {
        let mut s = surface_with(&[("a.txt", 1..=20)]);
        let index = RowIndex::rebuild(&mut s);
        let mut sel = Selection::Idle;

        sel.on_row_activated(row(&index, "a.txt", 15), &mut s, &index);
        let Activation::Completed(range) = sel.on_row_activated(row(&index, "a.txt", 12), &mut s, &index)
        else {
            panic!("expected completion");
        };
        assert_eq!((range.start_line(), range.end_line(), range.len()), (12, 15, 4));
        let start = s.row(index.find("a.txt", 12).unwrap()).unwrap().markers;
        assert!(start.contains(Markers::SELECTED | Markers::RANGE_START));
    }

    #[test]
    fn same_row_twice_is_a_single_line_range() {
        let mut s = surface_with(&[("a.txt", 1..=5)]);
        let index = RowIndex::rebuild(&mut s);
        let mut sel = Selection::Idle;
        let t = row(&index, "a.txt", 3);
        sel.on_row_activated(t, &mut s, &index);
        match sel.on_row_activated(t, &mut s, &index) {
            Activation::Completed(range) => {
                assert_eq!(range.len(), 1);
                assert_eq!(range.describe(), "line 3");
            }
            other => panic!("unexpected {other:?}"),
        }
        let m = s.row(t.row()).unwrap().markers;
        assert!(m.contains(Markers::RANGE_START));
        assert!(!m.intersects(Markers::RANGE_END | Markers::RANGE_MIDDLE));
    }

    #[test]
    fn unnumbered_rows_are_ignored_in_both_states() {
        let mut s = surface_with(&[("a.txt", 1..=3)]);
        let sec = 0;
        let hunk = s.push_row(sec, RowKind::Hunk, vec![Cell::new(CellKind::Info, "@@")]);
        let index = RowIndex::rebuild(&mut s);
        let mut sel = Selection::Idle;

        assert_eq!(sel.on_row_activated(Target::Row(hunk), &mut s, &index), Activation::Ignored);
        assert_eq!(sel, Selection::Idle);

        sel.on_row_activated(row(&index, "a.txt", 2), &mut s, &index);
        assert_eq!(sel.on_row_activated(Target::Row(hunk), &mut s, &index), Activation::Ignored);
        assert!(sel.is_awaiting());
    }

    #[test]
    fn stale_anchor_is_abandoned() {
        let mut old = surface_with(&[("a.txt", 1..=3)]);
        let old_index = RowIndex::rebuild(&mut old);
        let mut sel = Selection::Idle;
        sel.on_row_activated(row(&old_index, "a.txt", 1), &mut old, &old_index);

        // same content, next generation
        let mut fresh = surface_at(2, &[("a.txt", 1..=3)]);
        let index = RowIndex::rebuild(&mut fresh);
        let out = sel.on_row_activated(row(&index, "a.txt", 2), &mut fresh, &index);
        assert_eq!(out, Activation::Abandoned);
        assert_eq!(sel, Selection::Idle);
        assert!(fresh.indicator().is_none());
    }

    #[test]
    fn preview_tracks_prospective_range_without_changing_state() {
        let mut s = surface_with(&[("a.txt", 1..=10), ("b.txt", 1..=3)]);
        let index = RowIndex::rebuild(&mut s);
        let mut sel = Selection::Idle;

        assert_eq!(sel.preview(row(&index, "a.txt", 4), &mut s, &index), 0);
        sel.on_row_activated(row(&index, "a.txt", 2), &mut s, &index);
        let before = sel;
        assert_eq!(sel.preview(row(&index, "a.txt", 5), &mut s, &index), 4);
        assert_eq!(sel.preview(row(&index, "a.txt", 3), &mut s, &index), 2);
        assert_eq!(s.marked_rows(Markers::HOVER_PREVIEW).count(), 2);
        assert_eq!(sel.preview(row(&index, "b.txt", 1), &mut s, &index), 0);
        assert_eq!(sel, before);

        sel.cancel(&mut s);
        assert_eq!(s.marked_rows(Markers::ALL).count(), 0);
    }

    #[test]
    fn hint_flips_with_state() {
        let mut s = surface_with(&[("a.txt", 1..=2)]);
        let index = RowIndex::rebuild(&mut s);
        let mut sel = Selection::Idle;
        assert_eq!(sel.hint(), "start range selection");
        sel.on_row_activated(row(&index, "a.txt", 1), &mut s, &index);
        assert_eq!(sel.hint(), "complete range selection");
    }
}
