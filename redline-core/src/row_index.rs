//! Mapping between drawn rows and `(file, line)` coordinates.
//!
//! Built once per render from the surface's cells. Only new-side line numbers
//! are indexed: removed-only rows carry an empty new-side cell and fall out
//! of every known layout.

use std::collections::{HashMap, HashSet};

use crate::surface::{Cell, CellKind, DiffRow, LineCache, RowHandle, RowId, Surface, Target};

/// Cells that hold a row's line number, most specific first. When none of
/// them qualifies the row's first cell is tried.
const LINE_NUMBER_LAYOUTS: [CellKind; 3] = [
    CellKind::LineNumber,
    CellKind::SideLineNumber,
    CellKind::LineNumberContent,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEntry {
    pub row: RowHandle,
    pub line: u32,
}

/// A completed selection: rows of one file, ascending by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRange {
    pub file: String,
    pub entries: Vec<RowEntry>,
}

impl LineRange {
    pub fn start_line(&self) -> u32 {
        self.entries.first().map_or(0, |e| e.line)
    }

    pub fn end_line(&self) -> u32 {
        self.entries.last().map_or(0, |e| e.line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"line 12"` or `"lines 12-15 (4 lines)"`.
    pub fn describe(&self) -> String {
        if self.start_line() == self.end_line() {
            format!("line {}", self.start_line())
        } else {
            format!(
                "lines {}-{} ({} lines)",
                self.start_line(),
                self.end_line(),
                self.len()
            )
        }
    }
}

/// Reads the line number out of a row using the known layouts.
pub fn extract_line(row: &DiffRow) -> Option<u32> {
    LINE_NUMBER_LAYOUTS
        .iter()
        .filter_map(|kind| row.cell(*kind))
        .find_map(Cell::line_number)
        .or_else(|| row.cells.first().and_then(Cell::line_number))
}

#[derive(Debug, Default, Clone)]
pub struct RowIndex {
    generation: u64,
    by_file: HashMap<String, Vec<RowEntry>>,
    all: Vec<RowHandle>,
}

impl RowIndex {
    /// Scans every row of `surface` and caches each row's line number on it.
    ///
    /// Caches are cleared before scanning. Rows without a readable line number,
    /// or repeating a line number already seen in the same file, are marked
    /// [`LineCache::Excluded`].
    pub fn rebuild(surface: &mut Surface) -> Self {
        surface.clear_line_caches();

        let mut index = RowIndex { generation: surface.generation(), ..Self::default() };
        let mut seen: HashMap<String, HashSet<u32>> = HashMap::new();
        let mut excluded = 0usize;

        for i in 0..surface.row_count() {
            let handle = surface.handle(RowId(i as u32));
            let Some(row) = surface.row(handle) else { continue };
            let line = extract_line(row);
            let file = surface.section(row.section).map(|s| s.name.clone());

            let cache = match (file, line) {
                (Some(file), Some(line)) => {
                    if seen.entry(file.clone()).or_default().insert(line) {
                        index.by_file.entry(file).or_default().push(RowEntry { row: handle, line });
                        index.all.push(handle);
                        LineCache::Known(line)
                    } else {
                        LineCache::Excluded
                    }
                }
                _ => LineCache::Excluded,
            };
            if cache == LineCache::Excluded {
                excluded += 1;
            }
            if let Some(row) = surface.row_mut(handle) {
                row.line_cache = cache;
            }
        }

        for entries in index.by_file.values_mut() {
            entries.sort_by_key(|e| e.line);
        }

        log::debug!(
            "row index g{}: {} rows in {} files, {} excluded",
            index.generation,
            index.all.len(),
            index.by_file.len(),
            excluded
        );
        index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The line number for `target`, or 0 when it cannot be determined.
    ///
    /// Uses the row's cache when set. Otherwise the target's own cell is tried
    /// (for cell targets), then the owning row, and a hit is cached.
    pub fn lookup(&self, surface: &mut Surface, target: Target) -> u32 {
        let Some(row) = surface.row_mut(target.row()) else {
            return 0;
        };
        match row.line_cache {
            LineCache::Known(n) => return n,
            LineCache::Excluded => return 0,
            LineCache::Unset => {}
        }

        let own = match target {
            Target::Cell { cell, .. } => row
                .cells
                .get(cell)
                .filter(|c| LINE_NUMBER_LAYOUTS.contains(&c.kind))
                .and_then(Cell::line_number),
            Target::Row(_) => None,
        };
        match own.or_else(|| extract_line(row)) {
            Some(n) => {
                row.line_cache = LineCache::Known(n);
                n
            }
            None => 0,
        }
    }

    /// Indexed rows of the file that owns `row`, ascending by line.
    pub fn rows_in_same_file_as(&self, surface: &Surface, row: RowHandle) -> &[RowEntry] {
        match surface.file_of(row) {
            Some(file) => self.entries(file),
            None => &[],
        }
    }

    pub fn entries(&self, file: &str) -> &[RowEntry] {
        match self.by_file.get(file) {
            Some(entries) => entries,
            None => &[],
        }
    }

    /// The row showing `line` of `file`.
    pub fn find(&self, file: &str, line: u32) -> Option<RowHandle> {
        let entries = self.by_file.get(file)?;
        entries
            .binary_search_by_key(&line, |e| e.line)
            .ok()
            .map(|i| entries[i].row)
    }

    /// Every indexed row in document order.
    pub fn all(&self) -> &[RowHandle] {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RowKind;

    fn unified(surface: &mut Surface, sec: usize, old: &str, new: &str) -> RowHandle {
        let kind = match (old.is_empty(), new.is_empty()) {
            (true, false) => RowKind::Added,
            (false, true) => RowKind::Removed,
            _ => RowKind::Context,
        };
        surface.push_row(
            sec,
            kind,
            vec![
                Cell::new(CellKind::Gutter, "-"),
                Cell::new(CellKind::OldLineNumber, old),
                Cell::new(CellKind::LineNumber, new),
                Cell::new(CellKind::Code, "x"),
                Cell::new(CellKind::Button, "+"),
            ],
        )
    }

    #[test]
    fn removed_rows_and_hunks_are_excluded() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let hunk = s.push_row(sec, RowKind::Hunk, vec![Cell::new(CellKind::Info, "@@ -1,2 +1,2 @@")]);
        let removed = unified(&mut s, sec, "1", "");
        let added = unified(&mut s, sec, "", "1");
        let ctx = unified(&mut s, sec, "2", "2");

        let index = RowIndex::rebuild(&mut s);
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(&mut s, Target::Row(hunk)), 0);
        assert_eq!(index.lookup(&mut s, Target::Row(removed)), 0);
        assert_eq!(index.lookup(&mut s, Target::Row(added)), 1);
        assert_eq!(index.find("a.txt", 2), Some(ctx));
        assert_eq!(s.row(removed).unwrap().line_cache, LineCache::Excluded);
    }

    #[test]
    fn split_and_content_layouts() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("b.rs", 'M');
        let split = s.push_row(
            sec,
            RowKind::Changed,
            vec![
                Cell::new(CellKind::Gutter, "~"),
                Cell::new(CellKind::OldLineNumber, "7"),
                Cell::new(CellKind::OldCode, "old"),
                Cell::new(CellKind::SideLineNumber, "9"),
                Cell::new(CellKind::Code, "new"),
            ],
        );
        let sec2 = s.begin_section("new.txt", '?');
        let content = s.push_row(
            sec2,
            RowKind::Added,
            vec![Cell::new(CellKind::LineNumberContent, "1"), Cell::new(CellKind::Code, "hi")],
        );
        let bare = s.push_row(sec2, RowKind::Added, vec![Cell::new(CellKind::Info, "2")]);

        let index = RowIndex::rebuild(&mut s);
        assert_eq!(index.lookup(&mut s, Target::Row(split)), 9);
        assert_eq!(index.lookup(&mut s, Target::Row(content)), 1);
        // first-cell fallback
        assert_eq!(index.lookup(&mut s, Target::Row(bare)), 2);
    }

    #[test]
    fn duplicate_lines_keep_first_row() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let first = unified(&mut s, sec, "5", "5");
        let dup = unified(&mut s, sec, "6", "5");
        let index = RowIndex::rebuild(&mut s);
        assert_eq!(index.entries("a.txt").len(), 1);
        assert_eq!(index.find("a.txt", 5), Some(first));
        assert_eq!(index.lookup(&mut s, Target::Row(dup)), 0);
    }

    #[test]
    fn large_untracked_file_rebuilds_in_linear_time() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("big.txt", '?');
        for n in 1..=100_000u32 {
            s.push_row(
                sec,
                RowKind::Added,
                vec![Cell::new(CellKind::LineNumberContent, n.to_string()), Cell::new(CellKind::Code, "x")],
            );
        }
        let dup = s.push_row(sec, RowKind::Added, vec![Cell::new(CellKind::LineNumberContent, "7")]);

        let started = std::time::Instant::now();
        let index = RowIndex::rebuild(&mut s);
        let elapsed = started.elapsed();

        assert_eq!(index.len(), 100_000);
        assert_eq!(index.find("big.txt", 7).map(|h| h.id), Some(RowId(6)));
        assert_eq!(s.row(dup).unwrap().line_cache, LineCache::Excluded);
        assert!(elapsed < std::time::Duration::from_secs(5), "rebuild took {elapsed:?}");
    }

    #[test]
    fn entries_ascend_and_are_per_file() {
        let mut s = Surface::new(3);
        let a = s.begin_section("a.txt", 'M');
        for n in 10..=16 {
            unified(&mut s, a, &n.to_string(), &n.to_string());
        }
        let b = s.begin_section("b.txt", 'M');
        let b_row = unified(&mut s, b, "12", "12");

        let index = RowIndex::rebuild(&mut s);
        let lines: Vec<u32> = index.entries("a.txt").iter().map(|e| e.line).collect();
        assert_eq!(lines, (10..=16).collect::<Vec<_>>());
        assert_eq!(index.rows_in_same_file_as(&s, b_row).len(), 1);
        assert_eq!(index.find("b.txt", 13), None);
    }

    #[test]
    fn cell_target_falls_back_to_owning_row() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let row = unified(&mut s, sec, "4", "4");
        let index = RowIndex::rebuild(&mut s);
        s.clear_line_caches();
        // button text is not numeric, the row's LineNumber cell is
        assert_eq!(index.lookup(&mut s, Target::Cell { row, cell: 4 }), 4);
        assert_eq!(s.row(row).unwrap().line_cache, LineCache::Known(4));
        // old-side number cells never count on their own
        s.clear_line_caches();
        assert_eq!(index.lookup(&mut s, Target::Cell { row, cell: 1 }), 4);
    }

    #[test]
    fn rebuild_clears_previous_caches() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let row = unified(&mut s, sec, "4", "4");
        s.row_mut(row).unwrap().line_cache = LineCache::Known(99);
        let index = RowIndex::rebuild(&mut s);
        assert_eq!(index.lookup(&mut s, Target::Row(row)), 4);
    }

    #[test]
    fn stale_handle_is_zero() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let row = unified(&mut s, sec, "4", "4");
        let mut next = Surface::new(2);
        let index = RowIndex::rebuild(&mut next);
        assert_eq!(index.lookup(&mut next, Target::Row(row)), 0);
        let _ = s;
    }
}
