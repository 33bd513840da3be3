//! The rendered diff as a retained view tree.
//!
//! The git renderer fills a [`Surface`] with file sections and rows; the
//! annotation core reads it back (line numbers live in cells, exactly as they
//! are drawn), toggles row markers, and inserts comment threads after rows.
//! The terminal UI draws whatever the surface holds.
//!
//! Every render produces a fresh surface with a higher generation. A
//! [`RowHandle`] remembers the generation it was taken from, so handles that
//! survive a re-render are detectably stale instead of silently pointing at a
//! different row.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::Comment;

/// The surface shared between the git worker thread and the UI loop.
pub type SharedSurface = Arc<Mutex<Surface>>;

/// Position of a row in the surface's arena, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u32);

impl RowId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference to a row that is only valid for one render generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle {
    pub generation: u64,
    pub id: RowId,
}

/// What an activation or hover was aimed at.
///
/// A cell target is resolved through the cell first, then through the row
/// that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Row(RowHandle),
    Cell { row: RowHandle, cell: usize },
}

impl Target {
    pub fn row(self) -> RowHandle {
        match self {
            Target::Row(row) | Target::Cell { row, .. } => row,
        }
    }
}

/// Semantic role of a cell. Line numbers are looked up by role, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// `+` / `-` / blank marker column.
    Gutter,
    OldLineNumber,
    /// New-side line number in the unified layout.
    LineNumber,
    /// New-side line number in the split layout.
    SideLineNumber,
    /// Line number of a whole-file listing (untracked files).
    LineNumberContent,
    OldCode,
    Code,
    /// Hunk headers and notices such as "Binary file".
    Info,
    /// The per-row comment button.
    Button,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStyle {
    pub fg: Option<(u8, u8, u8)>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Word-level change emphasis.
    pub emphasis: bool,
}

/// A styled run of text inside a code cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    /// Plain text as drawn; line numbers are read from here.
    pub text: String,
    /// Optional styled rendition of `text`. Empty means draw `text` plainly.
    pub segments: Vec<Segment>,
}

impl Cell {
    pub fn new(kind: CellKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), segments: Vec::new() }
    }

    pub fn styled(kind: CellKind, segments: Vec<Segment>) -> Self {
        let text = segments.iter().map(|s| s.text.as_str()).collect();
        Self { kind, text, segments }
    }

    /// The line number shown in this cell, if its trimmed text is all digits.
    pub fn line_number(&self) -> Option<u32> {
        let text = self.text.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok().filter(|n| *n > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Context,
    Added,
    Removed,
    /// Split layout: a removed line paired with an added line.
    Changed,
    Hunk,
    Notice,
}

/// Visual state flags on a row, combined as a bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers(u8);

impl Markers {
    pub const NONE: Markers = Markers(0);
    pub const SELECTED: Markers = Markers(1);
    pub const RANGE_START: Markers = Markers(1 << 1);
    pub const RANGE_MIDDLE: Markers = Markers(1 << 2);
    pub const RANGE_END: Markers = Markers(1 << 3);
    pub const HOVER_PREVIEW: Markers = Markers(1 << 4);
    /// Every marker the selection state machine owns.
    pub const SELECTION: Markers = Markers(0b1111);
    pub const ALL: Markers = Markers(0b1_1111);

    pub fn contains(self, other: Markers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Markers) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Markers) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Markers) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Markers {
    type Output = Markers;

    fn bitor(self, rhs: Markers) -> Markers {
        Markers(self.0 | rhs.0)
    }
}

/// Per-row memo of the extracted line number. Cleared on every index rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineCache {
    #[default]
    Unset,
    Known(u32),
    Excluded,
}

#[derive(Debug, Clone)]
pub struct DiffRow {
    pub section: usize,
    pub kind: RowKind,
    pub cells: Vec<Cell>,
    pub markers: Markers,
    pub line_cache: LineCache,
}

impl DiffRow {
    pub fn cell(&self, kind: CellKind) -> Option<&Cell> {
        self.cells.iter().find(|c| c.kind == kind)
    }

    pub fn button_cell(&self) -> Option<usize> {
        self.cells.iter().position(|c| c.kind == CellKind::Button)
    }
}

/// One file's block of rows.
#[derive(Debug, Clone)]
pub struct FileSection {
    pub name: String,
    /// `'M'` modified, `'A'` added, `'D'` deleted, `'R'` renamed, `'?'` untracked.
    pub status: char,
    pub added: usize,
    pub removed: usize,
    pub rows: Vec<RowId>,
}

/// Comments painted directly after one anchor row.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    /// Set when the thread's first comment covers more than one line.
    pub range: bool,
    pub entries: Vec<Comment>,
}

impl Thread {
    pub fn contains(&self, comment_id: &str) -> bool {
        self.entries.iter().any(|c| c.id == comment_id)
    }
}

/// The "range selection in progress" banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Interactions routed through the surface container to bound listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Activate(Target),
    Hover(Target),
    HoverEnd,
    Cancel,
}

#[derive(Debug, Default)]
pub struct Surface {
    generation: u64,
    sections: Vec<FileSection>,
    rows: Vec<DiffRow>,
    threads: BTreeMap<RowId, Thread>,
    listeners: Vec<ListenerId>,
    next_listener: u64,
    indicator: Option<Indicator>,
    complete: bool,
}

impl Surface {
    pub fn new(generation: u64) -> Self {
        Self { generation, ..Self::default() }
    }

    pub fn shared(generation: u64) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(generation)))
    }

    /// Starts a new render in place: content is dropped and the generation
    /// advances. Listeners are registered on the container, not on rows, and
    /// therefore survive.
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.sections.clear();
        self.rows.clear();
        self.threads.clear();
        self.indicator = None;
        self.complete = false;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Set by the renderer once every section has been written.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    // --- building ---

    pub fn begin_section(&mut self, name: impl Into<String>, status: char) -> usize {
        self.sections.push(FileSection {
            name: name.into(),
            status,
            added: 0,
            removed: 0,
            rows: Vec::new(),
        });
        self.sections.len() - 1
    }

    /// Appends a row to `section`. Rows are stored in document order, so
    /// sections must be filled one after another.
    pub fn push_row(&mut self, section: usize, kind: RowKind, cells: Vec<Cell>) -> RowHandle {
        let id = RowId(self.rows.len() as u32);
        self.rows.push(DiffRow {
            section,
            kind,
            cells,
            markers: Markers::NONE,
            line_cache: LineCache::Unset,
        });
        if let Some(s) = self.sections.get_mut(section) {
            match kind {
                RowKind::Added => s.added += 1,
                RowKind::Removed => s.removed += 1,
                RowKind::Changed => {
                    s.added += 1;
                    s.removed += 1;
                }
                _ => {}
            }
            s.rows.push(id);
        }
        self.handle(id)
    }

    // --- reading ---

    pub fn handle(&self, id: RowId) -> RowHandle {
        RowHandle { generation: self.generation, id }
    }

    pub fn is_current(&self, handle: RowHandle) -> bool {
        handle.generation == self.generation && handle.id.index() < self.rows.len()
    }

    pub fn row(&self, handle: RowHandle) -> Option<&DiffRow> {
        if handle.generation != self.generation {
            return None;
        }
        self.rows.get(handle.id.index())
    }

    pub fn row_mut(&mut self, handle: RowHandle) -> Option<&mut DiffRow> {
        if handle.generation != self.generation {
            return None;
        }
        self.rows.get_mut(handle.id.index())
    }

    pub fn row_by_id(&self, id: RowId) -> Option<&DiffRow> {
        self.rows.get(id.index())
    }

    /// All rows in document order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &DiffRow)> {
        self.rows.iter().enumerate().map(|(i, r)| (RowId(i as u32), r))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn sections(&self) -> &[FileSection] {
        &self.sections
    }

    pub fn section(&self, idx: usize) -> Option<&FileSection> {
        self.sections.get(idx)
    }

    /// The file name of the section owning `handle`.
    pub fn file_of(&self, handle: RowHandle) -> Option<&str> {
        let row = self.row(handle)?;
        self.sections.get(row.section).map(|s| s.name.as_str())
    }

    // --- markers and caches ---

    /// Removes `markers` from every row.
    pub fn strip_markers(&mut self, markers: Markers) {
        for row in &mut self.rows {
            row.markers.remove(markers);
        }
    }

    pub fn clear_line_caches(&mut self) {
        for row in &mut self.rows {
            row.line_cache = LineCache::Unset;
        }
    }

    pub fn marked_rows(&self, markers: Markers) -> impl Iterator<Item = RowId> + '_ {
        self.rows()
            .filter(move |(_, r)| r.markers.intersects(markers))
            .map(|(id, _)| id)
    }

    // --- threads ---

    pub fn thread_after(&self, id: RowId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    pub fn thread_after_mut(&mut self, id: RowId) -> Option<&mut Thread> {
        self.threads.get_mut(&id)
    }

    /// Returns the thread after `id`, creating an empty one if needed.
    pub fn ensure_thread(&mut self, id: RowId) -> &mut Thread {
        self.threads.entry(id).or_default()
    }

    pub fn remove_thread(&mut self, id: RowId) -> Option<Thread> {
        self.threads.remove(&id)
    }

    /// Threads keyed by the row they follow, in document order.
    pub fn threads(&self) -> impl Iterator<Item = (RowId, &Thread)> {
        self.threads.iter().map(|(id, t)| (*id, t))
    }

    /// The anchor row of the thread holding `comment_id`.
    pub fn find_comment(&self, comment_id: &str) -> Option<RowId> {
        self.threads
            .iter()
            .find(|(_, t)| t.contains(comment_id))
            .map(|(id, _)| *id)
    }

    /// Number of painted comment entries across all threads.
    pub fn comment_count(&self) -> usize {
        self.threads.values().map(|t| t.entries.len()).sum()
    }

    // --- indicator ---

    pub fn show_indicator(&mut self, message: impl Into<String>) {
        self.indicator = Some(Indicator { message: message.into() });
    }

    pub fn hide_indicator(&mut self) {
        self.indicator = None;
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    // --- delegated listeners ---

    /// Registers a listener on the surface container.
    pub fn add_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(id);
        id
    }

    /// Unregisters `id`. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners that receive `event`, in registration order.
    pub fn dispatch(&self, event: &SurfaceEvent) -> Vec<ListenerId> {
        log::trace!("surface dispatch {event:?} to {} listener(s)", self.listeners.len());
        self.listeners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unified_row(surface: &mut Surface, section: usize, line: &str) -> RowHandle {
        surface.push_row(
            section,
            RowKind::Context,
            vec![
                Cell::new(CellKind::Gutter, " "),
                Cell::new(CellKind::OldLineNumber, line),
                Cell::new(CellKind::LineNumber, line),
                Cell::new(CellKind::Code, "let x = 1;"),
                Cell::new(CellKind::Button, "+"),
            ],
        )
    }

    #[test]
    fn handles_go_stale_across_generations() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let h = unified_row(&mut s, sec, "3");
        assert!(s.is_current(h));
        assert_eq!(s.file_of(h), Some("a.txt"));

        let next = Surface::new(2);
        assert!(!next.is_current(h));
        assert!(next.row(h).is_none());
    }

    #[test]
    fn numeric_cells_only() {
        assert_eq!(Cell::new(CellKind::LineNumber, " 42 ").line_number(), Some(42));
        assert_eq!(Cell::new(CellKind::LineNumber, "").line_number(), None);
        assert_eq!(Cell::new(CellKind::LineNumber, "4a").line_number(), None);
        assert_eq!(Cell::new(CellKind::LineNumber, "-3").line_number(), None);
        assert_eq!(Cell::new(CellKind::LineNumber, "0").line_number(), None);
    }

    #[test]
    fn markers_combine_and_strip() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let h = unified_row(&mut s, sec, "1");
        s.row_mut(h).unwrap().markers.insert(Markers::SELECTED | Markers::HOVER_PREVIEW);
        s.strip_markers(Markers::SELECTION);
        let m = s.row(h).unwrap().markers;
        assert!(m.contains(Markers::HOVER_PREVIEW));
        assert!(!m.intersects(Markers::SELECTION));
    }

    #[test]
    fn listener_registry_counts() {
        let mut s = Surface::new(1);
        let a = s.add_listener();
        let b = s.add_listener();
        assert_eq!(s.listener_count(), 2);
        assert!(s.remove_listener(a));
        assert!(!s.remove_listener(a));
        assert_eq!(s.dispatch(&SurfaceEvent::Cancel), vec![b]);
    }

    #[test]
    fn reset_keeps_listeners_and_drops_content() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        let h = unified_row(&mut s, sec, "1");
        s.ensure_thread(h.id);
        s.show_indicator("busy");
        s.add_listener();
        s.mark_complete();

        s.reset(2);
        assert_eq!(s.generation(), 2);
        assert_eq!(s.row_count(), 0);
        assert_eq!(s.threads().count(), 0);
        assert!(s.indicator().is_none());
        assert!(!s.is_complete());
        assert_eq!(s.listener_count(), 1);
    }

    #[test]
    fn section_counts_follow_row_kinds() {
        let mut s = Surface::new(1);
        let sec = s.begin_section("a.txt", 'M');
        s.push_row(sec, RowKind::Added, vec![]);
        s.push_row(sec, RowKind::Removed, vec![]);
        s.push_row(sec, RowKind::Changed, vec![]);
        let section = s.section(sec).unwrap();
        assert_eq!((section.added, section.removed), (2, 2));
        assert_eq!(section.rows.len(), 3);
    }
}
