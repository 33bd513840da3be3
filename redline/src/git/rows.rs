//! Turns owned diffs into surface rows.
//!
//! Row layouts put the new-side line number in a role the row index knows
//! (`LineNumber` in unified, `SideLineNumber` in split, `LineNumberContent`
//! for untracked files) and leave it empty on removed-only rows, so only
//! lines that exist in the working tree can be commented on.

use std::sync::LazyLock;

use similar::{ChangeTag, TextDiff};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;

use redline_core::surface::{Cell, CellKind, RowKind, Segment, SegmentStyle};

use crate::git::types::{FileDiff, OwnedDiffHunk, OwnedDiffLine, ViewMode};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub type RowSpec = (RowKind, Vec<Cell>);

/// Loads the syntax and theme sets so the first render does not pay for it.
pub fn warm_up() {
    let _ = &*PS;
    let _ = &*TS;
}

/// Per-file syntect state. Lines must be fed in file order.
pub struct Highlighter {
    inner: Option<HighlightLines<'static>>,
}

impl Highlighter {
    pub fn for_path(path: &str) -> Self {
        let theme = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next());
        let syntax = PS
            .find_syntax_by_extension(file_ext(path))
            .unwrap_or_else(|| PS.find_syntax_plain_text());
        Self { inner: theme.map(|t| HighlightLines::new(syntax, t)) }
    }

    pub fn segments(&mut self, code: &str) -> Vec<Segment> {
        let Some(h) = self.inner.as_mut() else {
            return vec![plain(code)];
        };
        let ranges = h.highlight_line(code, &PS).unwrap_or_default();
        if ranges.is_empty() {
            return vec![plain(code)];
        }
        ranges
            .into_iter()
            .map(|(style, text)| Segment {
                text: text.to_owned(),
                style: SegmentStyle {
                    fg: (style.foreground.a > 0)
                        .then_some((style.foreground.r, style.foreground.g, style.foreground.b)),
                    bold: style.font_style.contains(FontStyle::BOLD),
                    italic: style.font_style.contains(FontStyle::ITALIC),
                    underline: style.font_style.contains(FontStyle::UNDERLINE),
                    emphasis: false,
                },
            })
            .collect()
    }
}

fn plain(text: &str) -> Segment {
    Segment { text: text.to_owned(), style: SegmentStyle::default() }
}

/// Word-level split of a removed/added pair; changed words carry `emphasis`.
fn word_emphasis(old: &str, new: &str) -> (Vec<Segment>, Vec<Segment>) {
    let diff = TextDiff::from_words(old, new);
    let mut old_segs = Vec::new();
    let mut new_segs = Vec::new();

    for op in diff.ops() {
        for change in diff.iter_inline_changes(op) {
            for (emphasized, value) in change.iter_strings_lossy() {
                let seg = Segment {
                    text: value.into_owned(),
                    style: SegmentStyle { emphasis: emphasized, ..SegmentStyle::default() },
                };
                match change.tag() {
                    ChangeTag::Delete => old_segs.push(seg),
                    ChangeTag::Insert => new_segs.push(seg),
                    ChangeTag::Equal => {
                        old_segs.push(seg.clone());
                        new_segs.push(seg);
                    }
                }
            }
        }
    }
    (old_segs, new_segs)
}

/// A diff line with its styled code.
struct CodeLine<'a> {
    line: &'a OwnedDiffLine,
    segments: Vec<Segment>,
}

/// Highlights a hunk in order, then swaps in word emphasis for each removed
/// line that is directly followed by an added counterpart.
fn prepare_hunk<'a>(hunk: &'a OwnedDiffHunk, hl: &mut Highlighter) -> Vec<CodeLine<'a>> {
    let mut lines: Vec<CodeLine<'a>> = hunk
        .lines
        .iter()
        .map(|line| CodeLine { line, segments: hl.segments(&line.content) })
        .collect();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].line.origin != '-' {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && lines[i].line.origin == '-' {
            i += 1;
        }
        let mid = i;
        while i < lines.len() && lines[i].line.origin == '+' {
            i += 1;
        }
        let pairs = (mid - start).min(i - mid);
        for k in 0..pairs {
            let (old, new) =
                word_emphasis(&lines[start + k].line.content, &lines[mid + k].line.content);
            lines[start + k].segments = old;
            lines[mid + k].segments = new;
        }
    }
    lines
}

fn number(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

fn button() -> Cell {
    Cell::new(CellKind::Button, "+")
}

/// All rows for one file, hunk header rows included.
pub fn layout_file(file: &FileDiff, view: ViewMode) -> Vec<RowSpec> {
    if file.binary {
        return vec![(RowKind::Notice, vec![Cell::new(CellKind::Info, "Binary file not shown")])];
    }

    let mut hl = Highlighter::for_path(&file.path);
    let mut rows = Vec::new();
    for hunk in &file.hunks {
        rows.push((RowKind::Hunk, vec![Cell::new(CellKind::Info, hunk.header.trim_end())]));
        let lines = prepare_hunk(hunk, &mut hl);
        if file.status == '?' {
            rows.extend(lines.into_iter().map(content_row));
        } else {
            match view {
                ViewMode::Unified => rows.extend(lines.into_iter().map(unified_row)),
                ViewMode::Split => split_rows(lines, &mut rows),
            }
        }
    }
    rows
}

/// Whole-file listing for untracked files: every line is new.
fn content_row(code: CodeLine<'_>) -> RowSpec {
    (
        RowKind::Added,
        vec![
            Cell::new(CellKind::LineNumberContent, number(code.line.new_lineno)),
            Cell::styled(CellKind::Code, code.segments),
            button(),
        ],
    )
}

fn unified_row(code: CodeLine<'_>) -> RowSpec {
    let (kind, gutter) = match code.line.origin {
        '+' => (RowKind::Added, "+"),
        '-' => (RowKind::Removed, "-"),
        _ => (RowKind::Context, " "),
    };
    (
        kind,
        vec![
            Cell::new(CellKind::Gutter, gutter),
            Cell::new(CellKind::OldLineNumber, number(code.line.old_lineno)),
            Cell::new(CellKind::LineNumber, number(code.line.new_lineno)),
            Cell::styled(CellKind::Code, code.segments),
            button(),
        ],
    )
}

fn split_rows(lines: Vec<CodeLine<'_>>, out: &mut Vec<RowSpec>) {
    let mut removed: Vec<CodeLine<'_>> = Vec::new();
    let mut added: Vec<CodeLine<'_>> = Vec::new();

    for code in lines {
        match code.line.origin {
            '-' => {
                if !added.is_empty() {
                    flush_block(&mut removed, &mut added, out);
                }
                removed.push(code);
            }
            '+' => added.push(code),
            _ => {
                flush_block(&mut removed, &mut added, out);
                out.push((
                    RowKind::Context,
                    vec![
                        Cell::new(CellKind::Gutter, " "),
                        Cell::new(CellKind::OldLineNumber, number(code.line.old_lineno)),
                        Cell::styled(CellKind::OldCode, code.segments.clone()),
                        Cell::new(CellKind::SideLineNumber, number(code.line.new_lineno)),
                        Cell::styled(CellKind::Code, code.segments),
                        button(),
                    ],
                ));
            }
        }
    }
    flush_block(&mut removed, &mut added, out);
}

/// Pairs a removed block with the added block after it, one row per pair.
fn flush_block(
    removed: &mut Vec<CodeLine<'_>>,
    added: &mut Vec<CodeLine<'_>>,
    out: &mut Vec<RowSpec>,
) {
    let mut old = removed.drain(..);
    let mut new = added.drain(..);
    loop {
        let (o, n) = (old.next(), new.next());
        let (kind, gutter) = match (&o, &n) {
            (None, None) => break,
            (Some(_), Some(_)) => (RowKind::Changed, "~"),
            (Some(_), None) => (RowKind::Removed, "-"),
            (None, Some(_)) => (RowKind::Added, "+"),
        };
        let (old_no, old_code) = match o {
            Some(c) => (number(c.line.old_lineno), Cell::styled(CellKind::OldCode, c.segments)),
            None => (String::new(), Cell::new(CellKind::OldCode, "")),
        };
        let (new_no, new_code) = match n {
            Some(c) => (number(c.line.new_lineno), Cell::styled(CellKind::Code, c.segments)),
            None => (String::new(), Cell::new(CellKind::Code, "")),
        };
        out.push((
            kind,
            vec![
                Cell::new(CellKind::Gutter, gutter),
                Cell::new(CellKind::OldLineNumber, old_no),
                old_code,
                Cell::new(CellKind::SideLineNumber, new_no),
                new_code,
                button(),
            ],
        ));
    }
}

fn file_ext(path: &str) -> &str {
    path.rsplit_once('.').map_or("txt", |(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::row_index::RowIndex;
    use redline_core::surface::Surface;

    fn line(origin: char, old: Option<u32>, new: Option<u32>, text: &str) -> OwnedDiffLine {
        OwnedDiffLine { origin, content: text.to_owned(), old_lineno: old, new_lineno: new }
    }

    fn sample(status: char) -> FileDiff {
        FileDiff {
            path: "src/lib.rs".to_owned(),
            status,
            binary: false,
            hunks: vec![OwnedDiffHunk {
                header: "@@ -10,4 +10,4 @@\n".to_owned(),
                lines: vec![
                    line(' ', Some(10), Some(10), "fn main() {"),
                    line('-', Some(11), None, "    let x = 1;"),
                    line('-', Some(12), None, "    let y = 2;"),
                    line('+', None, Some(11), "    let x = 3;"),
                    line(' ', Some(13), Some(12), "}"),
                ],
            }],
        }
    }

    fn index_of(rows: Vec<RowSpec>, path: &str) -> (Surface, RowIndex) {
        let mut s = Surface::new(1);
        let sec = s.begin_section(path, 'M');
        for (kind, cells) in rows {
            s.push_row(sec, kind, cells);
        }
        let index = RowIndex::rebuild(&mut s);
        (s, index)
    }

    #[test]
    fn unified_indexes_only_new_side_lines() {
        let rows = layout_file(&sample('M'), ViewMode::Unified);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].0, RowKind::Hunk);
        let (_, index) = index_of(rows, "src/lib.rs");
        let lines: Vec<u32> = index.entries("src/lib.rs").iter().map(|e| e.line).collect();
        assert_eq!(lines, [10, 11, 12]);
    }

    #[test]
    fn split_pairs_removed_with_added() {
        let rows = layout_file(&sample('M'), ViewMode::Split);
        let kinds: Vec<RowKind> = rows.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            [RowKind::Hunk, RowKind::Context, RowKind::Changed, RowKind::Removed, RowKind::Context]
        );
        let changed = &rows[2].1;
        let emphasized = changed
            .iter()
            .filter(|c| c.kind == CellKind::Code)
            .flat_map(|c| c.segments.iter())
            .any(|s| s.style.emphasis);
        assert!(emphasized);

        let (_, index) = index_of(rows, "src/lib.rs");
        let lines: Vec<u32> = index.entries("src/lib.rs").iter().map(|e| e.line).collect();
        assert_eq!(lines, [10, 11, 12]);
    }

    #[test]
    fn untracked_files_use_content_layout() {
        let file = FileDiff {
            path: "notes.md".to_owned(),
            status: '?',
            binary: false,
            hunks: vec![OwnedDiffHunk {
                header: "@@ -0,0 +1,2 @@".to_owned(),
                lines: vec![line('+', None, Some(1), "# hi"), line('+', None, Some(2), "there")],
            }],
        };
        let rows = layout_file(&file, ViewMode::Split);
        assert_eq!(rows[1].1[0].kind, CellKind::LineNumberContent);
        let (_, index) = index_of(rows, "notes.md");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn binary_files_get_a_notice() {
        let file = FileDiff { path: "logo.png".into(), status: 'M', binary: true, hunks: vec![] };
        let rows = layout_file(&file, ViewMode::Unified);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, RowKind::Notice);
    }

    #[test]
    fn code_cell_text_is_the_source_line() {
        let rows = layout_file(&sample('M'), ViewMode::Unified);
        let code = rows[1].1.iter().find(|c| c.kind == CellKind::Code).unwrap();
        assert_eq!(code.text, "fn main() {");
    }
}
