//! End-to-end annotation behaviour on a hand-built surface: selection,
//! painting and re-render safety.

use std::time::Duration;

use redline_core::anchor::{self, PaintJob, PaintProgress};
use redline_core::error::{SelectionError, SetupError};
use redline_core::lifecycle::{Lifecycle, Outcome, RetryPolicy};
use redline_core::selection::Activation;
use redline_core::store::{CommentStore, MemoryStore, SqliteStore};
use redline_core::surface::{Cell, CellKind, Markers, RowId, RowKind, Surface, SurfaceEvent, Target};
use redline_core::types::{Comment, CommentKind};

/// Unified-layout rows for each `(file, lines)` pair, then marks the render complete.
fn render(surface: &mut Surface, generation: u64, files: &[(&str, std::ops::RangeInclusive<u32>)]) {
    surface.reset(generation);
    for (name, lines) in files {
        let sec = surface.begin_section(*name, 'M');
        surface.push_row(sec, RowKind::Hunk, vec![Cell::new(CellKind::Info, "@@ -1 +1 @@")]);
        for n in lines.clone() {
            surface.push_row(
                sec,
                RowKind::Context,
                vec![
                    Cell::new(CellKind::Gutter, " "),
                    Cell::new(CellKind::OldLineNumber, n.to_string()),
                    Cell::new(CellKind::LineNumber, n.to_string()),
                    Cell::new(CellKind::Code, format!("line {n}")),
                    Cell::new(CellKind::Button, "+"),
                ],
            );
        }
    }
    surface.mark_complete();
}

fn attached(files: &[(&str, std::ops::RangeInclusive<u32>)]) -> (Surface, Lifecycle) {
    let mut surface = Surface::new(0);
    render(&mut surface, 1, files);
    let mut lc = Lifecycle::new();
    lc.begin_render(&mut surface);
    lc.attach(&mut surface, 1).unwrap();
    (surface, lc)
}

fn at(lc: &Lifecycle, file: &str, line: u32) -> Target {
    Target::Row(lc.index().find(file, line).unwrap())
}

fn markers(surface: &Surface, lc: &Lifecycle, file: &str, line: u32) -> Markers {
    surface.row(lc.index().find(file, line).unwrap()).unwrap().markers
}

fn activate(surface: &mut Surface, lc: &mut Lifecycle, target: Target) -> Activation {
    match lc.dispatch(surface, SurfaceEvent::Activate(target)).as_slice() {
        [Outcome::Activation(a)] => a.clone(),
        other => panic!("expected exactly one activation, got {other:?}"),
    }
}

#[test]
fn range_twelve_to_fifteen() {
    let (mut surface, mut lc) = attached(&[("a.txt", 10..=20)]);

    let started = ({ let t = at(&lc, "a.txt", 12); activate(&mut surface, &mut lc, t) });
    assert_eq!(started, Activation::Started { line: 12 });
    assert!(lc.selection().is_awaiting());
    assert!(surface.indicator().is_some());

    let Activation::Completed(range) = ({ let t = at(&lc, "a.txt", 15); activate(&mut surface, &mut lc, t) }) else {
        panic!("range not completed");
    };
    let lines: Vec<u32> = range.entries.iter().map(|e| e.line).collect();
    assert_eq!(lines, [12, 13, 14, 15]);
    assert!(!lc.selection().is_awaiting());
    assert!(surface.indicator().is_none());

    assert!(markers(&surface, &lc, "a.txt", 12).contains(Markers::SELECTED | Markers::RANGE_START));
    assert!(markers(&surface, &lc, "a.txt", 13).contains(Markers::SELECTED | Markers::RANGE_MIDDLE));
    assert!(markers(&surface, &lc, "a.txt", 14).contains(Markers::SELECTED | Markers::RANGE_MIDDLE));
    assert!(markers(&surface, &lc, "a.txt", 15).contains(Markers::SELECTED | Markers::RANGE_END));
    assert!(markers(&surface, &lc, "a.txt", 16).is_empty());
}

#[test]
fn selection_is_order_independent() {
    let (mut surface, mut lc) = attached(&[("a.txt", 1..=12)]);
    for a in 1..=12 {
        for b in 1..=12 {
            if a == b {
                continue;
            }
            ({ let t = at(&lc, "a.txt", a); activate(&mut surface, &mut lc, t) });
            let forward = ({ let t = at(&lc, "a.txt", b); activate(&mut surface, &mut lc, t) });
            ({ let t = at(&lc, "a.txt", b); activate(&mut surface, &mut lc, t) });
            let backward = ({ let t = at(&lc, "a.txt", a); activate(&mut surface, &mut lc, t) });
            assert_eq!(forward, backward, "{a} -> {b}");
        }
    }
}

#[test]
fn escape_cancels_without_trace() {
    let (mut surface, mut lc) = attached(&[("a.txt", 10..=20)]);
    ({ let t = at(&lc, "a.txt", 12); activate(&mut surface, &mut lc, t) });
    lc.hover(&mut surface, at(&lc, "a.txt", 14));

    let outcomes = lc.dispatch(&mut surface, SurfaceEvent::Cancel);
    assert_eq!(outcomes, [Outcome::Cancelled]);
    assert!(!lc.selection().is_awaiting());
    assert_eq!(lc.selection().anchor(), None);
    assert_eq!(surface.marked_rows(Markers::ALL).count(), 0);
    assert!(surface.indicator().is_none());
    assert!(lc.comments().is_empty());
}

#[test]
fn cross_file_end_is_rejected() {
    let (mut surface, mut lc) = attached(&[("a.txt", 10..=20), ("b.txt", 1..=8)]);
    ({ let t = at(&lc, "a.txt", 12); activate(&mut surface, &mut lc, t) });
    let out = ({ let t = at(&lc, "b.txt", 5); activate(&mut surface, &mut lc, t) });

    let Activation::Rejected(err) = out else {
        panic!("expected rejection, got {out:?}");
    };
    assert!(matches!(err, SelectionError::CrossFile { .. }));
    assert!(err.to_string().starts_with("Invalid line range selected"));
    assert!(!lc.selection().is_awaiting());
    assert_eq!(surface.marked_rows(Markers::ALL).count(), 0);
}

#[test]
fn comment_button_cell_activates_its_row() {
    let (mut surface, mut lc) = attached(&[("a.txt", 1..=4)]);
    let row = lc.index().find("a.txt", 3).unwrap();
    let cell = surface.row(row).unwrap().button_cell().unwrap();
    let out = activate(&mut surface, &mut lc, Target::Cell { row, cell });
    assert_eq!(out, Activation::Started { line: 3 });
}

#[test]
fn two_comments_share_one_thread_in_list_order() {
    let (mut surface, lc) = attached(&[("a.txt", 10..=20)]);
    let first = Comment::new("a.txt", 12, 12, "first", CommentKind::Issue).unwrap();
    let second = Comment::new("a.txt", 12, 13, "second", CommentKind::Suggestion).unwrap();

    let report = anchor::paint_many(&[first.clone(), second.clone()], lc.index(), &mut surface);
    assert_eq!(report.painted, 2);

    assert_eq!(surface.threads().count(), 1);
    let row = lc.index().find("a.txt", 12).unwrap();
    let thread = surface.thread_after(row.id).unwrap();
    assert_eq!(thread.entries, vec![first, second]);
    assert!(!thread.range);
}

#[test]
fn painting_is_idempotent() {
    let (mut surface, lc) = attached(&[("a.txt", 10..=20)]);
    let c = Comment::new("a.txt", 14, 14, "once", CommentKind::Question).unwrap();
    anchor::paint_many(std::slice::from_ref(&c), lc.index(), &mut surface);
    let again = anchor::paint_many(std::slice::from_ref(&c), lc.index(), &mut surface);
    assert_eq!(again.painted, 0);
    assert_eq!(again.duplicates, 1);
    assert_eq!(surface.comment_count(), 1);
}

#[test]
fn comments_without_visible_anchor_are_skipped() {
    let (mut surface, lc) = attached(&[("a.txt", 10..=20)]);
    let gone = [
        Comment::new("a.txt", 3, 3, "above the hunk", CommentKind::Issue).unwrap(),
        Comment::new("deleted.rs", 12, 12, "file not shown", CommentKind::Issue).unwrap(),
    ];
    let report = anchor::paint_many(&gone, lc.index(), &mut surface);
    assert_eq!(report.missing, 2);
    assert_eq!(surface.threads().count(), 0);
}

#[test]
fn chunked_painting_matches_single_pass() {
    let files = [("a.txt", 1..=40), ("b.txt", 1..=40)];
    let batch: Vec<Comment> = (0..47)
        .map(|i| {
            let file = if i % 3 == 0 { "b.txt" } else { "a.txt" };
            let line = (i * 7) % 45 + 1;
            Comment::new(file, line, line, &format!("c{i}"), CommentKind::ALL[i as usize % 4]).unwrap()
        })
        .collect();

    let (mut whole, lc_whole) = attached(&files);
    let expected = anchor::paint_many(&batch, lc_whole.index(), &mut whole);

    let (mut chunked, lc_chunked) = attached(&files);
    let mut job = PaintJob::new(batch);
    let mut steps = 0;
    let report = loop {
        steps += 1;
        if let PaintProgress::Done(report) = job.step(lc_chunked.index(), &mut chunked) {
            break report;
        }
    };
    assert_eq!(steps, 5);
    assert_eq!(report, expected);

    let dump = |s: &Surface| -> Vec<(u32, bool, Vec<String>)> {
        s.threads()
            .map(|(id, t)| (id.0, t.range, t.entries.iter().map(|c| c.id.clone()).collect()))
            .collect()
    };
    assert_eq!(dump(&whole), dump(&chunked));
}

#[test]
fn listener_count_stays_one_across_rerenders() {
    let mut surface = Surface::new(0);
    let mut lc = Lifecycle::new();
    for generation in 1..=10 {
        render(&mut surface, generation, &[("a.txt", 1..=5)]);
        lc.begin_render(&mut surface);
        lc.attach(&mut surface, generation).unwrap();
    }
    assert_eq!(surface.listener_count(), 1);

    // One activation toggles the state machine exactly once.
    ({ let t = at(&lc, "a.txt", 2); activate(&mut surface, &mut lc, t) });
    assert!(lc.selection().is_awaiting());
}

#[test]
fn rerender_replaces_selection_context() {
    let (mut surface, mut lc) = attached(&[("a.txt", 1..=5)]);
    let stale = at(&lc, "a.txt", 2);
    activate(&mut surface, &mut lc, stale);

    render(&mut surface, 2, &[("a.txt", 1..=5)]);
    lc.begin_render(&mut surface);
    lc.attach(&mut surface, 2).unwrap();
    assert!(!lc.selection().is_awaiting());
    // Handles from the old render no longer resolve.
    assert_eq!(activate(&mut surface, &mut lc, stale), Activation::Ignored);
}

#[test]
fn late_ready_signal_does_not_index_the_next_render() {
    let (mut surface, mut lc) = attached(&[("a.txt", 1..=5)]);

    // The renderer has moved on to generation 2 and is halfway through it.
    surface.reset(2);
    let sec = surface.begin_section("a.txt", 'M');
    surface.push_row(sec, RowKind::Context, vec![Cell::new(CellKind::LineNumber, "1")]);
    lc.begin_render(&mut surface);

    // The ready signal for generation 1 arrives late.
    assert!(matches!(lc.attach(&mut surface, 1), Err(SetupError::Superseded { generation: 1 })));
    assert!(!lc.is_attached());
    assert!(lc.index().is_empty());
    let first = Target::Row(surface.handle(RowId(0)));
    assert_eq!(lc.activate(&mut surface, first), Activation::Ignored);

    surface.push_row(sec, RowKind::Context, vec![Cell::new(CellKind::LineNumber, "2")]);
    surface.mark_complete();
    assert_eq!(lc.attach(&mut surface, 2).unwrap(), 2);
    assert_eq!(surface.listener_count(), 1);
}

#[tokio::test]
async fn wait_for_rows_gives_up_with_diagnostic() {
    let shared = Surface::shared(3);
    let store = MemoryStore::default();
    let mut lc = Lifecycle::new();
    let policy = RetryPolicy { attempts: 4, backoff: Duration::from_millis(2) };
    let err = lc.setup(&shared, &store, policy).await.unwrap_err();
    assert!(matches!(err, SetupError::RowsNotReady { attempts: 4 }));
    assert!(!lc.is_attached());
    assert_eq!(shared.lock().listener_count(), 0);
}

#[tokio::test]
async fn created_comment_reappears_after_rerender() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("review.db").to_string_lossy().to_string();
    let store = SqliteStore::open(&path, "/repo").await.unwrap();

    let shared = Surface::shared(0);
    render(&mut shared.lock(), 1, &[("a.txt", 10..=20)]);
    let mut lc = Lifecycle::new();
    lc.setup(&shared, &store, RetryPolicy::default()).await.unwrap();

    let range = {
        let mut surface = shared.lock();
        let start = at(&lc, "a.txt", 12);
        let end = at(&lc, "a.txt", 15);
        activate(&mut surface, &mut lc, start);
        match activate(&mut surface, &mut lc, end) {
            Activation::Completed(range) => range,
            other => panic!("unexpected {other:?}"),
        }
    };
    let comment = Comment::new(
        &range.file,
        range.start_line(),
        range.end_line(),
        "extract this",
        CommentKind::Suggestion,
    )
    .unwrap();
    let stored = store.create(comment).await.unwrap();
    assert!(lc.comment_created(&mut shared.lock(), stored.clone()));

    // Re-render (e.g. view toggle) and replay from storage.
    render(&mut shared.lock(), 2, &[("a.txt", 10..=20)]);
    let report = lc.setup(&shared, &store, RetryPolicy::default()).await.unwrap();
    assert_eq!(report.painted, 1);

    let surface = shared.lock();
    let row = lc.index().find("a.txt", 12).unwrap();
    let thread = surface.thread_after(row.id).unwrap();
    assert!(thread.range);
    assert_eq!(thread.entries[0].line_label(), "Lines 12-15");
    assert_eq!(surface.listener_count(), 1);
}
