//! Background thread that owns `git2::Repository` for its lifetime.
//!
//! `git2::Repository` is !Send, so it is opened inside the thread. Requests come
//! in over a crossbeam channel; rows go straight onto the shared surface and
//! the UI loop hears about each new generation through `AppEvent::SurfaceDrawn`.

use std::cell::RefCell;

use crossbeam_channel::Receiver;
use git2::{Delta, Diff, DiffOptions, Repository};
use tokio::sync::mpsc::UnboundedSender;

use redline_core::surface::SharedSurface;

use crate::event::AppEvent;
use crate::git::rows;
use crate::git::types::{FileDiff, OwnedDiffHunk, OwnedDiffLine, RenderRequest, ViewMode};

/// Entry point for the git thread. Runs until every request sender is dropped.
pub fn git_worker_loop(
    path: String,
    rx: Receiver<RenderRequest>,
    surface: SharedSurface,
    event_tx: UnboundedSender<AppEvent>,
) {
    rows::warm_up();

    let repo = match Repository::discover(&path) {
        Ok(r) => r,
        Err(e) => {
            log::error!("cannot open repository at {path}: {e}");
            let _ = event_tx.send(AppEvent::GitError(e.message().to_owned()));
            return;
        }
    };

    let mut generation = surface.lock().generation();
    while let Ok(first) = rx.recv() {
        // Only the newest queued request matters.
        let RenderRequest::Draw(view) = rx.try_iter().last().unwrap_or(first);

        generation += 1;
        surface.lock().reset(generation);
        let _ = event_tx.send(AppEvent::SurfaceDrawn { generation, view });

        match read_working_tree(&repo) {
            Ok(files) => {
                log::debug!("generation {generation}: {} changed files", files.len());
                fill_surface(&surface, generation, &files, view);
            }
            Err(e) => {
                log::error!("diff failed: {e}");
                let _ = event_tx.send(AppEvent::GitError(e.message().to_owned()));
                surface.lock().mark_complete();
            }
        }
    }
}

/// Pushes rows one file at a time so readers see a partially built surface
/// until `mark_complete`.
fn fill_surface(surface: &SharedSurface, generation: u64, files: &[FileDiff], view: ViewMode) {
    for file in files {
        let specs = rows::layout_file(file, view);
        let mut s = surface.lock();
        if s.generation() != generation {
            return;
        }
        let section = s.begin_section(file.path.as_str(), file.status);
        for (kind, cells) in specs {
            s.push_row(section, kind, cells);
        }
    }
    surface.lock().mark_complete();
}

/// HEAD (or the empty tree in a fresh repository) against the working tree,
/// staged changes and untracked files included.
pub fn read_working_tree(repo: &Repository) -> Result<Vec<FileDiff>, git2::Error> {
    let head_tree = repo.head().ok().and_then(|h| h.peel_to_tree().ok());
    let mut opts = DiffOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true);
    let diff = repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?;
    extract_files(&diff)
}

/// Walks the diff once, converting deltas, hunks and lines to owned types.
/// All callbacks run sequentially on this thread, so a `RefCell` is enough.
fn extract_files(diff: &Diff<'_>) -> Result<Vec<FileDiff>, git2::Error> {
    let files: RefCell<Vec<FileDiff>> = RefCell::new(Vec::new());

    diff.foreach(
        &mut |delta, _progress| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_owned());
            let status = match delta.status() {
                Delta::Added => 'A',
                Delta::Deleted => 'D',
                Delta::Renamed => 'R',
                Delta::Untracked => '?',
                _ => 'M',
            };
            let binary = delta.flags().is_binary();
            files.borrow_mut().push(FileDiff { path, status, binary, hunks: Vec::new() });
            true
        },
        Some(&mut |_delta, _binary| {
            if let Some(f) = files.borrow_mut().last_mut() {
                f.binary = true;
            }
            true
        }),
        Some(&mut |_delta, hunk| {
            if let Some(f) = files.borrow_mut().last_mut() {
                f.hunks.push(OwnedDiffHunk {
                    header: String::from_utf8_lossy(hunk.header()).into_owned(),
                    lines: Vec::new(),
                });
            }
            true
        }),
        Some(&mut |_delta, _hunk, line| {
            let origin = line.origin();
            if !matches!(origin, '+' | '-' | ' ') {
                return true;
            }
            let content = String::from_utf8_lossy(line.content())
                .trim_end_matches(['\n', '\r'])
                .to_owned();
            let mut files = files.borrow_mut();
            if let Some(h) = files.last_mut().and_then(|f| f.hunks.last_mut()) {
                h.lines.push(OwnedDiffLine {
                    origin,
                    content,
                    old_lineno: line.old_lineno(),
                    new_lineno: line.new_lineno(),
                });
            }
            true
        }),
    )?;

    Ok(files.into_inner())
}
