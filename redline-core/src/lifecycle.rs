//! Per-render annotation setup.
//!
//! Each render goes through the same steps:
//!
//! 0. [`Lifecycle::begin_render`] throws away the previous context (index and
//!    selection) and any paint job still in flight.
//! 1. [`wait_for_rows`] polls until the renderer has finished the surface.
//! 2. [`Lifecycle::attach`] rebuilds the row index and rebinds the one
//!    delegated listener.
//! 3. [`Lifecycle::load_comments`] replaces the comment mirror with a fresh
//!    storage read and queues a [`PaintJob`], which
//!    [`Lifecycle::paint_step`] advances.
//!
//! The binary drives these steps from its event loop; [`Lifecycle::setup`]
//! runs them back to back.

use std::time::Duration;

use crate::anchor::{self, PaintJob, PaintProgress, PaintReport};
use crate::error::SetupError;
use crate::row_index::RowIndex;
use crate::selection::{Activation, Selection};
use crate::store::CommentStore;
use crate::surface::{ListenerId, Markers, SharedSurface, Surface, SurfaceEvent, Target};
use crate::types::Comment;

/// How long to wait for the renderer before giving up on a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 30, backoff: Duration::from_millis(100) }
    }
}

/// Polls `shared` until the render `generation` is complete.
///
/// Returns the row count. Fails with [`SetupError::Superseded`] as soon as a
/// newer render replaces the surface, and with [`SetupError::RowsNotReady`]
/// after `policy.attempts` checks.
pub async fn wait_for_rows(
    shared: &SharedSurface,
    generation: u64,
    policy: RetryPolicy,
) -> Result<usize, SetupError> {
    for attempt in 1..=policy.attempts {
        {
            let surface = shared.lock();
            if surface.generation() != generation {
                return Err(SetupError::Superseded { generation });
            }
            if surface.is_complete() {
                log::debug!(
                    "render g{generation} ready after {attempt} check(s), {} rows",
                    surface.row_count()
                );
                return Ok(surface.row_count());
            }
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }
    log::warn!("render g{generation} not ready after {} attempts", policy.attempts);
    Err(SetupError::RowsNotReady { attempts: policy.attempts })
}

/// Everything that belongs to one render. Replaced wholesale, never patched.
#[derive(Debug, Default)]
pub struct AnnotationContext {
    pub generation: u64,
    pub index: RowIndex,
    pub selection: Selection,
}

impl AnnotationContext {
    fn new(generation: u64) -> Self {
        Self { generation, ..Self::default() }
    }
}

/// What one delivered surface event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Activation(Activation),
    Preview(usize),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    context: AnnotationContext,
    binding: Option<ListenerId>,
    attached: bool,
    mirror: Vec<Comment>,
    paint_job: Option<PaintJob>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.context.generation
    }

    pub fn index(&self) -> &RowIndex {
        &self.context.index
    }

    pub fn selection(&self) -> &Selection {
        &self.context.selection
    }

    /// Comments from the last storage read plus any created or deleted since.
    pub fn comments(&self) -> &[Comment] {
        &self.mirror
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_painting(&self) -> bool {
        self.paint_job.is_some()
    }

    pub fn hint(&self) -> &'static str {
        self.context.selection.hint()
    }

    /// Step 0. Call as soon as the renderer announces a new generation.
    pub fn begin_render(&mut self, surface: &mut Surface) {
        self.context = AnnotationContext::new(surface.generation());
        self.attached = false;
        if self.paint_job.take().is_some() {
            log::debug!("dropped paint job of a replaced render");
        }
        surface.strip_markers(Markers::ALL);
        surface.hide_indicator();
        surface.clear_line_caches();
    }

    /// Steps 1 and 2: index the finished surface and rebind the listener.
    ///
    /// `generation` is the render the caller waited for. Anything else, or a
    /// surface the renderer is still filling, is [`SetupError::Superseded`].
    pub fn attach(
        &mut self,
        surface: &mut Surface,
        generation: u64,
    ) -> Result<usize, SetupError> {
        if generation != self.context.generation
            || surface.generation() != generation
            || !surface.is_complete()
        {
            return Err(SetupError::Superseded { generation });
        }
        self.context.index = RowIndex::rebuild(surface);
        self.unbind(surface);
        self.bind(surface);
        self.attached = true;
        Ok(self.context.index.len())
    }

    fn unbind(&mut self, surface: &mut Surface) {
        if let Some(id) = self.binding.take() {
            surface.remove_listener(id);
        }
    }

    fn bind(&mut self, surface: &mut Surface) {
        self.binding = Some(surface.add_listener());
    }

    /// Step 3. Stale generations are rejected so a slow storage read cannot
    /// paint onto a newer render.
    pub fn load_comments(
        &mut self,
        generation: u64,
        comments: Vec<Comment>,
    ) -> Result<(), SetupError> {
        if generation != self.context.generation {
            return Err(SetupError::Superseded { generation });
        }
        self.mirror = comments.clone();
        let job = PaintJob::new(comments);
        if job.is_chunked() {
            log::debug!("painting {} comments in chunks", self.mirror.len());
        }
        self.paint_job = Some(job);
        Ok(())
    }

    /// Paints the next chunk. `None` when no job is queued.
    pub fn paint_step(&mut self, surface: &mut Surface) -> Option<PaintProgress> {
        if surface.generation() != self.context.generation {
            self.paint_job = None;
            return None;
        }
        let job = self.paint_job.as_mut()?;
        let progress = job.step(&self.context.index, surface);
        if let PaintProgress::Done(report) = progress {
            self.paint_job = None;
            log::info!(
                "painted {} comment(s), {} without anchor",
                report.painted,
                report.missing
            );
        }
        Some(progress)
    }

    /// Runs the whole setup sequence for the render currently on `shared`.
    pub async fn setup(
        &mut self,
        shared: &SharedSurface,
        store: &dyn CommentStore,
        policy: RetryPolicy,
    ) -> Result<PaintReport, SetupError> {
        let generation = {
            let mut surface = shared.lock();
            self.begin_render(&mut surface);
            surface.generation()
        };
        wait_for_rows(shared, generation, policy).await?;
        self.attach(&mut shared.lock(), generation)?;

        let comments = store.list().await?;
        self.load_comments(generation, comments)?;

        let mut surface = shared.lock();
        let job = self.paint_job.take();
        match job {
            Some(mut job) if surface.generation() == generation => {
                let report = job.finish(&self.context.index, &mut surface);
                log::info!(
                    "painted {} comment(s), {} without anchor",
                    report.painted,
                    report.missing
                );
                Ok(report)
            }
            _ => Err(SetupError::Superseded { generation }),
        }
    }

    /// Routes `event` through the surface's listeners. Nothing happens until
    /// a listener is bound.
    pub fn dispatch(&mut self, surface: &mut Surface, event: SurfaceEvent) -> Vec<Outcome> {
        surface
            .dispatch(&event)
            .into_iter()
            .map(|_| self.handle(surface, event))
            .collect()
    }

    fn handle(&mut self, surface: &mut Surface, event: SurfaceEvent) -> Outcome {
        match event {
            SurfaceEvent::Activate(target) => Outcome::Activation(self.activate(surface, target)),
            SurfaceEvent::Hover(target) => Outcome::Preview(self.hover(surface, target)),
            SurfaceEvent::HoverEnd => {
                Selection::clear_preview(surface);
                Outcome::Preview(0)
            }
            SurfaceEvent::Cancel => {
                self.cancel(surface);
                Outcome::Cancelled
            }
        }
    }

    pub fn activate(&mut self, surface: &mut Surface, target: Target) -> Activation {
        if !self.attached || surface.generation() != self.context.generation {
            return Activation::Ignored;
        }
        self.context
            .selection
            .on_row_activated(target, surface, &self.context.index)
    }

    pub fn cancel(&mut self, surface: &mut Surface) {
        self.context.selection.cancel(surface);
    }

    pub fn hover(&mut self, surface: &mut Surface, target: Target) -> usize {
        if !self.attached {
            return 0;
        }
        self.context
            .selection
            .preview(target, surface, &self.context.index)
    }

    /// Records a comment that storage accepted and paints it.
    pub fn comment_created(&mut self, surface: &mut Surface, comment: Comment) -> bool {
        let painted = surface.generation() == self.context.generation
            && anchor::paint(&comment, &self.context.index, surface);
        self.mirror.push(comment);
        painted
    }

    pub fn comment_deleted(&mut self, surface: &mut Surface, comment_id: &str) -> bool {
        self.mirror.retain(|c| c.id != comment_id);
        anchor::remove(comment_id, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::surface::{Cell, CellKind, RowKind};
    use crate::types::CommentKind;

    fn render(surface: &mut Surface, generation: u64, lines: std::ops::RangeInclusive<u32>) {
        surface.reset(generation);
        let sec = surface.begin_section("a.txt", 'M');
        for n in lines {
            surface.push_row(
                sec,
                RowKind::Context,
                vec![Cell::new(CellKind::LineNumber, n.to_string()), Cell::new(CellKind::Code, "x")],
            );
        }
        surface.mark_complete();
    }

    #[test]
    fn one_listener_across_renders() {
        let mut surface = Surface::new(0);
        let mut lc = Lifecycle::new();
        for generation in 1..=5 {
            render(&mut surface, generation, 1..=3);
            lc.begin_render(&mut surface);
            lc.attach(&mut surface, generation).unwrap();
            assert_eq!(surface.listener_count(), 1);
        }
        let target = Target::Row(lc.index().find("a.txt", 2).unwrap());
        let outcomes = lc.dispatch(&mut surface, SurfaceEvent::Activate(target));
        assert_eq!(outcomes, vec![Outcome::Activation(Activation::Started { line: 2 })]);
    }

    #[test]
    fn events_before_attach_reach_nobody() {
        let mut surface = Surface::new(0);
        render(&mut surface, 1, 1..=3);
        let mut lc = Lifecycle::new();
        lc.begin_render(&mut surface);
        assert!(lc.dispatch(&mut surface, SurfaceEvent::Cancel).is_empty());
    }

    #[test]
    fn begin_render_drops_selection_and_job() {
        let mut surface = Surface::new(0);
        render(&mut surface, 1, 1..=30);
        let mut lc = Lifecycle::new();
        lc.begin_render(&mut surface);
        lc.attach(&mut surface, 1).unwrap();
        let target = Target::Row(lc.index().find("a.txt", 4).unwrap());
        lc.activate(&mut surface, target);
        let batch = (1..=25)
            .map(|n| Comment::new("a.txt", n, n, "c", CommentKind::Issue).unwrap())
            .collect();
        lc.load_comments(1, batch).unwrap();
        lc.paint_step(&mut surface);

        render(&mut surface, 2, 1..=30);
        lc.begin_render(&mut surface);
        assert_eq!(*lc.selection(), Selection::Idle);
        assert!(!lc.is_painting());
        assert!(surface.indicator().is_none());
        assert!(matches!(
            lc.load_comments(1, Vec::new()),
            Err(SetupError::Superseded { generation: 1 })
        ));
    }

    #[test]
    fn attach_waits_for_a_complete_current_render() {
        let mut surface = Surface::new(0);
        render(&mut surface, 1, 1..=3);
        let mut lc = Lifecycle::new();
        lc.begin_render(&mut surface);

        // Renderer has started the next generation but not finished it.
        surface.reset(2);
        let sec = surface.begin_section("a.txt", 'M');
        surface.push_row(sec, RowKind::Context, vec![Cell::new(CellKind::LineNumber, "1")]);
        lc.begin_render(&mut surface);

        assert!(matches!(lc.attach(&mut surface, 1), Err(SetupError::Superseded { generation: 1 })));
        assert!(matches!(lc.attach(&mut surface, 2), Err(SetupError::Superseded { generation: 2 })));
        assert!(!lc.is_attached());
        assert_eq!(surface.listener_count(), 0);

        surface.mark_complete();
        assert_eq!(lc.attach(&mut surface, 2).unwrap(), 1);
        assert!(lc.is_attached());
    }

    #[tokio::test]
    async fn wait_gives_up_on_unfinished_render() {
        let shared = Surface::shared(7);
        let policy = RetryPolicy { attempts: 3, backoff: Duration::from_millis(1) };
        let err = wait_for_rows(&shared, 7, policy).await.unwrap_err();
        assert!(matches!(err, SetupError::RowsNotReady { attempts: 3 }));

        let err = wait_for_rows(&shared, 6, policy).await.unwrap_err();
        assert!(matches!(err, SetupError::Superseded { generation: 6 }));
    }

    #[tokio::test]
    async fn setup_replays_stored_comments() {
        let shared = Surface::shared(0);
        render(&mut shared.lock(), 1, 1..=20);
        let store = MemoryStore::with_comments(vec![
            Comment::new("a.txt", 12, 12, "first", CommentKind::Issue).unwrap(),
            Comment::new("a.txt", 12, 14, "second", CommentKind::Question).unwrap(),
        ]);
        let mut lc = Lifecycle::new();
        let report = lc.setup(&shared, &store, RetryPolicy::default()).await.unwrap();
        assert_eq!(report.painted, 2);
        assert_eq!(lc.comments().len(), 2);

        let surface = shared.lock();
        let row = lc.index().find("a.txt", 12).unwrap();
        let texts: Vec<&str> = surface
            .thread_after(row.id)
            .unwrap()
            .entries
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[tokio::test]
    async fn setup_paints_chunked_batches_completely() {
        let shared = Surface::shared(0);
        render(&mut shared.lock(), 1, 1..=40);
        let store = MemoryStore::with_comments(
            (1..=35)
                .map(|n| Comment::new("a.txt", n, n, "c", CommentKind::Praise).unwrap())
                .collect(),
        );
        let mut lc = Lifecycle::new();
        let report = lc.setup(&shared, &store, RetryPolicy::default()).await.unwrap();
        assert_eq!(report.painted, 35);
        assert!(!lc.is_painting());
        assert_eq!(shared.lock().comment_count(), 35);
    }
}
