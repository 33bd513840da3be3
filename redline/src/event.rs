//! Event bus.
//!
//! Terminal input, timers, the git thread and store tasks all report through
//! one tokio unbounded channel of [`AppEvent`]s, drained by the main loop.
//!
//! Render (33 ms) and tick (250 ms) intervals are independent so draw rate and
//! status-message expiry can be tuned separately.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use redline_core::error::{SetupError, StoreError};
use redline_core::types::{Comment, Review};

use crate::git::types::ViewMode;

#[derive(Debug)]
pub enum AppEvent {
    /// Key press (`KeyEventKind::Press` only).
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Logic tick (250 ms).
    Tick,
    /// Draw tick (33 ms).
    Render,
    Quit,

    /// The git thread reset the surface to `generation` and is filling it.
    SurfaceDrawn { generation: u64, view: ViewMode },
    GitError(String),
    /// `wait_for_rows` finished for `generation`.
    RowsReady { generation: u64, result: Result<usize, SetupError> },
    CommentsLoaded { generation: u64, result: Result<Vec<Comment>, StoreError> },
    /// Self-scheduled: paint the next chunk of `generation`'s comments.
    PaintChunk { generation: u64 },
    CommentCreated(Result<Comment, StoreError>),
    CommentDeleted { id: String, result: Result<(), StoreError> },
    ReviewLoaded(Result<Review, StoreError>),
    ReviewSaved(Result<Review, StoreError>),
}

/// Both ends of the event channel. Clone `tx` for every producer.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that turns crossterm input and timers into events.
///
/// `reader.next().fuse()` keeps `select!` from polling a finished stream.
/// Only key presses are forwarded; Windows also reports releases.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            tokio::select! {
                _ = tick_tick => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
                _ = render_tick => {
                    if tx.send(AppEvent::Render).is_err() {
                        break;
                    }
                }
                maybe_event = crossterm_event => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if key.kind == KeyEventKind::Press {
                                let _ = tx.send(AppEvent::Key(key));
                            }
                        }
                        Some(Ok(Event::Resize(w, h))) => {
                            let _ = tx.send(AppEvent::Resize(w, h));
                        }
                        Some(Ok(Event::Mouse(mouse))) => {
                            let _ = tx.send(AppEvent::Mouse(mouse));
                        }
                        Some(Err(e)) => log::warn!("terminal event error: {e}"),
                        _ => {}
                    }
                }
            }
        }
    });
}
