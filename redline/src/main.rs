//! redline: review the working tree diff and leave line-range comments.
//!
//! Startup order:
//!
//! 1. Config and theme (read-only, before the terminal is touched).
//! 2. Panic hook, then the SIGTERM flag.
//! 3. File logging under `.redline/` and the SQLite store.
//! 4. Raw mode and the alternate screen.
//! 5. Event task, git thread, first render request.
//!
//! The event loop only exits through `break`, so `restore_tui()` after it is
//! always reached; the panic hook covers the other path.

mod app;
mod config;
mod event;
mod git;
mod theme;
mod tui;
mod ui;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use redline_core::anchor::PaintProgress;
use redline_core::error::SetupError;
use redline_core::lifecycle::{wait_for_rows, Lifecycle, RetryPolicy};
use redline_core::store::{CommentStore, SqliteStore};
use redline_core::surface::{SharedSurface, Surface};

use app::AppState;
use event::AppEvent;
use git::types::RenderRequest;
use ui::keybindings::{Effect, KeyAction};

const DATA_DIR: &str = ".redline";

fn io_err(e: impl std::error::Error + Send + Sync + 'static) -> std::io::Error {
    std::io::Error::other(e)
}

/// `env_logger` into `.redline/redline.log`; the terminal belongs to the UI.
fn init_logging() -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(format!("{DATA_DIR}/redline.log"))?;
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("REDLINE_LOG", "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Repository work-tree root, or the current directory outside a repository.
fn repo_root() -> String {
    git2::Repository::discover(".")
        .ok()
        .and_then(|r| r.workdir().map(|p| p.to_string_lossy().into_owned()))
        .unwrap_or_else(|| ".".to_owned())
}

/// Handles the loop hands work to: the store, the git thread and the
/// setup waiter for the current render.
struct Services {
    store: SqliteStore,
    surface: SharedSurface,
    tx: UnboundedSender<AppEvent>,
    git_tx: crossbeam_channel::Sender<RenderRequest>,
    policy: RetryPolicy,
    wait_task: Option<JoinHandle<()>>,
}

impl Services {
    fn run_effect(&self, effect: Effect, state: &mut AppState) {
        match effect {
            Effect::Render(view) => {
                if self.git_tx.send(RenderRequest::Draw(view)).is_err() {
                    state.loading = false;
                    state.error("git worker is not running");
                }
            }
            Effect::CreateComment(comment) => {
                let (store, tx) = (self.store.clone(), self.tx.clone());
                tokio::spawn(async move {
                    let _ = tx.send(AppEvent::CommentCreated(store.create(comment).await));
                });
            }
            Effect::DeleteComment(id) => {
                let (store, tx) = (self.store.clone(), self.tx.clone());
                tokio::spawn(async move {
                    let result = store.delete(&id).await;
                    let _ = tx.send(AppEvent::CommentDeleted { id, result });
                });
            }
            Effect::SaveReview { status, summary } => {
                let (store, tx) = (self.store.clone(), self.tx.clone());
                tokio::spawn(async move {
                    let result = store.save_review(status, &summary).await;
                    let _ = tx.send(AppEvent::ReviewSaved(result));
                });
            }
        }
    }

    /// Starts setup for a new render: drop the old context, then wait for rows.
    fn surface_drawn(&mut self, generation: u64, lifecycle: &mut Lifecycle) {
        {
            let mut surface = self.surface.lock();
            if surface.generation() != generation {
                return;
            }
            lifecycle.begin_render(&mut surface);
        }
        if let Some(task) = self.wait_task.take() {
            task.abort();
        }
        let (shared, tx, policy) = (Arc::clone(&self.surface), self.tx.clone(), self.policy);
        self.wait_task = Some(tokio::spawn(async move {
            let result = wait_for_rows(&shared, generation, policy).await;
            let _ = tx.send(AppEvent::RowsReady { generation, result });
        }));
    }

    fn load_comments(&self, generation: u64) {
        let (store, tx) = (self.store.clone(), self.tx.clone());
        tokio::spawn(async move {
            let result = store.list().await;
            let _ = tx.send(AppEvent::CommentsLoaded { generation, result });
        });
    }
}

/// Everything except input and drawing.
fn handle_background(
    event: AppEvent,
    state: &mut AppState,
    lifecycle: &mut Lifecycle,
    services: &mut Services,
) {
    match event {
        AppEvent::Tick => state.tick(),
        AppEvent::SurfaceDrawn { generation, view } => {
            state.view = view;
            state.loading = true;
            state.hover = None;
            services.surface_drawn(generation, lifecycle);
        }
        AppEvent::GitError(msg) => {
            state.loading = false;
            state.error(format!("git: {msg}"));
        }
        AppEvent::RowsReady { generation, result } => {
            let attached =
                result.and_then(|_| lifecycle.attach(&mut services.surface.lock(), generation));
            match attached {
                Ok(lines) => {
                    log::debug!("render g{generation}: {lines} commentable lines");
                    services.load_comments(generation);
                }
                Err(SetupError::Superseded { .. }) => {}
                Err(e) => {
                    state.loading = false;
                    state.error(e.to_string());
                }
            }
        }
        AppEvent::CommentsLoaded { generation, result } => {
            let loaded = result
                .map_err(SetupError::from)
                .and_then(|comments| lifecycle.load_comments(generation, comments));
            match loaded {
                Ok(()) => {
                    let _ = services.tx.send(AppEvent::PaintChunk { generation });
                }
                Err(SetupError::Superseded { .. }) => {}
                Err(e) => {
                    state.loading = false;
                    state.error(e.to_string());
                }
            }
        }
        AppEvent::PaintChunk { generation } => {
            if generation != lifecycle.generation() {
                return;
            }
            match lifecycle.paint_step(&mut services.surface.lock()) {
                // Yield to the loop between chunks.
                Some(PaintProgress::Pending { .. }) => {
                    let _ = services.tx.send(AppEvent::PaintChunk { generation });
                }
                Some(PaintProgress::Done(report)) => {
                    state.loading = false;
                    if report.missing > 0 {
                        state.info(format!(
                            "{} comment(s) are on lines not shown in this diff",
                            report.missing
                        ));
                    }
                }
                None => state.loading = false,
            }
        }
        AppEvent::CommentCreated(Ok(comment)) => {
            let id = comment.id.clone();
            let painted = {
                let mut surface = services.surface.lock();
                let painted = lifecycle.comment_created(&mut surface, comment);
                state.refresh_lines(&surface);
                if painted {
                    state.jump_to_comment(&surface, &id);
                }
                painted
            };
            if painted {
                state.info("Comment added");
            } else {
                state.info("Comment added; its line is not shown in this diff");
            }
        }
        AppEvent::CommentCreated(Err(e)) => state.error(format!("Failed to add comment: {e}")),
        AppEvent::CommentDeleted { id, result } => match result {
            Ok(()) => {
                lifecycle.comment_deleted(&mut services.surface.lock(), &id);
                state.info("Comment deleted");
            }
            Err(e) => state.error(format!("Failed to delete comment: {e}")),
        },
        AppEvent::ReviewLoaded(Ok(review)) => state.review = review,
        AppEvent::ReviewLoaded(Err(e)) => state.error(format!("Failed to load review: {e}")),
        AppEvent::ReviewSaved(Ok(review)) => {
            state.info(format!("Review saved: {}", review.status.as_str()));
            state.review = review;
        }
        AppEvent::ReviewSaved(Err(e)) => state.error(format!("Failed to save review: {e}")),
        AppEvent::Resize(_, _) => {}
        AppEvent::Key(_) | AppEvent::Mouse(_) | AppEvent::Render | AppEvent::Quit => {}
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = config::Config::load();
    let theme = theme::Theme::from_name(&config.theme);
    let mut state = AppState::new(config.view_mode());

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm();

    std::fs::create_dir_all(DATA_DIR)?;
    init_logging()?;
    let repo_path = repo_root();
    log::info!("starting redline in {repo_path}");
    let store = SqliteStore::open(&format!("{DATA_DIR}/reviews.db"), &repo_path)
        .await
        .map_err(io_err)?;
    log::info!("review session {}", store.session().id);

    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;

    let surface = Surface::shared(0);
    let (git_tx, git_rx) = crossbeam_channel::unbounded();
    {
        let (surface, tx, path) = (Arc::clone(&surface), handler.tx.clone(), repo_path.clone());
        std::thread::spawn(move || git::worker::git_worker_loop(path, git_rx, surface, tx));
    }
    let _ = git_tx.send(RenderRequest::Draw(state.view));

    {
        let (store, tx) = (store.clone(), handler.tx.clone());
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::ReviewLoaded(store.load_review().await));
        });
    }

    let mut lifecycle = Lifecycle::new();
    let mut services = Services {
        store,
        surface,
        tx: handler.tx.clone(),
        git_tx,
        policy: config.retry_policy(),
        wait_task: None,
    };

    'event_loop: loop {
        tokio::select! {
            // Heartbeat so SIGTERM is seen even when nothing else happens.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        let surface = services.surface.lock();
                        terminal.draw(|frame| {
                            ui::render(frame, &mut state, &surface, &lifecycle, &theme)
                        })?;
                    }
                    Some(AppEvent::Key(key)) => {
                        let action = ui::keybindings::handle_key(
                            key,
                            &mut state,
                            &mut lifecycle,
                            &mut services.surface.lock(),
                        );
                        match action {
                            KeyAction::Quit => break 'event_loop,
                            KeyAction::Effect(effect) => services.run_effect(effect, &mut state),
                            KeyAction::Continue => {}
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        let action = ui::keybindings::handle_mouse(
                            mouse,
                            &mut state,
                            &mut lifecycle,
                            &mut services.surface.lock(),
                        );
                        if let KeyAction::Effect(effect) = action {
                            services.run_effect(effect, &mut state);
                        }
                    }
                    Some(AppEvent::Quit) | None => break 'event_loop,
                    Some(other) => handle_background(other, &mut state, &mut lifecycle, &mut services),
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;
    if let Some(task) = services.wait_task.take() {
        task.abort();
    }
    if let Err(e) = services.store.touch().await {
        log::warn!("could not update session timestamp: {e}");
    }
    log::info!("exiting");
    Ok(())
}
