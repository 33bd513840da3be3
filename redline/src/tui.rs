//! Terminal setup and teardown.
//!
//! The UI is drawn on stderr so stdout stays usable in pipelines. Logs go to
//! a file (see `main.rs`) because the terminal is owned by the UI while it runs.

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;
use std::io::{stderr, BufWriter, Stderr};
use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

/// Crossterm over buffered stderr; buffering batches escape sequences per frame.
pub type Tui = Terminal<CrosstermBackend<BufWriter<Stderr>>>;

/// Enters raw mode and the alternate screen with mouse capture on.
/// Pair with [`restore_tui`] on every exit path.
pub fn init_tui() -> std::io::Result<Tui> {
    let mut out = BufWriter::new(stderr());
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    Terminal::new(CrosstermBackend::new(out))
}

/// Leaves the alternate screen and raw mode. Idempotent.
pub fn restore_tui() -> std::io::Result<()> {
    disable_raw_mode()?;
    execute!(stderr(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Chains a hook that restores the terminal before the panic message prints.
/// Install before [`init_tui`].
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_tui();
        log::error!("panic: {panic_info}");
        original_hook(panic_info);
    }));
}

/// Returns a flag that flips to `true` on SIGTERM; the event loop polls it.
///
/// # Panics
///
/// Panics if the signal handler cannot be registered.
pub fn register_sigterm() -> Arc<AtomicBool> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term)).expect("Failed to register SIGTERM handler");
    term
}
