//! User configuration from `$XDG_CONFIG_HOME/redline/config.toml`.
//!
//! Every field is optional. A missing file means defaults; a malformed one is
//! logged and also means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use redline_core::lifecycle::RetryPolicy;

use crate::git::types::ViewMode;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    /// `"unified"` or `"split"`.
    pub view: String,
    pub setup_attempts: u32,
    pub setup_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            view: "unified".to_owned(),
            setup_attempts: 30,
            setup_backoff_ms: 100,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config parse error in {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        ViewMode::parse(&self.view).unwrap_or_else(|| {
            log::warn!("unknown view '{}', using unified", self.view);
            ViewMode::Unified
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.setup_attempts.max(1),
            backoff: Duration::from_millis(self.setup_backoff_ms),
        }
    }
}

/// `$XDG_CONFIG_HOME/redline/config.toml`, falling back to `~/.config`.
fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("redline").join("config.toml")
}
