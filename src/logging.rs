//! Debug side-channel logging, gated entirely by `READONLY_HOOK_DEBUG`.
//!
//! This never affects the decision and never writes to stdout — only to a
//! log file the user can tail while debugging a misclassification. Any
//! failure to open or write the log file is swallowed; logging must never
//! be the reason a hook invocation fails.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;

/// Verbosity requested via `READONLY_HOOK_DEBUG`. `0` means logging is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Verbosity {
    pub fn from_env() -> Verbosity {
        let level = std::env::var("READONLY_HOOK_DEBUG")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(0);
        Verbosity(level.min(3))
    }

    pub fn is_enabled(self) -> bool {
        self.0 > 0
    }

    pub fn at_least(self, level: u8) -> bool {
        self.0 >= level
    }
}

pub struct DebugLog {
    verbosity: Verbosity,
}

impl DebugLog {
    pub fn new(verbosity: Verbosity) -> Self {
        DebugLog { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Append `message` to the log file if `level` is at or below the
    /// configured verbosity. Silently does nothing on any I/O failure.
    pub fn log(&self, level: u8, message: &str) {
        if !self.verbosity.at_least(level) {
            return;
        }
        let Some(path) = log_path() else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = writeln!(file, "[{}] {}", Utc::now().to_rfc3339(), message);
        }
    }
}

fn log_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("READONLY_HOOK_LOG_DIR") {
        return Some(PathBuf::from(dir).join("readonly-bash-hook.log"));
    }
    dirs::cache_dir().map(|dir| dir.join("readonly-bash-hook").join("readonly-bash-hook.log"))
}
