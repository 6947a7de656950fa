//! # History File Management
//!
//! Manages the location of the REPL history file. By default, history is
//! stored in `~/.sqlfence_history`.
//!
//! ## Configuration
//!
//! The history file location can be overridden using the `SQLFENCE_HISTORY`
//! environment variable:
//!
//! ```bash
//! export SQLFENCE_HISTORY=/custom/path/history
//! sqlfence schemas/trips.json
//! ```
//!
//! To disable history persistence, set `SQLFENCE_HISTORY` to an empty
//! string.
//!
//! The history path is resolved once at REPL startup and passed to
//! rustyline, which handles the file I/O.

use std::env;
use std::path::PathBuf;

const DEFAULT_HISTORY_FILE: &str = ".sqlfence_history";
pub const HISTORY_ENV_VAR: &str = "SQLFENCE_HISTORY";

pub fn history_path() -> Option<PathBuf> {
    history_path_from(|key| env::var(key).ok())
}

fn history_path_from<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(custom_path) = lookup(HISTORY_ENV_VAR) {
        if custom_path.is_empty() {
            return None;
        }
        return Some(PathBuf::from(custom_path));
    }

    lookup("HOME").map(|home| PathBuf::from(home).join(DEFAULT_HISTORY_FILE))
}
