use std::path::{Path, PathBuf};
use home::home_dir;

const WORKFLOW_DIR: &str = ".workflow";
const LOG_PREFIX: &str = "chat_session_";
const LOG_SUFFIX: &str = ".log";

/// Maps a caller-supplied session id to a token that is safe as a single
/// path segment. Every character outside `[A-Za-z0-9_-]` becomes `_`, one
/// for one, so the character count is preserved.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `~/.workflow`, or `None` when the home directory cannot be determined.
pub fn workflow_home() -> Option<PathBuf> {
    home_dir().map(|home| home.join(WORKFLOW_DIR))
}

pub fn session_log_name(raw_id: &str) -> String {
    format!("{}{}{}", LOG_PREFIX, sanitize(raw_id), LOG_SUFFIX)
}

pub fn session_log_path(base_dir: &Path, raw_id: &str) -> PathBuf {
    base_dir.join(session_log_name(raw_id))
}
