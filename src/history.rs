use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use serde::Serialize;
use thiserror::Error;
use crate::session::session_log_path;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("session_id is required")]
    MissingIdentifier,

    #[error("workflow directory not found: {}", .0.display())]
    HomeDirectoryMissing(PathBuf),

    #[error("session log not found: {}", .0.display())]
    LogNotFound(PathBuf),

    #[error("failed to read file: {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// The log path the failure refers to, when one was computed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchError::LogNotFound(path) => Some(path),
            FetchError::ReadFailure { path, .. } => Some(path),
            FetchError::MissingIdentifier | FetchError::HomeDirectoryMissing(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionLog {
    pub path: PathBuf,
    pub content: String,
}

impl SessionLog {
    /// Length in characters, not bytes.
    pub fn length(&self) -> usize {
        self.content.chars().count()
    }
}

/// Wire shape of a fetch: `{ok: true, path, length, content}` on success,
/// `{ok: false, error, path?}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<Result<SessionLog, FetchError>> for FetchResponse {
    fn from(result: Result<SessionLog, FetchError>) -> Self {
        match result {
            Ok(log) => FetchResponse {
                ok: true,
                error: None,
                path: Some(log.path.display().to_string()),
                length: Some(log.length()),
                content: Some(log.content),
            },
            Err(err) => FetchResponse {
                ok: false,
                path: err.path().map(|p| p.display().to_string()),
                error: Some(err.to_string()),
                length: None,
                content: None,
            },
        }
    }
}

/// Read-only view over the directory holding `chat_session_<id>.log` files.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    base_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn get_chat_session_history(&self, session_id: &str) -> Result<SessionLog, FetchError> {
        if session_id.is_empty() {
            return Err(FetchError::MissingIdentifier);
        }

        if !self.base_dir.is_dir() {
            return Err(FetchError::HomeDirectoryMissing(self.base_dir.clone()));
        }

        let path = session_log_path(&self.base_dir, session_id);
        if !path.is_file() {
            return Err(FetchError::LogNotFound(path));
        }

        match fs::read(&path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                Ok(SessionLog { path, content })
            }
            Err(source) => Err(FetchError::ReadFailure { path, source }),
        }
    }

    /// Same as [`get_chat_session_history`](Self::get_chat_session_history),
    /// folded into the wire response and logged.
    pub fn fetch(&self, session_id: &str) -> FetchResponse {
        let result = self.get_chat_session_history(session_id);
        match &result {
            Ok(log) => {
                tracing::info!(session_id = %session_id, path = %log.path.display(), length = log.length(), "Session log served");
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Session log fetch failed");
            }
        }
        FetchResponse::from(result)
    }
}
