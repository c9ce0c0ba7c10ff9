use std::collections::BTreeSet;
use std::time::Duration;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:6225";
pub const BASE_URL_ENV: &str = "CHAT_HISTORY_BASE_URL";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Error connecting to chat history service at {base_url}: {source}")]
    Connect {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No session found for id {0}")]
    NoSession(i64),

    #[error("Invalid session id in response: {0}")]
    InvalidSessionId(String),
}

/// HTTP client for the `/chat-history` service.
#[derive(Clone)]
pub struct ChatHistoryClient {
    client: Client,
    base_url: String,
}

impl ChatHistoryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn history_url(&self, session_id: i64) -> String {
        format!("{}/chat-history?sid={}", self.base_url, session_id)
    }

    pub fn list_url(&self) -> String {
        format!("{}/chat-history", self.base_url)
    }

    /// `{"session_id": .., "sessions": ..}` for one session.
    pub async fn get_chat_history(&self, session_id: i64) -> Result<Value, ClientError> {
        let url = self.history_url(session_id);
        eprintln!("Fetching chat history from URL: {}", url);

        let sessions = self.get_json(&url).await?;
        if is_empty_json(&sessions) {
            return Err(ClientError::NoSession(session_id));
        }

        Ok(json!({
            "session_id": session_id,
            "sessions": sessions
        }))
    }

    /// `{"raw_response": .., "session_ids": [..]}` across all sessions.
    pub async fn list_session_ids(&self) -> Result<Value, ClientError> {
        let url = self.list_url();
        eprintln!("Fetching all session IDs from URL: {}", url);

        let data = self.get_json(&url).await?;
        let session_ids = extract_session_ids(&data)?;

        Ok(json!({
            "raw_response": data,
            "session_ids": session_ids
        }))
    }

    async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let connect_err = |source| ClientError::Connect {
            base_url: self.base_url.clone(),
            source,
        };

        let res = self.client.get(url).send().await.map_err(connect_err)?;
        let status = res.status();
        let body = res.bytes().await.map_err(connect_err)?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Null, `false`, `0`, `""`, `[]` and `{}` all mean "nothing found".
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Accepts a bare list of ids or objects, or an object wrapping one under
/// `session_ids`, `sessions` or `ids`. Returns the ids sorted and deduplicated.
pub fn extract_session_ids(data: &Value) -> Result<Vec<i64>, ClientError> {
    let items = match data {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["session_ids", "sessions", "ids"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|candidate| !is_empty_json(candidate))
            .and_then(Value::as_array),
        _ => None,
    };

    let mut ids = BTreeSet::new();
    for item in items.into_iter().flatten() {
        let raw = match item {
            Value::Number(_) | Value::String(_) => Some(item),
            Value::Object(obj) => ["session_id", "id", "sid"]
                .iter()
                .filter_map(|key| obj.get(*key))
                .find(|sid| !is_empty_json(sid)),
            _ => None,
        };
        if let Some(raw) = raw {
            ids.insert(parse_session_id(raw)?);
        }
    }

    Ok(ids.into_iter().collect())
}

fn parse_session_id(raw: &Value) -> Result<i64, ClientError> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ClientError::InvalidSessionId(raw.to_string()))
}
