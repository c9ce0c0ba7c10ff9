use std::fs;
use serde_json::{json, Value};
use workflow_history_mcp::config::{load_config, resolve_port, DEFAULT_PORT};
use workflow_history_mcp::history::HistoryStore;
use workflow_history_mcp::server::{ToolRegistry, GET_CHAT_SESSION_HISTORY};
use workflow_history_mcp::session::{sanitize, session_log_path};

fn call(store: &HistoryStore, session_id: &str) -> Value {
    let args = match json!({"session_id": session_id}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    ToolRegistry::default()
        .call(store, GET_CHAT_SESSION_HISTORY, args)
        .unwrap()
}

#[test]
fn empty_session_id_is_required() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(temp_dir.path());

    assert_eq!(call(&store, ""), json!({"ok": false, "error": "session_id is required"}));
}

#[test]
fn absent_log_reports_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(temp_dir.path());

    let value = call(&store, "abc");
    assert_eq!(value["ok"], false);
    assert!(value["error"].as_str().unwrap().contains("session log not found"));
    assert!(value["path"].as_str().unwrap().ends_with("chat_session_abc.log"));
}

#[test]
fn absent_workflow_home_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(temp_dir.path().join(".workflow"));

    let value = call(&store, "abc");
    assert_eq!(value["ok"], false);
    assert!(value["error"].as_str().unwrap().starts_with("workflow directory not found: "));
    assert!(value.get("path").is_none());
}

#[test]
fn existing_log_is_returned_whole() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("chat_session_abc.log"), "hello\nworld").unwrap();
    let store = HistoryStore::new(temp_dir.path());

    let value = call(&store, "abc");
    assert_eq!(value["ok"], true);
    assert_eq!(value["length"], 11);
    assert_eq!(value["content"], "hello\nworld");
}

#[test]
fn every_call_rereads_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let log = temp_dir.path().join("chat_session_live.log");
    let store = HistoryStore::new(temp_dir.path());

    fs::write(&log, "one").unwrap();
    assert_eq!(call(&store, "live")["content"], "one");

    fs::write(&log, "one\ntwo").unwrap();
    assert_eq!(call(&store, "live")["content"], "one\ntwo");

    fs::remove_file(&log).unwrap();
    assert_eq!(call(&store, "live")["ok"], false);
}

#[test]
fn malformed_bytes_do_not_fail() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("chat_session_raw.log"), [0x68, 0x69, 0xc3, 0x28, 0x0a]).unwrap();
    let store = HistoryStore::new(temp_dir.path());

    let value = call(&store, "raw");
    assert_eq!(value["ok"], true);
    let content = value["content"].as_str().unwrap();
    assert!(content.starts_with("hi"));
    assert!(content.contains('\u{FFFD}'));
    assert_eq!(value["length"], content.chars().count());
}

#[test]
fn traversal_attempt_stays_in_base() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path().join("wf");
    fs::create_dir(&base).unwrap();
    fs::write(temp_dir.path().join("secret.log"), "secret").unwrap();
    let store = HistoryStore::new(&base);

    let value = call(&store, "../secret");
    assert_eq!(value["ok"], false);
    let path = value["path"].as_str().unwrap();
    assert!(path.ends_with("chat_session____secret.log"));

    for raw in ["../../etc/passwd", "..\\..\\x", "/", ".."] {
        let path = session_log_path(&base, raw);
        assert_eq!(path.parent(), Some(base.as_path()));
        let clean = sanitize(raw);
        assert!(!clean.contains('/') && !clean.contains('\\') && !clean.contains(".."));
    }
}

#[test]
fn port_resolution_from_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.json");

    assert_eq!(resolve_port(&load_config(&path)), DEFAULT_PORT);

    fs::write(&path, r#"{"mcp_port": 9999}"#).unwrap();
    assert_eq!(resolve_port(&load_config(&path)), 9999);

    fs::write(&path, r#"{"name": "x"}"#).unwrap();
    assert_eq!(resolve_port(&load_config(&path)), 8012);
}
