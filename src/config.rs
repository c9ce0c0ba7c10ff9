use config::{Config as ConfigLoader, File, FileFormat};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_PORT: u16 = 8012;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Checked in order; the first one holding a usable port wins.
pub const PORT_KEYS: [&str; 3] = ["port", "http_port", "mcp_port"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    pub fn from_map(raw: &Map<String, Value>) -> Self {
        Self {
            port: resolve_port(raw),
            log_level: resolve_log_level(raw),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// `config.json` next to the running executable.
pub fn config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("Executable path has no parent: {:?}", exe))?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Reads the JSON object at `path`. A missing file is an empty mapping;
/// malformed content is an error.
pub fn try_load_config(path: &Path) -> Result<Map<String, Value>> {
    let builder = ConfigLoader::builder()
        .add_source(File::from(path).format(FileFormat::Json).required(false))
        .build()?;

    let raw: Map<String, Value> = builder.try_deserialize()?;
    Ok(raw)
}

pub fn load_config(path: &Path) -> Map<String, Value> {
    try_load_config(path).unwrap_or_default()
}

pub fn resolve_port(raw: &Map<String, Value>) -> u16 {
    PORT_KEYS
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(port_from_value)
        .unwrap_or(DEFAULT_PORT)
}

pub fn resolve_log_level(raw: &Map<String, Value>) -> String {
    raw.get("log_level")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

fn port_from_value(value: &Value) -> Option<u16> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64().filter(|f| f.is_finite())?;
                f.trunc() as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u16::try_from(n).ok()
}
