use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use std::path::PathBuf;
use home::home_dir;
use anyhow::Result;

pub const LOG_FILE_NAME: &str = "workflow-history-mcp.log";
pub const LOG_ENV: &str = "RUST_LOG";

/// `RUST_LOG`, when set and parseable, wins over the configured level.
pub fn log_filter(log_level: &str, env_override: Option<&str>) -> EnvFilter {
    env_override
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(log_level))
}

pub fn init_logging(log_level: &str) -> Result<WorkerGuard> {
    let log_dir = get_log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let env_override = std::env::var(LOG_ENV).ok();
    let filter = || log_filter(log_level, env_override.as_deref());

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(filter());

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(dir = %log_dir.display(), "File logging enabled");
    Ok(guard)
}

/// Kept out of `~/.workflow`, which this server only ever reads.
pub fn get_log_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".var").join("app").join("workflow-history-mcp").join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_override() {
        assert_eq!(log_filter("warn", None).to_string(), "warn");
        assert_eq!(log_filter("warn", Some("  ")).to_string(), "warn");
    }

    #[test]
    fn env_override_wins() {
        assert_eq!(log_filter("info", Some("debug")).to_string(), "debug");
    }

    #[test]
    fn unparseable_override_falls_back() {
        assert_eq!(log_filter("info", Some("server=loudest")).to_string(), "info");
    }

    #[test]
    fn log_dir_is_outside_workflow_home() {
        let dir = get_log_dir().unwrap();
        assert!(dir.ends_with("workflow-history-mcp/logs"));
        if let Some(workflow) = crate::session::workflow_home() {
            assert!(!dir.starts_with(workflow));
        }
    }
}
