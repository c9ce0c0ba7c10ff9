use std::process::ExitCode;
use clap::Parser;
use workflow_history_mcp::client::{BASE_URL_ENV, ChatHistoryClient, DEFAULT_BASE_URL};

/// Developer client for the `/chat-history` HTTP service.
#[derive(Debug, Parser)]
#[command(name = "chat-history", version)]
struct Cli {
    /// List every session id the service knows about
    #[arg(short, long, conflicts_with = "session_id")]
    list: bool,

    /// Session id to fetch
    #[arg(required_unless_present = "list", allow_negative_numbers = true)]
    session_id: Option<i64>,

    /// Base URL of the chat history service
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let client = match ChatHistoryClient::new(&cli.base_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.session_id {
        Some(session_id) if !cli.list => client
            .get_chat_history(session_id)
            .await
            .map_err(|e| format!("Error calling get_chat_history({}): {}", session_id, e)),
        _ => client
            .list_session_ids()
            .await
            .map_err(|e| format!("Error listing session IDs: {}", e)),
    };

    match result.and_then(|value| serde_json::to_string_pretty(&value).map_err(|e| e.to_string())) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
