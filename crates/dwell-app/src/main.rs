//! Dwell application binary - composition root.
//!
//! 1. Load configuration from TOML and apply CLI/env overrides
//! 2. Open the SQLite listing store
//! 3. Build the chat-completions agent and the search service
//! 4. Run the interactive terminal session

mod cli;
mod repl;

use std::sync::Arc;

use clap::Parser;

use dwell_chat::{Collaborators, SearchService};
use dwell_core::{logging, DwellConfig};
use dwell_llm::{ChatClient, LlmAgent};
use dwell_storage::{Database, SqliteExecutor};

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = DwellConfig::load_or_default(&config_file);
    cli::apply_env_overrides(&mut config);

    logging::init(&args.resolve_log_level(&config));
    tracing::info!("Starting dwell v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let db_path = cli::expand_home(&config.storage.database_path);
    let db = match Database::new(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "Failed to open listing database");
            return Err(e.into());
        }
    };

    // Collaborators.
    if config.llm.api_key.is_empty() {
        tracing::warn!(
            "No API key configured; set {} or llm.api_key",
            cli::API_KEY_ENV
        );
    }
    let client = ChatClient::new(&config.llm)?;
    tracing::info!(url = %client.url(), model = %client.model(), "Chat model configured");
    let agent = Arc::new(LlmAgent::new(client, config.guard.default_limit));

    let collaborators = Collaborators {
        extractor: agent.clone(),
        synthesizer: agent.clone(),
        fixer: agent.clone(),
        composer: agent,
        executor: Arc::new(SqliteExecutor::new(db)),
    };
    let service = SearchService::new(&config, collaborators);

    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(session_id = %session_id, "Session ready");

    repl::run(&service, &session_id).await?;

    tracing::info!("Goodbye");
    Ok(())
}
