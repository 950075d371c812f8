//! Grocer application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize tracing
//! 3. Load the product catalog (fatal on malformed data)
//! 4. Pick the query oracle (rules or LLM)
//! 5. Serve the HTTP API, or chat on the terminal with `--repl`

mod cli;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grocer_api::AppState;
use grocer_catalog::CatalogStore;
use grocer_chat::{LlmOracle, QueryOracle, RuleOracle};
use grocer_core::config::{GrocerConfig, OracleConfig, OracleProvider};

use crate::cli::CliArgs;

fn select_oracle(config: &OracleConfig, catalog: &CatalogStore) -> Arc<dyn QueryOracle> {
    match config.provider {
        OracleProvider::Rules => Arc::new(RuleOracle::from_catalog(catalog)),
        OracleProvider::Llm => {
            let oracle = LlmOracle::from_config(config);
            if !oracle.is_configured() {
                tracing::warn!(
                    env = %config.api_key_env,
                    "LLM API key not set; every turn will fall back to inherited filters"
                );
            }
            tracing::info!(
                endpoint = %oracle.endpoint(),
                model = %config.model,
                "LLM oracle configured"
            );
            Arc::new(oracle)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = GrocerConfig::load_or_default(&config_file);
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    if args.write_config {
        config.save(&config_file)?;
        tracing::info!(path = %config_file.display(), "Configuration written");
        return Ok(());
    }

    tracing::info!("Starting Grocer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        found = config_file.exists(),
        oracle = ?config.oracle.provider,
        "Configuration resolved"
    );

    // Catalog.
    let catalog_dir = PathBuf::from(&config.general.catalog_dir);
    let catalog = match CatalogStore::load_dir(&catalog_dir) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(dir = %catalog_dir.display(), error = %e, "Catalog load failed");
            return Err(e.into());
        }
    };
    tracing::info!(
        dir = %catalog_dir.display(),
        products = catalog.len(),
        vendors = catalog.vendors().len(),
        "Catalog loaded"
    );

    let oracle = select_oracle(&config.oracle, &catalog);
    let state = AppState::from_config(&config, catalog, oracle);

    if args.repl {
        let orchestrator = Arc::clone(&state.orchestrator);
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            repl::run(&orchestrator, stdin.lock(), std::io::stdout())
        })
        .await??;
        return Ok(());
    }

    let port = config.general.port;
    if let Err(e) = grocer_api::start_server(port, state).await {
        tracing::error!(port, error = %e, "API server stopped");
        tracing::error!("Try: GROCER_PORT={} grocer", port.saturating_add(1));
        return Err(e.into());
    }

    Ok(())
}
