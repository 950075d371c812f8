//! CLI argument definitions for the grocer binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use grocer_core::config::GrocerConfig;

/// Grocer: a conversational grocery shopping assistant.
#[derive(Parser, Debug)]
#[command(name = "grocer", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory of product catalog JSON files.
    #[arg(short = 'd', long = "catalog-dir")]
    pub catalog_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Chat on the terminal instead of serving HTTP.
    #[arg(long = "repl")]
    pub repl: bool,

    /// Write the resolved configuration to the config path and exit.
    #[arg(long = "write-config")]
    pub write_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > GROCER_CONFIG env var > ./grocer.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(std::env::var("GROCER_CONFIG").ok())
    }

    fn resolve_config_path_with(&self, env: Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env {
            return PathBuf::from(p);
        }
        PathBuf::from("grocer.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > GROCER_PORT env var > config file value > 5000.
    fn resolve_port_with(&self, env: Option<String>, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Some(p) = env.and_then(|v| v.parse::<u16>().ok()) {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        5000
    }

    /// Resolve the catalog directory.
    ///
    /// Priority: --catalog-dir flag > config file value.
    pub fn resolve_catalog_dir(&self, config_dir: &str) -> PathBuf {
        self.catalog_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_dir))
    }

    /// Fold flag and env overrides into the loaded config.
    pub fn apply(&self, config: &mut GrocerConfig) {
        self.apply_with(std::env::var("GROCER_PORT").ok(), config);
    }

    fn apply_with(&self, port_env: Option<String>, config: &mut GrocerConfig) {
        let general = &mut config.general;
        general.port = self.resolve_port_with(port_env, general.port);
        general.catalog_dir = self
            .resolve_catalog_dir(&general.catalog_dir)
            .to_string_lossy()
            .to_string();
        general.log_level = self.resolve_log_level(&general.log_level);
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}
