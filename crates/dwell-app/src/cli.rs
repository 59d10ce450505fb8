//! CLI argument definitions for the dwell binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use dwell_core::DwellConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "DWELL_CONFIG";
/// Environment variable overriding `llm.api_key`.
pub const API_KEY_ENV: &str = "DWELL_LLM_API_KEY";

/// Dwell - a conversational apartment search assistant.
#[derive(Parser, Debug)]
#[command(name = "dwell", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Session id to use (a new one is generated when omitted).
    #[arg(short = 's', long = "session")]
    pub session: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Priority: --config flag > DWELL_CONFIG env var > ~/.dwell/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        default_config_path()
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config: &DwellConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone())
    }
}

/// Apply environment overrides that take precedence over the config file.
pub fn apply_env_overrides(config: &mut DwellConfig) {
    apply_api_key(config, std::env::var(API_KEY_ENV).ok());
}

fn apply_api_key(config: &mut DwellConfig, key: Option<String>) {
    if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
        config.llm.api_key = key;
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".dwell").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
