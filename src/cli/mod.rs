//! CLI module for Lumi
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `ask` - Answer one question against a knowledge-base file
//! - `kb backfill` - Compute missing FAQ embeddings
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Ask in French, printing JSON
//! lumi ask --tenant acme --kb kb.json --lang fr --json "Êtes-vous ouverts le dimanche ?"
//!
//! # Embed entries added since the last run
//! lumi kb backfill --kb kb.json
//!
//! # Generate shell completions
//! lumi completions bash > ~/.bash_completion.d/lumi
//! ```

pub mod ask;
pub mod completions;
pub mod config;
pub mod kb;
pub mod output;

pub use ask::handle_ask;
pub use completions::handle_completions;
pub use config::handle_config_init;
pub use kb::handle_kb_backfill;

use crate::config::{ConfigError, LumiConfig};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Lumi - FAQ-grounded customer support answers
#[derive(Parser, Debug)]
#[command(
    name = "lumi",
    version,
    about = "Multi-tenant FAQ answering with retrieval-augmented generation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question for a tenant
    Ask(AskArgs),
    /// Knowledge-base maintenance
    #[command(subcommand)]
    Kb(KbCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The end-user question
    pub question: String,

    /// Tenant whose knowledge base is searched
    #[arg(short, long)]
    pub tenant: String,

    /// Knowledge-base JSON file
    #[arg(short, long, default_value = "kb.json")]
    pub kb: PathBuf,

    /// Answer language (e.g. en, fr)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Correlation id recorded with usage and the trace cache
    #[arg(long)]
    pub trace_id: Option<String>,

    /// Override the chat model
    #[arg(short, long, env = "LUMI_MODEL")]
    pub model: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, env = "LUMI_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "lumi.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum KbCommands {
    /// Embed FAQ entries that have no embedding yet
    Backfill(KbBackfillArgs),
}

#[derive(Args, Debug)]
pub struct KbBackfillArgs {
    /// Knowledge-base JSON file, updated in place
    #[arg(short, long, default_value = "kb.json")]
    pub kb: PathBuf,

    /// Only backfill this tenant
    #[arg(short, long)]
    pub tenant: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "lumi.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "lumi.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load the config file if present, then apply `LUMI_*` overrides.
///
/// A missing file yields the defaults so commands work without `config init`.
pub fn load_config(path: &Path) -> Result<LumiConfig, ConfigError> {
    let config = match LumiConfig::load(Some(path)) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) => LumiConfig::default(),
        Err(e) => return Err(e),
    };
    Ok(config.with_env_overrides())
}
