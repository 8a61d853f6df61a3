//! CLI argument parsing and command definitions.

use clap::{Args, Parser, Subcommand};

use gigo_retrieval::RetrievalConfig;

// ============================================================================
// CLI argument types
// ============================================================================

/// Retrieve evidence (ranked pages, tables and figures) from technical manuals.
#[derive(Parser, Debug)]
#[command(name = "gigo", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "GIGO_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieve ranked candidates for a query.
    Search(QueryArgs),

    /// Retrieve candidates and resolve their table and figure references.
    References(ReferencesArgs),

    /// Answer a question from retrieved evidence.
    Ask(AskArgs),

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Per-invocation overrides of the `[retrieval]` config section.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct RetrievalOverrides {
    /// Strategy: hybrid, token_only, multi_resolution or weighted_fusion.
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Collection to search.
    #[arg(long)]
    pub collection: Option<String>,

    /// Maximum results.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Prefetch width before reranking.
    #[arg(long)]
    pub prefetch_limit: Option<usize>,

    /// Minimum reranked score.
    #[arg(long, conflicts_with = "no_threshold")]
    pub threshold: Option<f32>,

    /// Disable the score threshold.
    #[arg(long)]
    pub no_threshold: bool,
}

impl RetrievalOverrides {
    /// Apply these overrides on top of `config`.
    pub fn apply(&self, config: &RetrievalConfig) -> RetrievalConfig {
        let mut merged = config.clone();
        if let Some(strategy) = &self.strategy {
            merged.strategy = strategy.clone();
        }
        if let Some(collection) = &self.collection {
            merged.collection_name = collection.clone();
        }
        if let Some(limit) = self.limit {
            merged.limit = limit;
        }
        if let Some(prefetch_limit) = self.prefetch_limit {
            merged.prefetch_limit = prefetch_limit;
        }
        if self.no_threshold {
            merged.score_threshold = None;
        } else if let Some(threshold) = self.threshold {
            merged.score_threshold = Some(threshold);
        }
        merged
    }
}

/// Arguments for `gigo search`.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text.
    pub query: String,

    /// Retrieval overrides.
    #[command(flatten)]
    pub retrieval: RetrievalOverrides,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `gigo references`.
#[derive(Args, Debug)]
pub struct ReferencesArgs {
    /// Query and retrieval options.
    #[command(flatten)]
    pub query: QueryArgs,

    /// Scratch directory with rendered tables and images.
    #[arg(long)]
    pub scratch_path: Option<String>,
}

/// Arguments for `gigo ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question and retrieval options.
    #[command(flatten)]
    pub query: QueryArgs,

    /// Scratch directory with rendered tables and images.
    #[arg(long)]
    pub scratch_path: Option<String>,

    /// Retrieve the question as-is instead of decomposing it.
    #[arg(long)]
    pub no_decompose: bool,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "retrieval.limit").
        key: String,
    },

    /// Set a configuration value by dotted key.
    Set {
        /// Dotted key (e.g., "retrieval.limit").
        key: String,

        /// Value to set.
        value: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Export configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
