//! Binary entry point for rekindle.
//!
//! This binary provides the CLI interface for the rekindle discovery engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow option_if_let_else for environment variable fallback chains
#![allow(clippy::option_if_let_else)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::FilterArgs;
use rekindle::RekindleConfig;
use rekindle::observability::{self, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Rekindle - rediscover forgotten bookmarks, a few at a time.
#[derive(Parser)]
#[command(name = "rekindle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bookmark collection file (overrides config).
    #[arg(long, global = true)]
    collection: Option<PathBuf>,

    /// Directory for the shown history (overrides config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show a random batch of bookmarks not seen in this cycle.
    Shuffle {
        /// Number of bookmarks to show.
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Show the batch without recording it as seen.
        #[arg(long)]
        no_commit: bool,
    },

    /// Show how much of the collection has been seen.
    Progress {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Clear the shown history and start over.
    Reset,

    /// Drop a deleted or merged bookmark from the shown history.
    Forget {
        /// URL of the bookmark.
        url: String,
    },

    /// Find duplicate bookmarks.
    Duplicates {
        /// Title similarity threshold in (0, 1].
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print clusters as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration.
    Config {
        /// Print as TOML.
        #[arg(long)]
        toml: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => apply_cli_overrides(config, &cli),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let result = run_command(cli, config).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: RekindleConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Shuffle {
            count,
            filters,
            no_commit,
        } => commands::cmd_shuffle(&config, count, &filters, no_commit),

        Commands::Progress { filters } => commands::cmd_progress(&config, &filters),

        Commands::Reset => commands::cmd_reset(&config),

        Commands::Forget { url } => commands::cmd_forget(&config, &url),

        Commands::Duplicates { threshold, json } => {
            commands::cmd_duplicates(&config, threshold, json).await
        },

        Commands::Config { toml } => commands::cmd_config(&config, toml),
    }
}

/// Loads configuration.
///
/// Explicit path first, then `REKINDLE_CONFIG_PATH`, then the platform
/// default location. Environment overrides apply to all three.
fn load_config(path: Option<&std::path::Path>) -> Result<RekindleConfig, Box<dyn std::error::Error>> {
    let config = if let Some(config_path) = path {
        RekindleConfig::load_from_file(config_path)?
    } else if let Ok(env_path) = std::env::var("REKINDLE_CONFIG_PATH") {
        RekindleConfig::load_from_file(std::path::Path::new(&env_path))?
    } else {
        RekindleConfig::load_default()
    };

    Ok(config.with_env_overrides())
}

fn apply_cli_overrides(mut config: RekindleConfig, cli: &Cli) -> RekindleConfig {
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(collection) = &cli.collection {
        config = config.with_collection_path(collection);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_shuffle() {
        let cli = Cli::try_parse_from([
            "rekindle",
            "--data-dir",
            "/tmp/rk",
            "shuffle",
            "-n",
            "3",
            "--category",
            "Rust",
            "--min-rating",
            "4",
            "--no-commit",
        ])
        .unwrap();

        let config = apply_cli_overrides(RekindleConfig::new(), &cli);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/rk"));

        match cli.command {
            Commands::Shuffle {
                count,
                filters,
                no_commit,
            } => {
                assert_eq!(count, Some(3));
                assert_eq!(filters.category.as_deref(), Some("Rust"));
                assert_eq!(filters.min_rating, Some(4));
                assert!(no_commit);
            },
            _ => unreachable!("expected shuffle"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_rating() {
        assert!(Cli::try_parse_from(["rekindle", "progress", "--min-rating", "9"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rekindle",
            "duplicates",
            "--threshold",
            "0.8",
            "--collection",
            "/tmp/autosave.json",
        ])
        .unwrap();
        let config = apply_cli_overrides(RekindleConfig::new(), &cli);
        assert_eq!(config.collection_path(), PathBuf::from("/tmp/autosave.json"));
    }
}
