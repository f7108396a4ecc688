//! study-tracker: infers study sessions from document access times.
//!
//! ## Subcommands
//!
//! - `track`: run the tracker with an interactive menu on stdin
//! - `report`: print aggregated study time from the configured log
//! - `user`: register, log in, or change a user's theme
//! - `config show`: print the effective configuration

mod logging;
mod report;
mod signal;
mod sinks;
mod track;
mod user;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use study_core::{StorageBackend, StoragePaths};

#[derive(Parser)]
#[command(name = "study-tracker")]
#[command(about = "Tracks study time from document access times")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.study-tracker/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options selecting where study logs are read from or written to.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Attribute logs to this registered user (SQLite backend only)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Override the configured storage backend (sqlite or csv)
    #[arg(long, value_parser = sinks::parse_backend)]
    pub backend: Option<StorageBackend>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the courseware directory and log study sessions
    Track {
        /// Directory to watch instead of the configured root
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Ignore stdin and run until interrupted
        #[arg(long)]
        headless: bool,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Summarize logged study time
    Report {
        /// Grouping for the summary
        #[arg(long, value_enum, default_value_t = report::GroupBy::Subject)]
        by: report::GroupBy,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: user::UserAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init(&StoragePaths::default().logs_dir());

    let result = match cli.command {
        Commands::Track {
            root,
            headless,
            storage,
        } => track::run(track::TrackOptions {
            config: cli.config,
            root,
            headless,
            storage,
        }),
        Commands::Report { by, json, storage } => report::run(cli.config, &storage, by, json),
        Commands::User { action } => user::run(cli.config, action),
        Commands::Config {
            action: ConfigAction::Show,
        } => sinks::show_config(cli.config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "study-tracker failed");
        std::process::exit(1);
    }
}
