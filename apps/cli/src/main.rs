//! mediarip CLI - download tracks from streaming backends
//!
//! Logs in to a backend, resolves a track and writes it to disk,
//! decrypting on the fly where the backend requires it.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mediarip_types::{MediaType, Source};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// mediarip - Streaming backend downloader
#[derive(Parser)]
#[command(name = "mediarip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file
    #[arg(long, env = "MEDIARIP_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more tracks
    Download {
        /// Backend (deezer, soundcloud)
        source: Source,

        /// Track ids on the backend
        #[arg(required = true)]
        ids: Vec<String>,

        /// Quality tier (defaults to the configured one)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Destination folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search a backend catalogue
    Search {
        /// Backend (deezer, soundcloud)
        source: Source,

        /// Item type (track, album, playlist, artist)
        media_type: MediaType,

        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = mediarip_core::client::DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "human")]
        output: OutputFormat,
    },

    /// Show/create settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all settings
    Show,

    /// Print the settings file path
    Path,

    /// Write a default settings file
    Init,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(|| {
        dirs::config_dir()
            .map(|d| d.join("mediarip"))
            .unwrap_or_else(|| PathBuf::from(".mediarip"))
            .join("config.json")
    });
    let store = mediarip_core::SettingsStore::new(config_path);

    match cli.command {
        Commands::Download {
            source,
            ids,
            quality,
            output,
        } => commands::download(&store, source, &ids, quality, output).await?,

        Commands::Search {
            source,
            media_type,
            query,
            limit,
            output,
        } => commands::search(&store, source, media_type, &query, limit, output).await?,

        Commands::Config { action } => commands::config_action(&store, action).await?,

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "mediarip", &mut std::io::stdout());
        }
    }

    Ok(())
}
