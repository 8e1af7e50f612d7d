//! formc - OpenSASE forms compiler CLI
//!
//! Operator tooling over the schema compiler: check form definitions,
//! validate submissions offline, preview visibility and benchmark.
//!
//! # Usage
//!
//! ```bash
//! formc check form.json
//! formc validate form.json submission.json --visible-only
//! formc visibility form.yaml values.json --format json
//! formc bench form.json --iterations 500
//! formc stats form.json other.yaml --format yaml
//! formc config set cache_capacity 100
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "formc")]
#[command(author = "OpenSASE")]
#[command(version)]
#[command(about = "OpenSASE forms schema compiler", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, short, global = true)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Override the compilation cache capacity
    #[arg(long, env = "FORMC_CACHE_CAPACITY", global = true)]
    cache_capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check form metadata for structural problems
    Check { metadata: PathBuf },
    /// Print the content hash used as cache key
    Hash { metadata: PathBuf },
    /// Validate a submission against form metadata
    Validate {
        metadata: PathBuf,
        data: PathBuf,
        /// Skip fields hidden by their conditions
        #[arg(long)]
        visible_only: bool,
    },
    /// Compute field visibility for a set of values keyed by field id
    Visibility { metadata: PathBuf, values: PathBuf },
    /// Benchmark compilation and validation
    Bench {
        metadata: PathBuf,
        #[arg(long, short)]
        iterations: Option<usize>,
    },
    /// Compile one or more files and print cache and timing statistics
    Stats {
        #[arg(required = true)]
        metadata: Vec<PathBuf>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Show effective configuration
    Show,
    /// Initialize configuration
    Init,
}

fn main() {
    // Logs go to stderr so json/yaml output stays machine readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match config::Config::load(cli.profile.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config not readable, using defaults");
            config::Config::default()
        }
    };
    let format = cli.format.unwrap_or_else(|| config.output_format());
    let mut compiler_config = config.compiler.clone();
    if let Some(capacity) = cli.cache_capacity {
        compiler_config.cache_capacity = capacity;
    }

    let result = match cli.command {
        Commands::Check { metadata } => commands::schema::check(&metadata, format),
        Commands::Hash { metadata } => commands::schema::hash(&metadata),
        Commands::Bench { metadata, iterations } => {
            commands::schema::bench(&metadata, iterations, compiler_config, format)
        }
        Commands::Stats { metadata } => commands::schema::stats(&metadata, compiler_config, format),
        Commands::Validate { metadata, data, visible_only } => {
            commands::submission::validate(&metadata, &data, visible_only, compiler_config, format)
        }
        Commands::Visibility { metadata, values } => {
            commands::submission::visibility(&metadata, &values, format)
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
