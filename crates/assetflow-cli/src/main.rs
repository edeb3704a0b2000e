// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use assetflow_cli::commands;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assetflow")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Build, compress and watch static site assets", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Quiet mode: only show errors (useful for CI)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean code outputs, rebuild everything, cache-bust, then watch (default)
    Build,
    /// Compress icons and images only
    Img,
    /// Delete every output directory and rebuild once
    Clean,
    /// Rebuild styles and scripts, cache-bust, then watch
    Watch,
    /// Create the starter directory tree for a new project
    Init {
        /// Project name (defaults to current directory name)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => commands::build::run(cli.quiet).await,
        Commands::Img => commands::img::run(cli.quiet).await,
        Commands::Clean => commands::clean::run(cli.quiet).await,
        Commands::Watch => commands::watch::run(cli.quiet).await,
        Commands::Init { name } => commands::init::run(name).await,
    }
}
