// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use stx_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stx")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Layered template sites with per-page asset bundles", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Quiet mode: only show errors (useful for CI)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new stx project
    Init {
        /// Project name (defaults to current directory name)
        name: Option<String>,
    },
    /// Start development server with live reload
    Dev {
        /// Port to run the dev server on (overrides stx.toml)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides stx.toml)
        #[arg(long)]
        host: Option<String>,
    },
    /// Serve the site without live reload
    Serve {
        /// Port to run the server on (overrides stx.toml)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides stx.toml)
        #[arg(long)]
        host: Option<String>,
    },
    /// Compile the site and list every route with its assets
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Init { name } => {
            commands::init::run(name).await
        }
        Commands::Dev { port, host } => {
            commands::dev::run(host, port, cli.quiet).await
        }
        Commands::Serve { port, host } => {
            commands::serve::run(host, port, cli.quiet).await
        }
        Commands::Routes => {
            commands::routes::run().await
        }
    }
}
