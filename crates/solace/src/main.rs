// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Solace - the server core of a conversational AI companion.
//!
//! This is the binary entry point for the Solace gateway.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Solace - streaming conversational AI gateway.
#[derive(Parser, Debug)]
#[command(name = "solace", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Solace gateway server.
    Serve,
    /// Print the effective configuration after all merge layers.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = match solace_config::load_config() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: failed to load configuration: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Config => match solace_config::load_config() {
            Ok(config) => match render_config(&config) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("error: failed to load configuration: {e}");
                std::process::exit(1);
            }
        },
    }
}

/// Renders the effective config as pretty JSON. Secrets are included;
/// the command is for local diagnostics only.
fn render_config(config: &solace_config::SolaceConfig) -> Result<String, String> {
    serde_json::to_string_pretty(config).map_err(|e| e.to_string())
}
