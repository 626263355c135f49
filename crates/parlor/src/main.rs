// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlor - a conversational retrieval backend for a portfolio site.
//!
//! This is the binary entry point for the parlor server.

use clap::{Parser, Subcommand};

mod serve;

/// Parlor - conversational retrieval backend.
#[derive(Parser, Debug)]
#[command(name = "parlor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the parlor gateway server.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parlor_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("parlor: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("parlor serve: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("parlor: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = parlor_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.agent.name, "parlor");
    }
}
