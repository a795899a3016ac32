// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recado - asynchronous follow-up messaging for the services marketplace.
//!
//! This is the binary entry point for the Recado service.

mod collaborators;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recado_engine::FollowUpRule;

/// Recado - asynchronous follow-up messaging for the services marketplace.
#[derive(Parser, Debug)]
#[command(name = "recado", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults to the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the workers and the webhook server.
    Serve,
    /// Validate the configuration and exit.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => recado_config::load_config_from_path(path),
        None => recado_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("recado: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("recado: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            if let Err(e) = check_config(&config) {
                eprintln!("recado: {e}");
                std::process::exit(1);
            }
            println!("recado: configuration ok");
        }
    }
}

/// Validate the parts of the configuration that would otherwise only fail
/// at serve time.
fn check_config(config: &recado_config::RecadoConfig) -> Result<(), recado_core::RecadoError> {
    for rule in &config.followup.rules {
        FollowUpRule::from_config(rule)?;
    }
    recado_whatsapp::TwilioWhatsAppGateway::new(&config.whatsapp)?;
    if config.webhook.signature_secret.is_none() {
        eprintln!("recado: warning: webhook.signature_secret is not set (non-production mode)");
    }
    Ok(())
}
