// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Glimpse - an Instagram story relay bot for Telegram.
//!
//! This is the binary entry point for the Glimpse service.

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// Glimpse - an Instagram story relay bot for Telegram.
#[derive(Parser, Debug)]
#[command(name = "glimpse", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay service: poll loop plus Telegram bot.
    Serve,
    /// Print the resolved configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match glimpse_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            glimpse_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("glimpse: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&redact(config)) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("glimpse: cannot render config: {e}");
                std::process::exit(1);
            }
        },
    }
}

/// Masks credentials so `glimpse config` output is safe to share.
fn redact(mut config: glimpse_config::GlimpseConfig) -> glimpse_config::GlimpseConfig {
    let mask = |v: &mut Option<String>| {
        if v.is_some() {
            *v = Some("<redacted>".into());
        }
    };
    mask(&mut config.instagram.password);
    mask(&mut config.telegram.bot_token);
    mask(&mut config.telegram.password);
    config
}
