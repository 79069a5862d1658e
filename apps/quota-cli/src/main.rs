//! # Quota CLI
//!
//! Command-line host for the per-category rate window.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use quota_shared::ErrorResponse;

mod cli;
mod commands;
mod config;
mod state;
mod telemetry;

use cli::Cli;
use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let json = cli.global.json;
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            if json {
                let error = ErrorResponse::internal_error(format!("{e:#}"));
                match serde_json::to_string_pretty(&error) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("error: {e:#}"),
                }
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    config
        .apply_overrides(&cli.global)
        .context("invalid command-line override")?;

    let bypass = cli.global.privileged || config.is_privileged(cli.global.user.as_deref());
    if bypass {
        tracing::info!(user = ?cli.global.user, "Privileged account, rate window bypassed");
    }

    let state = AppState::new(&config, cli.global.json, bypass)?;
    commands::run(&state, cli.command)
}
