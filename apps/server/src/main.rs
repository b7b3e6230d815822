//! [apps/server/src/main.rs]
//! CLI entry point: loads configuration, initializes tracing, and either
//! runs the server or applies the relational schema and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use warden_server::prelude::*;

#[derive(Parser)]
#[command(name = "warden", about = "Warden telemetry server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "./warden.toml")]
    config: PathBuf,

    /// Raise the default log level by one notch.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server until a shutdown signal is received. The default
    /// when no subcommand is given.
    Serve,
    /// Apply the relational schema against the configured database and exit.
    Migrate,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.verbose && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warden_server=trace,warden_infra_store=debug");
    }
    warden_shared_telemetry::init_tracing("warden_server");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start tokio runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        match cli.command.unwrap_or(Command::Serve) {
            Command::Serve => run_serve(cli.config).await,
            Command::Migrate => run_migrate(cli.config).await,
        }
    })
}

async fn run_serve(config_path: PathBuf) -> ExitCode {
    let config = match WardenConfig::load(&config_path) {
        Ok(config) => config,
        Err(error) => {
            error!(event = "config_load_failed", path = %config_path.display(), error = %error, "cannot start without a valid configuration");
            return ExitCode::FAILURE;
        }
    };

    let kernel = match ServerKernel::build(config).await {
        Ok(kernel) => kernel,
        Err(error) => {
            error!(event = "kernel_build_failed", error = %error, "failed to construct server components");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = kernel.run().await {
        error!(event = "kernel_run_failed", error = %error, "server terminated with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run_migrate(config_path: PathBuf) -> ExitCode {
    let config = match WardenConfig::load(&config_path) {
        Ok(config) => config,
        Err(error) => {
            error!(event = "config_load_failed", path = %config_path.display(), error = %error, "cannot migrate without a valid configuration");
            return ExitCode::FAILURE;
        }
    };

    match warden_infra_store::StoreClient::connect(&config.database.url, config.database.auth_token.clone()).await {
        Ok(_) => {
            tracing::info!(event = "migrate_complete", "relational schema applied");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(event = "migrate_failed", error = %error, "schema application failed");
            ExitCode::FAILURE
        }
    }
}
