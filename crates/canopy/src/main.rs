// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canopy - SAN certificate provisioning control plane.
//!
//! This is the binary entry point: the `serve` daemon plus one-shot operator
//! commands against the same database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod cert_info;
mod runtime;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use canopy_config::CanopyConfig;
use canopy_core::CanopyError;

/// Canopy - SAN certificate provisioning control plane.
#[derive(Parser, Debug)]
#[command(name = "canopy", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the background job scheduler until interrupted.
    Serve,
    /// Run one background job cycle and print its outcome.
    PostJob {
        /// Job type, e.g. `akamai_check_and_update_cert_status`.
        job_type: String,
        /// JSON object of job arguments.
        #[arg(long, default_value = "{}")]
        kwargs: String,
    },
    /// Inspect or replace the queue as san-retry entries.
    SanRetry {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Inspect or replace the queue as full mapping requests.
    SanMapping {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Inspect or edit stored SAN certificate info.
    CertInfo {
        #[command(subcommand)]
        action: CertInfoAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ListAction {
    /// Print the current list.
    Get,
    /// Replace the list with the JSON array in FILE (`-` for stdin).
    Put { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub(crate) enum CertInfoAction {
    /// Print the record of one certificate.
    Show { hostname: String },
    /// List certificate hostnames.
    List,
    /// Replace the whole info table with the JSON object in FILE.
    Seed { file: PathBuf },
    /// Allow new domains on a certificate.
    Enable { hostname: String },
    /// Stop assigning new domains to a certificate.
    Disable { hostname: String },
    /// Print the hostname limit per certificate.
    GetLimit,
    /// Set the hostname limit per certificate.
    SetLimit { limit: u32 },
}

fn load_config(path: Option<&PathBuf>) -> Result<CanopyConfig, Vec<canopy_config::ConfigError>> {
    match path {
        Some(path) => canopy_config::load_and_validate_path(path),
        None => canopy_config::load_and_validate(),
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), CanopyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a JSON document from `path`, or stdin for `-`.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, CanopyError> {
    use std::io::Read;

    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|e| CanopyError::validation(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CanopyError::validation(format!("{} is not valid JSON: {e}", path.display())))
}

/// Exit status for a failed command: 2 for rejected input, 1 otherwise.
fn exit_code_for(err: &CanopyError) -> u8 {
    if err.is_client_error() { 2 } else { 1 }
}

fn report(err: &CanopyError) {
    match err {
        CanopyError::ValidationFailed { errors } => {
            eprintln!("error: validation failed");
            for message in errors {
                eprintln!("  - {message}");
            }
        }
        other => eprintln!("error: {other}"),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("canopy={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Commands, config: CanopyConfig) -> Result<(), CanopyError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::PostJob { job_type, kwargs } => admin::post_job(&config, &job_type, &kwargs).await,
        Commands::SanRetry { action } => admin::san_retry(&config, action).await,
        Commands::SanMapping { action } => admin::san_mapping(&config, action).await,
        Commands::CertInfo { action } => cert_info::run(&config, action).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            canopy_config::render_errors(&errors);
            return ExitCode::from(1);
        }
    };

    let Some(command) = cli.command else {
        println!("canopy: use --help for available commands");
        return ExitCode::SUCCESS;
    };

    init_tracing(&config.daemon.log_level);

    match dispatch(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}
