// Ethernet Bundle - Main Entry Point
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Ethernet Bundle
//!
//! Ethernet interface configuration agent for embedded Linux hosts.
//!
//! Requests arrive as JSON lines on stdin; responses and change events are
//! written as JSON lines to stdout. Logs go to stderr.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod bus;
mod handlers;
mod models;
mod network_utils;
mod reconciler;
mod storage;

use bus::ChannelNotifier;
use models::AppConfig;
use network_utils::SystemAdapter;
use reconciler::Reconciler;

/// Human-readable application name.
pub const APP_NAME: &str = "Ethernet Bundle";

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Print version information and exit.
fn print_version() {
    println!("{} {}", APP_NAME, VERSION);
    println!("Copyright (C) 2026 Christos A. Daggas");
    println!("License: MIT");
}

/// Print help information and exit.
fn print_help() {
    println!(
        "Usage: {} [OPTIONS]",
        env::args().next().unwrap_or_else(|| "ethernet-bundle".to_string())
    );
    println!();
    println!("Ethernet interface configuration agent (JSON lines over stdio).");
    println!();
    println!("Options:");
    println!("  -h, --help             Show this help message and exit");
    println!("  -v, --version          Show version information and exit");
    println!("  -d, --debug            Enable debug logging");
    println!("  -c, --config <PATH>    Read configuration from PATH");
    println!("      --data-dir <DIR>   Directory holding the record store");
    println!();
    println!("Environment variables:");
    println!("  RUST_LOG               Set log level (trace, debug, info, warn, error)");
}

/// Parsed command-line options.
#[derive(Debug, Default)]
struct Options {
    debug: bool,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

/// Parse arguments. `Err` carries the exit code for early termination.
fn parse_args(args: &[String]) -> Result<Options, ExitCode> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Err(ExitCode::SUCCESS);
            }
            "-v" | "--version" => {
                print_version();
                return Err(ExitCode::SUCCESS);
            }
            "-d" | "--debug" => options.debug = true,
            "-c" | "--config" | "--data-dir" => {
                let Some(value) = iter.next() else {
                    eprintln!("Option {} requires a value.", arg);
                    return Err(ExitCode::FAILURE);
                };
                if arg == "--data-dir" {
                    options.data_dir = Some(PathBuf::from(value));
                } else {
                    options.config = Some(PathBuf::from(value));
                }
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Try '--help' for more information.");
                return Err(ExitCode::FAILURE);
            }
        }
    }

    Ok(options)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(code) => return code,
    };

    let mut config = match AppConfig::discover(options.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = options.data_dir {
        config.data_dir = dir;
    }

    // stdout carries the bus, so logs go to stderr
    let level = if options.debug {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::debug!("Configuration: {:?}", config);

    let (tx, rx) = mpsc::unbounded_channel();
    let adapter = SystemAdapter::new(config.dhcp_client.clone());
    let notifier = ChannelNotifier::new(tx.clone());

    let mut reconciler = match Reconciler::bootstrap(&config, adapter, notifier) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let writer = tokio::spawn(bus::write_outbound(rx));
    let served = bus::serve(&mut reconciler, tx).await;

    // Close the last sender so the writer drains and stops.
    drop(reconciler);
    let written = match writer.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
    };

    match served.and(written) {
        Ok(()) => {
            tracing::info!("Input closed, shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Bus failure: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let options = parse_args(&args(&["-d", "--data-dir", "/tmp/eth", "-c", "a.toml"])).unwrap();
        assert!(options.debug);
        assert_eq!(options.data_dir, Some(PathBuf::from("/tmp/eth")));
        assert_eq!(options.config, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_missing_values() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["--config"])).is_err());
    }
}
