// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Tether CLI.
//!
//! The library does the work; this binary is thin glue that exercises it the
//! way an editor extension would: connect to (or spawn) the server for a
//! project directory, list running instances, probe ports, and push prompt
//! text to the bound server.

#![allow(clippy::print_stdout, reason = "CLI tool needs to output to stdout")]
#![allow(clippy::print_stderr, reason = "CLI tool needs to output to stderr")]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tether::cli::{ColorConfig, ColumnWidths, terminal_width, truncate};
use tether::client::{ClientOptions, ServerClient};
use tether::config::Settings;
use tether::connect::ConnectionManager;
use tether::net::probe::{PortProbe, TcpProbe};
use tether::prompt::{DiagnosticContext, format_fix_prompt};
use tether::scan::platform_scanner;

/// Command-line arguments for Tether.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Connect a text editor to the AI-assistant server for the current project")]
#[command(version = env!("TETHER_VERSION"))]
struct Args {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,

    /// Project directory to match servers against (defaults to the current
    /// directory).
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    nocolor: bool,
}

/// Subcommands supported by Tether.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the connection cascade for the project directory (default).
    Connect {
        /// Pin this port as the preferred instance before connecting.
        #[arg(long)]
        pin: Option<u16>,
    },

    /// List running server instances and the directories they serve.
    Scan,

    /// Check whether something listens on a port.
    Probe {
        /// Port to probe.
        port: u16,
    },

    /// Fetch the health report of one instance.
    Health {
        /// Port to query (defaults to the configured port).
        port: Option<u16>,
    },

    /// Connect, then append text to the server's prompt input.
    Prompt {
        /// Text to append.
        text: String,
    },

    /// Format a diagnostic as prompt text (what the editor gutter action
    /// sends), without contacting a server.
    FormatDiagnostic {
        /// File path relative to the project.
        path: String,
        /// Zero-based line number.
        line: u32,
        /// Diagnostic message.
        message: String,
        /// Diagnostic code, e.g. TS2322.
        #[arg(long)]
        code: Option<String>,
    },
}

/// Entry point for the Tether binary.
///
/// # Errors
///
/// Returns an error if the subcommand fails.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tether=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let colors = ColorConfig::new(args.nocolor);
    let settings = Settings::load(args.config.clone())?;
    let workspace = workspace_dir(args.dir.clone())?;

    match args.command {
        None => run_connect(settings, workspace, None, &colors).await,
        Some(Command::Connect { pin }) => run_connect(settings, workspace, pin, &colors).await,
        Some(Command::Scan) => run_scan(&settings, &colors).await,
        Some(Command::Probe { port }) => run_probe(port, &colors).await,
        Some(Command::Health { port }) => run_health(&settings, port).await,
        Some(Command::Prompt { text }) => run_prompt(settings, workspace, &text).await,
        Some(Command::FormatDiagnostic {
            path,
            line,
            message,
            code,
        }) => {
            let diagnostic = DiagnosticContext {
                path,
                line,
                code,
                message,
            };
            println!("{}", format_fix_prompt(&diagnostic));
            Ok(())
        }
    }
}

/// Resolves the project directory to an absolute path.
fn workspace_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))
}

/// Runs the connection cascade and reports the outcome.
async fn run_connect(
    settings: Settings,
    workspace: PathBuf,
    pin: Option<u16>,
    colors: &ColorConfig,
) -> Result<()> {
    let mut manager = ConnectionManager::new(settings, workspace);

    if let Some(port) = pin {
        manager.pin_instance(port);
    }

    if manager.ensure_connected().await {
        let port = manager
            .connected_port()
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        println!(
            "{} {}",
            colors.green("connected"),
            colors.cyan(&format!("127.0.0.1:{port}"))
        );
        Ok(())
    } else {
        let reason = manager
            .last_spawn_error()
            .map_or_else(|| "no server reachable".to_string(), ToString::to_string);
        // The reason is already on stdout; the error itself stays bare so it
        // is not reported twice.
        println!("{} {}", colors.red("disconnected"), colors.dim(&reason));
        Err(anyhow!("connection failed"))
    }
}

/// Lists running instances with the directories they serve.
async fn run_scan(settings: &Settings, colors: &ColorConfig) -> Result<()> {
    let scanner = platform_scanner(&settings.binary);
    let processes = scanner.scan().await;

    let mut seen = HashSet::new();
    let unique: Vec<_> = processes
        .into_iter()
        .filter(|p| seen.insert(p.port))
        .collect();

    if unique.is_empty() {
        println!("No running {} instances found.", settings.binary);
        return Ok(());
    }

    let widths = ColumnWidths::calculate(terminal_width());
    println!(
        "{:<rw$} {:<pw$} {:<ow$} {}",
        colors.dim("#"),
        colors.dim("PID"),
        colors.dim("PORT"),
        colors.dim("DIRECTORY"),
        rw = widths.row_num,
        pw = widths.pid,
        ow = widths.port,
    );

    for (index, process) in unique.iter().enumerate() {
        let directory = match ServerClient::new(ClientOptions::quick_probe(process.port)) {
            Ok(client) => client
                .working_directory()
                .await
                .map_or_else(|e| format!("({e})"), |wd| wd.directory),
            Err(e) => format!("({e})"),
        };

        println!(
            "{:<rw$} {:<pw$} {:<ow$} {}",
            index + 1,
            process.pid,
            colors.cyan(&process.port.to_string()),
            truncate(&directory, widths.directory),
            rw = widths.row_num,
            pw = widths.pid,
            ow = widths.port,
        );
    }

    Ok(())
}

/// Probes a single port and prints the classification.
async fn run_probe(port: u16, colors: &ColorConfig) -> Result<()> {
    let outcome = TcpProbe.probe(port, Duration::from_secs(2)).await;

    if outcome.listening {
        println!("{port}: {}", colors.green("listening"));
    } else {
        let reason = outcome.reason.unwrap_or_else(|| "not listening".to_string());
        println!("{port}: {}", colors.red(&reason));
    }

    Ok(())
}

/// Queries one instance's health endpoint.
async fn run_health(settings: &Settings, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(settings.port);
    let client = ServerClient::new(ClientOptions::quick_probe(port))?;
    let health = client
        .health()
        .await
        .with_context(|| format!("Health check failed for port {port}"))?;

    println!(
        "port {port}: healthy={} version={}",
        health.healthy, health.version
    );
    Ok(())
}

/// Connects, then appends prompt text to the bound server.
async fn run_prompt(settings: Settings, workspace: PathBuf, text: &str) -> Result<()> {
    let mut manager = ConnectionManager::new(settings, workspace);

    if !manager.ensure_connected().await {
        let reason = manager
            .last_spawn_error()
            .map_or_else(|| "no server reachable".to_string(), ToString::to_string);
        return Err(anyhow!("connection failed: {reason}"));
    }

    let client = manager
        .client()
        .ok_or_else(|| anyhow!("connected without a client"))?;

    if client.append_to_prompt(text).await? {
        println!("prompt appended");
        Ok(())
    } else {
        Err(anyhow!("server rejected the prompt"))
    }
}
