// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The `agent` binary: parse the command line, load the configuration, and
//! run the supervision tasks until a configuration change shuts us down.

use anyhow::Context as _;
use clap::error::ErrorKind;
use clap::Parser;
use ghost_core::AgentConfig;
use ghost_daemon::{bootstrap, checkin, drainer, heartbeat, supervisor, BootstrapArgs};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::MakeWriterExt as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agent", version)]
struct Cli {
    /// Debug mode (no file hash verification & offline mode)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Run offline while still verifying file hashes
    #[arg(short = 'o', long)]
    offline: bool,

    /// YAML formatted configuration file
    config_file: PathBuf,
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

fn init_logging(level: &str, install_dir: &Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(install_dir, "ghost.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(level.to_lowercase())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file_writer.and(std::io::stderr))
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    let debug = cli.debug;
    // Debug implies offline.
    let offline = cli.offline || cli.debug;

    let config =
        AgentConfig::load(&cli.config_file).context("unable to load configuration file")?;

    let exe = std::env::current_exe().context("unable to locate agent binary")?;
    let install_dir = exe.parent().unwrap_or(Path::new(".")).to_path_buf();
    let _log_guard = init_logging(&config.log_level, &install_dir)?;

    let ctx = bootstrap::bootstrap(BootstrapArgs {
        config,
        config_path: cli.config_file,
        debug,
        offline,
    })
    .await
    .context("bootstrap failed")?;
    let ctx = std::sync::Arc::new(ctx);

    // Self-verification: a mismatched binary either stages an update and
    // exits, or is unrunnable offline.
    if !ctx.debug && !bootstrap::verify_binary(&ctx).await {
        anyhow::bail!(
            "no suitable client binary found... want: {} have: {}",
            ctx.config.binary_hash,
            ctx.binary_hash
        );
    }

    if !cli.debug && !cli.offline {
        tokio::spawn(heartbeat::run(ctx.install_dir.clone()));
    }
    if !ctx.offline {
        tokio::spawn(checkin::run(ctx.clone()));
        tokio::spawn(drainer::run(ctx.clone()));
    }

    // The supervisor runs on the main task; check-in shuts the whole process
    // down with exit(0) when a new configuration lands.
    supervisor::run(ctx).await;
    Ok(())
}
