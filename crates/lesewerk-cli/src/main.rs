// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk batch OCR scanner.
//
// Entry point. Loads the persisted configuration, initialises logging and the
// backend services, then runs one subcommand.

mod services;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use lesewerk_core::error::Result;
use lesewerk_core::{AppConfig, LogLevel, ScanId};
use lesewerk_scan::{ChannelSink, LogLine, ScanSummary};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};

use services::app_services::{AppServices, load_config};
use services::data_dir;

#[derive(Parser, Debug)]
#[command(name = "lesewerk", version, about = "Batch OCR scanner for image directories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recognise every image in a directory and store the results
    Scan {
        /// Directory to scan (not recursive)
        directory: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// List stored records
    Records {
        /// Maximum number of records to show
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Only show records from this scan
        #[arg(long)]
        scan: Option<ScanId>,
    },
    /// Print the effective configuration
    Config {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Per-invocation changes to the persisted configuration.
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Highest log level shown: 0-4 or fatal, error, warn, info, debug
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log every preprocessing step
    #[arg(long)]
    debug: bool,

    /// Warn about images recognised below this confidence (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    critical_confidence: Option<u8>,

    #[arg(long, overrides_with = "no_grayscale")]
    grayscale: bool,
    #[arg(long, overrides_with = "grayscale")]
    no_grayscale: bool,

    #[arg(long, overrides_with = "no_binary")]
    binary: bool,
    #[arg(long, overrides_with = "binary")]
    no_binary: bool,

    #[arg(long, overrides_with = "no_smooth")]
    smooth: bool,
    #[arg(long, overrides_with = "smooth")]
    no_smooth: bool,

    #[arg(long, overrides_with = "no_border")]
    border: bool,
    #[arg(long, overrides_with = "border")]
    no_border: bool,

    /// Stroke-width transform
    #[arg(long, overrides_with = "no_swt")]
    swt: bool,
    #[arg(long, overrides_with = "swt")]
    no_swt: bool,

    #[arg(long, overrides_with = "no_contrast")]
    contrast: bool,
    #[arg(long, overrides_with = "contrast")]
    no_contrast: bool,

    /// Directory holding the engine's language data
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// `+`-joined language codes, e.g. eng+deu
    #[arg(long)]
    languages: Option<String>,

    /// Persist these overrides as the new defaults
    #[arg(long)]
    save: bool,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(threshold) = self.critical_confidence {
            config.critical_confidence = threshold;
        }

        let flags = &mut config.preprocessing;
        toggle(&mut flags.grayscale, self.grayscale, self.no_grayscale);
        toggle(&mut flags.binary, self.binary, self.no_binary);
        toggle(&mut flags.smooth, self.smooth, self.no_smooth);
        toggle(&mut flags.border, self.border, self.no_border);
        toggle(&mut flags.swt, self.swt, self.no_swt);
        toggle(&mut flags.contrast, self.contrast, self.no_contrast);

        if let Some(path) = &self.data_path {
            config.engine.data_path = path.clone();
        }
        if let Some(languages) = &self.languages {
            config.engine.languages = languages.clone();
        }
    }
}

fn toggle(flag: &mut bool, on: bool, off: bool) {
    if on {
        *flag = true;
    } else if off {
        *flag = false;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = load_config(&data_dir::data_dir()).unwrap_or_default();
    if let Commands::Scan { overrides, .. } | Commands::Config { overrides } = &cli.command {
        overrides.apply(&mut config);
    }
    init_tracing(config.log_level);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("lesewerk: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Scan { directory, overrides } => {
            scan_directory(directory, overrides.save, config).await?;
        }
        Commands::Records { limit, scan } => {
            let svc = AppServices::init()?;
            for record in svc.records(limit, scan)? {
                println!("{}", serde_json::to_string(&record)?);
            }
            info!(total = svc.record_count()?, "records listed");
        }
        Commands::Config { overrides } => {
            if overrides.save {
                let svc = AppServices::init()?;
                svc.save_config(&config)?;
                info!(path = %svc.data_dir().display(), "configuration saved");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

/// Run one scan, printing its events to stderr while it runs.
async fn scan_directory(directory: PathBuf, save: bool, config: AppConfig) -> Result<()> {
    let (sink, events) = ChannelSink::new();
    let printer = tokio::spawn(print_progress(events, std::io::stderr()));
    let svc = AppServices::init_with_log(Arc::new(sink))?;

    let outcome = run_scan(&svc, directory, save, config).await;
    // The last sender goes with the services; the printer then drains and stops.
    drop(svc);
    let _ = printer.await;

    let summary = outcome?;
    info!(
        scan_id = %summary.scan_id,
        stored = summary.stored,
        skipped = summary.skipped,
        "scan finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_scan(
    svc: &AppServices,
    directory: PathBuf,
    save: bool,
    config: AppConfig,
) -> Result<ScanSummary> {
    if save {
        svc.save_config(&config)?;
    } else {
        svc.set_config(config);
    }
    svc.start_scan(directory)?
        .await
        .map_err(|e| std::io::Error::other(format!("scan worker stopped: {e}")))?
}

/// Write each scan event as `[LEVEL] message` until every sender is gone.
/// Returns how many lines were written.
async fn print_progress<W: Write>(mut events: UnboundedReceiver<LogLine>, mut out: W) -> usize {
    let mut printed = 0;
    while let Some(line) = events.recv().await {
        if writeln!(out, "[{}] {}", line.level, line.message).is_err() {
            break;
        }
        printed += 1;
    }
    printed
}

/// `RUST_LOG` wins; otherwise the configured level decides.
fn init_tracing(level: LogLevel) {
    let default = match level {
        LogLevel::Fatal | LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}
