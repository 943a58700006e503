mod app;
mod cluster;
mod config;
mod constants;
mod control;
mod driver;
mod error;
mod headless;
mod sampler;
mod series;
mod ui;
mod util;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "serving_console")]
#[command(about = "Synthetic inference-cluster telemetry console")]
struct Args {
    /// Path to configuration file (defaults apply when missing)
    #[arg(long, default_value = "serving_console.toml")]
    config: PathBuf,

    /// Sampling period in milliseconds
    #[arg(long)]
    tick_rate_ms: Option<u64>,

    /// Seed for reproducible synthetic data
    #[arg(long)]
    seed: Option<u64>,

    /// Start with the traffic generator on
    #[arg(long)]
    generating: bool,

    /// Print samples to stdout instead of drawing the dashboard
    #[arg(long)]
    headless: bool,

    /// Stop a headless run after this many ticks
    #[arg(long, requires = "headless")]
    ticks: Option<u64>,

    /// Log file for the dashboard (overrides config)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(ms) = self.tick_rate_ms {
            config.tick_rate_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.generating {
            config.controls.generating = true;
        }
        if let Some(path) = &self.log_file {
            config.log.file = path.clone();
        }
    }
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level))
}

// The dashboard owns the terminal, so it logs to a file.
fn init_file_logging(config: &Config) -> Result<WorkerGuard> {
    let path = &config.log.file;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {:?} has no file name", path))?;
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn init_stderr_logging(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    args.apply(&mut config);

    if args.headless {
        init_stderr_logging(&config);
        info!(?config, "starting headless sampler");
        let running = headless::shutdown_flag()?;
        let stdout = io::stdout();
        headless::run(App::new(&config), args.ticks, &running, &mut stdout.lock())?;
        return Ok(());
    }

    let _guard = init_file_logging(&config)?;
    info!(?config, "starting console");
    ui::run(App::new(&config)).context("terminal session failed")?;
    Ok(())
}
