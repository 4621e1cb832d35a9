use crate::event_loop::DEFAULT_WATCHDOG;
use cfstat_core::poll::DEFAULT_POLL_INTERVAL;
use clap::Parser;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_CF_BIN: &str = "cf";
const LOG_FILE_NAME: &str = "cf-statistics.log";

#[derive(Parser, Debug)]
#[command(
    name = "cf-statistics",
    version,
    about = "Display live metrics/statistics about an app"
)]
pub struct Args {
    /// App to watch
    pub app_name: Option<String>,
    /// Print metrics to stdout as JSON lines instead of drawing the dashboard
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    /// With --debug, print the whole instance record
    #[arg(long, default_value_t = false)]
    pub full: bool,
    /// Log at debug level (logs go to CFSTAT_LOG_DIR when set)
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
    /// cf executable used for every command
    #[arg(long)]
    pub cf_bin: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_name: Option<String>,
    pub debug: bool,
    pub full: bool,
    pub cf_bin: PathBuf,
    pub poll_interval: Duration,
    pub watchdog: Duration,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

pub fn load_config(args: Args) -> Config {
    Config {
        app_name: args
            .app_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        debug: args.debug,
        full: args.full,
        cf_bin: resolve_cf_bin(args.cf_bin),
        poll_interval: resolve_poll_interval(),
        watchdog: resolve_watchdog(),
        log_dir: resolve_log_dir(),
        log_level: resolve_log_level(args.verbose),
    }
}

fn resolve_cf_bin(flag: Option<String>) -> PathBuf {
    flag.and_then(|value| non_empty(&value))
        .or_else(|| env_value("CFSTAT_CF_BIN"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CF_BIN))
}

fn resolve_poll_interval() -> Duration {
    env_value("CFSTAT_POLL_INTERVAL_MS")
        .and_then(|value| parse_millis(&value))
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

fn resolve_watchdog() -> Duration {
    env_value("CFSTAT_WATCHDOG_SECS")
        .and_then(|value| parse_secs(&value))
        .unwrap_or(DEFAULT_WATCHDOG)
}

fn resolve_log_dir() -> Option<PathBuf> {
    env_value("CFSTAT_LOG_DIR").map(PathBuf::from)
}

fn resolve_log_level(verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    env_value("CFSTAT_LOG_LEVEL").unwrap_or_else(|| "info".to_string())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| non_empty(&value))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_millis(value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(millis) => Some(Duration::from_millis(millis)),
    }
}

fn parse_secs(value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}

/// The dashboard owns stdout, so events go to the log file when one is
/// configured and nowhere otherwise.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let file = match config.log_dir.as_deref().map(open_log_file) {
        Some(Ok(file)) => Some(file),
        Some(Err(err)) => {
            eprintln!("log_file_error: {err}");
            None
        }
        None => None,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(io::sink).try_init(),
    };
}

fn open_log_file(dir: &Path) -> io::Result<File> {
    std::fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}
