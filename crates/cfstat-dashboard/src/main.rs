mod config;
mod dashboard;
mod event_loop;
mod presenter;
mod surface;
mod theme;
mod ui;

use anyhow::Context;
use cfstat_core::{
    command::{CfCli, CommandError, CommandGuard},
    identity::{self, IdentityError},
    poll::Poller,
    scale::ScaleTrigger,
};
use clap::{CommandFactory, Parser};
use config::{init_logging, load_config, Args, Config};
use crossterm::event::{Event, EventStream};
use dashboard::DashboardState;
use event_loop::{EventLoop, LoopError};
use futures_util::stream;
use presenter::{Dashboard, DebugEmitter};
use std::{io, process::ExitCode};
use surface::TerminalSurface;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_config(Args::parse());
    init_logging(&config);

    let Some(app_name) = config.app_name.clone() else {
        print_usage();
        return ExitCode::FAILURE;
    };

    match run(&app_name, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(app_name: &str, config: &Config) -> anyhow::Result<()> {
    let guard = CommandGuard::new(CfCli::new(&config.cf_bin));
    let config_path = identity::cf_config_path().ok_or(IdentityError::NoConfigDir)?;
    let space_guid = identity::read_space_guid(&config_path)?;
    let app_guid = identity::resolve_app_guid(&guard, &space_guid, app_name).await?;
    info!(event = "dashboard_start", app = %app_name, debug = config.debug);

    let (poll_task, polls) = Poller::new(guard.clone(), app_guid)
        .with_interval(config.poll_interval)
        .spawn();
    let scaler = ScaleTrigger::new(guard, app_name);

    let result = if config.debug {
        let emitter = DebugEmitter::new(io::stdout(), config.full);
        let input = stream::pending::<io::Result<Event>>();
        let mut event_loop =
            EventLoop::new(emitter, input, polls, scaler).with_watchdog(config.watchdog);
        event_loop.run().await
    } else {
        let surface = TerminalSurface::enter().context("failed to set up the terminal")?;
        let dashboard = Dashboard::new(DashboardState::new(app_name), surface);
        let mut event_loop = EventLoop::new(dashboard, EventStream::new(), polls, scaler)
            .with_watchdog(config.watchdog);
        event_loop.run().await
    };
    poll_task.abort();
    Ok(result?)
}

fn print_usage() {
    println!("\nFAILED\nIncorrect usage.\n");
    println!("{}", Args::command().render_help());
}

/// Prints the failing command's output, then the error. Runs after the
/// terminal has been restored.
fn report(err: &anyhow::Error) {
    for line in command_output(err) {
        println!("{line}");
    }
    match err.downcast_ref::<LoopError>() {
        Some(LoopError::Timeout) => println!("\n{err}"),
        _ => println!("\nERROR: {err}"),
    }
}

fn command_output(err: &anyhow::Error) -> &[String] {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CommandError>())
        .map(CommandError::output)
        .unwrap_or(&[])
}
