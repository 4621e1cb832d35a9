use crate::{
    command::{CommandError, CommandGuard},
    Statistics,
};
use futures_util::{pin_mut, Stream, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("malformed stats response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("metrics poller stopped")]
    Stopped,
}

impl PollError {
    pub fn output(&self) -> &[String] {
        match self {
            PollError::Command(err) => err.output(),
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub enum PollEvent {
    Snapshot(Statistics),
    Failed(PollError),
}

pub fn stats_command(app_guid: &str) -> Vec<String> {
    vec!["curl".to_string(), format!("/v2/apps/{app_guid}/stats")]
}

/// Fetches `/v2/apps/:guid/stats` for one app, once per interval, until the
/// first failure.
pub struct Poller {
    guard: CommandGuard,
    app_guid: String,
    interval: Duration,
}

impl Poller {
    pub fn new(guard: CommandGuard, app_guid: impl Into<String>) -> Self {
        Self {
            guard,
            app_guid: app_guid.into(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Lazy sequence of poll results. The next fetch only starts once the
    /// consumer asks for it and the interval has passed; the sequence ends
    /// right after yielding an error.
    pub fn stream(self) -> impl Stream<Item = Result<Statistics, PollError>> + Send {
        let Poller {
            guard,
            app_guid,
            interval,
        } = self;
        async_stream::stream! {
            let command = stats_command(&app_guid);
            let mut cycle: u64 = 0;
            loop {
                let lines = match guard.invoke(&command).await {
                    Ok(lines) => lines,
                    Err(err) => {
                        warn!(event = "poll_failed", app_guid = %app_guid, cycle, error = %err);
                        yield Err(PollError::Command(err));
                        break;
                    }
                };
                match Statistics::parse(&lines) {
                    Ok(stats) => {
                        debug!(event = "poll_cycle", app_guid = %app_guid, cycle, instances = stats.len());
                        yield Ok(stats);
                    }
                    Err(err) => {
                        warn!(event = "poll_failed", app_guid = %app_guid, cycle, error = %err);
                        yield Err(PollError::Decode(err));
                        break;
                    }
                }
                cycle += 1;
                tokio::time::sleep(interval).await;
            }
        }
    }

    /// Runs the poller as a background task. The channel holds a single
    /// event and the task reserves that slot before each fetch, so nothing
    /// is fetched while an earlier snapshot still waits for the consumer.
    pub fn spawn(self) -> (JoinHandle<()>, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let stream = self.stream();
            pin_mut!(stream);
            loop {
                let Ok(permit) = tx.reserve().await else {
                    break;
                };
                let Some(result) = stream.next().await else {
                    break;
                };
                permit.send(match result {
                    Ok(stats) => PollEvent::Snapshot(stats),
                    Err(err) => PollEvent::Failed(err),
                });
            }
        });
        (handle, rx)
    }
}
