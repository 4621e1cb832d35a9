use crate::presenter::Presenter;
use cfstat_core::{
    poll::{PollError, PollEvent},
    scale::{ScaleError, ScaleTrigger},
    Statistics, MAX_DISPLAYED_INSTANCES,
};
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::{Stream, StreamExt};
use std::{io, time::Duration};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("TIMEOUT\nQuerying metrics took too long.. Check your connectivity!")]
    Timeout,
    #[error("{0}")]
    Poll(#[from] PollError),
    #[error("{0}")]
    Scale(#[from] ScaleError),
    #[error("terminal input failed: {0}")]
    Input(#[source] io::Error),
    #[error("terminal input closed")]
    InputClosed,
    #[error("rendering failed: {0}")]
    Output(#[source] io::Error),
}

impl LoopError {
    /// Lines printed by the failing `cf` command, if one failed.
    pub fn output(&self) -> &[String] {
        match self {
            LoopError::Poll(err) => err.output(),
            LoopError::Scale(err) => err.source.output(),
            _ => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ScaleInFlight,
    Terminating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    Redraw,
    Scale(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleDirection {
    Up,
    Down,
}

/// Target count for a scale request. Scaling up stops at eight instances,
/// scaling down at one.
pub fn scale_target(direction: ScaleDirection, current: usize) -> Option<usize> {
    match direction {
        ScaleDirection::Up if (1..MAX_DISPLAYED_INSTANCES).contains(&current) => {
            Some(current + 1)
        }
        ScaleDirection::Down if current > 1 => Some(current - 1),
        _ => None,
    }
}

pub fn key_action(event: &Event, instances: usize) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::PageUp => scale_target(ScaleDirection::Up, instances).map(Action::Scale),
            KeyCode::PageDown => {
                scale_target(ScaleDirection::Down, instances).map(Action::Scale)
            }
            _ => None,
        },
        Event::Resize(_, _) => Some(Action::Redraw),
        _ => None,
    }
}

/// Multiplexes terminal input, poll events, ctrl-c and the watchdog. Every
/// exit path goes through [`EventLoop::run`], which releases the presenter.
pub struct EventLoop<P, I> {
    presenter: P,
    input: I,
    polls: mpsc::Receiver<PollEvent>,
    scaler: ScaleTrigger,
    watchdog: Duration,
    instances: usize,
    state: LoopState,
}

impl<P, I> EventLoop<P, I>
where
    P: Presenter,
    I: Stream<Item = io::Result<Event>> + Unpin,
{
    pub fn new(
        presenter: P,
        input: I,
        polls: mpsc::Receiver<PollEvent>,
        scaler: ScaleTrigger,
    ) -> Self {
        Self {
            presenter,
            input,
            polls,
            scaler,
            watchdog: DEFAULT_WATCHDOG,
            instances: 0,
            state: LoopState::Running,
        }
    }

    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn instances(&self) -> usize {
        self.instances
    }

    pub async fn run(&mut self) -> Result<(), LoopError> {
        let result = self.drive().await;
        self.state = LoopState::Terminating;
        let released = self.presenter.release().map_err(LoopError::Output);
        match &result {
            Ok(()) => info!(event = "dashboard_exit", reason = "quit"),
            Err(err) => info!(event = "dashboard_exit", reason = %err),
        }
        result.and(released)
    }

    async fn drive(&mut self) -> Result<(), LoopError> {
        self.presenter.redraw().map_err(LoopError::Output)?;
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            let watchdog = tokio::time::sleep(self.watchdog);
            let action = tokio::select! {
                event = self.input.next() => match event {
                    Some(Ok(event)) => key_action(&event, self.instances),
                    Some(Err(err)) => return Err(LoopError::Input(err)),
                    None => return Err(LoopError::InputClosed),
                },
                poll = self.polls.recv() => match poll {
                    Some(PollEvent::Snapshot(stats)) => {
                        self.apply(&stats)?;
                        None
                    }
                    Some(PollEvent::Failed(err)) => return Err(err.into()),
                    None => return Err(PollError::Stopped.into()),
                },
                _ = &mut interrupt => Some(Action::Quit),
                _ = watchdog => {
                    warn!(event = "watchdog_timeout", secs = self.watchdog.as_secs());
                    return Err(LoopError::Timeout);
                }
            };

            match action {
                Some(Action::Quit) => return Ok(()),
                Some(Action::Redraw) => self.presenter.redraw().map_err(LoopError::Output)?,
                Some(Action::Scale(target)) => self.scale(target).await?,
                None => {}
            }
        }
    }

    fn apply(&mut self, stats: &Statistics) -> Result<(), LoopError> {
        self.instances = stats.len();
        debug!(event = "snapshot_applied", instances = self.instances);
        self.presenter.present(stats).map_err(LoopError::Output)
    }

    async fn scale(&mut self, target: usize) -> Result<(), LoopError> {
        self.state = LoopState::ScaleInFlight;
        self.presenter
            .scaling(self.scaler.app_name(), target)
            .map_err(LoopError::Output)?;
        let result = self.scaler.scale(target).await;
        self.state = LoopState::Running;
        result.map_err(LoopError::from)
    }
}
