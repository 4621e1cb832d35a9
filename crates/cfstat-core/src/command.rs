use async_trait::async_trait;
use std::{
    path::PathBuf,
    process::Stdio,
    sync::Arc,
};
use thiserror::Error;
use tokio::{process::Command, sync::Mutex};
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status})")]
    Failed {
        command: String,
        status: String,
        output: Vec<String>,
    },
}

impl CommandError {
    /// Whatever the command printed before failing.
    pub fn output(&self) -> &[String] {
        match self {
            CommandError::Spawn { .. } => &[],
            CommandError::Failed { output, .. } => output,
        }
    }
}

/// A connection to the control plane that takes text commands and answers
/// with the lines they printed.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn invoke(&self, args: &[String]) -> Result<Vec<String>, CommandError>;
}

/// Serializes access to one [`CommandChannel`]. Clones share the same lock,
/// which is held only while a single request is in flight.
#[derive(Clone)]
pub struct CommandGuard {
    channel: Arc<Mutex<Box<dyn CommandChannel>>>,
}

impl CommandGuard {
    pub fn new(channel: impl CommandChannel + 'static) -> Self {
        Self {
            channel: Arc::new(Mutex::new(Box::new(channel))),
        }
    }

    pub async fn invoke(&self, args: &[String]) -> Result<Vec<String>, CommandError> {
        let channel = self.channel.lock().await;
        channel.invoke(args).await
    }
}

/// Runs commands through the `cf` executable.
#[derive(Clone, Debug)]
pub struct CfCli {
    program: PathBuf,
}

impl CfCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CfCli {
    fn default() -> Self {
        Self::new("cf")
    }
}

#[async_trait]
impl CommandChannel for CfCli {
    async fn invoke(&self, args: &[String]) -> Result<Vec<String>, CommandError> {
        debug!(event = "command_invoke", program = %self.program.display(), args = ?args);
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        if output.status.success() {
            return Ok(lines);
        }
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string),
        );
        Err(CommandError::Failed {
            command: args.join(" "),
            status: output.status.to_string(),
            output: lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChannel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct OverlapProbe {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandChannel for OverlapProbe {
        async fn invoke(&self, _args: &[String]) -> Result<Vec<String>, CommandError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn guard_never_lets_requests_overlap() {
        let peak = Arc::new(AtomicUsize::new(0));
        let guard = CommandGuard::new(OverlapProbe {
            active: Arc::new(AtomicUsize::new(0)),
            peak: peak.clone(),
        });

        let mut handles = Vec::new();
        for _ in 0..6 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                guard.invoke(&["curl".to_string()]).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("invoke");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn guard_releases_after_failure() {
        let channel = ScriptedChannel::new()
            .fail(&["boom"])
            .respond(&["ok"]);
        let log = channel.calls();
        let guard = CommandGuard::new(channel);

        let err = guard.invoke(&["first".to_string()]).await.unwrap_err();
        assert_eq!(err.output(), ["boom"]);
        let lines = guard.invoke(&["second".to_string()]).await.expect("second");
        assert_eq!(lines, vec!["ok".to_string()]);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cf_cli_splits_stdout_into_lines() {
        let cli = CfCli::new("printf");
        let lines = cli
            .invoke(&["a\\nb\\n".to_string()])
            .await
            .expect("printf");
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cf_cli_reports_non_zero_exit_as_failure() {
        let cli = CfCli::new("false");
        let err = cli.invoke(&[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }

    #[tokio::test]
    async fn cf_cli_reports_missing_binary() {
        let cli = CfCli::new("/nonexistent/cfstat-test-binary");
        let err = cli.invoke(&["curl".to_string()]).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(err.output().is_empty());
    }
}
