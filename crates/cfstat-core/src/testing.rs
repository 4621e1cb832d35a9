//! Fakes shared by the unit and integration tests of both crates.

use crate::command::{CommandChannel, CommandError};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

pub type CallLog = Arc<Mutex<Vec<Vec<String>>>>;

/// Replays canned responses in order and records every invocation. Once the
/// script runs out it answers with no output.
#[derive(Default)]
pub struct ScriptedChannel {
    responses: Mutex<VecDeque<Result<Vec<String>, CommandError>>>,
    calls: CallLog,
    latency: Option<Duration>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, lines: &[&str]) -> Self {
        self.push(Ok(lines.iter().map(|line| line.to_string()).collect()))
    }

    pub fn fail(self, output: &[&str]) -> Self {
        self.push(Err(CommandError::Failed {
            command: "scripted".to_string(),
            status: "exit status: 1".to_string(),
            output: output.iter().map(|line| line.to_string()).collect(),
        }))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    fn push(self, response: Result<Vec<String>, CommandError>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn invoke(&self, args: &[String]) -> Result<Vec<String>, CommandError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// `/v2/apps/:guid/stats` body with one running instance per entry of
/// `(index, cpu, memory, memory_quota)`.
pub fn stats_body(instances: &[(&str, f64, u64, u64)]) -> String {
    let entries: Vec<String> = instances
        .iter()
        .map(|(index, cpu, memory, quota)| {
            format!(
                r#""{index}":{{"state":"RUNNING","stats":{{"name":"web","uris":[],"host":"10.0.0.1","port":61000,"uptime":60,"mem_quota":{quota},"disk_quota":1073741824,"fds_quota":16384,"usage":{{"time":"2026-10-14 10:00:00 +0000","cpu":{cpu},"mem":{memory},"disk":52428800}}}}}}"#
            )
        })
        .collect();
    format!("{{{}}}", entries.join(","))
}
