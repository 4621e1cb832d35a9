use crate::command::{CommandError, CommandGuard};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("scaling {app_name} to {instances} instances failed: {source}")]
pub struct ScaleError {
    pub app_name: String,
    pub instances: usize,
    #[source]
    pub source: CommandError,
}

pub fn scale_command(app_name: &str, instances: usize) -> Vec<String> {
    vec![
        "scale".to_string(),
        app_name.to_string(),
        "-i".to_string(),
        instances.to_string(),
    ]
}

/// Issues `scale <app> -i <n>` through the shared guard. Bounds are the
/// caller's business.
#[derive(Clone)]
pub struct ScaleTrigger {
    guard: CommandGuard,
    app_name: String,
}

impl ScaleTrigger {
    pub fn new(guard: CommandGuard, app_name: impl Into<String>) -> Self {
        Self {
            guard,
            app_name: app_name.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub async fn scale(&self, instances: usize) -> Result<(), ScaleError> {
        info!(event = "scale_requested", app = %self.app_name, instances);
        self.guard
            .invoke(&scale_command(&self.app_name, instances))
            .await
            .map(|_| ())
            .map_err(|source| {
                warn!(event = "scale_failed", app = %self.app_name, instances, error = %source);
                ScaleError {
                    app_name: self.app_name.clone(),
                    instances,
                    source,
                }
            })
    }
}
