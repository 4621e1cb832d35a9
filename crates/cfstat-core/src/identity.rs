use crate::command::{CommandError, CommandGuard};
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("cannot locate the cf CLI config; set CF_HOME or HOME")]
    NoConfigDir,
    #[error("failed to read {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed cf CLI config {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no space targeted; run `cf target -s SPACE` first")]
    NoSpace,
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("malformed app lookup response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("app {0} not found in the targeted space")]
    NotFound(String),
}

impl IdentityError {
    pub fn output(&self) -> &[String] {
        match self {
            IdentityError::Command(err) => err.output(),
            _ => &[],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CfConfig {
    #[serde(default, rename = "SpaceFields")]
    space_fields: SpaceFields,
}

#[derive(Debug, Default, Deserialize)]
struct SpaceFields {
    #[serde(default, rename = "GUID", alias = "Guid")]
    guid: String,
}

#[derive(Debug, Deserialize)]
struct AppSearch {
    #[serde(default)]
    resources: Vec<AppResource>,
}

#[derive(Debug, Deserialize)]
struct AppResource {
    metadata: AppMetadata,
}

#[derive(Debug, Deserialize)]
struct AppMetadata {
    guid: String,
}

/// `$CF_HOME/.cf/config.json`, falling back to the home directory.
pub fn cf_config_path() -> Option<PathBuf> {
    let base = match std::env::var("CF_HOME") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => dirs::home_dir()?,
    };
    Some(base.join(".cf").join("config.json"))
}

pub fn read_space_guid(path: &Path) -> Result<String, IdentityError> {
    let raw = fs::read_to_string(path).map_err(|source| IdentityError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CfConfig =
        serde_json::from_str(&raw).map_err(|source| IdentityError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;
    let guid = config.space_fields.guid.trim().to_string();
    if guid.is_empty() {
        return Err(IdentityError::NoSpace);
    }
    Ok(guid)
}

pub fn app_lookup_command(space_guid: &str, app_name: &str) -> Vec<String> {
    vec![
        "curl".to_string(),
        format!(
            "/v2/spaces/{space_guid}/apps?q=name:{}&inline-relations-depth=1",
            urlencoding::encode(app_name)
        ),
    ]
}

pub async fn resolve_app_guid(
    guard: &CommandGuard,
    space_guid: &str,
    app_name: &str,
) -> Result<String, IdentityError> {
    let lines = guard
        .invoke(&app_lookup_command(space_guid, app_name))
        .await?;
    let search: AppSearch =
        serde_json::from_str(&lines.concat()).map_err(IdentityError::Decode)?;
    let guid = search
        .resources
        .into_iter()
        .next()
        .map(|resource| resource.metadata.guid)
        .ok_or_else(|| IdentityError::NotFound(app_name.to_string()))?;
    info!(event = "app_resolved", app = %app_name, app_guid = %guid);
    Ok(guid)
}
