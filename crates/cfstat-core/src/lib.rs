pub mod command;
pub mod identity;
pub mod poll;
pub mod scale;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Panels are drawn for at most this many instances; aggregates still cover all of them.
pub const MAX_DISPLAYED_INSTANCES: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default, rename = "mem")]
    pub memory: u64,
    #[serde(default)]
    pub disk: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uris: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(default)]
    pub port: u32,
    /// Seconds since the instance started.
    #[serde(default)]
    pub uptime: u64,
    #[serde(default, rename = "mem_quota")]
    pub memory_quota: u64,
    #[serde(default)]
    pub disk_quota: u64,
    #[serde(default, rename = "fds_quota")]
    pub fds_quota: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Usage,
}

/// One instance as reported by `/v2/apps/:guid/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: InstanceStats,
}

/// A single poll cycle. Instance indices are kept in lexicographic string
/// order, so `"10"` sorts before `"2"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    instances: Vec<String>,
    data: BTreeMap<String, InstanceSnapshot>,
}

impl Statistics {
    pub fn from_data<I>(data: I) -> Self
    where
        I: IntoIterator<Item = (String, InstanceSnapshot)>,
    {
        let data: BTreeMap<String, InstanceSnapshot> = data.into_iter().collect();
        let instances = data.keys().cloned().collect();
        Self { instances, data }
    }

    /// Decodes the raw command output, which arrives split into lines.
    pub fn parse(lines: &[String]) -> Result<Self, serde_json::Error> {
        let joined = lines.concat();
        let data: BTreeMap<String, InstanceSnapshot> = serde_json::from_str(&joined)?;
        Ok(Self::from_data(data))
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn get(&self, index: &str) -> Option<&InstanceSnapshot> {
        self.data.get(index)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstanceSnapshot)> {
        self.data.iter().map(|(index, instance)| (index.as_str(), instance))
    }

    /// The instances that get their own panels, in display order.
    pub fn displayed(&self) -> impl Iterator<Item = (&str, &InstanceSnapshot)> {
        self.iter().take(MAX_DISPLAYED_INSTANCES)
    }

    pub fn displayed_count(&self) -> usize {
        self.len().min(MAX_DISPLAYED_INSTANCES)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
