//! Client configuration

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for a syncing client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g. `https://api.pawkit.app`)
    pub api_url: String,
    /// Bearer token identifying the workspace session
    pub api_token: String,
    /// Workspace to sync
    pub workspace_id: String,
    /// Human-readable device label
    pub device_name: String,
    /// Periodic sync interval (default: 60 seconds)
    pub sync_interval: Duration,
    /// Heartbeat interval while active (default: 30 seconds)
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    /// Read configuration from `PAWKIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = required(&lookup, "PAWKIT_API_URL")?;
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(Error::InvalidInput(
                "PAWKIT_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let api_token = required(&lookup, "PAWKIT_API_TOKEN")?;
        let workspace_id = required(&lookup, "PAWKIT_WORKSPACE")?;
        let device_name = optional(&lookup, "PAWKIT_DEVICE_NAME")
            .unwrap_or_else(|| "pawkit".to_string());

        let sync_interval = interval_secs(&lookup, "PAWKIT_SYNC_INTERVAL_SECS", 60, 5..=3_600)?;
        let heartbeat_interval =
            interval_secs(&lookup, "PAWKIT_HEARTBEAT_INTERVAL_SECS", 30, 5..=600)?;

        Ok(Self {
            api_url,
            api_token,
            workspace_id,
            device_name,
            sync_interval,
            heartbeat_interval,
        })
    }
}

fn interval_secs(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<Duration> {
    let secs = match optional(&lookup, name) {
        Some(value) => value.parse::<u64>().map_err(|_| {
            Error::InvalidInput(format!(
                "{name} must be an integer in [{}, {}]",
                range.start(),
                range.end()
            ))
        })?,
        None => default,
    };
    if !range.contains(&secs) {
        return Err(Error::InvalidInput(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn required(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(&lookup, name)
        .ok_or_else(|| Error::InvalidInput(format!("Missing required environment variable {name}")))
}

fn optional(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PAWKIT_API_URL", "https://api.pawkit.app"),
            ("PAWKIT_API_TOKEN", "token"),
            ("PAWKIT_WORKSPACE", "ws-1"),
        ])
    }

    fn from_map(map: &HashMap<&str, &str>) -> Result<ClientConfig> {
        ClientConfig::from_lookup(|key| map.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn config_defaults() {
        let config = from_map(&base_env()).unwrap();
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.device_name, "pawkit");
    }

    #[test]
    fn config_requires_api_url() {
        let mut map = base_env();
        map.remove("PAWKIT_API_URL");
        let err = from_map(&map).unwrap_err();
        assert!(err.to_string().contains("PAWKIT_API_URL"));
    }

    #[test]
    fn config_rejects_bad_scheme() {
        let mut map = base_env();
        map.insert("PAWKIT_API_URL", "api.pawkit.app");
        assert!(from_map(&map).is_err());
    }

    #[test]
    fn config_validates_interval_range() {
        let mut map = base_env();
        map.insert("PAWKIT_SYNC_INTERVAL_SECS", "2");
        assert!(from_map(&map).is_err());

        map.insert("PAWKIT_SYNC_INTERVAL_SECS", "120");
        let config = from_map(&map).unwrap();
        assert_eq!(config.sync_interval, Duration::from_secs(120));
    }
}
