use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Database file path; in-memory when unset (tests, throwaway runs)
    pub db_path: Option<PathBuf>,
    /// `workspace=token` pairs authorizing API access
    pub workspace_tokens: HashMap<String, String>,
    /// How long a session counts as active after its last heartbeat
    pub session_ttl: Duration,
    pub rate_limit_window: Duration,
    pub write_rate_limit_per_window: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("workspace_tokens", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "write_rate_limit_per_window",
                &self.write_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "PAWKIT_BIND_ADDR", "127.0.0.1:8794");

        let db_path = optional_trimmed(&lookup, "PAWKIT_DB_PATH").map(PathBuf::from);

        let tokens_raw = required_trimmed(&lookup, "PAWKIT_API_TOKENS")?;
        let workspace_tokens = parse_workspace_tokens(&tokens_raw)?;

        let session_ttl_secs = value_or_default(&lookup, "PAWKIT_SESSION_TTL_SECS", "90")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "PAWKIT_SESSION_TTL_SECS must be an integer in [10, 3600]".to_string(),
                )
            })?;
        if !(10..=3_600).contains(&session_ttl_secs) {
            return Err(ConfigError::Invalid(
                "PAWKIT_SESSION_TTL_SECS must be in [10, 3600]".to_string(),
            ));
        }

        let rate_limit_window_secs = value_or_default(&lookup, "PAWKIT_RATE_LIMIT_WINDOW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "PAWKIT_RATE_LIMIT_WINDOW_SECS must be an integer in [10, 3600]".to_string(),
                )
            })?;
        if !(10..=3_600).contains(&rate_limit_window_secs) {
            return Err(ConfigError::Invalid(
                "PAWKIT_RATE_LIMIT_WINDOW_SECS must be in [10, 3600]".to_string(),
            ));
        }

        let write_rate_limit_per_window =
            value_or_default(&lookup, "PAWKIT_WRITE_RATE_LIMIT_PER_WINDOW", "240")
                .parse::<u32>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "PAWKIT_WRITE_RATE_LIMIT_PER_WINDOW must be an integer in [1, 5000]"
                            .to_string(),
                    )
                })?;
        if !(1..=5_000).contains(&write_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "PAWKIT_WRITE_RATE_LIMIT_PER_WINDOW must be in [1, 5000]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            db_path,
            workspace_tokens,
            session_ttl: Duration::from_secs(session_ttl_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            write_rate_limit_per_window,
        })
    }

    /// Workspace id for a presented bearer token, if the token is known
    pub fn workspace_for_token(&self, token: &str) -> Option<&str> {
        self.workspace_tokens
            .iter()
            .find(|(_, t)| t.as_str() == token)
            .map(|(ws, _)| ws.as_str())
    }
}

/// Parse `ws-1=token1,ws-2=token2`
fn parse_workspace_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (workspace, token) = pair.split_once('=').ok_or_else(|| {
            ConfigError::Invalid(
                "PAWKIT_API_TOKENS entries must look like workspace=token".to_string(),
            )
        })?;
        let workspace = workspace.trim();
        let token = token.trim();
        if workspace.is_empty() || token.is_empty() {
            return Err(ConfigError::Invalid(
                "PAWKIT_API_TOKENS entries must not have empty parts".to_string(),
            ));
        }
        tokens.insert(workspace.to_string(), token.to_string());
    }
    if tokens.is_empty() {
        return Err(ConfigError::Invalid(
            "PAWKIT_API_TOKENS must define at least one workspace".to_string(),
        ));
    }
    Ok(tokens)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
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

    #[test]
    fn config_requires_tokens() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PAWKIT_API_TOKENS"));
    }

    #[test]
    fn config_parses_token_pairs() {
        let mut map = HashMap::new();
        map.insert("PAWKIT_API_TOKENS", "ws-1=alpha, ws-2=beta");

        let config =
            AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string())).unwrap();
        assert_eq!(config.workspace_for_token("alpha"), Some("ws-1"));
        assert_eq!(config.workspace_for_token("beta"), Some("ws-2"));
        assert_eq!(config.workspace_for_token("gamma"), None);
    }

    #[test]
    fn config_redacts_tokens_in_debug() {
        let mut map = HashMap::new();
        map.insert("PAWKIT_API_TOKENS", "ws-1=super-secret");

        let config =
            AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string())).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn config_validates_ranges() {
        let mut map = HashMap::new();
        map.insert("PAWKIT_API_TOKENS", "ws-1=alpha");
        map.insert("PAWKIT_SESSION_TTL_SECS", "5");

        let err = AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PAWKIT_SESSION_TTL_SECS"));
    }
}
