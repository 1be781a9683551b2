use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Result, TrackerError};
use crate::gateway::{InMemoryGateway, LocalFileGateway, PersistenceGateway, RemoteGateway};
use crate::gateway::remote::DEFAULT_TIMEOUT;

pub const ENV_BACKEND: &str = "MANUTRACK_BACKEND";
pub const ENV_OFFLINE: &str = "MANUTRACK_OFFLINE";
pub const ENV_DATA_DIR: &str = "MANUTRACK_DATA_DIR";
pub const ENV_API_URL: &str = "MANUTRACK_API_URL";
pub const ENV_API_TOKEN: &str = "MANUTRACK_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "MANUTRACK_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = ".manutrack";

/// Where the persistence gateway keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayBackend {
    /// On-device JSON document.
    Local { data_dir: PathBuf },
    /// Remote HTTP service.
    Remote {
        base_url: String,
        api_token: Option<String>,
        timeout: Duration,
    },
    /// Process memory only; lost on exit.
    Memory,
}

impl GatewayBackend {
    pub fn name(&self) -> &'static str {
        match self {
            GatewayBackend::Local { .. } => "local",
            GatewayBackend::Remote { .. } => "remote",
            GatewayBackend::Memory => "memory",
        }
    }
}

/// Startup configuration. Resolved once and passed by value into gateway
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub backend: GatewayBackend,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::Local {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            },
        }
    }
}

impl TrackerConfig {
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: GatewayBackend::Local {
                data_dir: data_dir.into(),
            },
        }
    }

    pub fn remote(base_url: impl Into<String>) -> Self {
        Self {
            backend: GatewayBackend::Remote {
                base_url: base_url.into(),
                api_token: None,
                timeout: DEFAULT_TIMEOUT,
            },
        }
    }

    pub fn memory() -> Self {
        Self {
            backend: GatewayBackend::Memory,
        }
    }

    /// Set the bearer token (remote backend only)
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        if let GatewayBackend::Remote { api_token, .. } = &mut self.backend {
            *api_token = Some(token.into());
        }
        self
    }

    /// Set the request timeout (remote backend only)
    pub fn timeout(mut self, value: Duration) -> Self {
        if let GatewayBackend::Remote { timeout, .. } = &mut self.backend {
            *timeout = value;
        }
        self
    }

    /// Local backend in `MANUTRACK_DATA_DIR`, or the default directory.
    /// Ignores every other setting.
    pub fn local_from_env() -> Self {
        Self::local_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn local_from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::local(data_dir_from(lookup(ENV_DATA_DIR)))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from a key lookup.
    ///
    /// `MANUTRACK_BACKEND` wins when set; otherwise `MANUTRACK_OFFLINE` picks
    /// local (true) or remote (false); with neither, a configured API URL
    /// selects remote and anything else falls back to local.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get(ENV_API_URL);
        let backend_name = match (get(ENV_BACKEND), get(ENV_OFFLINE)) {
            (Some(name), _) => name.to_ascii_lowercase(),
            (None, Some(flag)) => {
                if parse_bool(&flag)? {
                    "local".to_string()
                } else {
                    "remote".to_string()
                }
            }
            (None, None) if api_url.is_some() => "remote".to_string(),
            (None, None) => "local".to_string(),
        };

        let backend = match backend_name.as_str() {
            "local" | "offline" | "file" => GatewayBackend::Local {
                data_dir: data_dir_from(get(ENV_DATA_DIR)),
            },
            "remote" | "online" | "http" => {
                let base_url = api_url.ok_or_else(|| {
                    TrackerError::config(format!("{} is required for the remote backend", ENV_API_URL))
                })?;
                let timeout = match get(ENV_TIMEOUT_SECS) {
                    Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                        TrackerError::config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
                    })?),
                    None => DEFAULT_TIMEOUT,
                };
                GatewayBackend::Remote {
                    base_url,
                    api_token: get(ENV_API_TOKEN),
                    timeout,
                }
            }
            "memory" => GatewayBackend::Memory,
            other => {
                return Err(TrackerError::config(format!(
                    "{} must be one of: local, remote, memory (got '{}')",
                    ENV_BACKEND, other
                )));
            }
        };

        Ok(Self { backend })
    }

    /// Builds the gateway this configuration selects.
    pub fn build_gateway(&self) -> Result<Arc<dyn PersistenceGateway>> {
        let gateway: Arc<dyn PersistenceGateway> = match &self.backend {
            GatewayBackend::Local { data_dir } => Arc::new(LocalFileGateway::open(data_dir)?),
            GatewayBackend::Remote {
                base_url,
                api_token,
                timeout,
            } => Arc::new(RemoteGateway::with_options(
                base_url.clone(),
                api_token.clone(),
                *timeout,
            )?),
            GatewayBackend::Memory => Arc::new(InMemoryGateway::new()),
        };
        Ok(gateway)
    }
}

fn data_dir_from(raw: Option<String>) -> PathBuf {
    raw.map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TrackerError::config(format!(
            "{} must be a boolean, got '{}'",
            ENV_OFFLINE, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(pairs: &[(&str, &str)]) -> Result<TrackerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TrackerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_local() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_offline_flag_selects_local() {
        let config = resolve(&[(ENV_OFFLINE, "true"), (ENV_DATA_DIR, "/tmp/mt")]).unwrap();
        assert_eq!(config, TrackerConfig::local("/tmp/mt"));
    }

    #[test]
    fn test_local_only_resolution_reads_data_dir() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATA_DIR, "/srv/manutrack"),
            (ENV_BACKEND, "remote"),
        ]
        .into_iter()
        .collect();
        let config = TrackerConfig::local_from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config, TrackerConfig::local("/srv/manutrack"));

        let fallback = TrackerConfig::local_from_lookup(|_| Some("  ".to_string()));
        assert_eq!(fallback, TrackerConfig::default());
    }

    #[test]
    fn test_online_requires_url() {
        let err = resolve(&[(ENV_OFFLINE, "false")]).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn test_api_url_implies_remote() {
        let config = resolve(&[
            (ENV_API_URL, "https://tracker.example/api"),
            (ENV_API_TOKEN, "secret"),
            (ENV_TIMEOUT_SECS, "3"),
        ])
        .unwrap();
        assert_eq!(
            config,
            TrackerConfig::remote("https://tracker.example/api")
                .api_token("secret")
                .timeout(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_explicit_backend_beats_offline_flag() {
        let config = resolve(&[(ENV_BACKEND, "Memory"), (ENV_OFFLINE, "true")]).unwrap();
        assert_eq!(config.backend, GatewayBackend::Memory);
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(resolve(&[(ENV_BACKEND, "ftp")]).is_err());
        assert!(resolve(&[(ENV_OFFLINE, "maybe")]).is_err());
        assert!(resolve(&[(ENV_BACKEND, "remote"), (ENV_API_URL, "http://x"), (ENV_TIMEOUT_SECS, "soon")]).is_err());
    }

    #[test]
    fn test_build_memory_gateway() {
        let gateway = TrackerConfig::memory().build_gateway().unwrap();
        assert_eq!(gateway.backend_name(), "memory");
    }
}
