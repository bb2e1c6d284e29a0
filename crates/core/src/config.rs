use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Result, DEFAULT_IMAGE, DEFAULT_SPACE};

/// Prefix of the environment variables read by [`SandboxaiConfig::load`].
pub const ENV_PREFIX: &str = "SANDBOXAI";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SandboxaiConfig {
    /// Address of an already running sandbox service, e.g. `http://localhost:5266/v1`.
    pub base_url: Option<String>,
    pub space: String,
    pub image: String,
    pub client: ClientConfig,
    pub embedded: EmbeddedConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout. `None` leaves requests unbounded, since cells may run for a long time.
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    pub health_poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddedConfig {
    /// Path of the `sandboxaid` binary. Looked up next to the current executable when unset.
    pub server_binary: Option<PathBuf>,
    /// Container runtime that must be on `PATH` before the server is launched.
    pub container_runtime: String,
    pub handshake_timeout_secs: u64,
    pub stop_timeout_secs: u64,
    pub log_join_timeout_secs: u64,
    /// Image the server falls back to when a create request leaves it empty.
    pub default_image: Option<String>,
}

impl SandboxaiConfig {
    /// Load from `sandboxai.{toml,yaml,json}` (optional) and `SANDBOXAI__*` variables.
    pub fn load() -> Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name("sandboxai").required(false))
            // Map SANDBOXAI__EMBEDDED__CONTAINER_RUNTIME=podman to embedded.container_runtime
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Load from an explicit set of variables instead of the process environment.
    pub fn load_from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: config::Map<String, String> = vars.into_iter().collect();
        let s = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }
}

impl EmbeddedConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn log_join_timeout(&self) -> Duration {
        Duration::from_secs(self.log_join_timeout_secs)
    }

    /// Resolve the server binary path, falling back to the bundled location.
    pub fn resolve_server_binary(&self) -> PathBuf {
        if let Some(path) = &self.server_binary {
            return path.clone();
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from))
            .unwrap_or_default();

        let beside = exe_dir.join("sandboxaid");
        if beside.is_file() {
            beside
        } else {
            exe_dir.join("bin").join("sandboxaid")
        }
    }
}

impl Default for SandboxaiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            space: DEFAULT_SPACE.into(),
            image: DEFAULT_IMAGE.into(),
            client: ClientConfig::default(),
            embedded: EmbeddedConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: 10,
            health_poll_interval_ms: 1000,
        }
    }
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            server_binary: None,
            container_runtime: "docker".into(),
            handshake_timeout_secs: 30,
            stop_timeout_secs: 30,
            log_join_timeout_secs: 10,
            default_image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = SandboxaiConfig::load_from_vars(Vec::new()).unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.space, "default");
        assert_eq!(config.image, DEFAULT_IMAGE);
        assert_eq!(config.embedded.container_runtime, "docker");
        assert_eq!(config.embedded.stop_timeout(), Duration::from_secs(30));
        assert_eq!(config.embedded.log_join_timeout(), Duration::from_secs(10));
        assert_eq!(config.client.health_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_nested_overrides() {
        let vars = vec![
            (
                "SANDBOXAI__BASE_URL".to_string(),
                "http://localhost:5266/v1".to_string(),
            ),
            (
                "SANDBOXAI__EMBEDDED__CONTAINER_RUNTIME".to_string(),
                "podman".to_string(),
            ),
            (
                "SANDBOXAI__EMBEDDED__STOP_TIMEOUT_SECS".to_string(),
                "5".to_string(),
            ),
            (
                "SANDBOXAI__CLIENT__REQUEST_TIMEOUT_SECS".to_string(),
                "60".to_string(),
            ),
        ];
        let config = SandboxaiConfig::load_from_vars(vars).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:5266/v1"));
        assert_eq!(config.embedded.container_runtime, "podman");
        assert_eq!(config.embedded.stop_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.client.request_timeout(),
            Some(Duration::from_secs(60))
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.embedded.handshake_timeout_secs, 30);
    }

    #[test]
    fn test_explicit_server_binary_wins() {
        let config = EmbeddedConfig {
            server_binary: Some(PathBuf::from("/opt/sandboxai/sandboxaid")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_server_binary(),
            PathBuf::from("/opt/sandboxai/sandboxaid")
        );
    }
}
