use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recordings: RecordingsConfig,
    pub provider: ProviderConfig,
    pub session: SessionSettings,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Per-connection outbound queue length
    pub max_send_queue: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-relay".to_string(),
            http: HttpConfig::default(),
            max_send_queue: 256,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecordingsConfig {
    /// Capture directory; `~` is expanded
    pub path: String,
}

impl Default for RecordingsConfig {
    fn default() -> Self {
        Self {
            path: "recordings".to_string(),
        }
    }
}

impl RecordingsConfig {
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub nats_url: String,
    pub start_timeout_secs: u64,
    pub stop_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            start_timeout_secs: 10,
            stop_timeout_secs: 5,
        }
    }
}

impl ProviderConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long teardown waits for the engine's last results
    pub drain_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 10,
        }
    }
}

impl SessionSettings {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token → user id
    pub tokens: HashMap<String, String>,
}

impl Config {
    /// Load from `path` (any format the `config` crate reads, extension
    /// optional) with `VOICE_RELAY__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_RELAY").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load("/nonexistent/voice-relay").unwrap();

        assert_eq!(cfg.service.http.port, 8080);
        assert_eq!(cfg.provider.nats_url, "nats://localhost:4222");
        assert_eq!(cfg.session.drain_timeout(), Duration::from_secs(10));
        assert!(cfg.auth.tokens.is_empty());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(
            &path,
            r#"
[service.http]
port = 9000

[recordings]
path = "/var/lib/relay"

[auth.tokens]
secret = "user-42"
"#,
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.service.http.port, 9000);
        assert_eq!(cfg.service.http.bind, "0.0.0.0");
        assert_eq!(cfg.recordings.dir(), PathBuf::from("/var/lib/relay"));
        assert_eq!(cfg.auth.tokens.get("secret").map(String::as_str), Some("user-42"));
    }
}
