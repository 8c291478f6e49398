use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Instance id advertised to the MEC registry. A random UUID when unset.
    #[serde(default)]
    pub service_id: Option<String>,
    /// Heartbeat period
    #[serde(default = "default_every_ms")]
    pub every_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
}

/// Upstream SD-RAN controller endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_ctrl_host")]
    pub host: String,
    #[serde(default = "default_ctrl_port")]
    pub port: u16,
    #[serde(default = "default_ctrl_user")]
    pub user: String,
    #[serde(default = "default_ctrl_password")]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Base URL the controller uses to reach our callback ingress
    #[serde(default = "default_public_uri")]
    pub public_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionsConfig {
    /// Worker loop period
    #[serde(default = "default_every_ms")]
    pub every_ms: u64,
}

fn default_every_ms() -> u64 {
    2000
}

fn default_registry_url() -> String {
    "http://127.0.0.1:8887/api/v1/services".to_string()
}

fn default_ctrl_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ctrl_port() -> u16 {
    8888
}

fn default_ctrl_user() -> String {
    "root".to_string()
}

fn default_ctrl_password() -> String {
    "root".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8890".to_string()
}

fn default_public_uri() -> String {
    "http://127.0.0.1:8890".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            service_id: None,
            every_ms: default_every_ms(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_ctrl_host(),
            port: default_ctrl_port(),
            user: default_ctrl_user(),
            password: default_ctrl_password(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_uri: default_public_uri(),
        }
    }
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            every_ms: default_every_ms(),
        }
    }
}

impl ManagerConfig {
    pub fn every(&self) -> Duration {
        Duration::from_millis(self.every_ms)
    }
}

impl SubscriptionsConfig {
    pub fn every(&self) -> Duration {
        Duration::from_millis(self.every_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;

        if config.manager.every_ms == 0 || config.subscriptions.every_ms == 0 {
            anyhow::bail!("every_ms must be greater than zero");
        }

        Ok(config)
    }
}
