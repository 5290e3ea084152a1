//! Webhook process configuration

use std::path::{Path, PathBuf};

use super::WebhookError;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Default health and metrics port
pub const HEALTH_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub health_port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: WEBHOOK_PORT,
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
            health_port: HEALTH_PORT,
        }
    }
}

impl WebhookConfig {
    /// Defaults overridden by `WEBHOOK_PORT`, `WEBHOOK_CERT_PATH`,
    /// `WEBHOOK_KEY_PATH` and `HEALTH_PORT`
    pub fn from_env() -> Result<Self, WebhookError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WebhookError> {
        let mut config = Self::default();
        if let Some(port) = lookup("WEBHOOK_PORT") {
            config.port = parse_port("WEBHOOK_PORT", &port)?;
        }
        if let Some(path) = lookup("WEBHOOK_CERT_PATH") {
            config.cert_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WEBHOOK_KEY_PATH") {
            config.key_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("HEALTH_PORT") {
            config.health_port = parse_port("HEALTH_PORT", &port)?;
        }
        Ok(config)
    }

    /// Both the certificate and the key exist
    pub fn tls_available(&self) -> bool {
        Path::new(&self.cert_path).exists() && Path::new(&self.key_path).exists()
    }
}

fn parse_port(name: &'static str, value: &str) -> Result<u16, WebhookError> {
    value.trim().parse().map_err(|_| WebhookError::Config {
        name,
        value: value.to_string(),
    })
}
