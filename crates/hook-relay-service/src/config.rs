//! Service configuration.
//!
//! All fields carry serde defaults so an empty configuration source yields a
//! runnable config, with one exception: the webhook secret has no default
//! and [`ServiceConfig::validate`] rejects a config without one. Loading and
//! layering (files, environment) happens in the binary via the `config`
//! crate; this module only defines the shape and the validation rules.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Default port when none is configured and no external listener is given.
pub const DEFAULT_PORT: u16 = 8001;

/// Default request deadline in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 3;

// ============================================================================
// Configuration
// ============================================================================

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook validation settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl ServiceConfig {
    /// Check the configuration for operator mistakes that must abort
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty secret, a hook path
    /// that does not start with `/`, or a zero request deadline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.secret.is_empty() {
            return Err(ConfigError::Invalid {
                message: "webhook.secret must be set; deliveries cannot be verified without it"
                    .to_string(),
            });
        }

        if !self.webhook.path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.path must start with '/', got '{}'",
                    self.webhook.path
                ),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_seconds must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to listen on. Ignored when an external listener is supplied.
    pub port: u16,

    /// Per-request deadline in seconds. The pipeline races this deadline;
    /// whichever finishes first decides the response.
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout_seconds: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Webhook validation configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// The single accepted webhook URL path.
    pub path: String,

    /// Shared HMAC secret. Required; there is no usable default.
    pub secret: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secret: String::new(),
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("path", &self.path)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
