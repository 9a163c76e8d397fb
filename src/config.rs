//! Live-update configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_LIVE_UPDATES_URL: &str = "ws://localhost:3001";
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid live-update URL '{0}' (expected ws://, wss://, http:// or https://)")]
    InvalidUrl(String),
    #[error("reconnect interval must be greater than zero")]
    ZeroReconnectInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    /// Feature flag. When off, `connect()` does nothing.
    pub enabled: bool,
    /// Base endpoint, always a `ws://` or `wss://` URL.
    pub url: String,
    /// Fixed delay between reconnection attempts.
    pub reconnect_interval: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_LIVE_UPDATES_URL.to_owned(),
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
        }
    }
}

impl LiveConfig {
    /// Enabled config for `url` with the default reconnect interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] when `url` has no WebSocket or
    /// HTTP scheme.
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        Ok(Self { enabled: true, url: normalize_base_url(url)?, ..Self::default() })
    }

    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `LIVE_UPDATES_ENABLED`: `true`/`1`/`yes`/`on` enables the feature (default off)
    /// - `LIVE_UPDATES_URL`: base endpoint (default `ws://localhost:3001`)
    /// - `LIVE_UPDATES_RECONNECT_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unusable URL or a zero interval.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_flag(std::env::var("LIVE_UPDATES_ENABLED").ok().as_deref());
        let url = normalize_base_url(
            &std::env::var("LIVE_UPDATES_URL").unwrap_or_else(|_| DEFAULT_LIVE_UPDATES_URL.to_owned()),
        )?;
        let reconnect_ms = env_parse_u64("LIVE_UPDATES_RECONNECT_MS", DEFAULT_RECONNECT_INTERVAL_MS);

        Self { enabled, url, ..Self::default() }.with_reconnect_ms(reconnect_ms)
    }

    /// Replace the base endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] for an unsupported scheme.
    pub fn with_url(self, url: &str) -> Result<Self, ConfigError> {
        Ok(Self { url: normalize_base_url(url)?, ..self })
    }

    /// Replace the reconnect interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroReconnectInterval`] when `ms` is zero.
    pub fn with_reconnect_ms(self, ms: u64) -> Result<Self, ConfigError> {
        if ms == 0 {
            return Err(ConfigError::ZeroReconnectInterval);
        }
        Ok(Self { reconnect_interval: Duration::from_millis(ms), ..self })
    }

    /// Endpoint for one connection attempt: `{url}?token={token}` when a
    /// token is present, else the bare base.
    #[must_use]
    pub fn endpoint_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{sep}token={token}", self.url)
            }
            None => self.url.clone(),
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        return Ok(trimmed.to_owned());
    }
    if let Some(rest) = trimmed.strip_prefix("http://") {
        return Ok(format!("ws://{rest}"));
    }
    if let Some(rest) = trimmed.strip_prefix("https://") {
        return Ok(format!("wss://{rest}"));
    }
    Err(ConfigError::InvalidUrl(raw.to_owned()))
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
