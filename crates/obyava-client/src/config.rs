//! Sync layer configuration loaded from environment variables.
//!
//! All settings have defaults so the client can run against a local
//! backend with zero configuration.

use obyava_shared::constants::{DEFAULT_PAGE_SIZE, FAVORITES_WS_PATH, GENERAL_WS_PATH};

/// Configuration for [`crate::SyncService`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Full URL of the general (listings / presence / parser) channel.
    /// Env: `OBYAVA_WS_BASE` (base, path appended)
    /// Default: `ws://localhost:8001/ws`
    pub general_endpoint: String,

    /// Full URL of the per-user favorites channel.
    /// Env: `OBYAVA_WS_BASE` (base, path appended)
    /// Default: `ws://localhost:8001/ws/favorites`
    pub favorites_endpoint: String,

    /// Bearer credential for both channels. Without it no channel is
    /// dialed.
    /// Env: `OBYAVA_TOKEN`
    /// Default: none
    pub token: Option<String>,

    /// Page size of the paginated listing views.
    /// Env: `OBYAVA_PAGE_SIZE`
    /// Default: `10`
    pub page_size: usize,
}

impl SyncConfig {
    /// Build a config for the given backend base URL, e.g.
    /// `ws://localhost:8001`.
    pub fn new(ws_base: &str, token: Option<String>) -> Self {
        let base = ws_base.trim_end_matches('/');
        Self {
            general_endpoint: format!("{base}{GENERAL_WS_PATH}"),
            favorites_endpoint: format!("{base}{FAVORITES_WS_PATH}"),
            token,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let base =
            std::env::var("OBYAVA_WS_BASE").unwrap_or_else(|_| "ws://localhost:8001".to_string());
        let token = std::env::var("OBYAVA_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let mut config = Self::new(&base, token);

        if let Ok(val) = std::env::var("OBYAVA_PAGE_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.page_size = n;
            } else {
                tracing::warn!(value = %val, "invalid OBYAVA_PAGE_SIZE, using default");
            }
        }

        config
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("ws://localhost:8001", None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints() {
        let config = SyncConfig::default();
        assert_eq!(config.general_endpoint, "ws://localhost:8001/ws");
        assert_eq!(config.favorites_endpoint, "ws://localhost:8001/ws/favorites");
        assert_eq!(config.page_size, 10);
        assert!(config.token.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_tolerated() {
        let config = SyncConfig::new("wss://dash.example.com/", Some("tok".into()));
        assert_eq!(config.general_endpoint, "wss://dash.example.com/ws");
        assert_eq!(
            config.favorites_endpoint,
            "wss://dash.example.com/ws/favorites"
        );
    }
}
