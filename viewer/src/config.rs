use std::fs;
use std::path::Path;

use snooper_core::transport::DEFAULT_ENDPOINT;
use snooper_core::VIEW_WINDOW;

/// Viewer configuration: defaults, then environment, then an optional TOML overlay
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    /// WebSocket endpoint of the telemetry server
    pub url: String,
    /// Rows kept in the view
    pub window: usize,
    /// Minimum delay between two redraws
    pub refresh_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("CAN_SNOOPER_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            window: std::env::var("CAN_SNOOPER_WINDOW")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|w| *w > 0)
                .unwrap_or(VIEW_WINDOW),
            refresh_ms: std::env::var("CAN_SNOOPER_REFRESH_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(250),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file (path via CAN_SNOOPER_CONFIG or ./can_snooper.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path =
            std::env::var("CAN_SNOOPER_CONFIG").unwrap_or_else(|_| "can_snooper.toml".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<ViewerToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ViewerToml {
    pub url: Option<String>,
    pub window: Option<usize>,
    pub refresh_ms: Option<u64>,
}

impl ViewerToml {
    fn overlay(self, mut base: ViewerConfig) -> ViewerConfig {
        if let Some(v) = self.url.filter(|s| !s.is_empty()) {
            base.url = v;
        }
        if let Some(v) = self.window.filter(|w| *w > 0) {
            base.window = v;
        }
        if let Some(v) = self.refresh_ms {
            base.refresh_ms = v;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ViewerConfig {
        ViewerConfig {
            url: DEFAULT_ENDPOINT.to_string(),
            window: VIEW_WINDOW,
            refresh_ms: 250,
        }
    }

    #[test]
    fn test_overlay_replaces_set_fields() {
        let t: ViewerToml = toml::from_str("url = \"ws://10.0.0.2:9000\"\nwindow = 50").unwrap();
        let cfg = t.overlay(base());
        assert_eq!(cfg.url, "ws://10.0.0.2:9000");
        assert_eq!(cfg.window, 50);
        assert_eq!(cfg.refresh_ms, 250);
    }

    #[test]
    fn test_overlay_ignores_zero_window() {
        let t: ViewerToml = toml::from_str("window = 0").unwrap();
        assert_eq!(t.overlay(base()).window, VIEW_WINDOW);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<ViewerToml>("colour = \"red\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = ViewerConfig::load_from(Path::new("/nonexistent/can_snooper.toml"));
        assert!(cfg.window > 0);
        assert!(!cfg.url.is_empty());
    }
}
