use std::fs;

use client_core::DEFAULT_POLL_INTERVAL;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device_url: String,
    pub poll_interval_ms: u64,
    pub push_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_url: "http://localhost:5000".into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            push_enabled: false,
        }
    }
}

/// Defaults, then `console.toml`, then environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("console.toml") {
        match toml::from_str::<Settings>(&raw) {
            Ok(file_cfg) => settings = file_cfg,
            Err(err) => tracing::warn!("ignoring malformed console.toml: {err}"),
        }
    }

    if let Ok(v) = std::env::var("DEVICE_URL") {
        settings.device_url = v;
    }
    if let Ok(v) = std::env::var("POLL_INTERVAL_MS") {
        if let Ok(ms) = v.parse() {
            settings.poll_interval_ms = ms;
        }
    }
    if let Ok(v) = std::env::var("PUSH_ENABLED") {
        settings.push_enabled = matches!(v.as_str(), "1" | "true" | "yes");
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.device_url, "http://localhost:5000");
        assert_eq!(settings.poll_interval_ms, 2000);
        assert!(!settings.push_enabled);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let settings: Settings = toml::from_str("poll_interval_ms = 500").expect("parse");
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.device_url, "http://localhost:5000");
    }
}
