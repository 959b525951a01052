//! Application configuration management.
//!
//! This module handles loading the application configuration:
//! the backend URL, its anon key and an optional data directory override.
//!
//! Configuration is stored at `~/.config/nexus-crm/config.json`. The
//! backend settings can also come from the environment (`SUPABASE_URL` /
//! `VITE_SUPABASE_URL` and `SUPABASE_ANON_KEY` / `VITE_SUPABASE_ANON_KEY`),
//! which take precedence over the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Application name used for config/data directory paths
const APP_NAME: &str = "nexus-crm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub remote_url: Option<String>,
    pub anon_key: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load the config file (default when absent), then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Replace backend settings with the first non-empty variable found.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };
        if let Some(url) = first(&URL_VARS[..]) {
            self.remote_url = Some(url);
        }
        if let Some(key) = first(&KEY_VARS[..]) {
            self.anon_key = Some(key);
        }
        self
    }

    /// True only when both URL and key are set and the URL is not a
    /// placeholder left over from a template.
    pub fn is_remote_configured(&self) -> bool {
        match (&self.remote_url, &self.anon_key) {
            (Some(url), Some(key)) => {
                !url.trim().is_empty() && !key.trim().is_empty() && !url.contains("placeholder")
            }
            _ => false,
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the local snapshot files and the log.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_is_not_configured() {
        assert!(!Config::default().is_remote_configured());
    }

    #[test]
    fn test_overrides_prefer_first_non_empty() {
        let config = Config::default().with_overrides(env(&[
            ("SUPABASE_URL", ""),
            ("VITE_SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]));
        assert_eq!(config.remote_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.anon_key.as_deref(), Some("anon"));
        assert!(config.is_remote_configured());
    }

    #[test]
    fn test_overrides_keep_file_values_when_unset() {
        let config = Config {
            remote_url: Some("https://file.supabase.co".to_string()),
            anon_key: Some("file-key".to_string()),
            data_dir: None,
        }
        .with_overrides(env(&[]));
        assert_eq!(config.remote_url.as_deref(), Some("https://file.supabase.co"));
    }

    #[test]
    fn test_placeholder_url_is_not_configured() {
        let config = Config {
            remote_url: Some("https://placeholder.supabase.co".to_string()),
            anon_key: Some("anon".to_string()),
            data_dir: None,
        };
        assert!(!config.is_remote_configured());
    }

    #[test]
    fn test_data_dir_override() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/nexus")),
            ..Default::default()
        };
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/nexus"));
    }
}
