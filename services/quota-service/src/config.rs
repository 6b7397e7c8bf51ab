use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coffer_quota_core::QuotaSettings;

#[derive(Debug, Clone)]
pub struct QuotaServiceConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub settings_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for QuotaServiceConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8184,
            data_dir: PathBuf::from("data/quota"),
            settings_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl QuotaServiceConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("QUOTA_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("QUOTA_PORT") {
            cfg.server_port = port.parse().context("QUOTA_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(file) = env::var("QUOTA_SETTINGS_FILE") {
            cfg.settings_file = Some(PathBuf::from(file));
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if let Some(file) = &self.settings_file {
            if !file.is_file() {
                anyhow::bail!("QUOTA_SETTINGS_FILE {} does not exist", file.display());
            }
        }

        Ok(())
    }

    /// Loads the quota limits from the configured settings file: a JSON
    /// object of flat `quotas.*` keys with integer (or integer string)
    /// values. Without a file every limit is unlimited.
    pub fn load_quota_settings(&self) -> Result<QuotaSettings> {
        let Some(path) = &self.settings_file else {
            return Ok(QuotaSettings::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to read settings file {}", path.display()))?;
        let entries: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
            .with_context(|| format!("settings file {} is not a JSON object", path.display()))?;

        let flat = entries.into_iter().map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        });

        QuotaSettings::from_flat_map(flat)
            .with_context(|| format!("invalid quota settings in {}", path.display()))
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}
