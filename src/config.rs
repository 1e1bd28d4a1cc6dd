//! Runtime settings. JSON file first, then `MMMS_*` environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::access::RouteTable;
use crate::error::{AppError, AppResult};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AccessConfig {
    /// Session file. Unset keeps the session in memory only.
    pub store_path: Option<PathBuf>,
    pub login_latency_ms: u64,
    pub register_latency_ms: u64,
    pub landing_path: String,
    pub login_path: String,
    pub log_filter: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            login_latency_ms: 0,
            register_latency_ms: 1_000,
            landing_path: "/dashboard".to_string(),
            login_path: "/login".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> AppResult<Self> {
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::user("config_unreadable".to_string(), format!("{}: {}", path.display(), e)))?;
        let mut cfg: AccessConfig = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::user("config_malformed".to_string(), format!("{}: {}", path.display(), e)))?;
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay values from a variable lookup; unparsable numbers are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MMMS_STORE_PATH") {
            self.store_path = if v.trim().is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        for (key, slot) in [
            ("MMMS_LOGIN_LATENCY_MS", &mut self.login_latency_ms),
            ("MMMS_REGISTER_LATENCY_MS", &mut self.register_latency_ms),
        ] {
            if let Some(v) = lookup(key) {
                match v.trim().parse::<u64>() {
                    Ok(n) => *slot = n,
                    Err(_) => warn!(target: "mmms::config", "ignoring {}='{}': not a number", key, v),
                }
            }
        }
        if let Some(v) = lookup("MMMS_LANDING_PATH") { self.landing_path = v; }
        if let Some(v) = lookup("MMMS_LOGIN_PATH") { self.login_path = v; }
        if let Some(v) = lookup("MMMS_LOG") { self.log_filter = v; }
    }

    pub fn validate(&self) -> AppResult<()> {
        for (name, p) in [("landing_path", &self.landing_path), ("login_path", &self.login_path)] {
            if !p.starts_with('/') {
                return Err(AppError::user("config_invalid".to_string(), format!("{} '{}' must start with '/'", name, p)));
            }
        }
        if self.landing_path == self.login_path {
            return Err(AppError::user("config_invalid", "landing_path and login_path must differ"));
        }
        // The dashboard is mounted at the landing path, so it must not shadow another page.
        let stock = RouteTable::standard("/dashboard", &self.login_path);
        if self.landing_path != "/dashboard" {
            if let Some(hit) = stock.resolve(&self.landing_path) {
                return Err(AppError::user(
                    "config_invalid".to_string(),
                    format!("landing_path '{}' collides with route '{}'", self.landing_path, hit.pattern),
                ));
            }
        }
        Ok(())
    }
}
