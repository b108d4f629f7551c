use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_CATALOG_TTL_SECS: i64 = 5 * 60;

/// Settings read from `coursehub.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx URL; `None` means the SQLite file in the platform data dir.
    pub database_url: Option<String>,
    /// PostgREST base URL. When unset, the local database is the catalog source.
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub catalog_ttl_secs: i64,
    pub run_migrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            backend_url: None,
            api_key: None,
            catalog_ttl_secs: DEFAULT_CATALOG_TTL_SECS,
            run_migrations: true,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location if it exists, then apply
    /// `COURSEHUB_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&text).with_context(|| format!("parsing config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Overrides from a key lookup; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = var("COURSEHUB_DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = var("COURSEHUB_BACKEND_URL") {
            self.backend_url = Some(v);
        }
        if let Some(v) = var("COURSEHUB_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(ttl) = var("COURSEHUB_CATALOG_TTL_SECS").and_then(|v| parse_or_warn("COURSEHUB_CATALOG_TTL_SECS", &v)) {
            self.catalog_ttl_secs = ttl;
        }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| warn!("Invalid {key} value {value:?}: {e}")).ok()
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "coursehub", "coursehub").map(|p| p.config_dir().join("coursehub.toml"))
}
