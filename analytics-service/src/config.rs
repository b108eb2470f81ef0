use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::analytics::climate::DEFAULT_BASE_TEMP_C;

const CONFIG_ENV: &str = "ANALYTICS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "analytics-config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the repository lives. Without a path the store is in-memory and
/// lost on exit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Seed for the demo fixture generator.
    pub rng_seed: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { rng_seed: 42 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub base_temp_c: f64,
    /// Reference daily energy spend the cooling cost impact is applied to.
    pub daily_energy_cost: f64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            base_temp_c: DEFAULT_BASE_TEMP_C,
            daily_energy_cost: 1600.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub daily_limit: u32,
    pub cache_ttl_hours: i64,
    pub quota_window_hours: i64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            daily_limit: 50,
            cache_ttl_hours: 48,
            quota_window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub seed: SeedConfig,
    pub climate: ClimateConfig,
    pub narrative: NarrativeConfig,
    pub ingest: IngestConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Loads the file named by `ANALYTICS_CONFIG`, else `analytics-config.toml`
    /// in the working directory. A missing default file yields the defaults;
    /// an explicitly configured file must exist.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let (path, explicit) = match env::var(CONFIG_ENV) {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.ingest.batch_size == 0 {
            anyhow::bail!("ingest.batch_size must be at least 1");
        }
        Ok(cfg)
    }
}
