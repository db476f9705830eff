//! Configuration management for the TraderDNA command line

use std::path::Path;

use serde::Deserialize;
use traderdna_core::AnalysisConfig;

use crate::error::Result;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Report cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum cached reports
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_ttl() -> u64 {
    3600 // 1 hour
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print single reports
    #[serde(default)]
    pub pretty: bool,
}

const ENV_PREFIX: &str = "TRADERDNA";
const ENV_SEPARATOR: &str = "__";

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Without an explicit path, `traderdna.{toml,json,yaml}` in the working
    /// directory is used when present. Environment variables use the
    /// `TRADERDNA__` prefix with `__` between levels, e.g.
    /// `TRADERDNA__ANALYSIS__PERIODS_PER_YEAR=252`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(
            path,
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
    }

    fn load_with(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("traderdna").required(false),
        };

        let settings = config::Config::builder()
            .set_default("cache.enabled", default_cache_enabled())?
            .set_default("cache.max_capacity", default_max_capacity() as i64)?
            .set_default("cache.ttl_seconds", default_ttl() as i64)?
            .add_source(file)
            .add_source(environment)
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.analysis.validate()?;
        Ok(config)
    }
}
