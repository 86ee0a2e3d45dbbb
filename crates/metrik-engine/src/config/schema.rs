use serde::Deserialize;

use metrik_core::error::{MetrikError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub durable: DurableSection,

    #[serde(default)]
    pub sampling: SamplingSection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            store: StoreSection::default(),
            durable: DurableSection::default(),
            sampling: SamplingSection::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetrikError::UnsupportedVersion);
        }
        self.store.validate()?;
        self.durable.validate()?;
        self.sampling.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Maximum records held in memory; oldest-first eviction beyond this.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=10_000_000).contains(&self.capacity) {
            return Err(MetrikError::BadRequest(
                "store.capacity must be between 10 and 10000000".into(),
            ));
        }
        if !(1..=86_400).contains(&self.cache_ttl_secs) {
            return Err(MetrikError::BadRequest(
                "store.cache_ttl_secs must be between 1 and 86400".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurableSection {
    /// SQLite file path; empty disables the durable path entirely.
    #[serde(default = "default_durable_path")]
    pub path: String,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for DurableSection {
    fn default() -> Self {
        Self {
            path: default_durable_path(),
            retention_days: default_retention_days(),
        }
    }
}

impl DurableSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3650).contains(&self.retention_days) {
            return Err(MetrikError::BadRequest(
                "durable.retention_days must be between 1 and 3650".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingSection {
    #[serde(default = "default_resource_interval_secs")]
    pub resource_interval_secs: u64,

    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,

    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            resource_interval_secs: default_resource_interval_secs(),
            health_interval_secs: default_health_interval_secs(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

impl SamplingSection {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("sampling.resource_interval_secs", self.resource_interval_secs),
            ("sampling.health_interval_secs", self.health_interval_secs),
            ("sampling.retention_interval_secs", self.retention_interval_secs),
        ] {
            if !(1..=86_400).contains(&v) {
                return Err(MetrikError::BadRequest(format!(
                    "{name} must be between 1 and 86400"
                )));
            }
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8086".into()
}
fn default_capacity() -> usize {
    10_000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_durable_path() -> String {
    "data/metrik.db".into()
}
fn default_retention_days() -> u32 {
    30
}
fn default_resource_interval_secs() -> u64 {
    30
}
fn default_health_interval_secs() -> u64 {
    60
}
fn default_retention_interval_secs() -> u64 {
    3600
}
