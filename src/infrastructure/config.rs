use crate::application::auto_save::AutoSavePolicy;
use crate::application::history::DEFAULT_HISTORY_LIMIT;
use crate::domain::catalog::Catalog;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct BuilderConfig {
    pub api: ApiSettings,
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub history_limit: usize,
    pub auto_save: AutoSaveSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AutoSaveSettings {
    pub interval_ms: u64,
    pub backoff_ms: Vec<u64>,
    pub max_failures: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let policy = AutoSavePolicy::default();
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            auto_save: AutoSaveSettings {
                interval_ms: policy.interval.as_millis() as u64,
                backoff_ms: policy.backoff.iter().map(|d| d.as_millis() as u64).collect(),
                max_failures: policy.max_failures,
            },
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_secs: 300,
        }
    }
}

impl AutoSaveSettings {
    pub fn policy(&self) -> AutoSavePolicy {
        AutoSavePolicy {
            interval: Duration::from_millis(self.interval_ms),
            backoff: self.backoff_ms.iter().copied().map(Duration::from_millis).collect(),
            max_failures: self.max_failures,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Load `config/builder.toml` (optional) with `BUILDER__*` environment overrides
pub fn load_builder_config() -> anyhow::Result<BuilderConfig> {
    build_config(config::File::with_name("config/builder").required(false))
}

fn build_config<S>(source: S) -> anyhow::Result<BuilderConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .set_default("api.base_url", "http://127.0.0.1:8080")?
        .set_default("api.timeout_secs", 15)?
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("session.history_limit", DEFAULT_HISTORY_LIMIT as u64)?
        .set_default("session.auto_save.interval_ms", 30_000)?
        .set_default("session.auto_save.backoff_ms", vec![5_000, 10_000, 20_000])?
        .set_default("session.auto_save.max_failures", 3)?
        .set_default("cache.capacity", 64)?
        .set_default("cache.ttl_secs", 300)?
        .add_source(source)
        .add_source(
            config::Environment::with_prefix("BUILDER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Load the widget catalog from a TOML file and validate every chart
pub fn load_catalog(path: impl AsRef<Path>) -> anyhow::Result<Catalog> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    parse_catalog(&raw)
}

pub fn parse_catalog(raw: &str) -> anyhow::Result<Catalog> {
    let catalog: Catalog = toml::from_str(raw).context("Failed to parse widget catalog")?;
    if let Err((id, err)) = catalog.validate() {
        anyhow::bail!("Catalog item {} is invalid: {}", id, err);
    }
    Ok(catalog)
}
