use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::canonical::SortOrder;
use crate::scope::{Scope, ScopeBuilder, ScopeTable};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// Configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: Option<UpstreamConfig>,
    #[serde(default)]
    pub sorted_args: SortedArgsConfig,
    #[serde(default)]
    pub cache_key: CacheKeyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default)]
    pub listen: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortedArgsConfig {
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub filter: Option<Vec<String>>,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub prefix: String,
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub filter: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheKeyConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for CacheKeyConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl ServerConfig {
    pub fn new(port: u16, listen: Vec<String>) -> Self {
        Self { port, listen }
    }
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>, timeout: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Result<Duration> {
        match &self.timeout {
            Some(ttl) => parse_duration(ttl),
            None => Ok(DEFAULT_UPSTREAM_TIMEOUT),
        }
    }
}

impl LocationConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            order: None,
            filter: None,
        }
    }

    pub fn with_filter<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }
}

impl AppConfig {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            server,
            upstream: None,
            sorted_args: SortedArgsConfig::default(),
            cache_key: CacheKeyConfig::default(),
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        serde_yaml::from_str(data).context("invalid configuration")
    }

    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_filter<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.sorted_args.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.sorted_args.order = Some(order);
        self
    }

    pub fn with_location(mut self, location: LocationConfig) -> Self {
        self.sorted_args.locations.push(location);
        self
    }

    /// Builds the main scope and one scope per location, each location
    /// inheriting what it leaves unset from the main scope.
    pub fn scopes(&self) -> Result<ScopeTable> {
        let mut main = ScopeBuilder::new("main");
        apply(&mut main, self.sorted_args.order, self.sorted_args.filter.as_deref())?;
        let main: Scope = main.merge(None);

        let mut table = ScopeTable::new(main.clone());

        for location in &self.sorted_args.locations {
            let mut builder = ScopeBuilder::new(location.prefix.as_str());
            apply(&mut builder, location.order, location.filter.as_deref())?;
            table.insert(location.prefix.as_str(), builder.merge(Some(&main)))?;
        }

        Ok(table)
    }
}

fn apply(builder: &mut ScopeBuilder, order: Option<SortOrder>, filter: Option<&[String]>) -> Result<()> {
    if let Some(order) = order {
        builder.order(order);
    }
    if let Some(names) = filter {
        builder.filter(names)?;
    }
    Ok(())
}

pub fn parse_duration(ttl: &str) -> Result<Duration> {
    let (count, unit) = if let Some(stripped) = ttl.strip_suffix('y') {
        (stripped, 365 * 24 * 3600)
    } else if let Some(stripped) = ttl.strip_suffix('w') {
        (stripped, 7 * 24 * 3600)
    } else if let Some(stripped) = ttl.strip_suffix('d') {
        (stripped, 24 * 3600)
    } else {
        return Ok(humantime::parse_duration(ttl)?);
    };

    let n: u64 = count.parse()?;
    let secs = n
        .checked_mul(unit)
        .ok_or_else(|| anyhow!("duration {:?} is too large", ttl))?;
    Ok(Duration::from_secs(secs))
}

pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        return Err(anyhow!("Invalid port"));
    }
    if config.server.listen.iter().any(|addr| addr.trim().is_empty()) {
        return Err(anyhow!("Empty listen address"));
    }
    if let Some(upstream) = &config.upstream {
        if upstream.base_url.is_empty() {
            return Err(anyhow!("Upstream base_url required"));
        }
        upstream.timeout().context("invalid upstream timeout")?;
    }
    if config.cache_key.namespace.is_empty() {
        return Err(anyhow!("Cache key namespace required"));
    }
    config.scopes()?;
    Ok(())
}
