use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use log::*;
use r2d2::Pool;
use r2d2_postgres::{PostgresConnectionManager, TlsMode};
use serde::{Deserialize, Serialize};
use url::Url;

use infra::persistence::DocumentConnectionManager;

const ENV_PREFIX: &str = "CONFECT_";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub profile: ProfileConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default)]
    pub pool_size: Option<u32>,
}

/// The operator the command line acts for.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub name: String,
    pub email: String,
}

/// Settings that may be overridden from `CONFECT_*` environment variables.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
struct EnvOverrides {
    postgres_url: Option<String>,
    pool_size: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    #[serde(default)]
    modules: HashMap<String, LogLevel>,
    #[serde(default)]
    timestamp_nanos: bool,
}

impl Config {
    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_env::<EnvOverrides>()
            .context("read environment overrides")?;
        Ok(self.apply(overrides))
    }

    /// As `with_env`, reading variables from `vars`.
    pub fn with_vars<I>(self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, EnvOverrides>(vars)
            .context("read environment overrides")?;
        Ok(self.apply(overrides))
    }

    fn apply(mut self, overrides: EnvOverrides) -> Self {
        if let Some(url) = overrides.postgres_url {
            debug!("Database url overridden from environment");
            self.postgres.url = url;
        }
        if let Some(size) = overrides.pool_size {
            debug!("Pool size overridden from environment: {}", size);
            self.postgres.pool_size = Some(size);
        }
        self
    }
}

impl PostgresConfig {
    pub(crate) fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.url).context("parse database url")?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(url),
            other => bail!("unsupported database scheme: {:?}", other),
        }
    }

    pub(crate) fn build(&self) -> Result<Pool<DocumentConnectionManager>> {
        let url = self.validate()?;
        debug!("Build pool for {}:{:?}", url.host_str().unwrap_or(""), url.port());

        let manager = PostgresConnectionManager::new(url.as_str(), TlsMode::None)
            .context("connection manager")?;

        let mut builder = r2d2::Pool::builder();
        if let Some(size) = self.pool_size {
            builder = builder.max_size(size);
        }

        debug!("Pool builder: {:?}", builder);
        let pool = builder
            .build(DocumentConnectionManager::new(manager))
            .context("build pool")?;

        Ok(pool)
    }
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
