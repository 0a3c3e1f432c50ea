use std::{
    env,
    path::{Path, PathBuf},
};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use heapwatch_core::settings::{
    endpoint::EndpointSettings,
    output::OutputSettings,
    sampler::{SamplerSettings, TriggerSettings},
};
use heapwatch_core::TriggerPolicy;
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "HEAPWATCH";
pub const RUN_MODE_VAR: &str = "HEAPWATCH_RUN_MODE";

#[derive(Debug, Deserialize, Clone, Default)]
#[readonly::make]
pub struct Settings {
    pub sampler: SamplerSettings,
    pub trigger: TriggerSettings,
    pub output: OutputSettings,
    pub endpoint: EndpointSettings,
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Defaults plus the optional files below `config_dir`, without the
    /// environment.
    pub fn layered(
        config_dir: &Path,
        run_mode: &str,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Config::builder()
            .set_default("sampler.interval", "10s")?
            .set_default("sampler.missed_tick", "burst")?
            .set_default("trigger.enabled", true)?
            .set_default("trigger.window", "60s")?
            .set_default("trigger.capture_window", "10s")?
            .set_default("output.csv_path", "memory_profiler_output.csv")?
            .set_default("output.heap_dump_dir", "heap_dump")?
            .set_default("endpoint.request_timeout", "5s")?
            .set_default("endpoint.snapshot_timeout", "10m")?
            .set_default("endpoint.max_retries", 2)?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(run_mode)).required(false))
            .add_source(File::from(config_dir.join("local")).required(false));

        Ok(builder)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var(RUN_MODE_VAR).unwrap_or_else(|_| "development".into());
        debug!(run_mode = %run_mode, "Loading settings");

        let config = Self::layered(Path::new("config"), &run_mode)?
            .add_source(Self::get_environment())
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sampler.interval.is_zero() {
            return Err(ConfigError::Message(
                "sampler.interval must be greater than zero".into(),
            ));
        }
        if self.trigger.enabled {
            self.trigger_policy()?;
        }
        Ok(())
    }

    pub fn trigger_policy(&self) -> Result<TriggerPolicy, ConfigError> {
        TriggerPolicy::new(
            self.trigger.window.into(),
            self.trigger.capture_window.into(),
        )
        .map_err(|e| ConfigError::Message(format!("Invalid trigger settings: {e}")))
    }
}

/// Loads `.env.local` and then `.env` from the working directory. Variables
/// already present in the environment are never overridden.
/// Loads `.env.local` and then `.env` from the working directory. Returns
/// the files that were read, so they can be logged once tracing is up
/// (the files may carry `RUST_LOG` themselves).
pub fn load_env_files() -> Vec<PathBuf> {
    load_env_files_from(Path::new("."))
}

/// Variables already set win, so `.env.local` overrides `.env`.
pub fn load_env_files_from(dir: &Path) -> Vec<PathBuf> {
    [".env.local", ".env"]
        .into_iter()
        .map(|file| dir.join(file))
        .filter(|path| dotenvy::from_path(path).is_ok())
        .collect()
}
