use std::path::Path;

use ::config::{Config, Environment, Map};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Loads a config struct from `APP_*` environment variables, `__` separating
/// nested sections (`APP_AUTH__SESSION_TTL_HOURS=12`).
pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "APP";
    const SEPARATOR: &'static str = "__";

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Reads `.env` next to the manifest (or the working directory) first.
    fn from_env() -> Result<Self> {
        load_dotenv();
        Self::load(None)
    }

    /// Same parsing as [`EnvConfig::from_env`] over an explicit variable set.
    fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::load(Some(vars))
    }

    fn load(source: Option<Map<String, String>>) -> Result<Self> {
        let environment = Environment::with_prefix(Self::PREFIX)
            .prefix_separator("_")
            .separator(Self::SEPARATOR)
            .try_parsing(true)
            .source(source);

        let cfg: Self = Config::builder()
            .add_source(environment)
            .build()
            .context("failed to read environment variables for config")?
            .try_deserialize()
            .context("failed to deserialize environment into config")?;

        cfg.validate()?;
        Ok(cfg)
    }
}

fn load_dotenv() {
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if dotenvy::from_filename(&manifest_env).is_err() {
        dotenvy::dotenv().ok();
    }
}
