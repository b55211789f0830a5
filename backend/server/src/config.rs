use std::{
    env,
    fmt::Display,
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, anyhow, bail};
use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Remote { url: String, api_key: String },
    Fixture(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub source: SourceConfig,
    pub redis_url: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), Path::new(SECRETS_DIR))
    }

    /// Same resolution as [`Config::load`] over an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F, secrets_dir: &Path) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match var("SUPABASE_URL") {
            Some(url) => SourceConfig::Remote {
                api_key: secret(&var, secrets_dir, "SUPABASE_ANON_KEY")?,
                url,
            },
            None => match var("FIXTURE_PATH") {
                Some(path) => SourceConfig::Fixture(PathBuf::from(path)),
                None => bail!("Neither SUPABASE_URL nor FIXTURE_PATH is set"),
            },
        };

        let redis_url = var("REDIS_URL");
        if redis_url.is_none() {
            info!("REDIS_URL not set, counting searches in memory");
        }

        Ok(Self {
            port: try_load(&var, "RUST_PORT", "1111")?,
            source,
            redis_url,
        })
    }
}

fn try_load<T, F>(var: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value {value:?}: {e}")
    })
}

/// Environment first, then the mounted secret file.
fn secret<F>(var: &F, secrets_dir: &Path, name: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = var(name) {
        return Ok(value);
    }

    let path = secrets_dir.join(name);
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read {name} from {}", path.display()))
}
