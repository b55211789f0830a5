use std::sync::Arc;

use registry::Registry;

use super::{
    config::{Config, SourceConfig},
    database::Tally,
};

pub struct State {
    pub config: Config,
    pub registry: Registry,
    pub tally: Tally,
}

impl State {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let registry = match &config.source {
            SourceConfig::Remote { url, api_key } => Registry::remote(url, api_key)?,
            SourceConfig::Fixture(path) => Registry::fixture(path)?,
        };

        let tally = Tally::connect(config.redis_url.as_deref()).await?;

        Ok(Arc::new(Self {
            config,
            registry,
            tally,
        }))
    }
}
