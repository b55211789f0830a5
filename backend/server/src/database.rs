//! # Redis
//!
//! Server-wide search tally.
//!
//! Every accepted `/verify` request bumps one integer key with `INCR`, which
//! Redis applies atomically, so concurrent handlers never lose a count. Without
//! `REDIS_URL` the tally lives in a process-local atomic and resets on restart.
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

pub const SEARCH_COUNT_KEY: &str = "search_count";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

pub enum Tally {
    Redis(ConnectionManager),
    Local(AtomicU64),
}

impl Tally {
    pub async fn connect(redis_url: Option<&str>) -> Result<Self, RedisError> {
        match redis_url {
            Some(url) => {
                let connection = init_redis(url).await?;
                info!("Connected to Redis for search tally");

                Ok(Tally::Redis(connection))
            }
            None => Ok(Tally::local()),
        }
    }

    pub fn local() -> Self {
        Tally::Local(AtomicU64::new(0))
    }

    pub async fn increment(&self) -> Result<u64, RedisError> {
        match self {
            Tally::Redis(connection) => connection.clone().incr(SEARCH_COUNT_KEY, 1).await,
            Tally::Local(count) => Ok(count.fetch_add(1, Ordering::Relaxed) + 1),
        }
    }

    pub async fn count(&self) -> Result<u64, RedisError> {
        match self {
            Tally::Redis(connection) => {
                let count: Option<u64> = connection.clone().get(SEARCH_COUNT_KEY).await?;

                Ok(count.unwrap_or(0))
            }
            Tally::Local(count) => Ok(count.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_tally() {
        let tally = Tally::connect(None).await.unwrap();

        assert_eq!(tally.count().await.unwrap(), 0);
        assert_eq!(tally.increment().await.unwrap(), 1);
        assert_eq!(tally.increment().await.unwrap(), 2);
        assert_eq!(tally.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bad_redis_url() {
        assert!(Tally::connect(Some("not a url")).await.is_err());
    }
}
