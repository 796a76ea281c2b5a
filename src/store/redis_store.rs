use super::{RecordStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::info;

/// Redis-backed record store, one hash per visit
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `redis_url`
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis successfully");

        Ok(Self { redis })
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.redis.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn merge_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        // One HMSET, so report and status land together
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
