use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mise_core::{CostCache, RecipeCost};
use redis::{AsyncCommands, Client};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}

/// Recipe costs as JSON strings under `mise:cost:<tenant>:<recipe>`, expired
/// by Redis itself.
#[derive(Clone)]
pub struct RedisCostCache {
    client: Client,
}

impl RedisCostCache {
    pub fn new(bus: &RedisBus) -> Self {
        Self {
            client: bus.client().clone(),
        }
    }
}

fn cost_key(tenant_id: &str, recipe_id: Uuid) -> String {
    format!("mise:cost:{tenant_id}:{recipe_id}")
}

#[async_trait]
impl CostCache for RedisCostCache {
    async fn get(&self, tenant_id: &str, recipe_id: Uuid) -> Result<Option<RecipeCost>> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = connection.get(cost_key(tenant_id, recipe_id)).await?;

        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, tenant_id: &str, cost: &RecipeCost, ttl: Duration) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(cost)?;
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = connection
            .set_ex(cost_key(tenant_id, cost.recipe_id), serialized, seconds)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, tenant_id: &str, recipe_ids: &[Uuid]) -> Result<()> {
        if recipe_ids.is_empty() {
            return Ok(());
        }

        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = recipe_ids
            .iter()
            .map(|recipe_id| cost_key(tenant_id, *recipe_id))
            .collect();
        let _: i64 = connection.del(keys).await?;
        Ok(())
    }
}
