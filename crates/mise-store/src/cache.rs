use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mise_core::{CostCache, RecipeCost};
use tokio::sync::RwLock;
use uuid::Uuid;

/// TTL cache of recipe costs held in process memory. A TTL too large to
/// represent as an `Instant` never expires.
#[derive(Default)]
pub struct InMemoryCostCache {
    entries: RwLock<HashMap<(String, Uuid), (Option<Instant>, RecipeCost)>>,
}

impl InMemoryCostCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CostCache for InMemoryCostCache {
    async fn get(&self, tenant_id: &str, recipe_id: Uuid) -> anyhow::Result<Option<RecipeCost>> {
        let key = (tenant_id.to_string(), recipe_id);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some((expires_at, cost))
                    if expires_at.is_none_or(|expires_at| expires_at > Instant::now()) =>
                {
                    return Ok(Some(cost.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // expired
        self.entries.write().await.remove(&key);
        Ok(None)
    }

    async fn put(&self, tenant_id: &str, cost: &RecipeCost, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            (tenant_id.to_string(), cost.recipe_id),
            (Instant::now().checked_add(ttl), cost.clone()),
        );
        Ok(())
    }

    async fn invalidate(&self, tenant_id: &str, recipe_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        for recipe_id in recipe_ids {
            entries.remove(&(tenant_id.to_string(), *recipe_id));
        }
        Ok(())
    }
}
