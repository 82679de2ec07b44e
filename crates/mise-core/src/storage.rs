use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Ingredient, Recipe, RecipeCost, Record, RecordKind, ShoppingListItem, StockMovement,
};

/// Tenant-scoped document persistence. `save` must be atomic for a single
/// record.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<Option<Record>>;
    async fn save(&self, tenant_id: &str, record: Record) -> anyhow::Result<()>;
    async fn delete(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<()>;
    async fn list_by_tenant(&self, tenant_id: &str, kind: RecordKind)
    -> anyhow::Result<Vec<Record>>;

    async fn get_ingredient(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<Option<Ingredient>> {
        Ok(self.get(tenant_id, id).await?.and_then(Record::into_ingredient))
    }

    async fn get_recipe(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        Ok(self.get(tenant_id, id).await?.and_then(Record::into_recipe))
    }

    async fn list_ingredients(&self, tenant_id: &str) -> anyhow::Result<Vec<Ingredient>> {
        let records = self.list_by_tenant(tenant_id, RecordKind::Ingredient).await?;
        Ok(records.into_iter().filter_map(Record::into_ingredient).collect())
    }

    async fn list_recipes(&self, tenant_id: &str) -> anyhow::Result<Vec<Recipe>> {
        let records = self.list_by_tenant(tenant_id, RecordKind::Recipe).await?;
        Ok(records.into_iter().filter_map(Record::into_recipe).collect())
    }

    async fn list_shopping_items(&self, tenant_id: &str) -> anyhow::Result<Vec<ShoppingListItem>> {
        let records = self
            .list_by_tenant(tenant_id, RecordKind::ShoppingListItem)
            .await?;
        Ok(records
            .into_iter()
            .filter_map(Record::into_shopping_list_item)
            .collect())
    }
}

/// The Kardex and the ingredient projection it maintains.
///
/// Writes of a stored ingredient are compare-and-swap: the ingredient must
/// carry the stored revision plus one (see `Ingredient::touch`), otherwise
/// the write fails with `RevisionConflict` and nothing changes.
#[async_trait]
pub trait MovementLog: Send + Sync {
    /// Writes the movement and the updated projection as one transaction.
    async fn commit_movement(
        &self,
        tenant_id: &str,
        ingredient: Ingredient,
        movement: StockMovement,
    ) -> anyhow::Result<()>;

    /// Replaces a stored ingredient without a movement (metadata, active flag).
    async fn replace_ingredient(&self, tenant_id: &str, ingredient: Ingredient)
    -> anyhow::Result<()>;

    /// Movements for one ingredient, oldest first.
    async fn movements(&self, tenant_id: &str, ingredient_id: Uuid)
    -> anyhow::Result<Vec<StockMovement>>;
}

/// Everything the engine needs from its persistence collaborator.
pub trait InventoryStore: DocumentStore + MovementLog {}

impl<T: DocumentStore + MovementLog> InventoryStore for T {}

/// Cache for derived recipe costs. Entries expire after their TTL and are
/// invalidated explicitly when a recipe or an ingredient cost changes.
#[async_trait]
pub trait CostCache: Send + Sync {
    async fn get(&self, tenant_id: &str, recipe_id: Uuid) -> anyhow::Result<Option<RecipeCost>>;
    async fn put(
        &self,
        tenant_id: &str,
        cost: &RecipeCost,
        ttl: Duration,
    ) -> anyhow::Result<()>;
    async fn invalidate(&self, tenant_id: &str, recipe_ids: &[Uuid]) -> anyhow::Result<()>;
}
