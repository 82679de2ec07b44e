mod cache;

use std::collections::HashMap;

use async_trait::async_trait;
use mise_core::{
    DocumentStore, Ingredient, MovementLog, Record, RecordKind, RevisionConflict, StockMovement,
};
use tokio::sync::RwLock;
use uuid::Uuid;

pub use cache::InMemoryCostCache;

#[derive(Default)]
struct TenantData {
    // Insertion order is the catalog scan order.
    records: Vec<Record>,
    movements: HashMap<Uuid, Vec<StockMovement>>,
}

impl TenantData {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    fn replace_checked(&mut self, ingredient: Ingredient) -> anyhow::Result<()> {
        let stored = self.position(ingredient.id).and_then(|index| match &self.records[index] {
            Record::Ingredient(stored) => Some(stored.revision),
            _ => None,
        });
        if stored.map(|revision| revision + 1) != Some(ingredient.revision) {
            return Err(RevisionConflict {
                id: ingredient.id,
                expected: ingredient.revision.saturating_sub(1),
            }
            .into());
        }
        self.upsert(Record::Ingredient(ingredient));
        Ok(())
    }

    fn upsert(&mut self, record: Record) {
        match self.position(record.id()) {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }
}

/// Process-local store for tests and embedded use. One lock guards every
/// tenant, so the revision check, the movement and its projection are
/// applied together.
#[derive(Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<String, TenantData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<Option<Record>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(tenant_id).and_then(|tenant| {
            tenant
                .position(id)
                .map(|index| tenant.records[index].clone())
        }))
    }

    async fn save(&self, tenant_id: &str, record: Record) -> anyhow::Result<()> {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .upsert(record);
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, id: Uuid) -> anyhow::Result<()> {
        let mut tenants = self.tenants.write().await;
        if let Some(tenant) = tenants.get_mut(tenant_id) {
            if let Some(index) = tenant.position(id) {
                tenant.records.remove(index);
            }
        }
        Ok(())
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        kind: RecordKind,
    ) -> anyhow::Result<Vec<Record>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .map(|tenant| {
                tenant
                    .records
                    .iter()
                    .filter(|record| record.kind() == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl MovementLog for InMemoryStore {
    async fn commit_movement(
        &self,
        tenant_id: &str,
        ingredient: Ingredient,
        movement: StockMovement,
    ) -> anyhow::Result<()> {
        if movement.ingredient_id != ingredient.id {
            anyhow::bail!(
                "movement {} belongs to ingredient {}, not {}",
                movement.id,
                movement.ingredient_id,
                ingredient.id
            );
        }

        let mut tenants = self.tenants.write().await;
        let tenant = tenants.entry(tenant_id.to_string()).or_default();
        let ingredient_id = ingredient.id;
        tenant.replace_checked(ingredient)?;
        tenant
            .movements
            .entry(ingredient_id)
            .or_default()
            .push(movement);

        Ok(())
    }

    async fn replace_ingredient(
        &self,
        tenant_id: &str,
        ingredient: Ingredient,
    ) -> anyhow::Result<()> {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .replace_checked(ingredient)
    }

    async fn movements(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
    ) -> anyhow::Result<Vec<StockMovement>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .and_then(|tenant| tenant.movements.get(&ingredient_id).cloned())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use mise_core::{MovementType, Recipe, Unit};
    use rust_decimal_macros::dec;

    use super::*;

    #[tokio::test]
    async fn records_are_isolated_per_tenant() {
        let store = InMemoryStore::new();
        let flour = Ingredient::new("Flour", Unit::Kilogram, dec!(2));
        store.save("bistro", flour.clone().into()).await.unwrap();

        assert!(store.get("bistro", flour.id).await.unwrap().is_some());
        assert!(store.get("cantina", flour.id).await.unwrap().is_none());
        assert!(store.list_ingredients("cantina").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_keeps_insertion_order_and_filters_kind() {
        let store = InMemoryStore::new();
        let tomato = Ingredient::new("Tomato", Unit::Kilogram, dec!(1));
        let basil = Ingredient::new("Basil", Unit::Gram, dec!(50));
        let sauce = Recipe::new("Sauce", dec!(1), Unit::Liter);

        store.save("bistro", tomato.clone().into()).await.unwrap();
        store.save("bistro", sauce.into()).await.unwrap();
        store.save("bistro", basil.clone().into()).await.unwrap();

        let mut renamed = tomato.clone();
        renamed.name = "Roma tomato".to_string();
        store.save("bistro", renamed.into()).await.unwrap();

        let names: Vec<String> = store
            .list_ingredients("bistro")
            .await
            .unwrap()
            .into_iter()
            .map(|ingredient| ingredient.name)
            .collect();
        assert_eq!(names, vec!["Roma tomato", "Basil"]);
    }

    #[tokio::test]
    async fn commit_writes_movement_and_projection_together() {
        let store = InMemoryStore::new();
        let mut oil = Ingredient::new("Olive oil", Unit::Liter, dec!(1));
        store.save("bistro", oil.clone().into()).await.unwrap();

        oil.current_stock = dec!(5);
        oil.touch();
        let movement = StockMovement::new(oil.id, MovementType::In, dec!(5), dec!(40), None);
        store
            .commit_movement("bistro", oil.clone(), movement.clone())
            .await
            .unwrap();

        let stored = store.get_ingredient("bistro", oil.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, dec!(5));
        assert_eq!(store.movements("bistro", oil.id).await.unwrap(), vec![movement]);
    }

    #[tokio::test]
    async fn stale_writes_are_rejected_without_side_effects() {
        let store = InMemoryStore::new();
        let oil = Ingredient::new("Olive oil", Unit::Liter, dec!(1));
        store.save("bistro", oil.clone().into()).await.unwrap();

        let mut first = oil.clone();
        first.current_stock = dec!(2);
        first.touch();
        let mut second = oil.clone();
        second.current_stock = dec!(3);
        second.touch();

        let movement = |quantity| StockMovement::new(oil.id, MovementType::In, quantity, dec!(1), None);
        store.commit_movement("bistro", first, movement(dec!(2))).await.unwrap();
        let err = store
            .commit_movement("bistro", second.clone(), movement(dec!(3)))
            .await
            .unwrap_err();
        assert!(RevisionConflict::is_conflict(&err));
        assert!(store.replace_ingredient("bistro", second).await.is_err());

        let stored = store.get_ingredient("bistro", oil.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, dec!(2));
        assert_eq!(stored.revision, 1);
        assert_eq!(store.movements("bistro", oil.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_rejects_mismatched_movement() {
        let store = InMemoryStore::new();
        let oil = Ingredient::new("Olive oil", Unit::Liter, dec!(1));
        let movement = StockMovement::new(Uuid::new_v4(), MovementType::In, dec!(1), dec!(1), None);

        assert!(store.commit_movement("bistro", oil.clone(), movement).await.is_err());
        assert!(store.get("bistro", oil.id).await.unwrap().is_none());
    }
}
