use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mise_core::{
    CostCache, DocumentStore, EngineError, EngineResult, Ingredient, Recipe, RecipeCost,
    RecordKind, Reference,
};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::resolver::resolve_cost;

/// Recipes persisted with their cached rollup, plus the cost cache in front
/// of the resolver.
pub struct RecipeBook<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<S, C> Clone for RecipeBook<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
        }
    }
}

struct Snapshot {
    ingredients: HashMap<Uuid, Ingredient>,
    recipes: HashMap<Uuid, Recipe>,
    // catalog order, for deterministic refreshes
    order: Vec<Uuid>,
}

impl<S, C> RecipeBook<S, C>
where
    S: DocumentStore,
    C: CostCache,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> EngineResult<Recipe> {
        self.store
            .get_recipe(tenant_id, id)
            .await?
            .ok_or(EngineError::NotFound {
                kind: RecordKind::Recipe,
                id,
            })
    }

    pub async fn list(&self, tenant_id: &str) -> EngineResult<Vec<Recipe>> {
        Ok(self.store.list_recipes(tenant_id).await?)
    }

    /// Validates and stores `recipe` with a fresh `total_cost`.
    ///
    /// Recipes that include this one are recomputed afterwards. A cycle or an
    /// unconvertible line rejects the save before anything is written.
    pub async fn save(&self, tenant_id: &str, mut recipe: Recipe) -> EngineResult<RecipeCost> {
        let name = recipe.name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("name", "recipe name is required"));
        }
        recipe.name = name.to_string();
        if recipe.yield_quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidYield {
                recipe: recipe.name.clone(),
            });
        }
        if recipe.ingredients.iter().any(|line| line.quantity <= Decimal::ZERO) {
            return Err(EngineError::InvalidQuantity {
                operation: "add line to",
                entity: recipe.name.clone(),
            });
        }

        let mut snapshot = self.snapshot(tenant_id).await?;
        if !snapshot.recipes.contains_key(&recipe.id) {
            snapshot.order.push(recipe.id);
        }
        snapshot.recipes.insert(recipe.id, recipe.clone());

        let cost = resolve_cost(&recipe, &snapshot.ingredients, &snapshot.recipes)?;

        recipe.total_cost = cost.total_cost;
        recipe.updated_at = Utc::now();
        self.store.save(tenant_id, recipe.clone().into()).await?;
        info!(
            "saved recipe {} ({}) for tenant {} at {} per {}",
            recipe.name, recipe.id, tenant_id, cost.cost_per_yield_unit, recipe.yield_unit
        );

        self.cache_cost(tenant_id, &cost).await;

        let dependents = dependents_of(&snapshot, Reference::Recipe(recipe.id));
        if !dependents.is_empty() {
            self.refresh(tenant_id, &snapshot, &dependents).await;
        }

        Ok(cost)
    }

    /// Cost of a stored recipe, served from the cache when possible. Cache
    /// failures fall back to resolving against the store.
    pub async fn cost(&self, tenant_id: &str, id: Uuid) -> EngineResult<RecipeCost> {
        match self.cache.get(tenant_id, id).await {
            Ok(Some(cost)) => return Ok(cost),
            Ok(None) => {}
            Err(err) => warn!("cost cache read failed for recipe {id}: {err:#}"),
        }

        let snapshot = self.snapshot(tenant_id).await?;
        let recipe = snapshot.recipes.get(&id).ok_or(EngineError::NotFound {
            kind: RecordKind::Recipe,
            id,
        })?;
        let cost = resolve_cost(recipe, &snapshot.ingredients, &snapshot.recipes)?;

        self.cache_cost(tenant_id, &cost).await;
        Ok(cost)
    }

    /// Recomputes every recipe that reaches `ingredient_id`, directly or
    /// through sub-recipes. Call after the ingredient's cost moved.
    ///
    /// Best effort: a recipe that no longer resolves is logged and skipped.
    pub async fn refresh_dependents(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
    ) -> EngineResult<Vec<RecipeCost>> {
        let snapshot = self.snapshot(tenant_id).await?;
        let affected = dependents_of(&snapshot, Reference::Ingredient(ingredient_id));
        Ok(self.refresh(tenant_id, &snapshot, &affected).await)
    }

    pub async fn refresh_all(&self, tenant_id: &str) -> EngineResult<Vec<RecipeCost>> {
        let snapshot = self.snapshot(tenant_id).await?;
        let all = snapshot.order.clone();
        Ok(self.refresh(tenant_id, &snapshot, &all).await)
    }

    /// Deletes a recipe that no other recipe uses.
    pub async fn remove(&self, tenant_id: &str, id: Uuid) -> EngineResult<()> {
        let recipe = self.get(tenant_id, id).await?;
        let users: Vec<String> = self
            .list(tenant_id)
            .await?
            .into_iter()
            .filter(|other| other.id != id && other.references(Reference::Recipe(id)))
            .map(|other| other.name)
            .collect();
        if !users.is_empty() {
            return Err(EngineError::validation(
                "recipe",
                format!("{} is used by {}", recipe.name, users.join(", ")),
            ));
        }

        self.store.delete(tenant_id, id).await?;
        if let Err(err) = self.cache.invalidate(tenant_id, &[id]).await {
            warn!("cost cache invalidation failed for recipe {id}: {err:#}");
        }
        info!("deleted recipe {} ({id}) for tenant {tenant_id}", recipe.name);
        Ok(())
    }

    async fn snapshot(&self, tenant_id: &str) -> EngineResult<Snapshot> {
        let ingredients = self
            .store
            .list_ingredients(tenant_id)
            .await?
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient))
            .collect();
        let recipes = self.store.list_recipes(tenant_id).await?;
        let order = recipes.iter().map(|recipe| recipe.id).collect();
        let recipes = recipes.into_iter().map(|recipe| (recipe.id, recipe)).collect();

        Ok(Snapshot {
            ingredients,
            recipes,
            order,
        })
    }

    async fn refresh(&self, tenant_id: &str, snapshot: &Snapshot, ids: &[Uuid]) -> Vec<RecipeCost> {
        if let Err(err) = self.cache.invalidate(tenant_id, ids).await {
            warn!("cost cache invalidation failed: {err:#}");
        }

        let mut costs = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(recipe) = snapshot.recipes.get(id) else {
                continue;
            };
            let cost = match resolve_cost(recipe, &snapshot.ingredients, &snapshot.recipes) {
                Ok(cost) => cost,
                Err(err) => {
                    warn!("cannot refresh cost of recipe {}: {err}", recipe.name);
                    continue;
                }
            };

            if cost.total_cost != recipe.total_cost {
                let mut updated = recipe.clone();
                updated.total_cost = cost.total_cost;
                updated.updated_at = Utc::now();
                if let Err(err) = self.store.save(tenant_id, updated.into()).await {
                    warn!("failed to store refreshed cost of recipe {}: {err:#}", recipe.name);
                    continue;
                }
            }

            self.cache_cost(tenant_id, &cost).await;
            costs.push(cost);
        }

        info!("refreshed {} of {} recipe costs for tenant {}", costs.len(), ids.len(), tenant_id);
        costs
    }

    async fn cache_cost(&self, tenant_id: &str, cost: &RecipeCost) {
        if let Err(err) = self.cache.put(tenant_id, cost, self.ttl).await {
            warn!("cost cache write failed for recipe {}: {err:#}", cost.recipe_id);
        }
    }
}

/// Recipes that reach `root` through their lines, in catalog order.
fn dependents_of(snapshot: &Snapshot, root: Reference) -> Vec<Uuid> {
    let mut affected = HashSet::new();
    let mut frontier = vec![root];

    while let Some(reference) = frontier.pop() {
        for recipe in snapshot.recipes.values() {
            if recipe.references(reference) && affected.insert(recipe.id) {
                frontier.push(Reference::Recipe(recipe.id));
            }
        }
    }

    snapshot
        .order
        .iter()
        .copied()
        .filter(|id| affected.contains(id))
        .collect()
}
