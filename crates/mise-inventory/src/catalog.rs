use std::sync::Arc;

use mise_core::{
    DocumentStore, EngineError, EngineResult, Ingredient, InventoryStore, MovementLog,
    PurchaseUnit, RecordKind, Reference, RevisionConflict, StockMovement, Unit,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::MAX_ATTEMPTS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub unit: Unit,
    #[serde(default)]
    pub min_stock: Decimal,
    #[serde(default)]
    pub purchase_unit: Option<PurchaseUnit>,
}

/// Metadata edit. Stock and cost are deliberately absent: they only move
/// through the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub min_stock: Option<Decimal>,
    /// `Some(None)` clears the purchase unit.
    pub purchase_unit: Option<Option<PurchaseUnit>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// Still referenced by a recipe or by Kardex history; kept but inactive.
    Deactivated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kardex {
    pub ingredient: Ingredient,
    pub movements: Vec<StockMovement>,
    /// Sum of the signed movement quantities.
    pub balance: Decimal,
}

impl Kardex {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ingredient.current_stock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationLine {
    pub ingredient_id: Uuid,
    pub name: String,
    pub unit: Unit,
    pub quantity: Decimal,
    pub cost_per_unit: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub lines: Vec<ValuationLine>,
    pub total_value: Decimal,
}

/// Ingredient metadata and read models over the ledger.
pub struct IngredientCatalog<S> {
    store: Arc<S>,
}

impl<S> Clone for IngredientCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> IngredientCatalog<S>
where
    S: InventoryStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an ingredient with zero stock; stock arrives via purchases.
    pub async fn create(&self, tenant_id: &str, input: NewIngredient) -> EngineResult<Ingredient> {
        let name = validate_name(&input.name)?;
        validate_min_stock(input.min_stock)?;
        if let Some(purchase) = &input.purchase_unit {
            validate_purchase_unit(purchase)?;
        }

        let mut ingredient = Ingredient::new(name, input.unit, input.min_stock);
        ingredient.purchase_unit = input.purchase_unit;

        self.store.save(tenant_id, ingredient.clone().into()).await?;
        info!("created ingredient {} ({}) for tenant {}", ingredient.name, ingredient.id, tenant_id);

        Ok(ingredient)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> EngineResult<Ingredient> {
        self.store
            .get_ingredient(tenant_id, id)
            .await?
            .ok_or(EngineError::NotFound {
                kind: RecordKind::Ingredient,
                id,
            })
    }

    pub async fn list(&self, tenant_id: &str) -> EngineResult<Vec<Ingredient>> {
        Ok(self.store.list_ingredients(tenant_id).await?)
    }

    pub async fn update_metadata(
        &self,
        tenant_id: &str,
        id: Uuid,
        update: IngredientUpdate,
    ) -> EngineResult<Ingredient> {
        self.revise(tenant_id, id, "update", |mut ingredient| {
            if let Some(name) = &update.name {
                ingredient.name = validate_name(name)?;
            }
            if let Some(min_stock) = update.min_stock {
                validate_min_stock(min_stock)?;
                ingredient.min_stock = min_stock;
            }
            if let Some(purchase_unit) = &update.purchase_unit {
                if let Some(purchase) = purchase_unit {
                    validate_purchase_unit(purchase)?;
                }
                ingredient.purchase_unit = *purchase_unit;
            }
            if let Some(unit) = update.unit.filter(|unit| *unit != ingredient.unit) {
                // stock and cost are denominated in the canonical unit
                if !ingredient.current_stock.is_zero() || !ingredient.cost_per_unit.is_zero() {
                    return Err(EngineError::validation(
                        "unit",
                        format!(
                            "cannot change unit of {} while it carries stock or cost",
                            ingredient.name
                        ),
                    ));
                }
                ingredient.unit = unit;
            }
            Ok(ingredient)
        })
        .await
    }

    /// Deletes the ingredient, or only deactivates it when recipes or Kardex
    /// history still point at it.
    pub async fn remove(&self, tenant_id: &str, id: Uuid) -> EngineResult<Removal> {
        self.get(tenant_id, id).await?;

        let recipes = self.store.list_recipes(tenant_id).await?;
        let in_recipes = recipes
            .iter()
            .any(|recipe| recipe.references(Reference::Ingredient(id)));
        let has_history = !self.store.movements(tenant_id, id).await?.is_empty();

        if in_recipes || has_history {
            self.set_active(tenant_id, id, false).await?;
            info!("deactivated ingredient {id} for tenant {tenant_id}");
            return Ok(Removal::Deactivated);
        }

        self.store.delete(tenant_id, id).await?;
        info!("deleted ingredient {id} for tenant {tenant_id}");
        Ok(Removal::Deleted)
    }

    pub async fn reactivate(&self, tenant_id: &str, id: Uuid) -> EngineResult<Ingredient> {
        self.set_active(tenant_id, id, true).await
    }

    async fn set_active(&self, tenant_id: &str, id: Uuid, active: bool) -> EngineResult<Ingredient> {
        self.revise(tenant_id, id, "update", |mut ingredient| {
            ingredient.is_active = active;
            Ok(ingredient)
        })
        .await
    }

    /// Applies `edit` to a fresh read and writes it back as the next
    /// revision, so ledger writes landing in between are never overwritten.
    async fn revise<F>(
        &self,
        tenant_id: &str,
        id: Uuid,
        operation: &'static str,
        edit: F,
    ) -> EngineResult<Ingredient>
    where
        F: Fn(Ingredient) -> EngineResult<Ingredient>,
    {
        let mut attempt = 1;
        loop {
            let mut ingredient = edit(self.get(tenant_id, id).await?)?;
            ingredient.touch();

            match self
                .store
                .replace_ingredient(tenant_id, ingredient.clone())
                .await
            {
                Ok(()) => return Ok(ingredient),
                Err(err) if RevisionConflict::is_conflict(&err) => {
                    if attempt == MAX_ATTEMPTS {
                        return Err(EngineError::Conflict {
                            operation,
                            entity: ingredient.name,
                        });
                    }
                    warn!(
                        "{} changed while being edited (attempt {attempt}); retrying",
                        ingredient.name
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn kardex(&self, tenant_id: &str, id: Uuid) -> EngineResult<Kardex> {
        let ingredient = self.get(tenant_id, id).await?;
        let movements = self.store.movements(tenant_id, id).await?;
        let balance = movements.iter().map(|movement| movement.quantity).sum();

        Ok(Kardex {
            ingredient,
            movements,
            balance,
        })
    }

    pub async fn valuation(&self, tenant_id: &str) -> EngineResult<InventoryValuation> {
        let lines: Vec<ValuationLine> = self
            .list(tenant_id)
            .await?
            .into_iter()
            .filter(|ingredient| ingredient.is_active)
            .map(|ingredient| ValuationLine {
                ingredient_id: ingredient.id,
                value: ingredient.stock_value(),
                quantity: ingredient.current_stock,
                cost_per_unit: ingredient.cost_per_unit,
                unit: ingredient.unit,
                name: ingredient.name,
            })
            .collect();
        let total_value = lines.iter().map(|line| line.value).sum();

        Ok(InventoryValuation { lines, total_value })
    }

    /// Active ingredients at or below their minimum.
    pub async fn low_stock(&self, tenant_id: &str) -> EngineResult<Vec<Ingredient>> {
        Ok(self
            .list(tenant_id)
            .await?
            .into_iter()
            .filter(Ingredient::is_low_stock)
            .collect())
    }
}

fn validate_name(name: &str) -> EngineResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation("name", "ingredient name is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_min_stock(min_stock: Decimal) -> EngineResult<()> {
    if min_stock < Decimal::ZERO {
        return Err(EngineError::validation("min_stock", "minimum stock cannot be negative"));
    }
    Ok(())
}

fn validate_purchase_unit(purchase: &PurchaseUnit) -> EngineResult<()> {
    if purchase.conversion_factor <= Decimal::ZERO {
        return Err(EngineError::validation(
            "conversion_factor",
            format!("1 {} must convert to a positive quantity", purchase.unit),
        ));
    }
    Ok(())
}
