use std::sync::Arc;

use mise_core::{
    DocumentStore, EngineError, EngineResult, Ingredient, InventoryPolicy, InventoryStore,
    MovementLog, MovementType, NegativeStockPolicy, RecordKind, RevisionConflict, StockMovement,
    Unit,
};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::costing::{apply_incoming_cost, issue_value};
use crate::units::to_canonical;

/// Attempts per operation before a write that keeps losing races gives up.
pub(crate) const MAX_ATTEMPTS: u32 = 5;

/// Sole writer of `current_stock` and `cost_per_unit`. Every operation
/// loads one ingredient, validates, then commits the movement and the new
/// projection in a single store transaction. A commit based on a stale read
/// is rejected by the store and the operation is replanned from a fresh one.
pub struct StockLedger<S> {
    store: Arc<S>,
    policy: InventoryPolicy,
}

impl<S> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
        }
    }
}

impl<S> StockLedger<S>
where
    S: InventoryStore,
{
    pub fn new(store: Arc<S>, policy: InventoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &InventoryPolicy {
        &self.policy
    }

    /// Receives a purchase. `raw_quantity` is in `unit`, or in the
    /// ingredient's purchase unit when `is_bulk_unit` is set.
    pub async fn record_purchase(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
        raw_quantity: Decimal,
        unit: Unit,
        total_cost: Decimal,
        is_bulk_unit: bool,
    ) -> EngineResult<StockMovement> {
        self.apply(tenant_id, ingredient_id, "restock", |mut ingredient| {
            if raw_quantity <= Decimal::ZERO {
                return Err(EngineError::InvalidQuantity {
                    operation: "restock",
                    entity: ingredient.name,
                });
            }
            if total_cost < Decimal::ZERO {
                return Err(EngineError::InvalidCost {
                    operation: "restock",
                    entity: ingredient.name,
                });
            }
            if !ingredient.is_active {
                return Err(EngineError::InactiveIngredient {
                    operation: "restock",
                    entity: ingredient.name,
                });
            }

            let quantity = to_canonical(&ingredient, raw_quantity, unit, is_bulk_unit)?;
            ingredient.cost_per_unit = apply_incoming_cost(&ingredient, quantity, total_cost);
            ingredient.current_stock += quantity;

            let movement =
                StockMovement::new(ingredient.id, MovementType::In, quantity, total_cost, None);
            Ok((ingredient, movement))
        })
        .await
    }

    /// Writes off `quantity` (canonical unit). Cost per unit is unchanged.
    pub async fn record_loss(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
        quantity: Decimal,
        reason: Option<String>,
    ) -> EngineResult<StockMovement> {
        let negative_stock = self.policy.negative_stock;
        self.apply(tenant_id, ingredient_id, "record loss for", |mut ingredient| {
            if quantity <= Decimal::ZERO {
                return Err(EngineError::InvalidQuantity {
                    operation: "record loss for",
                    entity: ingredient.name,
                });
            }

            let resulting = ingredient.current_stock - quantity;
            let (applied, reason) = if resulting >= Decimal::ZERO {
                (quantity, reason.clone())
            } else {
                match negative_stock {
                    NegativeStockPolicy::Reject => {
                        return Err(EngineError::NegativeStockResult {
                            operation: "record loss for",
                            entity: ingredient.name,
                            resulting,
                        });
                    }
                    NegativeStockPolicy::Clamp => {
                        let available = ingredient.current_stock.max(Decimal::ZERO);
                        warn!(
                            "loss of {} {} on {} clamped to {} on hand",
                            quantity, ingredient.unit, ingredient.name, available
                        );
                        let note = format!("requested {quantity}, clamped to {available}");
                        let reason = match &reason {
                            Some(reason) => format!("{reason} ({note})"),
                            None => note,
                        };
                        (available, Some(reason))
                    }
                    NegativeStockPolicy::Allow => {
                        warn!(
                            "loss on {} takes stock negative ({})",
                            ingredient.name, resulting
                        );
                        (quantity, reason.clone())
                    }
                }
            };

            info!(
                "writing off {} {} of {} (value {})",
                applied,
                ingredient.unit,
                ingredient.name,
                issue_value(&ingredient, applied)
            );

            ingredient.current_stock -= applied;
            let movement = StockMovement::new(
                ingredient.id,
                MovementType::Loss,
                -applied,
                Decimal::ZERO,
                reason,
            );
            Ok((ingredient, movement))
        })
        .await
    }

    /// Sets stock to a counted value, recording the difference.
    pub async fn record_adjustment(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
        new_absolute_stock: Decimal,
        reason: Option<String>,
    ) -> EngineResult<StockMovement> {
        self.apply(tenant_id, ingredient_id, "adjust stock of", |mut ingredient| {
            if new_absolute_stock < Decimal::ZERO {
                return Err(EngineError::NegativeStockResult {
                    operation: "adjust stock of",
                    entity: ingredient.name,
                    resulting: new_absolute_stock,
                });
            }

            let delta = new_absolute_stock - ingredient.current_stock;
            ingredient.current_stock = new_absolute_stock;

            let movement = StockMovement::new(
                ingredient.id,
                MovementType::Adjustment,
                delta,
                Decimal::ZERO,
                reason.clone(),
            );
            Ok((ingredient, movement))
        })
        .await
    }

    async fn load(&self, tenant_id: &str, ingredient_id: Uuid) -> EngineResult<Ingredient> {
        self.store
            .get_ingredient(tenant_id, ingredient_id)
            .await?
            .ok_or(EngineError::NotFound {
                kind: RecordKind::Ingredient,
                id: ingredient_id,
            })
    }

    /// Loads, plans and commits, replanning from a fresh read whenever the
    /// store reports that the ingredient moved on underneath us.
    async fn apply<F>(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
        operation: &'static str,
        plan: F,
    ) -> EngineResult<StockMovement>
    where
        F: Fn(Ingredient) -> EngineResult<(Ingredient, StockMovement)>,
    {
        let mut attempt = 1;
        loop {
            let (mut ingredient, movement) = plan(self.load(tenant_id, ingredient_id).await?)?;
            ingredient.touch();
            let name = ingredient.name.clone();
            let stock = ingredient.current_stock;

            match self
                .store
                .commit_movement(tenant_id, ingredient, movement.clone())
                .await
            {
                Ok(()) => {
                    info!(
                        "{} {} on {} for tenant {}; stock now {}",
                        movement.movement_type.as_str(),
                        movement.quantity,
                        name,
                        tenant_id,
                        stock
                    );
                    return Ok(movement);
                }
                Err(err) if RevisionConflict::is_conflict(&err) => {
                    if attempt == MAX_ATTEMPTS {
                        return Err(EngineError::Conflict {
                            operation,
                            entity: name,
                        });
                    }
                    warn!(
                        "{name} changed before the {} could be committed (attempt {attempt}); retrying",
                        movement.movement_type.as_str()
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
