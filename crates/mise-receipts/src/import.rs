use std::sync::Arc;

use mise_core::{
    BulkItemCandidate, EngineError, EngineResult, Ingredient, InventoryPolicy, InventoryStore,
    Unit,
};
use mise_inventory::{IngredientCatalog, NewIngredient, StockLedger};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Imported { movement_id: Uuid, quantity: Decimal },
    /// No catalog ingredient was linked; nothing was recorded.
    Unmatched,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub raw_name: String,
    pub ingredient_id: Option<Uuid>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub items: Vec<ItemOutcome>,
    pub imported: usize,
    pub total: usize,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!("{} of {} imported", self.imported, self.total)
    }

    /// Ingredients whose cost may have moved, without repeats.
    pub fn imported_ingredients(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for item in &self.items {
            if let (ItemStatus::Imported { .. }, Some(id)) = (&item.status, item.ingredient_id) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Turns reconciled receipt lines into ledger purchases.
pub struct ReceiptImporter<S> {
    ledger: StockLedger<S>,
    catalog: IngredientCatalog<S>,
}

impl<S> ReceiptImporter<S>
where
    S: InventoryStore,
{
    pub fn new(store: Arc<S>, policy: InventoryPolicy) -> Self {
        Self {
            ledger: StockLedger::new(Arc::clone(&store), policy),
            catalog: IngredientCatalog::new(store),
        }
    }

    /// Records one purchase per matched candidate. Each line stands alone:
    /// a failure is reported for that line and the rest still import.
    pub async fn confirm_import(
        &self,
        tenant_id: &str,
        candidates: &[BulkItemCandidate],
    ) -> ImportReport {
        let mut items = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let status = match candidate.matched_ingredient_id {
                None => ItemStatus::Unmatched,
                Some(ingredient_id) => self
                    .import_line(tenant_id, ingredient_id, candidate)
                    .await
                    .unwrap_or_else(|err| {
                        warn!("receipt line '{}' not imported: {err}", candidate.raw_name);
                        ItemStatus::Failed {
                            error: err.to_string(),
                        }
                    }),
            };
            items.push(ItemOutcome {
                raw_name: candidate.raw_name.clone(),
                ingredient_id: candidate.matched_ingredient_id,
                status,
            });
        }

        let imported = items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Imported { .. }))
            .count();
        let report = ImportReport {
            items,
            imported,
            total: candidates.len(),
        };
        info!("receipt import for tenant {}: {}", tenant_id, report.summary());
        report
    }

    async fn import_line(
        &self,
        tenant_id: &str,
        ingredient_id: Uuid,
        candidate: &BulkItemCandidate,
    ) -> EngineResult<ItemStatus> {
        let unit: Unit = candidate.unit.parse()?;
        let movement = self
            .ledger
            .record_purchase(
                tenant_id,
                ingredient_id,
                candidate.quantity,
                unit,
                candidate.total_cost,
                candidate.is_bulk_unit,
            )
            .await?;

        Ok(ItemStatus::Imported {
            movement_id: movement.id,
            quantity: movement.quantity,
        })
    }

    /// Manually points a candidate at an existing, active ingredient.
    pub async fn link_candidate(
        &self,
        tenant_id: &str,
        mut candidate: BulkItemCandidate,
        ingredient_id: Uuid,
    ) -> EngineResult<BulkItemCandidate> {
        let ingredient = self.catalog.get(tenant_id, ingredient_id).await?;
        if !ingredient.is_active {
            return Err(EngineError::InactiveIngredient {
                operation: "link receipt line to",
                entity: ingredient.name,
            });
        }

        candidate.matched_ingredient_id = Some(ingredient.id);
        Ok(candidate)
    }

    /// Creates a catalog ingredient named after an unmatched line, in the
    /// line's unit, and links the line to it.
    pub async fn create_ingredient_from_candidate(
        &self,
        tenant_id: &str,
        mut candidate: BulkItemCandidate,
    ) -> EngineResult<(Ingredient, BulkItemCandidate)> {
        let unit: Unit = candidate.unit.parse()?;
        let ingredient = self
            .catalog
            .create(
                tenant_id,
                NewIngredient {
                    name: candidate.raw_name.clone(),
                    unit,
                    min_stock: Decimal::ZERO,
                    purchase_unit: None,
                },
            )
            .await?;

        // the quantity is already in the new ingredient's own unit
        candidate.is_bulk_unit = false;
        candidate.matched_ingredient_id = Some(ingredient.id);
        Ok((ingredient, candidate))
    }
}
