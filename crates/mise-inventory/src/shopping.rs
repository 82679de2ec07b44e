use std::collections::HashSet;
use std::sync::Arc;

use mise_core::{
    DocumentStore, EngineError, EngineResult, Ingredient, InventoryStore, RecordKind,
    ShoppingListItem, Unit,
};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Proposes one item per active ingredient at or below its minimum, sized
/// `min_stock * multiplier`.
///
/// Ingredients that already have an unchecked item (same ingredient id or
/// same name) are skipped, so calling this repeatedly is idempotent. Zero
/// quantities are never proposed.
pub fn suggest(
    ingredients: &[Ingredient],
    existing: &[ShoppingListItem],
    multiplier: Decimal,
) -> Vec<ShoppingListItem> {
    let open_items: Vec<&ShoppingListItem> = existing.iter().filter(|item| !item.checked).collect();
    let mut pending_names: HashSet<String> = open_items
        .iter()
        .map(|item| normalize_name(&item.name))
        .collect();
    let pending_ids: HashSet<Uuid> = open_items.iter().filter_map(|item| item.ingredient_id).collect();

    let mut suggestions = Vec::new();
    for ingredient in ingredients.iter().filter(|ingredient| ingredient.is_low_stock()) {
        if pending_ids.contains(&ingredient.id) {
            continue;
        }
        if !pending_names.insert(normalize_name(&ingredient.name)) {
            continue;
        }

        let quantity = ingredient.min_stock * multiplier;
        if quantity <= Decimal::ZERO {
            continue;
        }

        let mut item = ShoppingListItem::new(ingredient.name.clone(), quantity, ingredient.unit);
        item.ingredient_id = Some(ingredient.id);
        suggestions.push(item);
    }

    suggestions
}

/// Persisted shopping list for a tenant.
pub struct ShoppingList<S> {
    store: Arc<S>,
    multiplier: Decimal,
}

impl<S> ShoppingList<S>
where
    S: InventoryStore,
{
    pub fn new(store: Arc<S>, multiplier: Decimal) -> Self {
        Self { store, multiplier }
    }

    pub async fn items(&self, tenant_id: &str) -> EngineResult<Vec<ShoppingListItem>> {
        Ok(self.store.list_shopping_items(tenant_id).await?)
    }

    /// Runs [`suggest`] against the catalog and saves the new items.
    pub async fn generate(&self, tenant_id: &str) -> EngineResult<Vec<ShoppingListItem>> {
        let ingredients = self.store.list_ingredients(tenant_id).await?;
        let existing = self.items(tenant_id).await?;
        let suggestions = suggest(&ingredients, &existing, self.multiplier);

        for item in &suggestions {
            self.store.save(tenant_id, item.clone().into()).await?;
        }
        info!("suggested {} shopping list items for tenant {}", suggestions.len(), tenant_id);

        Ok(suggestions)
    }

    pub async fn add_item(
        &self,
        tenant_id: &str,
        name: &str,
        quantity: Decimal,
        unit: Unit,
    ) -> EngineResult<ShoppingListItem> {
        if name.trim().is_empty() {
            return Err(EngineError::validation("name", "item name is required"));
        }
        if quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity {
                operation: "add to shopping list",
                entity: name.trim().to_string(),
            });
        }

        let item = ShoppingListItem::new(name.trim(), quantity, unit);
        self.store.save(tenant_id, item.clone().into()).await?;
        Ok(item)
    }

    pub async fn toggle(&self, tenant_id: &str, item_id: Uuid) -> EngineResult<ShoppingListItem> {
        let mut item = self.load(tenant_id, item_id).await?;

        item.checked = !item.checked;
        self.store.save(tenant_id, item.clone().into()).await?;
        Ok(item)
    }

    /// Deletes a shopping list item. Ids of other records are not found here.
    pub async fn remove(&self, tenant_id: &str, item_id: Uuid) -> EngineResult<()> {
        let item = self.load(tenant_id, item_id).await?;
        self.store.delete(tenant_id, item.id).await?;
        Ok(())
    }

    async fn load(&self, tenant_id: &str, item_id: Uuid) -> EngineResult<ShoppingListItem> {
        self.store
            .get(tenant_id, item_id)
            .await?
            .and_then(|record| record.into_shopping_list_item())
            .ok_or(EngineError::NotFound {
                kind: RecordKind::ShoppingListItem,
                id: item_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn ingredient(name: &str, stock: Decimal, min_stock: Decimal) -> Ingredient {
        let mut ingredient = Ingredient::new(name, Unit::Kilogram, min_stock);
        ingredient.current_stock = stock;
        ingredient
    }

    #[test]
    fn proposes_double_minimum_for_low_stock() {
        let ingredients = vec![
            ingredient("Onion", dec!(1), dec!(3)),
            ingredient("Garlic", dec!(0.5), dec!(0.5)),
            ingredient("Potato", dec!(10), dec!(3)),
        ];

        let items = suggest(&ingredients, &[], Decimal::TWO);

        let summary: Vec<(&str, Decimal)> =
            items.iter().map(|item| (item.name.as_str(), item.quantity)).collect();
        assert_eq!(summary, vec![("Onion", dec!(6)), ("Garlic", dec!(1))]);
        assert_eq!(items[0].ingredient_id, Some(ingredients[0].id));
        assert!(items.iter().all(|item| !item.checked && item.unit == Unit::Kilogram));
    }

    #[test]
    fn skips_inactive_and_zero_minimum() {
        let mut retired = ingredient("Lard", Decimal::ZERO, dec!(2));
        retired.is_active = false;
        let untracked = ingredient("Parsley", Decimal::ZERO, Decimal::ZERO);

        assert!(suggest(&[retired, untracked], &[], Decimal::TWO).is_empty());
    }

    #[test]
    fn does_not_duplicate_unchecked_items() {
        let onion = ingredient("Onion", dec!(1), dec!(3));
        let mut manual = ShoppingListItem::new(" onion ", dec!(2), Unit::Kilogram);
        manual.ingredient_id = None;

        assert!(suggest(&[onion.clone()], &[manual.clone()], Decimal::TWO).is_empty());

        // a checked entry no longer blocks a new suggestion
        manual.checked = true;
        assert_eq!(suggest(&[onion], &[manual], Decimal::TWO).len(), 1);
    }

    #[test]
    fn repeated_suggestion_is_idempotent() {
        let ingredients = vec![ingredient("Rice", dec!(2), dec!(5))];
        let first = suggest(&ingredients, &[], Decimal::TWO);
        let second = suggest(&ingredients, &first, Decimal::TWO);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
