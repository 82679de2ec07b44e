use mise_core::Ingredient;
use rust_decimal::Decimal;

/// Moving weighted-average cost after receiving `incoming_quantity`
/// (canonical unit) for `incoming_total_cost`.
///
/// Only purchases go through here. Losses and adjustments leave the average
/// untouched: they remove value at the existing cost basis.
pub fn apply_incoming_cost(
    ingredient: &Ingredient,
    incoming_quantity: Decimal,
    incoming_total_cost: Decimal,
) -> Decimal {
    let current_value = ingredient.current_stock * ingredient.cost_per_unit;
    let new_stock = ingredient.current_stock + incoming_quantity;

    if new_stock > Decimal::ZERO {
        return (current_value + incoming_total_cost) / new_stock;
    }

    if incoming_quantity > Decimal::ZERO {
        incoming_total_cost / incoming_quantity
    } else {
        ingredient.cost_per_unit
    }
}

/// Value leaving the books when `quantity` is written off at the current
/// average cost.
pub fn issue_value(ingredient: &Ingredient, quantity: Decimal) -> Decimal {
    quantity * ingredient.cost_per_unit
}
