use mise_core::{Dimension, EngineError, EngineResult, Ingredient, Unit};
use rust_decimal::Decimal;

const THOUSAND: Decimal = Decimal::ONE_THOUSAND;

/// Size of one `unit` in its dimension's smallest unit (g, ml, or one piece).
fn base_factor(unit: Unit) -> Decimal {
    match unit {
        Unit::Kilogram | Unit::Liter => THOUSAND,
        Unit::Gram | Unit::Milliliter => Decimal::ONE,
        Unit::Piece | Unit::Box | Unit::Pack | Unit::Case => Decimal::ONE,
    }
}

/// Converts `quantity` from one unit to another.
///
/// With an explicit `factor` the result is `quantity * factor` whatever the
/// dimensions are; this is how purchase units ("1 case = 24 un") resolve.
/// Without one, only same-dimension conversions succeed.
pub fn convert(
    quantity: Decimal,
    from: Unit,
    to: Unit,
    factor: Option<Decimal>,
) -> EngineResult<Decimal> {
    if let Some(factor) = factor {
        if factor <= Decimal::ZERO {
            return Err(EngineError::validation(
                "conversion_factor",
                format!("factor for {from} to {to} must be positive"),
            ));
        }
        return Ok(quantity * factor);
    }

    if from == to {
        return Ok(quantity);
    }

    match (from.dimension(), to.dimension()) {
        (Dimension::Count, Dimension::Count) => Ok(quantity),
        (source, target) if source == target => {
            Ok(quantity * base_factor(from) / base_factor(to))
        }
        _ => Err(EngineError::UnsupportedConversion { from, to }),
    }
}

/// Expresses a transaction quantity in the ingredient's canonical unit.
///
/// `is_bulk_unit` forces the ingredient's purchase-unit factor. A quantity
/// given in the purchase unit itself uses the factor too.
pub fn to_canonical(
    ingredient: &Ingredient,
    quantity: Decimal,
    unit: Unit,
    is_bulk_unit: bool,
) -> EngineResult<Decimal> {
    match ingredient.purchase_unit {
        Some(purchase) if is_bulk_unit || (unit == purchase.unit && unit != ingredient.unit) => {
            convert(quantity, unit, ingredient.unit, Some(purchase.conversion_factor))
        }
        None if is_bulk_unit => Err(EngineError::validation(
            "purchase_unit",
            format!("{} has no purchase unit to convert from", ingredient.name),
        )),
        _ => convert(quantity, unit, ingredient.unit, None),
    }
}
