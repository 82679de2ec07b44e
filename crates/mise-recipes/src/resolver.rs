use std::collections::HashMap;

use mise_core::{
    CostWarning, EngineError, EngineResult, Ingredient, Recipe, RecipeCost, RecipeIngredient,
    Reference,
};
use mise_inventory::{convert, to_canonical};
use rust_decimal::Decimal;
use uuid::Uuid;

pub trait IngredientLookup {
    fn ingredient(&self, id: Uuid) -> Option<&Ingredient>;
}

pub trait RecipeLookup {
    fn recipe(&self, id: Uuid) -> Option<&Recipe>;
}

impl IngredientLookup for HashMap<Uuid, Ingredient> {
    fn ingredient(&self, id: Uuid) -> Option<&Ingredient> {
        self.get(&id)
    }
}

impl RecipeLookup for HashMap<Uuid, Recipe> {
    fn recipe(&self, id: Uuid) -> Option<&Recipe> {
        self.get(&id)
    }
}

/// Rolls up the cost of `recipe` from ingredient costs and sub-recipes.
///
/// Ingredient lines are converted to the ingredient's canonical unit and
/// priced at its `cost_per_unit`. Sub-recipe lines are converted to the
/// sub-recipe's yield unit and priced at its cost per yield unit. Missing
/// references cost zero and come back as warnings; a recipe that reaches
/// itself fails with `CyclicRecipeReference`.
///
/// Pure: the same inputs always give the same result.
pub fn resolve_cost<I, R>(recipe: &Recipe, ingredients: &I, recipes: &R) -> EngineResult<RecipeCost>
where
    I: IngredientLookup + ?Sized,
    R: RecipeLookup + ?Sized,
{
    let mut resolver = Resolver {
        ingredients,
        recipes,
        stack: Vec::new(),
        per_yield_unit: HashMap::new(),
        warnings: Vec::new(),
    };

    let total_cost = resolver.total_cost(recipe)?;

    Ok(RecipeCost {
        recipe_id: recipe.id,
        total_cost,
        cost_per_yield_unit: total_cost / recipe.yield_quantity,
        warnings: resolver.warnings,
    })
}

struct Resolver<'a, I: ?Sized, R: ?Sized> {
    ingredients: &'a I,
    recipes: &'a R,
    /// Recipes currently being resolved, outermost first.
    stack: Vec<(Uuid, &'a str)>,
    per_yield_unit: HashMap<Uuid, Decimal>,
    warnings: Vec<CostWarning>,
}

impl<'a, I, R> Resolver<'a, I, R>
where
    I: IngredientLookup + ?Sized,
    R: RecipeLookup + ?Sized,
{
    fn total_cost(&mut self, recipe: &'a Recipe) -> EngineResult<Decimal> {
        if recipe.yield_quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidYield {
                recipe: recipe.name.clone(),
            });
        }

        if let Some(start) = self.stack.iter().position(|(id, _)| *id == recipe.id) {
            let mut chain: Vec<&str> = self.stack[start..].iter().map(|(_, name)| *name).collect();
            chain.push(recipe.name.as_str());
            return Err(EngineError::CyclicRecipeReference {
                recipe: recipe.name.clone(),
                chain: chain.join(" -> "),
            });
        }

        self.stack.push((recipe.id, recipe.name.as_str()));
        let mut total = Decimal::ZERO;
        for line in &recipe.ingredients {
            total += self.line_cost(recipe, line)?;
        }
        self.stack.pop();

        Ok(total)
    }

    fn line_cost(&mut self, recipe: &Recipe, line: &RecipeIngredient) -> EngineResult<Decimal> {
        match line.reference {
            Reference::Ingredient(id) => {
                let ingredients: &'a I = self.ingredients;
                let Some(ingredient) = ingredients.ingredient(id) else {
                    self.dangling(recipe, line.reference);
                    return Ok(Decimal::ZERO);
                };
                let quantity = to_canonical(ingredient, line.quantity, line.unit, false)?;
                Ok(quantity * ingredient.cost_per_unit)
            }
            Reference::Recipe(id) => {
                let recipes: &'a R = self.recipes;
                let Some(sub_recipe) = recipes.recipe(id) else {
                    self.dangling(recipe, line.reference);
                    return Ok(Decimal::ZERO);
                };
                let unit_cost = self.cost_per_yield_unit(sub_recipe)?;
                let quantity = convert(line.quantity, line.unit, sub_recipe.yield_unit, None)?;
                Ok(quantity * unit_cost)
            }
        }
    }

    fn cost_per_yield_unit(&mut self, recipe: &'a Recipe) -> EngineResult<Decimal> {
        if let Some(cost) = self.per_yield_unit.get(&recipe.id) {
            return Ok(*cost);
        }

        let cost = self.total_cost(recipe)? / recipe.yield_quantity;
        self.per_yield_unit.insert(recipe.id, cost);
        Ok(cost)
    }

    fn dangling(&mut self, recipe: &Recipe, reference: Reference) {
        tracing::warn!("recipe {} references missing {}", recipe.name, reference);
        self.warnings.push(CostWarning::DanglingReference {
            recipe_id: recipe.id,
            reference,
        });
    }
}

#[cfg(test)]
mod tests {
    use mise_core::Unit;
    use rust_decimal_macros::dec;

    use super::*;

    fn priced(name: &str, unit: Unit, cost: Decimal) -> Ingredient {
        let mut ingredient = Ingredient::new(name, unit, Decimal::ZERO);
        ingredient.cost_per_unit = cost;
        ingredient
    }

    fn index<T, F: Fn(&T) -> Uuid>(items: Vec<T>, id: F) -> HashMap<Uuid, T> {
        items.into_iter().map(|item| (id(&item), item)).collect()
    }

    fn no_ingredients() -> HashMap<Uuid, Ingredient> {
        HashMap::new()
    }

    fn no_recipes() -> HashMap<Uuid, Recipe> {
        HashMap::new()
    }

    #[test]
    fn sums_direct_ingredients_per_yield_unit() {
        let a = priced("A", Unit::Piece, dec!(3));
        let b = priced("B", Unit::Piece, dec!(4));
        let recipe = Recipe::new("Plate", dec!(5), Unit::Piece)
            .with_line(Reference::Ingredient(a.id), dec!(2), Unit::Piece)
            .with_line(Reference::Ingredient(b.id), dec!(1), Unit::Piece);
        let ingredients = index(vec![a, b], |ingredient| ingredient.id);

        let cost = resolve_cost(&recipe, &ingredients, &no_recipes()).unwrap();

        assert_eq!(cost.total_cost, dec!(10));
        assert_eq!(cost.cost_per_yield_unit, dec!(2.0));
        assert!(cost.warnings.is_empty());
    }

    #[test]
    fn converts_line_units_to_canonical() {
        let flour = priced("Flour", Unit::Kilogram, dec!(4));
        let milk = priced("Milk", Unit::Liter, dec!(6));
        let batter = Recipe::new("Batter", dec!(1), Unit::Liter)
            .with_line(Reference::Ingredient(flour.id), dec!(250), Unit::Gram)
            .with_line(Reference::Ingredient(milk.id), dec!(500), Unit::Milliliter);
        let ingredients = index(vec![flour, milk], |ingredient| ingredient.id);

        let cost = resolve_cost(&batter, &ingredients, &no_recipes()).unwrap();
        assert_eq!(cost.total_cost, dec!(4));
    }

    #[test]
    fn nested_recipes_use_sub_recipe_cost_per_yield_unit() {
        let tomato = priced("Tomato", Unit::Kilogram, dec!(5));
        // 2 kg tomato -> 1 L sauce: 10 per liter
        let sauce = Recipe::new("Sauce", dec!(1), Unit::Liter)
            .with_line(Reference::Ingredient(tomato.id), dec!(2), Unit::Kilogram);
        let dough = priced("Dough ball", Unit::Piece, dec!(1.5));
        let pizza = Recipe::new("Pizza", dec!(2), Unit::Piece)
            .with_line(Reference::Ingredient(dough.id), dec!(2), Unit::Piece)
            .with_line(Reference::Recipe(sauce.id), dec!(300), Unit::Milliliter);

        let ingredients = index(vec![tomato, dough], |ingredient| ingredient.id);
        let recipes = index(vec![sauce], |recipe| recipe.id);

        let cost = resolve_cost(&pizza, &ingredients, &recipes).unwrap();
        assert_eq!(cost.total_cost, dec!(6));
        assert_eq!(cost.cost_per_yield_unit, dec!(3));
    }

    #[test]
    fn detects_direct_and_transitive_cycles() {
        let mut own = Recipe::new("Mother dough", dec!(1), Unit::Kilogram);
        own = own.clone().with_line(Reference::Recipe(own.id), dec!(0.2), Unit::Kilogram);
        let recipes = index(vec![own.clone()], |recipe| recipe.id);
        let err = resolve_cost(&own, &no_ingredients(), &recipes).unwrap_err();
        assert!(matches!(err, EngineError::CyclicRecipeReference { .. }));

        let mut first = Recipe::new("First", dec!(1), Unit::Kilogram);
        let mut second = Recipe::new("Second", dec!(1), Unit::Kilogram);
        first = first.with_line(Reference::Recipe(second.id), dec!(1), Unit::Kilogram);
        second = second.with_line(Reference::Recipe(first.id), dec!(1), Unit::Kilogram);
        let recipes = index(vec![first.clone(), second], |recipe| recipe.id);

        let err = resolve_cost(&first, &no_ingredients(), &recipes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "recipe First includes itself (First -> Second -> First)"
        );
    }

    #[test]
    fn dangling_references_cost_zero_with_warning() {
        let salt = priced("Salt", Unit::Kilogram, dec!(2));
        let missing_ingredient = Uuid::new_v4();
        let missing_recipe = Uuid::new_v4();
        let brine = Recipe::new("Brine", dec!(2), Unit::Liter)
            .with_line(Reference::Ingredient(salt.id), dec!(1), Unit::Kilogram)
            .with_line(Reference::Ingredient(missing_ingredient), dec!(1), Unit::Kilogram)
            .with_line(Reference::Recipe(missing_recipe), dec!(1), Unit::Liter);
        let ingredients = index(vec![salt], |ingredient| ingredient.id);

        let cost = resolve_cost(&brine, &ingredients, &no_recipes()).unwrap();

        assert_eq!(cost.total_cost, dec!(2));
        assert_eq!(cost.cost_per_yield_unit, dec!(1));
        assert_eq!(
            cost.warnings,
            vec![
                CostWarning::DanglingReference {
                    recipe_id: brine.id,
                    reference: Reference::Ingredient(missing_ingredient),
                },
                CostWarning::DanglingReference {
                    recipe_id: brine.id,
                    reference: Reference::Recipe(missing_recipe),
                },
            ]
        );
    }

    #[test]
    fn rejects_non_positive_yield_and_incompatible_units() {
        let empty = Recipe::new("Nothing", Decimal::ZERO, Unit::Piece);
        let err = resolve_cost(&empty, &no_ingredients(), &no_recipes()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidYield { .. }));

        let oil = priced("Oil", Unit::Liter, dec!(9));
        let wrong = Recipe::new("Dressing", dec!(1), Unit::Liter)
            .with_line(Reference::Ingredient(oil.id), dec!(100), Unit::Gram);
        let ingredients = index(vec![oil], |ingredient| ingredient.id);
        let err = resolve_cost(&wrong, &ingredients, &no_recipes()).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedConversion { .. }));
    }

    #[test]
    fn resolution_is_repeatable() {
        let butter = priced("Butter", Unit::Kilogram, dec!(11.37));
        let roux = Recipe::new("Roux", dec!(3), Unit::Kilogram)
            .with_line(Reference::Ingredient(butter.id), dec!(1), Unit::Kilogram);
        let ingredients = index(vec![butter], |ingredient| ingredient.id);

        let first = resolve_cost(&roux, &ingredients, &no_recipes()).unwrap();
        let second = resolve_cost(&roux, &ingredients, &no_recipes()).unwrap();
        assert_eq!(first, second);
    }
}
