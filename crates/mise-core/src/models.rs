use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::units::Unit;

/// "1 `unit` = `conversion_factor` canonical units", used for bulk purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUnit {
    pub unit: Unit,
    pub conversion_factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Canonical unit; stock and cost are always expressed in it.
    pub unit: Unit,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub cost_per_unit: Decimal,
    pub is_active: bool,
    #[serde(default)]
    pub purchase_unit: Option<PurchaseUnit>,
    /// Bumped by `touch` on every write of a stored ingredient. Stores only
    /// accept a replacement carrying the stored revision plus one.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, unit: Unit, min_stock: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            unit,
            current_stock: Decimal::ZERO,
            min_stock,
            cost_per_unit: Decimal::ZERO,
            is_active: true,
            purchase_unit: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_purchase_unit(mut self, unit: Unit, conversion_factor: Decimal) -> Self {
        self.purchase_unit = Some(PurchaseUnit {
            unit,
            conversion_factor,
        });
        self
    }

    /// Marks the ingredient as the next revision of what was loaded.
    pub fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    pub fn stock_value(&self) -> Decimal {
        self.current_stock * self.cost_per_unit
    }

    pub fn is_low_stock(&self) -> bool {
        self.is_active && self.current_stock <= self.min_stock
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Loss,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Loss => "LOSS",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

/// One Kardex line. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    /// Signed, in the ingredient's canonical unit.
    pub quantity: Decimal,
    /// Total cost of the movement; zero for losses and adjustments.
    pub cost: Decimal,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        ingredient_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        cost: Decimal,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ingredient_id,
            movement_type,
            quantity,
            cost,
            reason,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Reference {
    Ingredient(Uuid),
    Recipe(Uuid),
}

impl Reference {
    pub fn id(&self) -> Uuid {
        match self {
            Reference::Ingredient(id) | Reference::Recipe(id) => *id,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Ingredient(id) => write!(f, "ingredient {id}"),
            Reference::Recipe(id) => write!(f, "recipe {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub reference: Reference,
    pub quantity: Decimal,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(rename = "yield")]
    pub yield_quantity: Decimal,
    pub yield_unit: Unit,
    /// Cached rollup, refreshed on save and when ingredient costs move.
    #[serde(default)]
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, yield_quantity: Decimal, yield_unit: Unit) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            ingredients: Vec::new(),
            yield_quantity,
            yield_unit,
            total_cost: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_line(mut self, reference: Reference, quantity: Decimal, unit: Unit) -> Self {
        self.ingredients.push(RecipeIngredient {
            reference,
            quantity,
            unit,
        });
        self
    }

    pub fn references(&self, reference: Reference) -> bool {
        self.ingredients.iter().any(|line| line.reference == reference)
    }

    pub fn sub_recipe_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.ingredients.iter().filter_map(|line| match line.reference {
            Reference::Recipe(id) => Some(id),
            Reference::Ingredient(_) => None,
        })
    }
}

/// Non-fatal findings from a cost rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostWarning {
    /// A line points at an ingredient or recipe that no longer exists; it
    /// was costed at zero.
    DanglingReference { recipe_id: Uuid, reference: Reference },
}

impl fmt::Display for CostWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostWarning::DanglingReference {
                recipe_id,
                reference,
            } => write!(f, "recipe {recipe_id} references missing {reference}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCost {
    pub recipe_id: Uuid,
    pub total_cost: Decimal,
    pub cost_per_yield_unit: Decimal,
    #[serde(default)]
    pub warnings: Vec<CostWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub checked: bool,
    #[serde(default)]
    pub ingredient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ShoppingListItem {
    pub fn new(name: impl Into<String>, quantity: Decimal, unit: Unit) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity,
            unit,
            checked: false,
            ingredient_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A purchase line as extracted from a receipt or invoice. Lives only for
/// one reconciliation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemCandidate {
    pub raw_name: String,
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub unit: String,
    #[serde(default)]
    pub matched_ingredient_id: Option<Uuid>,
    /// Quantity is expressed in the matched ingredient's purchase unit.
    #[serde(default)]
    pub is_bulk_unit: bool,
}

impl BulkItemCandidate {
    pub fn new(
        raw_name: impl Into<String>,
        quantity: Decimal,
        total_cost: Decimal,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            quantity,
            total_cost,
            unit: unit.into(),
            matched_ingredient_id: None,
            is_bulk_unit: false,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_ingredient_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Ingredient,
    Recipe,
    ShoppingListItem,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Ingredient => "ingredient",
            RecordKind::Recipe => "recipe",
            RecordKind::ShoppingListItem => "shopping_list_item",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as held by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Record {
    Ingredient(Ingredient),
    Recipe(Recipe),
    ShoppingListItem(ShoppingListItem),
}

impl Record {
    pub fn id(&self) -> Uuid {
        match self {
            Record::Ingredient(ingredient) => ingredient.id,
            Record::Recipe(recipe) => recipe.id,
            Record::ShoppingListItem(item) => item.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Ingredient(_) => RecordKind::Ingredient,
            Record::Recipe(_) => RecordKind::Recipe,
            Record::ShoppingListItem(_) => RecordKind::ShoppingListItem,
        }
    }

    pub fn into_ingredient(self) -> Option<Ingredient> {
        match self {
            Record::Ingredient(ingredient) => Some(ingredient),
            _ => None,
        }
    }

    pub fn into_recipe(self) -> Option<Recipe> {
        match self {
            Record::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn into_shopping_list_item(self) -> Option<ShoppingListItem> {
        match self {
            Record::ShoppingListItem(item) => Some(item),
            _ => None,
        }
    }
}

impl From<Ingredient> for Record {
    fn from(value: Ingredient) -> Self {
        Record::Ingredient(value)
    }
}

impl From<Recipe> for Record {
    fn from(value: Recipe) -> Self {
        Record::Recipe(value)
    }
}

impl From<ShoppingListItem> for Record {
    fn from(value: ShoppingListItem) -> Self {
        Record::ShoppingListItem(value)
    }
}
