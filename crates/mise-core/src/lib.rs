pub mod error;
pub mod models;
pub mod policy;
pub mod storage;
pub mod units;

pub use error::{EngineError, EngineResult, RevisionConflict};
pub use models::{
    BulkItemCandidate, CostWarning, Ingredient, MovementType, PurchaseUnit, Recipe, RecipeCost,
    RecipeIngredient, Record, RecordKind, Reference, ShoppingListItem, StockMovement,
};
pub use policy::{InventoryPolicy, NegativeStockPolicy};
pub use storage::{CostCache, DocumentStore, InventoryStore, MovementLog};
pub use units::{Dimension, Unit};
