//! Stock side of the costing engine: unit conversion, weighted-average
//! costing, the Kardex ledger, the ingredient catalog and shopping lists.

pub mod catalog;
pub mod costing;
pub mod ledger;
pub mod shopping;
pub mod units;

pub use catalog::{
    IngredientCatalog, IngredientUpdate, InventoryValuation, Kardex, NewIngredient, Removal,
    ValuationLine,
};
pub use costing::{apply_incoming_cost, issue_value};
pub use ledger::StockLedger;
pub use shopping::{ShoppingList, suggest};
pub use units::{convert, to_canonical};
