//! Receipt reconciliation: fold line names, propose catalog matches, and
//! import the confirmed lines as purchases.

pub mod import;
pub mod matcher;
pub mod normalize;

pub use import::{ImportReport, ItemOutcome, ItemStatus, ReceiptImporter};
pub use matcher::{best_match, match_candidates};
pub use normalize::normalize_name;
