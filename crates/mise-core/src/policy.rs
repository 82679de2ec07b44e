use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// What a loss does when it would take stock below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeStockPolicy {
    /// Fail with `NegativeStockResult` before writing anything.
    #[default]
    Reject,
    /// Record only what is on hand and log the discrepancy.
    Clamp,
    /// Let stock go negative; it shows up as a low-stock anomaly.
    Allow,
}

impl FromStr for NegativeStockPolicy {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(NegativeStockPolicy::Reject),
            "clamp" => Ok(NegativeStockPolicy::Clamp),
            "allow" => Ok(NegativeStockPolicy::Allow),
            other => Err(EngineError::validation(
                "negative_stock_policy",
                format!("unsupported policy '{other}' (expected reject, clamp or allow)"),
            )),
        }
    }
}

/// Tunables shared by the ledger, the shopping list and the cost cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPolicy {
    pub negative_stock: NegativeStockPolicy,
    /// Suggested quantity is `min_stock * replenishment_multiplier`.
    pub replenishment_multiplier: Decimal,
    pub cost_cache_ttl: Duration,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            negative_stock: NegativeStockPolicy::Reject,
            replenishment_multiplier: Decimal::TWO,
            cost_cache_ttl: Duration::from_secs(300),
        }
    }
}
