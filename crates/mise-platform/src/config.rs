use std::time::Duration;

use anyhow::{Context, Result};
use mise_core::{InventoryPolicy, NegativeStockPolicy};
use rust_decimal::Decimal;

const MAX_COST_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub policy: InventoryPolicy,
}

impl ServiceConfig {
    pub fn worker_from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let policy = policy_from_lookup(|key| std::env::var(key).ok())?;

        Ok(Self {
            database_url,
            redis_url,
            policy,
        })
    }
}

/// Builds the inventory policy from `NEGATIVE_STOCK_POLICY`,
/// `REPLENISHMENT_MULTIPLIER` and `COST_CACHE_TTL_SECS`; unset keys keep
/// their defaults.
pub fn policy_from_lookup<F>(lookup: F) -> Result<InventoryPolicy>
where
    F: Fn(&str) -> Option<String>,
{
    let mut policy = InventoryPolicy::default();

    if let Some(raw) = lookup("NEGATIVE_STOCK_POLICY") {
        policy.negative_stock = raw
            .parse::<NegativeStockPolicy>()
            .context("NEGATIVE_STOCK_POLICY is invalid")?;
    }

    if let Some(raw) = lookup("REPLENISHMENT_MULTIPLIER") {
        let multiplier: Decimal = raw
            .trim()
            .parse()
            .with_context(|| format!("REPLENISHMENT_MULTIPLIER '{raw}' is not a decimal"))?;
        if multiplier <= Decimal::ZERO {
            anyhow::bail!("REPLENISHMENT_MULTIPLIER must be positive");
        }
        policy.replenishment_multiplier = multiplier;
    }

    if let Some(raw) = lookup("COST_CACHE_TTL_SECS") {
        let seconds: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("COST_CACHE_TTL_SECS '{raw}' is not a whole number"))?;
        if seconds > MAX_COST_CACHE_TTL_SECS {
            anyhow::bail!(
                "COST_CACHE_TTL_SECS must be at most {MAX_COST_CACHE_TTL_SECS} (30 days), got {seconds}"
            );
        }
        policy.cost_cache_ttl = Duration::from_secs(seconds);
    }

    Ok(policy)
}
