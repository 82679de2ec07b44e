use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::StreamExt;
use mise_core::{CostCache, DocumentStore, InventoryStore};
use mise_platform::{
    PgDocumentStore, RECEIPTS_CONFIRMED, RECEIPTS_EXTRACTED, RECEIPTS_IMPORTED, RECEIPTS_MATCHED,
    ReceiptConfirmedEvent, ReceiptExtractedEvent, ReceiptImportedEvent, ReceiptMatchedEvent,
    RedisBus, RedisCostCache, ServiceConfig, connect_database, ensure_schema,
};
use mise_receipts::{ReceiptImporter, match_candidates};
use mise_recipes::RecipeBook;
use redis::Msg;
use tracing::{error, info, warn};

struct Worker<S, C> {
    store: Arc<S>,
    importer: ReceiptImporter<S>,
    recipes: RecipeBook<S, C>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mise_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(&config.database_url).await?;
    ensure_schema(&pool).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let store = Arc::new(PgDocumentStore::new(pool));
    let cache = Arc::new(RedisCostCache::new(&redis));
    let worker = Worker {
        importer: ReceiptImporter::new(Arc::clone(&store), config.policy.clone()),
        recipes: RecipeBook::new(Arc::clone(&store), cache, config.policy.cost_cache_ttl),
        store,
    };

    let mut pubsub = redis.client().get_async_pubsub().await?;
    pubsub.subscribe(RECEIPTS_EXTRACTED).await?;
    pubsub.subscribe(RECEIPTS_CONFIRMED).await?;
    let mut messages = pubsub.on_message();

    info!("ops worker subscribed to {RECEIPTS_EXTRACTED} and {RECEIPTS_CONFIRMED}");

    loop {
        let msg = messages
            .next()
            .await
            .context("receipt stream ended unexpectedly")?;
        if let Err(err) = handle_message(&worker, &redis, msg).await {
            error!("failed to process message: {err:#}");
        }
    }
}

async fn handle_message<S, C>(worker: &Worker<S, C>, redis: &RedisBus, msg: Msg) -> Result<()>
where
    S: InventoryStore,
    C: CostCache,
{
    let channel = msg.get_channel_name().to_string();
    let payload: String = msg.get_payload()?;

    match channel.as_str() {
        RECEIPTS_EXTRACTED => {
            let event: ReceiptExtractedEvent = serde_json::from_str(&payload)
                .with_context(|| format!("malformed {RECEIPTS_EXTRACTED} payload"))?;
            let matched = worker.propose_matches(event).await?;
            redis.publish_json(RECEIPTS_MATCHED, &matched).await?;
            info!(
                "receipt {} matched {} of {} lines",
                matched.receipt_id,
                matched.matched,
                matched.lines.len()
            );
        }
        RECEIPTS_CONFIRMED => {
            let event: ReceiptConfirmedEvent = serde_json::from_str(&payload)
                .with_context(|| format!("malformed {RECEIPTS_CONFIRMED} payload"))?;
            let imported = worker.import(event).await?;
            redis.publish_json(RECEIPTS_IMPORTED, &imported).await?;
            info!("receipt {}: {}", imported.receipt_id, imported.summary);
        }
        other => warn!("ignoring message on unexpected channel {other}"),
    }

    Ok(())
}

impl<S, C> Worker<S, C>
where
    S: InventoryStore,
    C: CostCache,
{
    async fn propose_matches(&self, event: ReceiptExtractedEvent) -> Result<ReceiptMatchedEvent> {
        let catalog = self
            .store
            .list_ingredients(&event.tenant_id)
            .await
            .with_context(|| format!("failed to load catalog for tenant {}", event.tenant_id))?;
        let lines = match_candidates(event.lines, &catalog);
        let matched = lines.iter().filter(|line| line.is_matched()).count();

        Ok(ReceiptMatchedEvent {
            tenant_id: event.tenant_id,
            receipt_id: event.receipt_id,
            lines,
            matched,
        })
    }

    async fn import(&self, event: ReceiptConfirmedEvent) -> Result<ReceiptImportedEvent> {
        let report = self.importer.confirm_import(&event.tenant_id, &event.lines).await;

        let mut recipes_refreshed = 0;
        for ingredient_id in report.imported_ingredients() {
            match self
                .recipes
                .refresh_dependents(&event.tenant_id, ingredient_id)
                .await
            {
                Ok(costs) => recipes_refreshed += costs.len(),
                Err(err) => warn!("recipe refresh after import failed for {ingredient_id}: {err}"),
            }
        }

        Ok(ReceiptImportedEvent {
            tenant_id: event.tenant_id,
            receipt_id: event.receipt_id,
            summary: report.summary(),
            report,
            recipes_refreshed,
            imported_at: Utc::now(),
        })
    }
}
