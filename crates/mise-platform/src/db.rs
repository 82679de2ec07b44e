use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use mise_core::{
    DocumentStore, Ingredient, MovementLog, MovementType, Record, RecordKind, RevisionConflict,
    StockMovement,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions};
use tracing::info;
use uuid::Uuid;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        tenant_id TEXT NOT NULL,
        id UUID NOT NULL,
        kind TEXT NOT NULL,
        body JSONB NOT NULL,
        seq BIGSERIAL,
        updated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (tenant_id, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_by_kind ON documents (tenant_id, kind, seq)",
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id UUID PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        ingredient_id UUID NOT NULL,
        movement_type TEXT NOT NULL,
        quantity NUMERIC NOT NULL,
        cost NUMERIC NOT NULL,
        reason TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        seq BIGSERIAL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stock_movements_by_ingredient ON stock_movements (tenant_id, ingredient_id, seq)",
];

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply schema")?;
    }
    info!("document store schema ready");
    Ok(())
}

/// Records as JSONB documents plus the Kardex table. Insertion order (`seq`)
/// is the listing order and survives updates.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UPSERT_DOCUMENT: &str = r#"
    INSERT INTO documents (tenant_id, id, kind, body, updated_at)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (tenant_id, id)
    DO UPDATE SET kind = EXCLUDED.kind, body = EXCLUDED.body, updated_at = EXCLUDED.updated_at
"#;

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, tenant_id: &str, id: Uuid) -> Result<Option<Record>> {
        let row = sqlx::query("SELECT body FROM documents WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(record) = row.try_get::<Json<Record>, _>("body")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, tenant_id: &str, record: Record) -> Result<()> {
        sqlx::query(UPSERT_DOCUMENT)
            .bind(tenant_id)
            .bind(record.id())
            .bind(record.kind().as_str())
            .bind(Json(&record))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: &str, kind: RecordKind) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            "SELECT body FROM documents WHERE tenant_id = $1 AND kind = $2 ORDER BY seq",
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(record) = row.try_get::<Json<Record>, _>("body")?;
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl MovementLog for PgDocumentStore {
    async fn commit_movement(
        &self,
        tenant_id: &str,
        ingredient: Ingredient,
        movement: StockMovement,
    ) -> Result<()> {
        if movement.ingredient_id != ingredient.id {
            anyhow::bail!(
                "movement {} belongs to ingredient {}, not {}",
                movement.id,
                movement.ingredient_id,
                ingredient.id
            );
        }

        let mut tx = self.pool.begin().await?;
        replace_locked(&mut tx, tenant_id, ingredient).await?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, ingredient_id, movement_type, quantity, cost, reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(movement.id)
        .bind(tenant_id)
        .bind(movement.ingredient_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.cost)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn replace_ingredient(&self, tenant_id: &str, ingredient: Ingredient) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        replace_locked(&mut tx, tenant_id, ingredient).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn movements(&self, tenant_id: &str, ingredient_id: Uuid) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, movement_type, quantity, cost, reason, created_at
            FROM stock_movements
            WHERE tenant_id = $1 AND ingredient_id = $2
            ORDER BY seq
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .fetch_all(&self.pool)
        .await?;

        let mut movements = Vec::with_capacity(rows.len());
        for row in rows {
            let movement_type: String = row.try_get("movement_type")?;
            movements.push(StockMovement {
                id: row.try_get("id")?,
                ingredient_id,
                movement_type: parse_movement_type(&movement_type)?,
                quantity: row.try_get::<Decimal, _>("quantity")?,
                cost: row.try_get::<Decimal, _>("cost")?,
                reason: row.try_get("reason")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(movements)
    }
}

/// Locks the stored ingredient row and overwrites it if `ingredient` is its
/// next revision.
async fn replace_locked(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    ingredient: Ingredient,
) -> Result<()> {
    let row = sqlx::query("SELECT body FROM documents WHERE tenant_id = $1 AND id = $2 FOR UPDATE")
        .bind(tenant_id)
        .bind(ingredient.id)
        .fetch_optional(&mut **tx)
        .await?;

    let stored = match row {
        Some(row) => {
            let Json(record) = row.try_get::<Json<Record>, _>("body")?;
            record.into_ingredient().map(|stored| stored.revision)
        }
        None => None,
    };
    if !is_next_revision(stored, ingredient.revision) {
        return Err(RevisionConflict {
            id: ingredient.id,
            expected: ingredient.revision.saturating_sub(1),
        }
        .into());
    }

    let record = Record::from(ingredient);
    sqlx::query(UPSERT_DOCUMENT)
        .bind(tenant_id)
        .bind(record.id())
        .bind(record.kind().as_str())
        .bind(Json(&record))
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

    Ok(())
}

fn is_next_revision(stored: Option<u64>, incoming: u64) -> bool {
    stored.map(|revision| revision + 1) == Some(incoming)
}

fn parse_movement_type(raw: &str) -> Result<MovementType> {
    match raw {
        "IN" => Ok(MovementType::In),
        "LOSS" => Ok(MovementType::Loss),
        "ADJUSTMENT" => Ok(MovementType::Adjustment),
        other => anyhow::bail!("unsupported movement type {other}"),
    }
}
