//! Resource transfers and cadence claim markers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use holdfast_core::Cadence;
use holdfast_economy::storage;
use holdfast_types::{ResourceAmounts, ResourceTransfer, TransferId, TransferStatus};

use crate::convert::{from_text, to_i64, to_text, to_u64};
use crate::error::DbError;

/// Operations on `resource_transfers` and `processing_markers`.
#[derive(Debug, Clone, Copy)]
pub struct TransferStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TransferStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Pending transfers whose arrival time has passed, earliest first.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ResourceTransfer>, DbError> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r"SELECT id, source, destination, amounts, due_at, status, completed_at
              FROM resource_transfers
              WHERE status = $1 AND due_at <= $2
              ORDER BY due_at, id",
        )
        .bind(to_text(&TransferStatus::Pending)?)
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(ResourceTransfer::try_from).collect()
    }

    /// Store a transfer created outside the engine.
    pub async fn insert(&self, transfer: &ResourceTransfer) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO resource_transfers
                (id, source, destination, amounts, due_at, status, completed_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(transfer.id.into_inner())
        .bind(transfer.source.into_inner())
        .bind(transfer.destination.into_inner())
        .bind(Json(transfer.amounts))
        .bind(transfer.due_at)
        .bind(to_text(&transfer.status)?)
        .bind(transfer.completed_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Deliver a pending transfer.
    ///
    /// The status flip and the stock credit share one transaction, and the
    /// flip only matches a pending row, so a transfer is credited at most
    /// once. Returns `None` if it was already delivered.
    pub async fn complete(
        &self,
        transfer_id: TransferId,
        now: DateTime<Utc>,
        capacity: ResourceAmounts,
    ) -> Result<Option<ResourceAmounts>, DbError> {
        let mut tx = self.pool.begin().await?;

        let flipped: Option<(Uuid, Json<ResourceAmounts>)> = sqlx::query_as(
            r"UPDATE resource_transfers
              SET status = $2, completed_at = $3
              WHERE id = $1 AND status = $4
              RETURNING destination, amounts",
        )
        .bind(transfer_id.into_inner())
        .bind(to_text(&TransferStatus::Completed)?)
        .bind(now)
        .bind(to_text(&TransferStatus::Pending)?)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((destination, Json(amounts))) = flipped else {
            tx.rollback().await?;
            return Ok(None);
        };

        let current: Option<(Decimal, Decimal, Decimal, Decimal, Decimal)> = sqlx::query_as(
            r"SELECT food, water, wood, stone, ore
              FROM resource_stock
              WHERE settlement_id = $1
              FOR UPDATE",
        )
        .bind(destination)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((food, water, wood, stone, ore)) = current else {
            tx.commit().await?;
            return Ok(Some(ResourceAmounts::ZERO));
        };
        let before = ResourceAmounts {
            food,
            water,
            wood,
            stone,
            ore,
        };
        let credit = amounts.map(|_, value| value.max(Decimal::ZERO));
        let after = storage::clamp(before, credit, capacity).map(|resource, value| {
            value.max(before.get(resource))
        });

        sqlx::query(
            r"UPDATE resource_stock
              SET food = $2, water = $3, wood = $4, stone = $5, ore = $6
              WHERE settlement_id = $1",
        )
        .bind(destination)
        .bind(after.food)
        .bind(after.water)
        .bind(after.wood)
        .bind(after.stone)
        .bind(after.ore)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(after.saturating_sub(before)))
    }

    /// Move the `(entity, cadence)` marker to `tick` if it is below it.
    pub async fn claim(&self, entity: Uuid, cadence: Cadence, tick: u64) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO processing_markers (entity_id, cadence, last_tick)
              VALUES ($1, $2, $3)
              ON CONFLICT (entity_id, cadence) DO UPDATE
                SET last_tick = EXCLUDED.last_tick
                WHERE processing_markers.last_tick < EXCLUDED.last_tick",
        )
        .bind(entity)
        .bind(cadence.as_str())
        .bind(to_i64(tick))
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Highest tick held by any marker, or 0 on a fresh database.
    pub async fn last_claimed_tick(&self) -> Result<u64, DbError> {
        let last: i64 = sqlx::query_scalar(r"SELECT COALESCE(MAX(last_tick), 0) FROM processing_markers")
            .fetch_one(self.pool)
            .await?;
        to_u64(last, "last_tick")
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    source: Uuid,
    destination: Uuid,
    amounts: Json<ResourceAmounts>,
    due_at: DateTime<Utc>,
    status: String,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransferRow> for ResourceTransfer {
    type Error = DbError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            source: row.source.into(),
            destination: row.destination.into(),
            amounts: row.amounts.0,
            due_at: row.due_at,
            status: from_text(&row.status)?,
            completed_at: row.completed_at,
        })
    }
}
