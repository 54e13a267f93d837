//! Per-settlement state: structures, modifier aggregates, stock,
//! population, and the construction queue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use holdfast_economy::construction;
use holdfast_types::{
    ConstructionQueueEntry, ModifierAggregate, PopulationState, QueueStatus, ResourceAmounts,
    ResourceStock, SettlementId, StructureId, StructureInstance,
};

use crate::convert::{from_text, to_i64, to_text, to_u8, to_u32, to_u64};
use crate::error::DbError;

/// Operations on the tables keyed by settlement.
#[derive(Debug, Clone, Copy)]
pub struct SettlementStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SettlementStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Structures
    // -----------------------------------------------------------------------

    /// Structures of a settlement, oldest first.
    pub async fn structures(&self, settlement_id: SettlementId) -> Result<Vec<StructureInstance>, DbError> {
        let rows = sqlx::query_as::<_, StructureRow>(
            r"SELECT id, settlement_id, category, structure_type, level, health,
                     population_assigned, built_at
              FROM structures
              WHERE settlement_id = $1
              ORDER BY built_at, id",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(StructureInstance::try_from).collect()
    }

    /// Set one structure's health.
    pub async fn set_structure_health(&self, structure_id: StructureId, health: u8) -> Result<(), DbError> {
        sqlx::query(r"UPDATE structures SET health = $2 WHERE id = $1")
            .bind(structure_id.into_inner())
            .bind(i16::from(health.min(100)))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Modifiers
    // -----------------------------------------------------------------------

    /// Cached modifier aggregates of a settlement.
    pub async fn modifiers(&self, settlement_id: SettlementId) -> Result<Vec<ModifierAggregate>, DbError> {
        let rows = sqlx::query_as::<_, ModifierRow>(
            r"SELECT settlement_id, kind, total, source_count, contributors
              FROM modifier_aggregates
              WHERE settlement_id = $1
              ORDER BY kind",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(ModifierAggregate::try_from).collect()
    }

    /// Replace every aggregate row of a settlement in one transaction.
    pub async fn replace_modifiers(
        &self,
        settlement_id: SettlementId,
        aggregates: &[ModifierAggregate],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r"DELETE FROM modifier_aggregates WHERE settlement_id = $1")
            .bind(settlement_id.into_inner())
            .execute(&mut *tx)
            .await?;

        for aggregate in aggregates {
            let contributors: Vec<Uuid> = aggregate
                .contributors
                .iter()
                .map(|id| id.into_inner())
                .collect();
            sqlx::query(
                r"INSERT INTO modifier_aggregates (settlement_id, kind, total, source_count, contributors)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(settlement_id.into_inner())
            .bind(to_text(&aggregate.kind)?)
            .bind(aggregate.total)
            .bind(i64::from(aggregate.source_count))
            .bind(contributors)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stock and population
    // -----------------------------------------------------------------------

    /// Resource stock of a settlement.
    pub async fn stock(&self, settlement_id: SettlementId) -> Result<Option<ResourceStock>, DbError> {
        let row = sqlx::query_as::<_, StockRow>(
            r"SELECT settlement_id, food, water, wood, stone, ore, updated_at
              FROM resource_stock
              WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(ResourceStock::from))
    }

    /// Overwrite a settlement's stock.
    pub async fn save_stock(&self, stock: &ResourceStock) -> Result<(), DbError> {
        let amounts = stock.amounts;
        sqlx::query(
            r"INSERT INTO resource_stock (settlement_id, food, water, wood, stone, ore, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (settlement_id) DO UPDATE SET
                food = EXCLUDED.food,
                water = EXCLUDED.water,
                wood = EXCLUDED.wood,
                stone = EXCLUDED.stone,
                ore = EXCLUDED.ore,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(stock.settlement_id.into_inner())
        .bind(amounts.food)
        .bind(amounts.water)
        .bind(amounts.wood)
        .bind(amounts.stone)
        .bind(amounts.ore)
        .bind(stock.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Replace a settlement's stock only if the stored row still equals
    /// `expected`, amounts and `updated_at` alike.
    pub async fn replace_stock(&self, expected: &ResourceStock, next: &ResourceStock) -> Result<bool, DbError> {
        let was = expected.amounts;
        let amounts = next.amounts;
        let result = sqlx::query(
            r"UPDATE resource_stock SET
                food = $2, water = $3, wood = $4, stone = $5, ore = $6, updated_at = $7
              WHERE settlement_id = $1
                AND food = $8 AND water = $9 AND wood = $10 AND stone = $11 AND ore = $12
                AND updated_at = $13",
        )
        .bind(next.settlement_id.into_inner())
        .bind(amounts.food)
        .bind(amounts.water)
        .bind(amounts.wood)
        .bind(amounts.stone)
        .bind(amounts.ore)
        .bind(next.updated_at)
        .bind(was.food)
        .bind(was.water)
        .bind(was.wood)
        .bind(was.stone)
        .bind(was.ore)
        .bind(expected.updated_at)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Population state of a settlement.
    pub async fn population(&self, settlement_id: SettlementId) -> Result<Option<PopulationState>, DbError> {
        let row = sqlx::query_as::<_, PopulationRow>(
            r"SELECT settlement_id, current, happiness, last_growth_tick, growth_carry, updated_at
              FROM population
              WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        row.map(PopulationState::try_from).transpose()
    }

    /// Overwrite a settlement's population state.
    pub async fn save_population(&self, state: &PopulationState) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO population
                (settlement_id, current, happiness, last_growth_tick, growth_carry, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (settlement_id) DO UPDATE SET
                current = EXCLUDED.current,
                happiness = EXCLUDED.happiness,
                last_growth_tick = EXCLUDED.last_growth_tick,
                growth_carry = EXCLUDED.growth_carry,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(state.settlement_id.into_inner())
        .bind(i64::from(state.current.max(1)))
        .bind(i16::from(state.happiness.min(100)))
        .bind(to_i64(state.last_growth_tick))
        .bind(state.growth_carry)
        .bind(state.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Construction queue
    // -----------------------------------------------------------------------

    /// Queue entries of a settlement in position order.
    pub async fn queue(&self, settlement_id: SettlementId) -> Result<Vec<ConstructionQueueEntry>, DbError> {
        let mut conn = self.pool.acquire().await?;
        load_queue(&mut conn, settlement_id).await
    }

    /// Deduct `cost` and store `entry` in one transaction.
    ///
    /// The settlement row is locked first, then the entry's position and
    /// whether it starts are decided against the queue as committed. Returns
    /// the stored entry, or `None` without writing anything when the stock
    /// no longer covers the cost.
    pub async fn enqueue_construction(
        &self,
        entry: &ConstructionQueueEntry,
        cost: &ResourceAmounts,
    ) -> Result<Option<ConstructionQueueEntry>, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_settlement(&mut tx, entry.settlement_id).await?;

        let debited = sqlx::query(
            r"UPDATE resource_stock SET
                food = food - $2,
                water = water - $3,
                wood = wood - $4,
                stone = stone - $5,
                ore = ore - $6
              WHERE settlement_id = $1
                AND food >= $2 AND water >= $3 AND wood >= $4 AND stone >= $5 AND ore >= $6",
        )
        .bind(entry.settlement_id.into_inner())
        .bind(cost.food)
        .bind(cost.water)
        .bind(cost.wood)
        .bind(cost.stone)
        .bind(cost.ore)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        let current = load_queue(&mut tx, entry.settlement_id).await?;
        let stored = construction::admit(entry.clone(), &current);
        upsert_entry(&mut tx, &stored).await?;
        tx.commit().await?;
        Ok(Some(stored))
    }

    /// Overwrite a queue entry.
    pub async fn save_queue_entry(&self, entry: &ConstructionQueueEntry) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        upsert_entry(&mut conn, entry).await
    }

    /// Promote a queued entry, holding the settlement row while the build
    /// slots are counted. Returns `false` when the entry is no longer
    /// queued or every slot is taken.
    pub async fn start_construction(&self, entry: &ConstructionQueueEntry) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_settlement(&mut tx, entry.settlement_id).await?;

        let current = load_queue(&mut tx, entry.settlement_id).await?;
        let still_queued = current
            .iter()
            .any(|e| e.id == entry.id && e.status == QueueStatus::Queued);
        if !still_queued || !construction::has_free_slot(&current) {
            tx.rollback().await?;
            return Ok(false);
        }

        upsert_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Mark an entry complete and insert or upgrade its structure.
    pub async fn complete_construction(
        &self,
        entry: &ConstructionQueueEntry,
        structure: &StructureInstance,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO structures
                (id, settlement_id, category, structure_type, level, health, population_assigned, built_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO UPDATE SET
                level = EXCLUDED.level,
                health = EXCLUDED.health,
                built_at = EXCLUDED.built_at",
        )
        .bind(structure.id.into_inner())
        .bind(structure.settlement_id.into_inner())
        .bind(to_text(&structure.category)?)
        .bind(to_text(&structure.structure_type)?)
        .bind(i16::from(structure.level))
        .bind(structure.health.map(i16::from))
        .bind(i64::from(structure.population_assigned))
        .bind(structure.built_at)
        .execute(&mut *tx)
        .await?;

        upsert_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Serialize queue changes of one settlement behind its row lock.
async fn lock_settlement(conn: &mut sqlx::PgConnection, settlement_id: SettlementId) -> Result<(), DbError> {
    sqlx::query(r"SELECT id FROM settlements WHERE id = $1 FOR UPDATE")
        .bind(settlement_id.into_inner())
        .fetch_optional(conn)
        .await?;
    Ok(())
}

async fn load_queue(
    conn: &mut sqlx::PgConnection,
    settlement_id: SettlementId,
) -> Result<Vec<ConstructionQueueEntry>, DbError> {
    let rows = sqlx::query_as::<_, QueueRow>(
        r"SELECT id, settlement_id, structure_type, target_level, upgrade_of, status, position,
                 is_emergency, queued_at, started_at, completes_at, completed_at
          FROM construction_queue
          WHERE settlement_id = $1
          ORDER BY position, queued_at",
    )
    .bind(settlement_id.into_inner())
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(ConstructionQueueEntry::try_from).collect()
}

async fn upsert_entry(
    conn: &mut sqlx::PgConnection,
    entry: &ConstructionQueueEntry,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO construction_queue
            (id, settlement_id, structure_type, target_level, upgrade_of, status, position,
             is_emergency, queued_at, started_at, completes_at, completed_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
          ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            position = EXCLUDED.position,
            started_at = EXCLUDED.started_at,
            completes_at = EXCLUDED.completes_at,
            completed_at = EXCLUDED.completed_at",
    )
    .bind(entry.id.into_inner())
    .bind(entry.settlement_id.into_inner())
    .bind(to_text(&entry.structure_type)?)
    .bind(i16::from(entry.target_level))
    .bind(entry.upgrade_of.map(StructureId::into_inner))
    .bind(to_text(&entry.status)?)
    .bind(i64::from(entry.position))
    .bind(entry.is_emergency)
    .bind(entry.queued_at)
    .bind(entry.started_at)
    .bind(entry.completes_at)
    .bind(entry.completed_at)
    .execute(conn)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct StructureRow {
    id: Uuid,
    settlement_id: Uuid,
    category: String,
    structure_type: String,
    level: i16,
    health: Option<i16>,
    population_assigned: i64,
    built_at: DateTime<Utc>,
}

impl TryFrom<StructureRow> for StructureInstance {
    type Error = DbError;

    fn try_from(row: StructureRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            settlement_id: row.settlement_id.into(),
            category: from_text(&row.category)?,
            structure_type: from_text(&row.structure_type)?,
            level: to_u8(row.level, "level")?,
            health: row.health.map(|h| to_u8(h, "health")).transpose()?,
            population_assigned: to_u32(row.population_assigned, "population_assigned")?,
            built_at: row.built_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ModifierRow {
    settlement_id: Uuid,
    kind: String,
    total: Decimal,
    source_count: i64,
    contributors: Vec<Uuid>,
}

impl TryFrom<ModifierRow> for ModifierAggregate {
    type Error = DbError;

    fn try_from(row: ModifierRow) -> Result<Self, Self::Error> {
        Ok(Self {
            settlement_id: row.settlement_id.into(),
            kind: from_text(&row.kind)?,
            total: row.total,
            source_count: to_u32(row.source_count, "source_count")?,
            contributors: row.contributors.into_iter().map(StructureId::from).collect(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    settlement_id: Uuid,
    food: Decimal,
    water: Decimal,
    wood: Decimal,
    stone: Decimal,
    ore: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for ResourceStock {
    fn from(row: StockRow) -> Self {
        Self {
            settlement_id: row.settlement_id.into(),
            amounts: ResourceAmounts {
                food: row.food,
                water: row.water,
                wood: row.wood,
                stone: row.stone,
                ore: row.ore,
            },
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PopulationRow {
    settlement_id: Uuid,
    current: i64,
    happiness: i16,
    last_growth_tick: i64,
    growth_carry: f64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PopulationRow> for PopulationState {
    type Error = DbError;

    fn try_from(row: PopulationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            settlement_id: row.settlement_id.into(),
            current: to_u32(row.current, "current")?,
            happiness: to_u8(row.happiness, "happiness")?,
            last_growth_tick: to_u64(row.last_growth_tick, "last_growth_tick")?,
            growth_carry: row.growth_carry,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    settlement_id: Uuid,
    structure_type: String,
    target_level: i16,
    upgrade_of: Option<Uuid>,
    status: String,
    position: i64,
    is_emergency: bool,
    queued_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completes_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for ConstructionQueueEntry {
    type Error = DbError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            settlement_id: row.settlement_id.into(),
            structure_type: from_text(&row.structure_type)?,
            target_level: to_u8(row.target_level, "target_level")?,
            upgrade_of: row.upgrade_of.map(StructureId::from),
            status: from_text(&row.status)?,
            position: to_u32(row.position, "position")?,
            is_emergency: row.is_emergency,
            queued_at: row.queued_at,
            started_at: row.started_at,
            completes_at: row.completes_at,
            completed_at: row.completed_at,
        })
    }
}
