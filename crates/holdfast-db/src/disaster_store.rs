//! Disaster events and their per-settlement reports.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use holdfast_types::{
    Biome, DisasterEvent, DisasterId, DisasterPhase, DisasterReport, DisasterStatus, ResourceAmounts,
    WorldId,
};

use crate::convert::{from_text, to_text, to_u8, to_u32};
use crate::error::DbError;

/// Operations on the `disasters` and `disaster_reports` tables.
#[derive(Debug, Clone, Copy)]
pub struct DisasterStore<'a> {
    pool: &'a PgPool,
}

impl<'a> DisasterStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Disasters of a world that have not resolved, oldest first.
    pub async fn active(&self, world_id: WorldId) -> Result<Vec<DisasterEvent>, DbError> {
        let rows = sqlx::query_as::<_, DisasterRow>(
            r"SELECT id, world_id, region_id, disaster_type, severity, affected_biomes,
                     scheduled_at, warning_seconds, impact_seconds, phase, created_at
              FROM disasters
              WHERE world_id = $1 AND status <> $2
              ORDER BY created_at, id",
        )
        .bind(world_id.into_inner())
        .bind(to_text(&DisasterStatus::Resolved)?)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(DisasterEvent::try_from).collect()
    }

    /// Store a new disaster.
    pub async fn insert(&self, disaster: &DisasterEvent) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO disasters
                (id, world_id, region_id, disaster_type, severity, affected_biomes,
                 scheduled_at, warning_seconds, impact_seconds, status, phase, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(disaster.id.into_inner())
        .bind(disaster.world_id.into_inner())
        .bind(disaster.region_id.into_inner())
        .bind(to_text(&disaster.disaster_type)?)
        .bind(i16::from(disaster.severity))
        .bind(Json(&disaster.affected_biomes))
        .bind(disaster.scheduled_at)
        .bind(i64::from(disaster.warning_seconds))
        .bind(i64::from(disaster.impact_seconds))
        .bind(to_text(&disaster.status())?)
        .bind(Json(disaster.phase))
        .bind(disaster.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Persist a disaster's phase (and the flat status derived from it).
    pub async fn save(&self, disaster: &DisasterEvent) -> Result<(), DbError> {
        sqlx::query(r"UPDATE disasters SET status = $2, phase = $3 WHERE id = $1")
            .bind(disaster.id.into_inner())
            .bind(to_text(&disaster.status())?)
            .bind(Json(disaster.phase))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Insert or replace the report for one settlement.
    pub async fn save_report(&self, report: &DisasterReport) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO disaster_reports
                (disaster_id, settlement_id, casualties, structures_lost, resource_losses)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (disaster_id, settlement_id) DO UPDATE SET
                casualties = EXCLUDED.casualties,
                structures_lost = EXCLUDED.structures_lost,
                resource_losses = EXCLUDED.resource_losses",
        )
        .bind(report.disaster_id.into_inner())
        .bind(report.settlement_id.into_inner())
        .bind(i64::from(report.casualties))
        .bind(i64::from(report.structures_lost))
        .bind(Json(report.resource_losses))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Reports of one disaster.
    pub async fn reports(&self, disaster_id: DisasterId) -> Result<Vec<DisasterReport>, DbError> {
        let rows = sqlx::query_as::<_, ReportRow>(
            r"SELECT disaster_id, settlement_id, casualties, structures_lost, resource_losses
              FROM disaster_reports
              WHERE disaster_id = $1
              ORDER BY settlement_id",
        )
        .bind(disaster_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(DisasterReport::try_from).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DisasterRow {
    id: Uuid,
    world_id: Uuid,
    region_id: Uuid,
    disaster_type: String,
    severity: i16,
    affected_biomes: Json<Vec<Biome>>,
    scheduled_at: DateTime<Utc>,
    warning_seconds: i64,
    impact_seconds: i64,
    phase: Json<DisasterPhase>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DisasterRow> for DisasterEvent {
    type Error = DbError;

    fn try_from(row: DisasterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            world_id: row.world_id.into(),
            disaster_type: from_text(&row.disaster_type)?,
            severity: to_u8(row.severity, "severity")?,
            region_id: row.region_id.into(),
            affected_biomes: row.affected_biomes.0,
            scheduled_at: row.scheduled_at,
            warning_seconds: to_u32(row.warning_seconds, "warning_seconds")?,
            impact_seconds: to_u32(row.impact_seconds, "impact_seconds")?,
            phase: row.phase.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    disaster_id: Uuid,
    settlement_id: Uuid,
    casualties: i64,
    structures_lost: i64,
    resource_losses: Json<ResourceAmounts>,
}

impl TryFrom<ReportRow> for DisasterReport {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            disaster_id: row.disaster_id.into(),
            settlement_id: row.settlement_id.into(),
            casualties: to_u32(row.casualties, "casualties")?,
            structures_lost: to_u32(row.structures_lost, "structures_lost")?,
            resource_losses: row.resource_losses.0,
        })
    }
}
