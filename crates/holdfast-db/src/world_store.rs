//! Worlds, regions, tiles, and settlements.
//!
//! The engine only reads these tables, apart from two settlement columns
//! written by the disaster lifecycle (`resilience` and
//! `emergency_repair_until`). The `insert_*` operations seed state created
//! outside the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use holdfast_types::{
    Biome, Region, Settlement, SettlementId, Tile, TileId, TileQuality, World, WorldId, WorldTemplate,
};

use crate::convert::{from_text, to_text, to_u32};
use crate::error::DbError;

/// Operations on the world geography and settlement tables.
#[derive(Debug, Clone, Copy)]
pub struct WorldStore<'a> {
    pool: &'a PgPool,
}

impl<'a> WorldStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every world with `active = true`.
    pub async fn active_worlds(&self) -> Result<Vec<World>, DbError> {
        let rows = sqlx::query_as::<_, WorldRow>(
            r"SELECT id, name, active, template FROM worlds WHERE active ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(World::from).collect())
    }

    /// Regions of a world.
    pub async fn regions(&self, world_id: WorldId) -> Result<Vec<Region>, DbError> {
        let rows = sqlx::query_as::<_, RegionRow>(
            r"SELECT id, world_id, name, biome_tiles FROM regions WHERE world_id = $1 ORDER BY id",
        )
        .bind(world_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Region::from).collect())
    }

    /// A tile by id.
    pub async fn tile(&self, tile_id: TileId) -> Result<Option<Tile>, DbError> {
        let row = sqlx::query_as::<_, TileRow>(
            r"SELECT id, region_id, biome, quality FROM tiles WHERE id = $1",
        )
        .bind(tile_id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        row.map(Tile::try_from).transpose()
    }

    /// Settlements of a world.
    pub async fn settlements(&self, world_id: WorldId) -> Result<Vec<Settlement>, DbError> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r"SELECT id, player_id, world_id, region_id, tile_id, name, resilience, emergency_repair_until
              FROM settlements
              WHERE world_id = $1
              ORDER BY id",
        )
        .bind(world_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Settlement::try_from).collect()
    }

    /// A settlement by id.
    pub async fn settlement(&self, settlement_id: SettlementId) -> Result<Option<Settlement>, DbError> {
        let row = sqlx::query_as::<_, SettlementRow>(
            r"SELECT id, player_id, world_id, region_id, tile_id, name, resilience, emergency_repair_until
              FROM settlements
              WHERE id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        row.map(Settlement::try_from).transpose()
    }

    /// Add to a settlement's resilience.
    pub async fn add_resilience(&self, settlement_id: SettlementId, bonus: u32) -> Result<(), DbError> {
        sqlx::query(r"UPDATE settlements SET resilience = resilience + $2 WHERE id = $1")
            .bind(settlement_id.into_inner())
            .bind(i64::from(bonus))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Open or extend the emergency repair window.
    pub async fn set_emergency_repair(
        &self,
        settlement_id: SettlementId,
        until: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE settlements
              SET emergency_repair_until = GREATEST(COALESCE(emergency_repair_until, $2), $2)
              WHERE id = $1",
        )
        .bind(settlement_id.into_inner())
        .bind(until)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Insert or replace a world.
    pub async fn insert_world(&self, world: &World) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO worlds (id, name, active, template) VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name, active = EXCLUDED.active, template = EXCLUDED.template",
        )
        .bind(world.id.into_inner())
        .bind(&world.name)
        .bind(world.active)
        .bind(Json(&world.template))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a region.
    pub async fn insert_region(&self, region: &Region) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO regions (id, world_id, name, biome_tiles) VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, biome_tiles = EXCLUDED.biome_tiles",
        )
        .bind(region.id.into_inner())
        .bind(region.world_id.into_inner())
        .bind(&region.name)
        .bind(Json(&region.biome_tiles))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a tile.
    pub async fn insert_tile(&self, tile: &Tile) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO tiles (id, region_id, biome, quality) VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE SET biome = EXCLUDED.biome, quality = EXCLUDED.quality",
        )
        .bind(tile.id.into_inner())
        .bind(tile.region_id.into_inner())
        .bind(to_text(&tile.biome)?)
        .bind(Json(tile.quality))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a settlement.
    pub async fn insert_settlement(&self, settlement: &Settlement) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO settlements
                (id, player_id, world_id, region_id, tile_id, name, resilience, emergency_repair_until)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                resilience = EXCLUDED.resilience,
                emergency_repair_until = EXCLUDED.emergency_repair_until",
        )
        .bind(settlement.id.into_inner())
        .bind(settlement.player_id.into_inner())
        .bind(settlement.world_id.into_inner())
        .bind(settlement.region_id.into_inner())
        .bind(settlement.tile_id.into_inner())
        .bind(&settlement.name)
        .bind(i64::from(settlement.resilience))
        .bind(settlement.emergency_repair_until)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct WorldRow {
    id: Uuid,
    name: String,
    active: bool,
    template: Json<WorldTemplate>,
}

impl From<WorldRow> for World {
    fn from(row: WorldRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            active: row.active,
            template: row.template.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RegionRow {
    id: Uuid,
    world_id: Uuid,
    name: String,
    biome_tiles: Json<BTreeMap<Biome, u32>>,
}

impl From<RegionRow> for Region {
    fn from(row: RegionRow) -> Self {
        Self {
            id: row.id.into(),
            world_id: row.world_id.into(),
            name: row.name,
            biome_tiles: row.biome_tiles.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TileRow {
    id: Uuid,
    region_id: Uuid,
    biome: String,
    quality: Json<TileQuality>,
}

impl TryFrom<TileRow> for Tile {
    type Error = DbError;

    fn try_from(row: TileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            region_id: row.region_id.into(),
            biome: from_text(&row.biome)?,
            quality: row.quality.0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettlementRow {
    id: Uuid,
    player_id: Uuid,
    world_id: Uuid,
    region_id: Uuid,
    tile_id: Uuid,
    name: String,
    resilience: i64,
    emergency_repair_until: Option<DateTime<Utc>>,
}

impl TryFrom<SettlementRow> for Settlement {
    type Error = DbError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            player_id: row.player_id.into(),
            world_id: row.world_id.into(),
            region_id: row.region_id.into(),
            tile_id: row.tile_id.into(),
            name: row.name,
            resilience: to_u32(row.resilience, "resilience")?,
            emergency_repair_until: row.emergency_repair_until,
        })
    }
}
