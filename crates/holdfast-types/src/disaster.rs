//! Disaster records: the event itself, its lifecycle phase, and the
//! per-settlement report written when impact ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Biome, DisasterStatus, DisasterType, SeverityLevel};
use crate::ids::{DisasterId, RegionId, SettlementId, WorldId};
use crate::structs::ResourceAmounts;

/// Lifecycle phase of a disaster.
///
/// Each variant carries only the timestamps that are meaningful once the
/// disaster has reached that phase. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum DisasterPhase {
    /// Created; no notice has gone out yet.
    Scheduled,
    /// Players have been warned.
    Warning {
        /// When the warning was issued.
        warning_issued_at: DateTime<Utc>,
        /// Whether the one-time imminent notice has been sent.
        imminent_notified: bool,
    },
    /// Damage is being applied in increments.
    Impact {
        /// When impact began.
        impact_started_at: DateTime<Utc>,
        /// Number of damage increments already applied.
        increments_applied: u32,
    },
    /// Impact is over; production penalties decay.
    Aftermath {
        /// When impact ended.
        impact_ended_at: DateTime<Utc>,
    },
    /// Terminal.
    Resolved {
        /// When impact ended.
        impact_ended_at: DateTime<Utc>,
        /// When the disaster resolved.
        resolved_at: DateTime<Utc>,
    },
}

impl DisasterPhase {
    /// Flat status of the phase.
    pub const fn status(&self) -> DisasterStatus {
        match self {
            Self::Scheduled => DisasterStatus::Scheduled,
            Self::Warning { .. } => DisasterStatus::Warning,
            Self::Impact { .. } => DisasterStatus::Impact,
            Self::Aftermath { .. } => DisasterStatus::Aftermath,
            Self::Resolved { .. } => DisasterStatus::Resolved,
        }
    }
}

/// A natural disaster targeting part of a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterEvent {
    /// Disaster identifier.
    pub id: DisasterId,
    /// World the disaster happens in.
    pub world_id: WorldId,
    /// Disaster type.
    pub disaster_type: DisasterType,
    /// Severity 0-100.
    pub severity: u8,
    /// Targeted region.
    pub region_id: RegionId,
    /// Biomes whose settlements are affected.
    pub affected_biomes: Vec<Biome>,
    /// When impact is scheduled to begin.
    pub scheduled_at: DateTime<Utc>,
    /// Warning lead time before `scheduled_at`, in seconds.
    pub warning_seconds: u32,
    /// Duration of the impact phase, in seconds.
    pub impact_seconds: u32,
    /// Current lifecycle phase.
    pub phase: DisasterPhase,
    /// When the disaster was rolled.
    pub created_at: DateTime<Utc>,
}

impl DisasterEvent {
    /// Severity bucket.
    pub const fn severity_level(&self) -> SeverityLevel {
        SeverityLevel::from_severity(self.severity)
    }

    /// Flat lifecycle status.
    pub const fn status(&self) -> DisasterStatus {
        self.phase.status()
    }

    /// Whether a settlement on `biome` is affected.
    pub fn affects(&self, biome: Biome) -> bool {
        self.affected_biomes.contains(&biome)
    }
}

/// Outcome of a disaster for one affected settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterReport {
    /// Disaster the report belongs to.
    pub disaster_id: DisasterId,
    /// Affected settlement.
    pub settlement_id: SettlementId,
    /// Settlers lost.
    pub casualties: u32,
    /// Structures whose health reached zero.
    pub structures_lost: u32,
    /// Stock destroyed.
    pub resource_losses: ResourceAmounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_status_follows_variant() {
        let now = Utc::now();
        assert_eq!(DisasterPhase::Scheduled.status(), DisasterStatus::Scheduled);
        let impact = DisasterPhase::Impact {
            impact_started_at: now,
            increments_applied: 0,
        };
        assert_eq!(impact.status(), DisasterStatus::Impact);
        let resolved = DisasterPhase::Resolved {
            impact_ended_at: now,
            resolved_at: now,
        };
        assert_eq!(resolved.status(), DisasterStatus::Resolved);
    }

    #[test]
    fn phase_serializes_with_status_tag() {
        let json = serde_json::to_value(DisasterPhase::Scheduled).ok();
        assert_eq!(
            json.as_ref()
                .and_then(|v| v.get("status"))
                .and_then(serde_json::Value::as_str),
            Some("SCHEDULED")
        );
    }
}
