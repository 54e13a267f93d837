//! Construction queue rules.
//!
//! A settlement runs at most [`MAX_CONCURRENT_BUILDS`] entries at once.
//! Further requests wait as `Queued` in position order. Every construction
//! step first completes due entries, then fills the freed slots with the
//! lowest-position queued entries.
//!
//! [`plan_enqueue`] validates a new request and prices it. The cost is
//! deducted all-or-nothing: on any shortfall nothing changes and the
//! per-resource shortfall is reported.
//!
//! The slot limit is only as good as the queue it is checked against.
//! Stores therefore re-run [`admit`] and [`has_free_slot`] while they hold
//! the settlement's queue exclusively, so two requests racing for the last
//! slot cannot both take it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use holdfast_types::{
    ConstructionQueueEntry, QueueEntryId, QueueStatus, ResourceAmounts, SettlementId,
    StructureId, StructureInstance, StructureType,
};

use crate::blueprint::{self, MAX_LEVEL};
use crate::error::EconomyError;

/// Maximum simultaneous `InProgress` entries per settlement.
pub const MAX_CONCURRENT_BUILDS: usize = 3;

/// A request to build or upgrade a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRequest {
    /// Structure to build.
    pub structure_type: StructureType,
    /// Existing structure to upgrade, or `None` for a new structure.
    pub upgrade_of: Option<StructureId>,
    /// Build in half the time for a 50% surcharge.
    pub is_emergency: bool,
}

/// A validated, priced request ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueuePlan {
    /// The new queue entry, either `InProgress` or `Queued`.
    pub entry: ConstructionQueueEntry,
    /// Resources to deduct.
    pub cost: ResourceAmounts,
    /// Stock after the deduction.
    pub remaining: ResourceAmounts,
}

/// Entries changed by one construction step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStep {
    /// Entries that became `Complete`.
    pub completed: Vec<ConstructionQueueEntry>,
    /// Entries promoted from `Queued` to `InProgress`.
    pub started: Vec<ConstructionQueueEntry>,
}

impl QueueStep {
    /// Whether the step changed nothing.
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.started.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Enqueue
// ---------------------------------------------------------------------------

/// Per-resource amount by which `stock` falls short of `cost`.
pub fn shortfall(cost: ResourceAmounts, stock: ResourceAmounts) -> ResourceAmounts {
    cost.saturating_sub(stock).map(|_, missing| missing.max(Decimal::ZERO))
}

/// Validate and price a build request for one settlement.
///
/// `structures` and `queue` must belong to `settlement_id`.
pub fn plan_enqueue(
    settlement_id: SettlementId,
    request: &BuildRequest,
    structures: &[StructureInstance],
    queue: &[ConstructionQueueEntry],
    stock: ResourceAmounts,
    now: DateTime<Utc>,
) -> Result<EnqueuePlan, EconomyError> {
    let target_level = match request.upgrade_of {
        None => 1,
        Some(structure_id) => {
            let existing = structures
                .iter()
                .find(|s| s.id == structure_id)
                .ok_or(EconomyError::UpgradeTargetNotFound {
                    structure_id,
                    settlement_id,
                })?;
            if existing.structure_type != request.structure_type {
                return Err(EconomyError::UpgradeTypeMismatch {
                    structure_id,
                    requested: request.structure_type,
                    actual: existing.structure_type,
                });
            }
            let already_queued = queue
                .iter()
                .any(|e| e.status != QueueStatus::Complete && e.upgrade_of == Some(structure_id));
            if already_queued {
                return Err(EconomyError::UpgradeAlreadyQueued(structure_id));
            }
            existing
                .level
                .checked_add(1)
                .filter(|level| *level <= MAX_LEVEL)
                .ok_or(EconomyError::InvalidLevel {
                    level: existing.level.saturating_add(1),
                })?
        }
    };

    let cost = blueprint::build_cost(request.structure_type, target_level, request.is_emergency);
    let missing = shortfall(cost, stock);
    if !missing.is_zero() {
        return Err(EconomyError::InsufficientResources { shortfall: missing });
    }

    let position = next_position(queue).ok_or(EconomyError::ArithmeticOverflow)?;

    let entry = ConstructionQueueEntry {
        id: QueueEntryId::new(),
        settlement_id,
        structure_type: request.structure_type,
        target_level,
        upgrade_of: request.upgrade_of,
        status: QueueStatus::Queued,
        position,
        is_emergency: request.is_emergency,
        queued_at: now,
        started_at: None,
        completes_at: None,
        completed_at: None,
    };

    Ok(EnqueuePlan {
        entry: admit(entry, queue),
        cost,
        remaining: stock.saturating_sub(cost),
    })
}

/// Place a new entry against the queue as it stands right now.
///
/// The entry takes the position after the last one and starts at its
/// `queued_at` if a build slot is free; otherwise it waits as `Queued`.
pub fn admit(mut entry: ConstructionQueueEntry, queue: &[ConstructionQueueEntry]) -> ConstructionQueueEntry {
    let others: Vec<ConstructionQueueEntry> = queue.iter().filter(|e| e.id != entry.id).cloned().collect();
    entry.position = next_position(&others).unwrap_or(u32::MAX);
    entry.status = QueueStatus::Queued;
    entry.started_at = None;
    entry.completes_at = None;
    if has_free_slot(&others) {
        let at = entry.queued_at;
        start(&mut entry, at);
    }
    entry
}

/// Whether fewer than [`MAX_CONCURRENT_BUILDS`] entries are in progress.
pub fn has_free_slot(queue: &[ConstructionQueueEntry]) -> bool {
    in_progress_count(queue) < MAX_CONCURRENT_BUILDS
}

fn next_position(queue: &[ConstructionQueueEntry]) -> Option<u32> {
    queue
        .iter()
        .map(|e| e.position)
        .max()
        .map_or(Some(1), |p| p.checked_add(1))
}

fn in_progress_count(queue: &[ConstructionQueueEntry]) -> usize {
    queue
        .iter()
        .filter(|e| e.status == QueueStatus::InProgress)
        .count()
}

fn start(entry: &mut ConstructionQueueEntry, now: DateTime<Utc>) {
    let duration = blueprint::build_duration(entry.structure_type, entry.is_emergency);
    entry.status = QueueStatus::InProgress;
    entry.started_at = Some(now);
    entry.completes_at = Some(now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC));
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One construction step over a settlement's queue.
///
/// Returns the entries whose state changed. Entries are not modified in
/// place; the caller persists the returned copies.
pub fn step(queue: &[ConstructionQueueEntry], now: DateTime<Utc>) -> QueueStep {
    let mut result = QueueStep::default();
    let mut running = 0_usize;

    for entry in queue.iter().filter(|e| e.status == QueueStatus::InProgress) {
        let due = entry.completes_at.is_none_or(|at| at <= now);
        if due {
            let mut done = entry.clone();
            done.status = QueueStatus::Complete;
            done.completed_at = Some(now);
            result.completed.push(done);
        } else {
            running = running.saturating_add(1);
        }
    }

    let free = MAX_CONCURRENT_BUILDS.saturating_sub(running);
    let mut waiting: Vec<&ConstructionQueueEntry> = queue
        .iter()
        .filter(|e| e.status == QueueStatus::Queued)
        .collect();
    waiting.sort_by_key(|e| e.position);

    for entry in waiting.into_iter().take(free) {
        let mut promoted = entry.clone();
        start(&mut promoted, now);
        result.started.push(promoted);
    }

    result
}

/// The structure produced by a completed entry.
///
/// Upgrades return the existing structure at the target level; new builds
/// return a fresh structure at full health.
pub fn complete(
    entry: &ConstructionQueueEntry,
    structures: &[StructureInstance],
    now: DateTime<Utc>,
) -> Result<StructureInstance, EconomyError> {
    if entry.target_level == 0 || entry.target_level > MAX_LEVEL {
        return Err(EconomyError::InvalidLevel {
            level: entry.target_level,
        });
    }
    match entry.upgrade_of {
        Some(structure_id) => {
            let mut upgraded = structures
                .iter()
                .find(|s| s.id == structure_id)
                .cloned()
                .ok_or(EconomyError::UpgradeTargetNotFound {
                    structure_id,
                    settlement_id: entry.settlement_id,
                })?;
            upgraded.level = entry.target_level;
            Ok(upgraded)
        }
        None => Ok(StructureInstance {
            id: StructureId::new(),
            settlement_id: entry.settlement_id,
            category: blueprint::blueprint(entry.structure_type).category,
            structure_type: entry.structure_type,
            level: entry.target_level,
            health: Some(100),
            population_assigned: 0,
            built_at: now,
        }),
    }
}
