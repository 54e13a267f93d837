//! Passive repair.
//!
//! Settlements with a standing Workshop heal damaged structures every hour.
//! Only structures with health in `21..=99` are repaired: badly damaged
//! structures need manual repair and undamaged ones need nothing.

use holdfast_types::{StructureId, StructureInstance, StructureType};

use crate::error::EconomyError;
use crate::modifiers::is_standing;

/// Health at or below which passive repair does not apply.
pub const REPAIR_FLOOR: u8 = 20;

/// Health points restored per pass by default.
pub const DEFAULT_POINTS_PER_HOUR: u8 = 1;

/// One structure healed by a repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repair {
    /// Repaired structure.
    pub structure_id: StructureId,
    /// Health before the pass.
    pub from: u8,
    /// Health after the pass.
    pub to: u8,
}

/// Whether any standing Workshop exists among `structures`.
pub fn has_workshop(structures: &[StructureInstance]) -> bool {
    structures
        .iter()
        .any(|s| s.structure_type == StructureType::Workshop && is_standing(s))
}

/// Health after one repair pass, or `None` if the structure is ineligible.
pub fn repaired_health(health: Option<u8>, points: u8) -> Result<Option<u8>, EconomyError> {
    match health {
        None | Some(100) => Ok(None),
        Some(h) if h > 100 => Err(EconomyError::InvalidHealth { health: h }),
        Some(h) if h <= REPAIR_FLOOR => Ok(None),
        Some(h) => Ok(Some(h.saturating_add(points).min(100))),
    }
}

/// Repairs for every eligible structure of one settlement.
///
/// Returns nothing when the settlement has no standing Workshop.
pub fn repair_pass(structures: &[StructureInstance], points: u8) -> Vec<Repair> {
    if !has_workshop(structures) {
        return Vec::new();
    }
    structures
        .iter()
        .filter_map(|s| {
            let from = s.health?;
            match repaired_health(s.health, points) {
                Ok(Some(to)) => Some(Repair {
                    structure_id: s.id,
                    from,
                    to,
                }),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(structure_id = %s.id, error = %e, "Skipping repair of invalid structure");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use holdfast_types::{SettlementId, StructureCategory};

    use super::*;

    fn structure(structure_type: StructureType, health: Option<u8>) -> StructureInstance {
        StructureInstance {
            id: StructureId::new(),
            settlement_id: SettlementId::new(),
            category: StructureCategory::Building,
            structure_type,
            level: 1,
            health,
            population_assigned: 0,
            built_at: Utc::now(),
        }
    }

    #[test]
    fn eligible_range_is_21_to_99() {
        assert_eq!(repaired_health(Some(20), 1).unwrap(), None);
        assert_eq!(repaired_health(Some(21), 1).unwrap(), Some(22));
        assert_eq!(repaired_health(Some(99), 1).unwrap(), Some(100));
        assert_eq!(repaired_health(Some(100), 1).unwrap(), None);
        assert_eq!(repaired_health(None, 1).unwrap(), None);
        assert_eq!(repaired_health(Some(98), 5).unwrap(), Some(100));
    }

    #[test]
    fn out_of_range_health_is_rejected() {
        assert!(matches!(
            repaired_health(Some(140), 1),
            Err(EconomyError::InvalidHealth { health: 140 })
        ));
    }

    #[test]
    fn workshop_heals_by_one_point() {
        let house = structure(StructureType::House, Some(50));
        let structures = vec![structure(StructureType::Workshop, None), house.clone()];
        let repairs = repair_pass(&structures, DEFAULT_POINTS_PER_HOUR);
        assert_eq!(
            repairs,
            vec![Repair {
                structure_id: house.id,
                from: 50,
                to: 51
            }]
        );
    }

    #[test]
    fn no_workshop_no_repair() {
        let structures = vec![structure(StructureType::House, Some(50))];
        assert!(repair_pass(&structures, 1).is_empty());
    }

    #[test]
    fn destroyed_workshop_does_not_count() {
        let structures = vec![
            structure(StructureType::Workshop, Some(0)),
            structure(StructureType::House, Some(50)),
        ];
        assert!(repair_pass(&structures, 1).is_empty());
    }
}
