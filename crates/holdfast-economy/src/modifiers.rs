//! Structure-derived modifier aggregation.
//!
//! Each standing structure contributes modifiers by type and level (see
//! [`crate::blueprint::contributions`]). [`aggregate`] groups and sums them
//! into one [`ModifierAggregate`] per kind, which the store caches and the
//! population and storage rules read back through [`ModifierTotals`].
//!
//! Modifier names persisted by older clients are resolved through a static
//! alias table ([`resolve_name`]).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use rust_decimal::Decimal;

use holdfast_types::{ModifierAggregate, ModifierKind, SettlementId, StructureInstance};

use crate::blueprint;

// ---------------------------------------------------------------------------
// Aliases
// ---------------------------------------------------------------------------

static ALIASES: LazyLock<BTreeMap<&'static str, ModifierKind>> = LazyLock::new(|| {
    BTreeMap::from([
        ("population_capacity", ModifierKind::PopulationCapacity),
        ("housing_capacity", ModifierKind::PopulationCapacity),
        ("pop_cap", ModifierKind::PopulationCapacity),
        ("max_population", ModifierKind::PopulationCapacity),
        ("storage_capacity", ModifierKind::StorageCapacity),
        ("storage", ModifierKind::StorageCapacity),
        ("global_storage", ModifierKind::StorageCapacity),
        ("food_storage", ModifierKind::FoodStorage),
        ("food_capacity", ModifierKind::FoodStorage),
        ("water_storage", ModifierKind::WaterStorage),
        ("water_capacity", ModifierKind::WaterStorage),
        ("wood_storage", ModifierKind::WoodStorage),
        ("wood_capacity", ModifierKind::WoodStorage),
        ("stone_storage", ModifierKind::StoneStorage),
        ("stone_capacity", ModifierKind::StoneStorage),
        ("ore_storage", ModifierKind::OreStorage),
        ("ore_capacity", ModifierKind::OreStorage),
        ("morale_bonus", ModifierKind::MoraleBonus),
        ("morale", ModifierKind::MoraleBonus),
        ("happiness", ModifierKind::MoraleBonus),
        ("happiness_bonus", ModifierKind::MoraleBonus),
    ])
});

/// Resolve a canonical or legacy modifier name.
pub fn resolve_name(name: &str) -> Option<ModifierKind> {
    ALIASES.get(name).copied()
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Summed modifier values for one settlement, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierTotals(BTreeMap<ModifierKind, Decimal>);

impl ModifierTotals {
    /// Build totals from cached aggregate rows.
    pub fn from_aggregates(aggregates: &[ModifierAggregate]) -> Self {
        let mut totals = Self::default();
        for aggregate in aggregates {
            totals.add(aggregate.kind, aggregate.total);
        }
        totals
    }

    /// Build totals from `(name, value)` pairs, resolving legacy names.
    ///
    /// Unknown names are skipped with a warning.
    pub fn from_named<'a>(pairs: impl IntoIterator<Item = (&'a str, Decimal)>) -> Self {
        let mut totals = Self::default();
        for (name, value) in pairs {
            match resolve_name(name) {
                Some(kind) => totals.add(kind, value),
                None => tracing::warn!(modifier = name, "Unknown modifier name, skipping"),
            }
        }
        totals
    }

    /// Add `value` to the total of `kind`.
    pub fn add(&mut self, kind: ModifierKind, value: Decimal) {
        let entry = self.0.entry(kind).or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(value);
    }

    /// Total of `kind`, zero when absent.
    pub fn get(&self, kind: ModifierKind) -> Decimal {
        self.0.get(&kind).copied().unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Whether a structure still provides its effects.
pub fn is_standing(structure: &StructureInstance) -> bool {
    structure.effective_health() > 0
}

/// Group and sum the contributions of every standing structure.
///
/// Returns one row per modifier kind with a non-empty contributor list, in
/// kind order. A settlement without standing structures yields no rows.
pub fn aggregate(
    settlement_id: SettlementId,
    structures: &[StructureInstance],
) -> Vec<ModifierAggregate> {
    let mut grouped: BTreeMap<ModifierKind, ModifierAggregate> = BTreeMap::new();
    for structure in structures.iter().filter(|s| is_standing(s)) {
        for (kind, value) in blueprint::contributions(structure.structure_type, structure.level) {
            let row = grouped.entry(kind).or_insert_with(|| ModifierAggregate {
                settlement_id,
                kind,
                total: Decimal::ZERO,
                source_count: 0,
                contributors: Vec::new(),
            });
            row.total = row.total.saturating_add(value);
            row.source_count = row.source_count.saturating_add(1);
            row.contributors.push(structure.id);
        }
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use holdfast_types::{StructureCategory, StructureId, StructureType};

    use super::*;

    fn structure(
        settlement_id: SettlementId,
        structure_type: StructureType,
        level: u8,
        health: Option<u8>,
    ) -> StructureInstance {
        StructureInstance {
            id: StructureId::new(),
            settlement_id,
            category: StructureCategory::Building,
            structure_type,
            level,
            health,
            population_assigned: 0,
            built_at: Utc::now(),
        }
    }

    #[test]
    fn aliases_resolve_to_canonical_kinds() {
        assert_eq!(resolve_name("housing_capacity"), Some(ModifierKind::PopulationCapacity));
        assert_eq!(resolve_name("happiness"), Some(ModifierKind::MoraleBonus));
        assert_eq!(resolve_name("global_storage"), Some(ModifierKind::StorageCapacity));
        assert_eq!(resolve_name("unknown_thing"), None);
    }

    #[test]
    fn named_totals_merge_aliases() {
        let totals = ModifierTotals::from_named([
            ("pop_cap", dec!(5)),
            ("max_population", dec!(3)),
            ("bogus", dec!(100)),
        ]);
        assert_eq!(totals.get(ModifierKind::PopulationCapacity), dec!(8));
        assert_eq!(totals.get(ModifierKind::MoraleBonus), Decimal::ZERO);
    }

    #[test]
    fn aggregate_groups_and_sums_by_kind() {
        let settlement = SettlementId::new();
        let structures = vec![
            structure(settlement, StructureType::House, 1, None),
            structure(settlement, StructureType::House, 2, Some(80)),
            structure(settlement, StructureType::Tavern, 1, None),
        ];
        let rows = aggregate(settlement, &structures);
        assert_eq!(rows.len(), 2);

        let pop = rows
            .iter()
            .find(|r| r.kind == ModifierKind::PopulationCapacity);
        assert_eq!(pop.map(|r| r.total), Some(dec!(15)));
        assert_eq!(pop.map(|r| r.source_count), Some(2));

        let morale = rows.iter().find(|r| r.kind == ModifierKind::MoraleBonus);
        assert_eq!(morale.map(|r| r.total), Some(dec!(5)));
    }

    #[test]
    fn destroyed_structures_do_not_contribute() {
        let settlement = SettlementId::new();
        let structures = vec![structure(settlement, StructureType::Warehouse, 1, Some(0))];
        assert!(aggregate(settlement, &structures).is_empty());
        assert!(aggregate(settlement, &[]).is_empty());
    }
}
