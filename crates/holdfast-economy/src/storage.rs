//! Storage capacity, clamping, waste, and warnings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use holdfast_types::{ModifierKind, ResourceAmounts, ResourceKind};

use crate::modifiers::ModifierTotals;

/// Capacity of every resource before modifiers.
pub const BASE_CAPACITY: Decimal = dec!(1000);

/// Fill ratio above which a storage warning is raised.
pub const NEAR_CAPACITY_RATIO: Decimal = dec!(0.9);

/// Per-resource capacity.
///
/// `BASE_CAPACITY` plus the global storage modifier on all five resources
/// plus each resource's own storage modifier. Never negative.
pub fn capacity(modifiers: &ModifierTotals) -> ResourceAmounts {
    let global = modifiers.get(ModifierKind::StorageCapacity);
    ResourceAmounts::uniform(BASE_CAPACITY.saturating_add(global)).map(|resource, base| {
        base.saturating_add(modifiers.get(ModifierKind::storage_for(resource)))
            .max(Decimal::ZERO)
    })
}

/// Apply `delta` to `stock`, keeping every resource within `[0, capacity]`.
pub fn clamp(
    stock: ResourceAmounts,
    delta: ResourceAmounts,
    capacity: ResourceAmounts,
) -> ResourceAmounts {
    stock.map(|resource, current| {
        current
            .saturating_add(delta.get(resource))
            .min(capacity.get(resource))
            .max(Decimal::ZERO)
    })
}

/// Production that does not fit in storage.
///
/// Only positive deltas can waste; the wasted share never exceeds the delta
/// itself.
pub fn waste(
    current: ResourceAmounts,
    delta: ResourceAmounts,
    capacity: ResourceAmounts,
) -> ResourceAmounts {
    current.map(|resource, amount| {
        let incoming = delta.get(resource);
        if incoming <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        amount
            .saturating_add(incoming)
            .saturating_sub(capacity.get(resource))
            .clamp(Decimal::ZERO, incoming)
    })
}

/// Resources filled strictly above 90% of capacity.
pub fn near_capacity(stock: ResourceAmounts, capacity: ResourceAmounts) -> Vec<ResourceKind> {
    stock
        .iter()
        .filter(|&(resource, amount)| {
            let cap = capacity.get(resource);
            cap > Decimal::ZERO && amount > cap.saturating_mul(NEAR_CAPACITY_RATIO)
        })
        .map(|(resource, _)| resource)
        .collect()
}

/// Resources whose consumption exceeded the available stock.
pub fn shortage(stock: ResourceAmounts, delta: ResourceAmounts) -> Vec<ResourceKind> {
    stock
        .iter()
        .filter(|&(resource, amount)| amount.saturating_add(delta.get(resource)) < Decimal::ZERO)
        .map(|(resource, _)| resource)
        .collect()
}
