//! Per-cadence passes run by the [`Engine`](crate::engine::Engine).

mod construction;
mod disaster;
mod modifiers;
mod population;
pub(crate) mod production;
mod repair;
mod transfer;
