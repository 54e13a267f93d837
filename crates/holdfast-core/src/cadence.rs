//! Tick-counted cadences.
//!
//! A cadence fires when at least its interval in ticks has passed since it
//! last fired. The marker moves to the current tick before any work runs,
//! so a slow pass can never make the same interval fire twice.
//!
//! | Cadence           | Interval (ticks)                  |
//! |-------------------|-----------------------------------|
//! | `DisasterStep`    | 6                                 |
//! | `ConstructionStep`| 60                                |
//! | `Hourly`          | rate x 3600                       |
//! | `ResourcePreview` | rate x projection interval        |
//! | `ResourceApply`   | rate x resource interval          |
//! | `Population`      | rate x population interval        |
//! | `TransferPoll`    | rate x 10                         |

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SchedulerConfig;

/// Ticks between disaster steps.
pub const DISASTER_STEP_TICKS: u64 = 6;

/// Ticks between construction steps.
pub const CONSTRUCTION_STEP_TICKS: u64 = 60;

/// Seconds between transfer polls.
pub const TRANSFER_POLL_SECONDS: u64 = 10;

/// Seconds in the hourly cadence.
pub const HOUR_SECONDS: u64 = 3_600;

/// A unit of periodic work driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Advance every active disaster.
    DisasterStep,
    /// Complete and promote construction queue entries.
    ConstructionStep,
    /// Disaster creation rolls and passive repair.
    Hourly,
    /// Broadcast projected resources.
    ResourcePreview,
    /// Persist production and consumption.
    ResourceApply,
    /// Population dynamics.
    Population,
    /// Complete due transfers.
    TransferPoll,
}

impl Cadence {
    /// Every cadence, in firing order within a tick.
    pub const ALL: [Self; 7] = [
        Self::DisasterStep,
        Self::ConstructionStep,
        Self::Hourly,
        Self::ResourcePreview,
        Self::ResourceApply,
        Self::Population,
        Self::TransferPoll,
    ];

    /// Stable name used in logs and claim markers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisasterStep => "disaster_step",
            Self::ConstructionStep => "construction_step",
            Self::Hourly => "hourly",
            Self::ResourcePreview => "resource_preview",
            Self::ResourceApply => "resource_apply",
            Self::Population => "population",
            Self::TransferPoll => "transfer_poll",
        }
    }

    /// Interval of this cadence in ticks under `config`.
    pub fn interval_ticks(self, config: &SchedulerConfig) -> u64 {
        let rate = u64::from(config.tick_rate);
        let seconds = |s: u64| rate.saturating_mul(s).max(1);
        match self {
            Self::DisasterStep => DISASTER_STEP_TICKS,
            Self::ConstructionStep => CONSTRUCTION_STEP_TICKS,
            Self::Hourly => seconds(HOUR_SECONDS),
            Self::ResourcePreview => seconds(u64::from(config.projection_interval_seconds)),
            Self::ResourceApply => seconds(u64::from(config.resource_interval_seconds)),
            Self::Population => seconds(u64::from(config.population_interval_seconds)),
            Self::TransferPoll => seconds(TRANSFER_POLL_SECONDS),
        }
    }
}

impl core::fmt::Display for Cadence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-fired markers for every cadence.
#[derive(Debug, Clone)]
pub struct CadenceTracker {
    intervals: BTreeMap<Cadence, u64>,
    last_fired: BTreeMap<Cadence, u64>,
}

impl CadenceTracker {
    /// Create a tracker with every marker at tick 0.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// Create a tracker whose markers all sit at `tick`, so counting
    /// resumes there instead of firing everything at once.
    pub fn starting_at(config: &SchedulerConfig, tick: u64) -> Self {
        let intervals = Cadence::ALL
            .iter()
            .map(|&c| (c, c.interval_ticks(config)))
            .collect();
        let last_fired = Cadence::ALL.iter().map(|&c| (c, tick)).collect();
        Self {
            intervals,
            last_fired,
        }
    }

    /// Cadences due at `tick`, with their markers moved to `tick`.
    pub fn due(&mut self, tick: u64) -> Vec<Cadence> {
        let mut fired = Vec::new();
        for (&cadence, last) in &mut self.last_fired {
            let interval = self.intervals.get(&cadence).copied().unwrap_or(u64::MAX);
            if tick.saturating_sub(*last) >= interval {
                *last = tick;
                fired.push(cadence);
            }
        }
        fired
    }

    /// Tick at which `cadence` last fired.
    pub fn last_fired(&self, cadence: Cadence) -> u64 {
        self.last_fired.get(&cadence).copied().unwrap_or(0)
    }
}
