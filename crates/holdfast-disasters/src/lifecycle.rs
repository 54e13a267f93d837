//! Disaster phase state machine.
//!
//! ```text
//! SCHEDULED --(now >= scheduled_at - warning)--> WARNING
//! WARNING   --(now >= scheduled_at)------------> IMPACT
//! IMPACT    --(elapsed >= impact duration)-----> AFTERMATH
//! AFTERMATH --(30 days after impact end)-------> RESOLVED
//! ```
//!
//! [`advance`] is pure: given a disaster and the current time it returns the
//! new phase plus the ordered list of transitions that happened. A disaster
//! that was not evaluated for a while moves through several phases in one
//! call, and impact starts at `scheduled_at` rather than at evaluation time,
//! so damage catches up exactly.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use holdfast_types::{DisasterEvent, DisasterPhase};

use crate::damage;
use crate::error::DisasterError;

/// Timing knobs for the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between damage increments.
    #[serde(default = "default_damage_interval")]
    pub damage_interval_seconds: u32,
    /// Length of the aftermath phase in seconds.
    #[serde(default = "default_aftermath")]
    pub aftermath_seconds: u32,
    /// Seconds before impact at which the imminent notice goes out.
    #[serde(default = "default_imminent_notice")]
    pub imminent_notice_seconds: u32,
    /// Length of the discounted repair window opened by aftermath.
    #[serde(default = "default_emergency_repair")]
    pub emergency_repair_seconds: u32,
}

const fn default_damage_interval() -> u32 {
    600
}

const fn default_aftermath() -> u32 {
    2_592_000 // 30 days
}

const fn default_imminent_notice() -> u32 {
    1_800
}

const fn default_emergency_repair() -> u32 {
    172_800 // 48 hours
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            damage_interval_seconds: default_damage_interval(),
            aftermath_seconds: default_aftermath(),
            imminent_notice_seconds: default_imminent_notice(),
            emergency_repair_seconds: default_emergency_repair(),
        }
    }
}

impl LifecycleConfig {
    /// Aftermath length as a [`TimeDelta`].
    pub fn aftermath(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.aftermath_seconds))
    }

    /// Emergency repair window as a [`TimeDelta`].
    pub fn emergency_repair(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.emergency_repair_seconds))
    }
}

/// One phase change or in-phase milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `Warning`.
    WarningIssued,
    /// The imminent notice is due.
    ImminentNotified,
    /// Entered `Impact`.
    ImpactStarted {
        /// Scheduled end of impact.
        ends_at: DateTime<Utc>,
    },
    /// Damage increments `from + 1 ..= to` are due.
    Damage {
        /// Increments applied before this step.
        from: u32,
        /// Increments applied after this step.
        to: u32,
        /// Total increments of the impact.
        total: u32,
    },
    /// Entered `Aftermath`.
    ImpactEnded {
        /// When impact ended.
        ended_at: DateTime<Utc>,
        /// When the aftermath will resolve.
        aftermath_ends_at: DateTime<Utc>,
    },
    /// Entered `Resolved`.
    Resolved,
}

/// Result of advancing a disaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// Phase after the step.
    pub phase: DisasterPhase,
    /// Transitions in the order they happened.
    pub transitions: Vec<Transition>,
}

impl Advance {
    /// Whether anything changed.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

fn shift(
    disaster: &DisasterEvent,
    at: DateTime<Utc>,
    seconds: i64,
) -> Result<DateTime<Utc>, DisasterError> {
    at.checked_add_signed(TimeDelta::seconds(seconds))
        .ok_or(DisasterError::TimeOutOfRange(disaster.id))
}

/// Increments due `elapsed` into an impact, capped at `total`.
fn increments_due(elapsed: TimeDelta, interval_seconds: u32, total: u32) -> u32 {
    let interval = i64::from(interval_seconds.max(1));
    let done = elapsed.num_seconds().max(0).checked_div(interval).unwrap_or(0);
    u32::try_from(done)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
        .min(total)
}

/// Advance `disaster` to `now`.
pub fn advance(
    disaster: &DisasterEvent,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> Result<Advance, DisasterError> {
    let mut phase = disaster.phase;
    let mut transitions = Vec::new();

    let warning_at = shift(disaster, disaster.scheduled_at, -i64::from(disaster.warning_seconds))?;
    let imminent_at = shift(
        disaster,
        disaster.scheduled_at,
        -i64::from(config.imminent_notice_seconds),
    )?;
    let impact_ends_at = shift(disaster, disaster.scheduled_at, i64::from(disaster.impact_seconds))?;
    let total = damage::total_increments(disaster.impact_seconds, config.damage_interval_seconds);

    loop {
        match phase {
            DisasterPhase::Scheduled => {
                if now < warning_at {
                    break;
                }
                phase = DisasterPhase::Warning {
                    warning_issued_at: now,
                    imminent_notified: false,
                };
                transitions.push(Transition::WarningIssued);
            }
            DisasterPhase::Warning {
                warning_issued_at,
                imminent_notified,
            } => {
                if !imminent_notified && now >= imminent_at {
                    phase = DisasterPhase::Warning {
                        warning_issued_at,
                        imminent_notified: true,
                    };
                    transitions.push(Transition::ImminentNotified);
                    continue;
                }
                if now < disaster.scheduled_at {
                    break;
                }
                phase = DisasterPhase::Impact {
                    impact_started_at: disaster.scheduled_at,
                    increments_applied: 0,
                };
                transitions.push(Transition::ImpactStarted {
                    ends_at: impact_ends_at,
                });
            }
            DisasterPhase::Impact {
                impact_started_at,
                increments_applied,
            } => {
                let ended = now >= impact_ends_at;
                let due = if ended {
                    total
                } else {
                    increments_due(now.signed_duration_since(impact_started_at), config.damage_interval_seconds, total)
                };
                if due > increments_applied {
                    transitions.push(Transition::Damage {
                        from: increments_applied,
                        to: due,
                        total,
                    });
                    phase = DisasterPhase::Impact {
                        impact_started_at,
                        increments_applied: due,
                    };
                }
                if !ended {
                    break;
                }
                let aftermath_ends_at = shift(disaster, impact_ends_at, i64::from(config.aftermath_seconds))?;
                phase = DisasterPhase::Aftermath {
                    impact_ended_at: impact_ends_at,
                };
                transitions.push(Transition::ImpactEnded {
                    ended_at: impact_ends_at,
                    aftermath_ends_at,
                });
            }
            DisasterPhase::Aftermath { impact_ended_at } => {
                let resolves_at = shift(disaster, impact_ended_at, i64::from(config.aftermath_seconds))?;
                if now < resolves_at {
                    break;
                }
                phase = DisasterPhase::Resolved {
                    impact_ended_at,
                    resolved_at: now,
                };
                transitions.push(Transition::Resolved);
            }
            DisasterPhase::Resolved { .. } => break,
        }
    }

    Ok(Advance { phase, transitions })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use holdfast_types::{Biome, DisasterId, DisasterStatus, DisasterType, RegionId, WorldId};

    use super::*;

    fn quake(now: DateTime<Utc>) -> DisasterEvent {
        // Earthquake: 30 min warning, 1 h impact, starting 2 h from now.
        DisasterEvent {
            id: DisasterId::new(),
            world_id: WorldId::new(),
            disaster_type: DisasterType::Earthquake,
            severity: 80,
            region_id: RegionId::new(),
            affected_biomes: vec![Biome::Mountain],
            scheduled_at: now + TimeDelta::hours(2),
            warning_seconds: 1_800,
            impact_seconds: 3_600,
            phase: DisasterPhase::Scheduled,
            created_at: now,
        }
    }

    fn run(disaster: &mut DisasterEvent, at: DateTime<Utc>) -> Vec<Transition> {
        let out = advance(disaster, at, &LifecycleConfig::default()).unwrap();
        disaster.phase = out.phase;
        out.transitions
    }

    #[test]
    fn scheduled_waits_for_warning_window() {
        let now = Utc::now();
        let mut d = quake(now);
        assert!(run(&mut d, now + TimeDelta::minutes(89)).is_empty());
        assert_eq!(d.status(), DisasterStatus::Scheduled);
    }

    #[test]
    fn warning_then_imminent_exactly_once() {
        let now = Utc::now();
        let mut d = quake(now);
        // Warning and imminent windows coincide for a 30 min warning.
        let t = run(&mut d, now + TimeDelta::minutes(90));
        assert_eq!(t, vec![Transition::WarningIssued, Transition::ImminentNotified]);
        assert!(run(&mut d, now + TimeDelta::minutes(100)).is_empty());
        assert_eq!(d.status(), DisasterStatus::Warning);
    }

    #[test]
    fn impact_applies_first_increment_on_entry() {
        let now = Utc::now();
        let mut d = quake(now);
        run(&mut d, now + TimeDelta::minutes(90));
        let t = run(&mut d, now + TimeDelta::hours(2));
        assert_eq!(t.len(), 2);
        assert!(matches!(t[0], Transition::ImpactStarted { .. }));
        assert_eq!(
            t[1],
            Transition::Damage {
                from: 0,
                to: 1,
                total: 6
            }
        );
    }

    #[test]
    fn missed_increments_are_caught_up() {
        let now = Utc::now();
        let mut d = quake(now);
        run(&mut d, now + TimeDelta::hours(2));
        // 25 minutes into impact: increments 2 and 3 are due.
        let t = run(&mut d, now + TimeDelta::hours(2) + TimeDelta::minutes(25));
        assert_eq!(
            t,
            vec![Transition::Damage {
                from: 1,
                to: 3,
                total: 6
            }]
        );
    }

    #[test]
    fn impact_end_flushes_outstanding_increments() {
        let now = Utc::now();
        let mut d = quake(now);
        run(&mut d, now + TimeDelta::hours(2));
        let t = run(&mut d, now + TimeDelta::hours(4));
        assert_eq!(
            t[0],
            Transition::Damage {
                from: 1,
                to: 6,
                total: 6
            }
        );
        assert!(matches!(t[1], Transition::ImpactEnded { .. }));
        assert_eq!(d.status(), DisasterStatus::Aftermath);
    }

    #[test]
    fn offline_disaster_runs_every_phase_in_order() {
        let now = Utc::now();
        let mut d = quake(now);
        let t = run(&mut d, now + TimeDelta::days(40));
        assert_eq!(t.len(), 6);
        assert_eq!(t[0], Transition::WarningIssued);
        assert_eq!(t[1], Transition::ImminentNotified);
        assert!(matches!(t[2], Transition::ImpactStarted { .. }));
        assert!(matches!(t[3], Transition::Damage { from: 0, to: 6, .. }));
        assert!(matches!(t[4], Transition::ImpactEnded { .. }));
        assert_eq!(t[5], Transition::Resolved);
        assert_eq!(d.status(), DisasterStatus::Resolved);
    }

    #[test]
    fn resolved_is_terminal() {
        let now = Utc::now();
        let mut d = quake(now);
        run(&mut d, now + TimeDelta::days(40));
        assert!(run(&mut d, now + TimeDelta::days(400)).is_empty());
    }

    #[test]
    fn phases_never_move_backwards() {
        let now = Utc::now();
        let mut d = quake(now);
        let mut previous = d.status();
        for minutes in (0..=60 * 24 * 31).step_by(7) {
            run(&mut d, now + TimeDelta::minutes(minutes));
            assert!(d.status() >= previous);
            previous = d.status();
        }
        assert_eq!(previous, DisasterStatus::Resolved);
    }
}
