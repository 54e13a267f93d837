//! The tick scheduler.
//!
//! One driver task advances a monotonic tick counter at `tick_rate` ticks
//! per second. On every tick it asks the [`CadenceTracker`] which cadences
//! are due and spawns each onto the runtime, tracked in a [`JoinSet`] so
//! [`Scheduler::stop`] can drain in-flight work. Late ticks are skipped,
//! never bunched.
//!
//! Claim markers outlive the process, so a restarted scheduler must not
//! count from zero again: [`Scheduler::resume`] picks the counter up at the
//! highest stored marker.
//!
//! Tests drive the scheduler with [`Scheduler::advance`] instead, which
//! runs due cadences inline and needs no wall-clock sleeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cadence::{Cadence, CadenceTracker};
use crate::engine::Engine;
use crate::error::StoreError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

/// Snapshot of the scheduler for the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    /// Whether the driver task is ticking.
    pub running: bool,
    /// Last tick issued.
    pub current_tick: u64,
    /// Ticks per second.
    pub rate: u32,
}

/// Drives an [`Engine`] on a fixed tick.
pub struct Scheduler<S, P> {
    engine: Arc<Engine<S, P>>,
    tick: AtomicU64,
    running: AtomicBool,
    shutdown: Notify,
    tracker: Mutex<CadenceTracker>,
    tasks: Mutex<JoinSet<()>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<S, P> core::fmt::Debug for Scheduler<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tick", &self.tick.load(Ordering::Acquire))
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<S: SimulationStore, P: EventPublisher> Scheduler<S, P> {
    /// Create a stopped scheduler at tick 0.
    pub fn new(engine: Arc<Engine<S, P>>) -> Self {
        Self::starting_at(engine, 0)
    }

    /// Create a stopped scheduler that continues from the highest tick any
    /// claim marker in the store holds.
    ///
    /// # Errors
    ///
    /// Returns the store error if the markers cannot be read.
    pub async fn resume(engine: Arc<Engine<S, P>>) -> Result<Self, StoreError> {
        let tick = engine.store().last_claimed_tick().await?;
        info!(tick, "Resuming tick counter");
        Ok(Self::starting_at(engine, tick))
    }

    /// Create a stopped scheduler whose last issued tick is `tick`.
    pub fn starting_at(engine: Arc<Engine<S, P>>, tick: u64) -> Self {
        let tracker = CadenceTracker::starting_at(&engine.config().scheduler, tick);
        Self {
            engine,
            tick: AtomicU64::new(tick),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            tracker: Mutex::new(tracker),
            tasks: Mutex::new(JoinSet::new()),
            driver: Mutex::new(None),
        }
    }

    /// The engine being driven.
    pub const fn engine(&self) -> &Arc<Engine<S, P>> {
        &self.engine
    }

    /// Start ticking. Returns `false` if already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.drive().await });
        *self.driver.lock().await = Some(handle);
        info!(
            rate = self.engine.config().scheduler.tick_rate,
            tick = self.tick.load(Ordering::Acquire),
            "Scheduler started"
        );
        true
    }

    /// Stop ticking and wait for in-flight cadence work to finish.
    ///
    /// Returns `false` if the scheduler was not running.
    pub async fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.shutdown.notify_waiters();
        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "Scheduler driver task failed");
            }
        }

        let mut tasks = self.tasks.lock().await;
        let mut drained = 0_usize;
        while let Some(result) = tasks.join_next().await {
            drained = drained.saturating_add(1);
            if let Err(err) = result {
                error!(error = %err, "Cadence task failed");
            }
        }
        info!(
            tick = self.tick.load(Ordering::Acquire),
            drained,
            "Scheduler stopped"
        );
        true
    }

    /// Current status.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::Acquire),
            current_tick: self.tick.load(Ordering::Acquire),
            rate: self.engine.config().scheduler.tick_rate,
        }
    }

    /// Issue `ticks` ticks immediately, running every due cadence to
    /// completion before the next tick.
    ///
    /// Returns the cadences fired, in order. Meant for a stopped scheduler.
    pub async fn advance(&self, ticks: u64) -> Vec<(u64, Cadence)> {
        let mut fired = Vec::new();
        for _ in 0..ticks {
            let tick = self.next_tick();
            let due = self.tracker.lock().await.due(tick);
            for cadence in due {
                run_logged(&self.engine, cadence, tick).await;
                fired.push((tick, cadence));
            }
        }
        fired
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    async fn drive(&self) {
        let rate = u64::from(self.engine.config().scheduler.tick_rate.max(1));
        let period = Duration::from_nanos(1_000_000_000_u64.checked_div(rate).unwrap_or(1).max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;

        while self.running.load(Ordering::Acquire) {
            tokio::select! {
                _ = interval.tick() => {}
                () = self.shutdown.notified() => break,
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            let tick = self.next_tick();
            let due = self.tracker.lock().await.due(tick);
            if due.is_empty() {
                continue;
            }

            let mut tasks = self.tasks.lock().await;
            while let Some(result) = tasks.try_join_next() {
                if let Err(err) = result {
                    error!(tick, error = %err, "Cadence task failed");
                }
            }
            for cadence in due {
                let engine = Arc::clone(&self.engine);
                tasks.spawn(async move { run_logged(&engine, cadence, tick).await });
            }
        }
    }
}

async fn run_logged<S: SimulationStore, P: EventPublisher>(engine: &Engine<S, P>, cadence: Cadence, tick: u64) {
    if let Err(err) = engine.run_cadence(cadence, tick).await {
        error!(tick, cadence = %cadence, error = %err, "Cadence failed");
    }
}
