//! Real-time dispatch simulation.
//!
//! Wall-clock time advances in fixed ticks. Each tick admits the instant
//! bookings whose load time has arrived, locks every assigned booking with an
//! imminent pickup, and (when new work arrived) re-plans the unlocked
//! residue from scratch while replaying locked assignments verbatim. Instant
//! bookings are admitted but never locked, so they stay movable until served.
//!
//! The tick sleep is the only suspension point; with a zero `real_step` the
//! loop is fully deterministic and suitable for tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::clock::{END_OF_DAY_MIN, LOCK_WINDOW_MIN, START_OF_DAY_MIN, TICK_STEP_MIN};
use crate::fleet::{Booking, BookingId, BookingOrigin, BookingTable, VehicleId, VehicleSpec};
use crate::matching::{Dispatcher, MAX_RING_INSTANT};

/// Earliest an instant booking may surface: two hours before pickup.
const LOAD_LEAD_MAX_MIN: f64 = 120.0;
/// Latest an instant booking may surface: one hour before pickup.
const LOAD_LEAD_MIN_MIN: f64 = 60.0;

/// Simulation pacing and reproducibility knobs.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub start_minute: f64,
    pub end_minute: f64,
    pub step_minutes: f64,
    /// Real time slept between ticks; zero disables pacing entirely.
    pub real_step: Duration,
    /// Seed for the instant-booking load-time draws.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            start_minute: START_OF_DAY_MIN,
            end_minute: END_OF_DAY_MIN,
            step_minutes: TICK_STEP_MIN,
            real_step: Duration::from_secs(6),
            seed: 42,
        }
    }
}

impl SimulatorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_end_minute(mut self, end_minute: f64) -> Self {
        self.end_minute = end_minute;
        self
    }

    pub fn with_real_step(mut self, real_step: Duration) -> Self {
        self.real_step = real_step;
        self
    }
}

/// An instant booking waiting to surface at its load time.
#[derive(Debug, Clone)]
struct InstantArrival {
    booking_id: BookingId,
    load_minute: f64,
    admitted: bool,
}

/// Assignment delta for one vehicle between consecutive replans.
#[derive(Debug, Clone)]
pub struct AssignmentChange {
    pub vehicle_id: VehicleId,
    pub added: Vec<BookingId>,
    pub removed: Vec<BookingId>,
}

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: usize,
    pub sim_minute: f64,
    pub admitted: Vec<BookingId>,
    pub replanned: bool,
    pub locked_count: usize,
    pub changes: Vec<AssignmentChange>,
}

pub struct Simulator {
    config: SimulatorConfig,
    specs: Vec<VehicleSpec>,
    scheduled: Vec<Booking>,
    instants: Vec<Booking>,
    arrivals: Vec<InstantArrival>,
    dispatcher: Dispatcher,
    table: BookingTable,
    locked: HashSet<BookingId>,
    now: f64,
    tick: usize,
    pending_replan: bool,
    prev_assignments: HashMap<VehicleId, Vec<BookingId>>,
}

impl Simulator {
    /// Build the simulator: draw a load time for every instant booking
    /// (uniform in `[max(start, pickup − 120), pickup − 60]`, degenerate range
    /// collapsing to its lower bound) and run the scheduled batch plan so the
    /// day starts from committed assignments.
    pub fn new(
        specs: Vec<VehicleSpec>,
        scheduled: Vec<Booking>,
        instants: Vec<Booking>,
        config: SimulatorConfig,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let arrivals = instants
            .iter()
            .map(|b| {
                let earliest = (b.pickup_minute - LOAD_LEAD_MAX_MIN).max(config.start_minute);
                let latest = b.pickup_minute - LOAD_LEAD_MIN_MIN;
                let load_minute = if latest > earliest {
                    rng.gen_range(earliest as i64..=latest as i64) as f64
                } else {
                    earliest
                };
                InstantArrival {
                    booking_id: b.id,
                    load_minute,
                    admitted: false,
                }
            })
            .collect();

        let table = BookingTable::new(scheduled.clone());
        let mut dispatcher = Dispatcher::new(&specs);
        let mut assigned = HashSet::new();
        let summary = dispatcher.plan(&table, &mut assigned);
        info!(
            assigned = summary.assigned,
            unassigned = summary.unassigned,
            instants = instants.len(),
            "scheduled plan complete, starting simulation"
        );

        let prev_assignments = Self::assignment_map(&dispatcher);
        Self {
            now: config.start_minute,
            config,
            specs,
            scheduled,
            instants,
            arrivals,
            dispatcher,
            table,
            locked: HashSet::new(),
            tick: 0,
            pending_replan: false,
            prev_assignments,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn table(&self) -> &BookingTable {
        &self.table
    }

    pub fn locked(&self) -> &HashSet<BookingId> {
        &self.locked
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_instant(&self, booking_id: BookingId) -> bool {
        self.instants.iter().any(|b| b.id == booking_id)
    }

    /// Instant bookings admitted so far.
    pub fn admitted_count(&self) -> usize {
        self.arrivals.iter().filter(|a| a.admitted).count()
    }

    /// Drive the tick loop to the end of the day, invoking `on_tick` after
    /// every tick and sleeping `real_step` in between.
    pub fn run<F>(&mut self, mut on_tick: F)
    where
        F: FnMut(&Simulator, &TickReport),
    {
        while self.now < self.config.end_minute {
            let report = self.step();
            on_tick(self, &report);
            if self.now < self.config.end_minute && !self.config.real_step.is_zero() {
                std::thread::sleep(self.config.real_step);
            }
        }
        info!("simulation completed");
    }

    /// One tick: admission, then locking, then (if needed) replan. The wall
    /// clock advances as the final action, so the returned report describes
    /// the tick's own minute.
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let sim_minute = self.now;

        let admitted = self.admit_due_instants();
        self.update_locks();

        let replanned = self.pending_replan;
        let mut changes = Vec::new();
        if self.pending_replan {
            info!(
                tick = self.tick,
                minute = sim_minute,
                new_bookings = admitted.len(),
                "replanning unlocked residue"
            );
            self.replan();
            self.pending_replan = false;
            changes = self.diff_assignments();
        }

        let report = TickReport {
            tick: self.tick,
            sim_minute,
            admitted,
            replanned,
            locked_count: self.locked.len(),
            changes,
        };
        self.now += self.config.step_minutes;
        report
    }

    /// Admit every instant booking whose load time has arrived. Admission is
    /// monotone: once in the active set, a booking never leaves it.
    fn admit_due_instants(&mut self) -> Vec<BookingId> {
        let mut newly = Vec::new();
        for arrival in &mut self.arrivals {
            if !arrival.admitted && arrival.load_minute <= self.now {
                arrival.admitted = true;
                newly.push(arrival.booking_id);
                info!(
                    booking_id = arrival.booking_id,
                    load_minute = arrival.load_minute,
                    "instant booking admitted"
                );
            }
        }
        if !newly.is_empty() {
            self.pending_replan = true;
            self.rebuild_table();
        }
        newly
    }

    /// Active set = all scheduled bookings plus admitted instants.
    fn rebuild_table(&mut self) {
        let admitted: HashSet<BookingId> = self
            .arrivals
            .iter()
            .filter(|a| a.admitted)
            .map(|a| a.booking_id)
            .collect();
        let mut active = self.scheduled.clone();
        active.extend(
            self.instants
                .iter()
                .filter(|b| admitted.contains(&b.id))
                .cloned(),
        );
        self.table = BookingTable::new(active);
    }

    /// Lock every assigned *scheduled* booking whose pickup is past or within
    /// the lock window. Instant bookings are never locked.
    fn update_locks(&mut self) {
        self.locked.clear();
        let horizon = self.now + LOCK_WINDOW_MIN;
        for vehicle in &self.dispatcher.vehicles {
            for &id in &vehicle.assigned_bookings {
                let Some(booking) = self.table.get(id) else {
                    continue;
                };
                if booking.origin == BookingOrigin::Instant {
                    continue;
                }
                if booking.pickup_minute <= horizon {
                    self.locked.insert(id);
                }
            }
        }
        info!(
            locked = self.locked.len(),
            minute = self.now,
            "lock window updated"
        );
    }

    /// Re-plan from a fresh dispatcher: replay locked assignments onto their
    /// vehicles verbatim, then run the batch planner over everything else.
    fn replan(&mut self) {
        let mut locked_by_vehicle: HashMap<VehicleId, Vec<BookingId>> = HashMap::new();
        for vehicle in &self.dispatcher.vehicles {
            let locked: Vec<BookingId> = vehicle
                .assigned_bookings
                .iter()
                .copied()
                .filter(|id| self.locked.contains(id))
                .collect();
            if !locked.is_empty() {
                locked_by_vehicle.insert(vehicle.id, locked);
            }
        }

        let mut fresh = Dispatcher::with_max_ring(&self.specs, MAX_RING_INSTANT);
        fresh.replay_locked(&self.table, &locked_by_vehicle, self.now);

        let mut assigned: HashSet<BookingId> = self.locked.clone();
        let summary = fresh.plan(&self.table, &mut assigned);
        info!(
            assigned = summary.assigned,
            unassigned = summary.unassigned,
            preserved = self.locked.len(),
            "replan complete"
        );
        self.dispatcher = fresh;
    }

    fn assignment_map(dispatcher: &Dispatcher) -> HashMap<VehicleId, Vec<BookingId>> {
        dispatcher
            .vehicles
            .iter()
            .map(|v| (v.id, v.assigned_bookings.clone()))
            .collect()
    }

    /// Per-vehicle added/removed bookings versus the previous replan.
    fn diff_assignments(&mut self) -> Vec<AssignmentChange> {
        let current = Self::assignment_map(&self.dispatcher);
        let mut changes = Vec::new();
        for vehicle in &self.dispatcher.vehicles {
            let now: HashSet<BookingId> =
                current.get(&vehicle.id).into_iter().flatten().copied().collect();
            let before: HashSet<BookingId> = self
                .prev_assignments
                .get(&vehicle.id)
                .into_iter()
                .flatten()
                .copied()
                .collect();
            let added: Vec<BookingId> = now.difference(&before).copied().collect();
            let removed: Vec<BookingId> = before.difference(&now).copied().collect();
            if !added.is_empty() || !removed.is_empty() {
                changes.push(AssignmentChange {
                    vehicle_id: vehicle.id,
                    added,
                    removed,
                });
            }
        }
        self.prev_assignments = current;
        changes
    }
}
