//! Batch planner: the outer loop over bookings in pickup-time order.
//!
//! Each booking is offered to the feasible candidate set from the expanding
//! ring search; the candidate whose hypothetical post-insert route minimises
//! `dead − active` kilometres wins. A booking that finds no vehicle of its own
//! class is retried exactly one class up. Every fresh assignment triggers the
//! home-oriented completion, and vehicles left unrouted at the end of the pass
//! are finalised with their return-home leg.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::fleet::{
    Booking, BookingId, BookingTable, VehicleClass, VehicleId, VehicleSpec, VehicleState,
};
use crate::pricing::dead_pay_rate;
use crate::routing::{active_km, dead_km_closed};
use crate::spatial::road_distance_km;

use super::completion::complete_route;
use super::search::{feasible_vehicles, MAX_RING_BATCH};
use super::assign_booking;

/// Counts from one planner pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanSummary {
    pub assigned: usize,
    pub unassigned: usize,
}

/// The dispatcher: exclusive owner of all vehicle state for a planning pass.
#[derive(Debug)]
pub struct Dispatcher {
    pub vehicles: Vec<VehicleState>,
    /// Booking ids left unplaced by the last `plan` call.
    pub unassigned: Vec<BookingId>,
    max_ring: u32,
}

impl Dispatcher {
    pub fn new(specs: &[VehicleSpec]) -> Self {
        Self::with_max_ring(specs, MAX_RING_BATCH)
    }

    /// Dispatcher with a custom ring-search ceiling (the real-time path uses a
    /// wider net than the batch planner).
    pub fn with_max_ring(specs: &[VehicleSpec], max_ring: u32) -> Self {
        let vehicles = specs.iter().map(VehicleState::new).collect::<Vec<_>>();
        info!(count = specs.len(), "initialized vehicles");
        Self {
            vehicles,
            unassigned: Vec::new(),
            max_ring,
        }
    }

    /// Assign every booking in `table` not already in `assigned`, in ascending
    /// pickup-time order. `assigned` is extended with each placement, so a
    /// pre-populated set (locked bookings replayed by the simulator) is left
    /// untouched and shields those bookings from re-placement.
    pub fn plan(&mut self, table: &BookingTable, assigned: &mut HashSet<BookingId>) -> PlanSummary {
        let before = assigned.len();

        for idx in table.ascending() {
            let booking = table.booking_at(idx);
            if assigned.contains(&booking.id) {
                continue;
            }

            let mut placed = self.place_fresh(booking, booking.class, table, assigned);
            if !placed {
                if let Some(upgraded) = booking.class.upgrade() {
                    info!(
                        booking_id = booking.id,
                        from = booking.class.as_str(),
                        to = upgraded.as_str(),
                        "no vehicle in declared class, retrying one class up"
                    );
                    placed = self.place_fresh(booking, upgraded, table, assigned);
                }
            }
            if !placed {
                warn!(
                    booking_id = booking.id,
                    class = booking.class.as_str(),
                    "booking left unassigned"
                );
            }
        }

        self.finalize();

        self.unassigned = table
            .iter()
            .filter(|b| !assigned.contains(&b.id))
            .map(|b| b.id)
            .collect();
        PlanSummary {
            assigned: assigned.len() - before,
            unassigned: self.unassigned.len(),
        }
    }

    /// Offer `booking` to the feasible vehicles of `class`; commit to the one
    /// minimising the post-insert `dead − active` score, then attempt the
    /// home-oriented completion. Returns false when no candidate exists.
    fn place_fresh(
        &mut self,
        booking: &Booking,
        class: VehicleClass,
        table: &BookingTable,
        assigned: &mut HashSet<BookingId>,
    ) -> bool {
        let candidates = feasible_vehicles(&self.vehicles, booking, class, self.max_ring);

        let mut best: Option<(usize, f64)> = None;
        for vi in candidates {
            let vehicle = &self.vehicles[vi];
            let mut hypothetical = vehicle.route.clone();
            hypothetical.extend([booking.pickup, booking.drop]);
            let delta =
                dead_km_closed(&hypothetical, vehicle.home) - active_km(&hypothetical, table);
            if best.is_none_or(|(_, d)| delta < d) {
                best = Some((vi, delta));
            }
        }
        let Some((vi, _)) = best else {
            return false;
        };

        assign_booking(&mut self.vehicles[vi], booking);
        assigned.insert(booking.id);

        // Try to extend into a full home-oriented day. Failure leaves the
        // fresh booking in place and the vehicle open.
        let added = complete_route(&mut self.vehicles[vi], table, assigned);
        assigned.extend(added);
        true
    }

    /// Close out every vehicle that holds assignments but never got a full
    /// route: add the return-home leg (and its dead-km pay) exactly once and
    /// mark the vehicle routed.
    fn finalize(&mut self) {
        for vehicle in &mut self.vehicles {
            if vehicle.assigned_bookings.is_empty() || vehicle.is_routed {
                continue;
            }
            let final_leg = road_distance_km(vehicle.current, vehicle.home);
            vehicle.dead_km += final_leg;
            vehicle.total_driver_pay += final_leg * dead_pay_rate(vehicle.class);
            vehicle.is_routed = true;
            info!(
                vehicle_id = vehicle.id,
                final_leg, "finalized vehicle with return-home leg"
            );
        }
    }

    /// Replay locked bookings onto their vehicles, in pickup-time order, using
    /// the ordinary commit path (open-form dead km, no return leg, vehicles
    /// left unrouted). Afterwards no availability clock is earlier than `now`.
    pub fn replay_locked(
        &mut self,
        table: &BookingTable,
        locked_by_vehicle: &HashMap<VehicleId, Vec<BookingId>>,
        now: f64,
    ) {
        for vehicle in &mut self.vehicles {
            if let Some(ids) = locked_by_vehicle.get(&vehicle.id) {
                let mut ordered: Vec<&Booking> =
                    ids.iter().filter_map(|&id| table.get(id)).collect();
                ordered.sort_by(|a, b| a.pickup_minute.total_cmp(&b.pickup_minute));
                for booking in ordered {
                    assign_booking(vehicle, booking);
                }
            }
            vehicle.available_time = vehicle.available_time.max(now);
        }
    }

    /// Vehicle currently holding `booking_id`, if any.
    pub fn vehicle_of(&self, booking_id: BookingId) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .find(|v| v.assigned_bookings.contains(&booking_id))
            .map(|v| v.id)
    }
}
