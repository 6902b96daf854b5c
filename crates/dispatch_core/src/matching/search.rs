//! Expanding-ring candidate search.
//!
//! Vehicles are indexed by the H3 cell of their current position. For a
//! booking we walk rings of increasing radius around the pickup cell and stop
//! at the first radius that yields a feasible vehicle, so nearer candidates
//! always shadow farther ones. Without spatial information (cell conversion
//! failed) the search degrades to a linear feasibility scan.

use tracing::{debug, warn};

use crate::clock::travel_time_min;
use crate::fleet::{Booking, VehicleClass, VehicleState};
use crate::spatial::{cell_of, cell_steps, ring, road_distance_km};

/// Ring search ceiling for the batch planner.
pub const MAX_RING_BATCH: u32 = 20;
/// Ring search ceiling for the instant (real-time) path.
pub const MAX_RING_INSTANT: u32 = 25;

/// Arrival slack: a vehicle may arrive up to this many minutes after the
/// requested pickup (arriving early means waiting at the kerb).
const PICKUP_SLACK_MIN: f64 = 60.0;

/// Time-only reachability: can the vehicle arrive at the pickup no later than
/// `pickup + 60` minutes, given its availability clock and current position?
pub fn can_reach(vehicle: &VehicleState, booking: &Booking) -> bool {
    let approach_km = road_distance_km(vehicle.current, booking.pickup);
    let earliest_arrival = vehicle.available_time + travel_time_min(approach_km);
    earliest_arrival <= booking.pickup_minute + PICKUP_SLACK_MIN
}

fn is_candidate(vehicle: &VehicleState, booking: &Booking, class: VehicleClass) -> bool {
    !vehicle.is_routed && vehicle.class == class && can_reach(vehicle, booking)
}

/// Feasible vehicles for `booking`, searched by expanding hex ring.
///
/// `class` is the class the search matches exactly (the booking's own class
/// on the primary pass, one above on the upgrade retry). Returns indices into
/// `vehicles` for the first non-empty ring, or the linear-scan result when the
/// pickup has no cell.
pub fn feasible_vehicles(
    vehicles: &[VehicleState],
    booking: &Booking,
    class: VehicleClass,
    max_ring: u32,
) -> Vec<usize> {
    let Some(pickup_cell) = cell_of(booking.pickup.0, booking.pickup.1) else {
        warn!(
            booking_id = booking.id,
            "pickup has no hex cell, falling back to linear scan"
        );
        return vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| is_candidate(v, booking, class))
            .map(|(i, _)| i)
            .collect();
    };

    for k in 0..=max_ring {
        let ring_cells = ring(pickup_cell, k);
        let found: Vec<usize> = vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| is_candidate(v, booking, class))
            .filter(|(_, v)| match (&ring_cells, v.hex) {
                (Some(cells), Some(hex)) => cells.contains(&hex),
                // Ring generation failed: compare grid-step distance directly.
                (None, Some(hex)) => {
                    cell_steps(pickup_cell, hex).is_some_and(|steps| steps <= k as i32)
                }
                (_, None) => false,
            })
            .map(|(i, _)| i)
            .collect();

        if !found.is_empty() {
            debug!(
                booking_id = booking.id,
                radius = k,
                candidates = found.len(),
                "expanding-ring search hit"
            );
            return found;
        }
    }

    warn!(
        booking_id = booking.id,
        max_ring, "no feasible vehicle within search radius"
    );
    Vec::new()
}
