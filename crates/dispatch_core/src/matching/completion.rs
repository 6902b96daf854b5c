//! Home-oriented route completion.
//!
//! Once a vehicle receives its first ("fresh") booking of a pass, this module
//! tries to extend it into a full day: pick an *ending* booking whose drop is
//! near the vehicle's home, fill the gap with *middle* bookings that keep dead
//! kilometres below active kilometres, and accept or reject the whole route on
//! an efficiency gate. Rejection rolls the vehicle back to just the fresh
//! booking so it stays eligible for other fresh assignments.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::clock::{travel_time_min, SERVICE_BUFFER_MIN};
use crate::fleet::{Booking, BookingId, BookingTable, VehicleState};
use crate::pricing::dead_pay_rate;
use crate::routing::{active_km, dead_km_closed};
use crate::spatial::{road_distance_km, GeoPoint};

use super::search::can_reach;

/// Ending drops farther than this from home are not considered at all.
const ENDING_FALLBACK_KM: f64 = 15.0;
/// Preferred ceiling for the first ending scan.
const ENDING_STRICT_KM: f64 = 5.0;
/// An ending this close to home is taken immediately.
const ENDING_EXCELLENT_KM: f64 = 3.0;
/// Minimum minutes between the vehicle's availability and the ending pickup,
/// leaving room for middle bookings.
const ENDING_MIN_GAP_MIN: f64 = 180.0;
/// Cap on middle bookings inserted per route.
const MAX_MIDDLE_BOOKINGS: usize = 10;
/// Minimum paid share of total kilometres for an accepted route.
const MIN_EFFICIENCY: f64 = 0.55;
/// Maximum length of the final return-home leg for an accepted route.
const MAX_FINAL_HOME_LEG_KM: f64 = 20.0;

/// Arrival slack shared with the feasibility check.
const PICKUP_SLACK_MIN: f64 = 60.0;

/// Complete the day's route for a vehicle that just received its fresh
/// booking. Returns the ids of the bookings added beyond the fresh one; empty
/// when no ending was found or the efficiency gate rejected the route (in
/// both cases the vehicle keeps only the fresh booking and `is_routed` stays
/// false).
pub(crate) fn complete_route(
    vehicle: &mut VehicleState,
    table: &BookingTable,
    assigned: &HashSet<BookingId>,
) -> Vec<BookingId> {
    let snapshot = vehicle.snapshot();

    let Some(ending_idx) = find_ending(vehicle, table, assigned) else {
        // No way to steer this vehicle home today; it keeps the fresh booking
        // and its availability clock, and stays open for later fresh bookings.
        info!(
            vehicle_id = vehicle.id,
            "no suitable ending booking, keeping vehicle open"
        );
        return Vec::new();
    };
    let ending = table.booking_at(ending_idx);

    let middles = select_middles(vehicle, ending, table, assigned);

    let mut added = Vec::with_capacity(middles.len() + 1);
    for &mi in &middles {
        let booking = table.booking_at(mi);
        super::assign_booking(vehicle, booking);
        added.push(booking.id);
    }
    super::assign_booking(vehicle, ending);
    added.push(ending.id);

    // Efficiency gate over the completed route, return-home leg included.
    let final_home_leg = road_distance_km(vehicle.current, vehicle.home);
    let dead_total = vehicle.dead_km + final_home_leg;
    let total = vehicle.active_km + dead_total;
    let efficiency = if total > 0.0 { vehicle.active_km / total } else { 0.0 };

    if efficiency < MIN_EFFICIENCY || final_home_leg > MAX_FINAL_HOME_LEG_KM {
        warn!(
            vehicle_id = vehicle.id,
            efficiency,
            final_home_leg,
            "route rejected, restoring fresh-only state"
        );
        // The snapshot's availability clock is the finish of the fresh
        // booking, so the vehicle remains eligible for later fresh bookings.
        vehicle.restore(snapshot);
        return Vec::new();
    }

    vehicle.dead_km += final_home_leg;
    vehicle.total_driver_pay += final_home_leg * dead_pay_rate(vehicle.class);
    vehicle.is_routed = true;
    info!(
        vehicle_id = vehicle.id,
        bookings = vehicle.assigned_bookings.len(),
        active_km = vehicle.active_km,
        dead_km = vehicle.dead_km,
        efficiency,
        "route accepted"
    );
    added
}

/// Scan bookings from latest pickup to earliest for an ending whose drop lands
/// near the vehicle's home. Two phases: strict (≤5km, early-exit at ≤3km),
/// then a relaxed fallback (≤15km).
fn find_ending(
    vehicle: &VehicleState,
    table: &BookingTable,
    assigned: &HashSet<BookingId>,
) -> Option<usize> {
    let order = table.descending();
    let scan = |ceiling_km: f64, early_exit: bool| -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for &idx in &order {
            let booking = table.booking_at(idx);
            if assigned.contains(&booking.id) {
                continue;
            }
            if !vehicle.class.serves(booking.class) {
                continue;
            }
            if !can_reach(vehicle, booking) {
                continue;
            }
            if booking.pickup_minute - vehicle.available_time < ENDING_MIN_GAP_MIN {
                continue;
            }
            let to_home = road_distance_km(booking.drop, vehicle.home);
            if to_home > ceiling_km {
                continue;
            }
            if early_exit && to_home <= ENDING_EXCELLENT_KM {
                info!(
                    vehicle_id = vehicle.id,
                    booking_id = booking.id,
                    to_home,
                    "excellent ending found"
                );
                return Some((idx, to_home));
            }
            if best.is_none_or(|(_, d)| to_home < d) {
                best = Some((idx, to_home));
            }
        }
        best
    };

    let found = scan(ENDING_STRICT_KM, true).or_else(|| scan(ENDING_FALLBACK_KM, false));
    match found {
        Some((idx, to_home)) => {
            info!(
                vehicle_id = vehicle.id,
                booking_id = table.booking_at(idx).id,
                to_home,
                "ending booking selected"
            );
            Some(idx)
        }
        None => None,
    }
}

/// Rolling vehicle position/clock used while evaluating middle insertions
/// without touching the real vehicle state.
struct RollState {
    current: GeoPoint,
    available_time: f64,
    route: Vec<GeoPoint>,
}

/// Greedily pick up to [`MAX_MIDDLE_BOOKINGS`] bookings between the vehicle's
/// current availability and the ending pickup. Each round scores candidates by
/// `dead - active` over the hypothetical route (ending included) and commits
/// the best, rejecting outright any candidate whose dead kilometres would
/// exceed its active kilometres.
fn select_middles(
    vehicle: &VehicleState,
    ending: &Booking,
    table: &BookingTable,
    assigned: &HashSet<BookingId>,
) -> Vec<usize> {
    let mut candidates: Vec<usize> = table
        .ascending()
        .into_iter()
        .filter(|&idx| {
            let b = table.booking_at(idx);
            b.id != ending.id
                && !assigned.contains(&b.id)
                && vehicle.class.serves(b.class)
                && b.pickup_minute >= vehicle.available_time
                && b.pickup_minute < ending.pickup_minute
        })
        .collect();

    let mut roll = RollState {
        current: vehicle.current,
        available_time: vehicle.available_time,
        route: vehicle.route.clone(),
    };
    let mut picked = Vec::new();

    while picked.len() < MAX_MIDDLE_BOOKINGS && !candidates.is_empty() {
        let mut best: Option<(usize, f64)> = None; // (position in candidates, delta)

        for (pos, &idx) in candidates.iter().enumerate() {
            let b = table.booking_at(idx);

            let approach = travel_time_min(road_distance_km(roll.current, b.pickup));
            let earliest_arrival = roll.available_time + approach;
            if earliest_arrival > b.pickup_minute + PICKUP_SLACK_MIN {
                continue;
            }

            // The ending must remain reachable after this insertion.
            let ride_start = earliest_arrival.max(b.pickup_minute);
            let booking_end = ride_start + b.travel_time_min + SERVICE_BUFFER_MIN;
            let to_ending = travel_time_min(road_distance_km(b.drop, ending.pickup));
            if booking_end + to_ending > ending.pickup_minute + PICKUP_SLACK_MIN {
                continue;
            }

            let mut hypothetical = roll.route.clone();
            hypothetical.extend([b.pickup, b.drop, ending.pickup, ending.drop]);
            let dead = dead_km_closed(&hypothetical, vehicle.home);
            let active = active_km(&hypothetical, table);
            if dead > active {
                continue;
            }
            let delta = dead - active;
            if best.is_none_or(|(_, d)| delta < d) {
                best = Some((pos, delta));
            }
        }

        let Some((pos, _)) = best else { break };
        let idx = candidates.remove(pos);
        let b = table.booking_at(idx);

        let approach = travel_time_min(road_distance_km(roll.current, b.pickup));
        let ride_start = (roll.available_time + approach).max(b.pickup_minute);
        roll.available_time = ride_start + b.travel_time_min + SERVICE_BUFFER_MIN;
        roll.current = b.drop;
        roll.route.extend([b.pickup, b.drop]);
        picked.push(idx);
    }

    info!(
        vehicle_id = vehicle.id,
        middles = picked.len(),
        "middle selection complete"
    );
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{BookingOrigin, VehicleClass, VehicleSpec};
    use crate::matching::assign_booking;

    const HOME: GeoPoint = (12.97, 77.59);

    fn vehicle(class: VehicleClass) -> VehicleState {
        VehicleState::new(&VehicleSpec {
            id: 1,
            class,
            home: HOME,
        })
    }

    fn booking(
        id: BookingId,
        pickup: GeoPoint,
        drop: GeoPoint,
        minute: f64,
        km: f64,
    ) -> Booking {
        Booking {
            id,
            pickup,
            drop,
            pickup_time: String::new(),
            pickup_minute: minute,
            class: VehicleClass::Class1,
            distance_km: km,
            travel_time_min: 30.0,
            origin: BookingOrigin::Scheduled,
        }
    }

    /// Fresh booking near home, long paid ending returning right to home:
    /// route is efficient and must be accepted.
    #[test]
    fn accepts_an_efficient_home_bound_route() {
        let mut v = vehicle(VehicleClass::Class1);
        let fresh = booking(1, HOME, (13.05, 77.65), 420.0, 12.0);
        // Ending picks up where the fresh drop is and rides back to home.
        let ending = booking(2, (13.05, 77.65), (12.971, 77.591), 1020.0, 12.0);
        let table = BookingTable::new(vec![fresh.clone(), ending.clone()]);

        assign_booking(&mut v, &fresh);
        let mut assigned: HashSet<BookingId> = [1].into();
        let added = complete_route(&mut v, &table, &assigned);
        assigned.extend(added.iter().copied());

        assert_eq!(added, vec![2]);
        assert!(v.is_routed);
        assert_eq!(v.active_km, 24.0);
        assert!(v.efficiency() >= MIN_EFFICIENCY);
    }

    /// A far-flung ending leaves the vehicle with dead km dwarfing active km:
    /// the gate must reject and restore the fresh-only state.
    #[test]
    fn rejects_and_rolls_back_an_inefficient_route() {
        let mut v = vehicle(VehicleClass::Class1);
        let fresh = booking(1, HOME, (12.98, 77.60), 420.0, 1.5);
        // Ending drop within the fallback ceiling but tiny paid distance, so
        // efficiency collapses below the threshold.
        let ending = booking(2, (13.06, 77.68), (13.02, 77.64), 1020.0, 1.0);
        let table = BookingTable::new(vec![fresh.clone(), ending]);

        assign_booking(&mut v, &fresh);
        let before = v.snapshot();
        let assigned: HashSet<BookingId> = [1].into();
        let added = complete_route(&mut v, &table, &assigned);

        assert!(added.is_empty());
        assert!(!v.is_routed);
        assert_eq!(v.assigned_bookings, vec![1]);
        assert_eq!(v.route, before.route);
        assert_eq!(v.available_time, before.available_time);
        assert_eq!(v.dead_km, before.dead_km);
    }

    /// No candidate satisfies the 180-minute gap: the vehicle stays open.
    #[test]
    fn no_ending_keeps_vehicle_unrouted() {
        let mut v = vehicle(VehicleClass::Class1);
        let fresh = booking(1, HOME, (12.98, 77.60), 420.0, 2.0);
        // Pickup only an hour after the fresh booking completes.
        let near_term = booking(2, (12.98, 77.60), (12.971, 77.591), 540.0, 2.0);
        let table = BookingTable::new(vec![fresh.clone(), near_term]);

        assign_booking(&mut v, &fresh);
        let assigned: HashSet<BookingId> = [1].into();
        let added = complete_route(&mut v, &table, &assigned);

        assert!(added.is_empty());
        assert!(!v.is_routed);
        assert_eq!(v.assigned_bookings, vec![1]);
    }

    /// Descending scan: a 1.5km-to-home candidate with the later pickup hits
    /// the ≤3km early-exit before the 2.5km one is ever considered.
    #[test]
    fn excellent_ending_early_exits_the_scan() {
        let mut v = vehicle(VehicleClass::Class1);
        let fresh = booking(1, HOME, (13.05, 77.65), 420.0, 12.0);
        // ~4km from home, earlier pickup: strict-phase material, not excellent.
        let good = booking(2, (13.05, 77.65), (12.995, 77.605), 990.0, 10.0);
        // ~1.5km from home, later pickup: scanned first in descending order.
        let excellent = booking(3, (13.05, 77.65), (12.980, 77.596), 1020.0, 10.0);
        let table = BookingTable::new(vec![fresh.clone(), good, excellent]);

        assign_booking(&mut v, &fresh);
        let assigned: HashSet<BookingId> = [1].into();
        let added = complete_route(&mut v, &table, &assigned);

        assert_eq!(*added.last().expect("ending"), 3);
    }

    /// Middle bookings must not make the ending unreachable.
    #[test]
    fn middles_respect_the_ending_deadline() {
        let mut v = vehicle(VehicleClass::Class1);
        let fresh = booking(1, HOME, (13.05, 77.65), 420.0, 12.0);
        // Candidate middle whose service window collides with the ending pickup.
        let mut late_middle = booking(2, (13.05, 77.65), (13.40, 78.00), 1015.0, 8.0);
        late_middle.travel_time_min = 120.0;
        let ending = booking(3, (13.05, 77.65), (12.971, 77.591), 1020.0, 12.0);
        let table = BookingTable::new(vec![fresh.clone(), late_middle, ending]);

        assign_booking(&mut v, &fresh);
        let assigned: HashSet<BookingId> = [1].into();
        let added = complete_route(&mut v, &table, &assigned);

        assert!(!added.contains(&2), "conflicting middle must be skipped");
        assert_eq!(*added.last().expect("ending"), 3);
    }
}
