//! Route cost kernel: dead and active kilometres of a waypoint sequence.
//!
//! A route is an alternating pickup/drop waypoint list anchored at the
//! vehicle's home. Dead kilometres cover home-to-first-pickup, each
//! drop-to-next-pickup hop, and (closed form only) last-drop-to-home. Active
//! kilometres come from the advertised booking distances, with a road-distance
//! fallback when no booking matches a pair.

use crate::fleet::BookingTable;
use crate::spatial::{road_distance_km, GeoPoint};

/// Coordinate tolerance when matching a route pair back to a booking.
const MATCH_EPS: f64 = 1e-6;

fn same_point(p: GeoPoint, q: GeoPoint) -> bool {
    p.0 == q.0 && p.1 == q.1
}

fn dead_km(route: &[GeoPoint], home: GeoPoint, include_final_leg: bool) -> f64 {
    if route.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    if !same_point(route[0], home) {
        total += road_distance_km(home, route[0]);
    }
    // Drop of pair i to pickup of pair i+1.
    let mut i = 1;
    while i + 1 < route.len() {
        let (drop, next_pickup) = (route[i], route[i + 1]);
        if !same_point(drop, next_pickup) {
            total += road_distance_km(drop, next_pickup);
        }
        i += 2;
    }
    if include_final_leg {
        let last = route[route.len() - 1];
        if !same_point(last, home) {
            total += road_distance_km(last, home);
        }
    }
    total
}

/// Dead kilometres of a full day route, including the return-home leg.
pub fn dead_km_closed(route: &[GeoPoint], home: GeoPoint) -> f64 {
    dead_km(route, home, true)
}

/// Dead kilometres while the vehicle is still out: the return-home leg is
/// omitted until finalisation adds it exactly once.
pub fn dead_km_open(route: &[GeoPoint], home: GeoPoint) -> f64 {
    dead_km(route, home, false)
}

/// Active kilometres of a route: each pickup/drop pair is matched against the
/// booking table (coordinates within [`MATCH_EPS`]) and contributes the
/// booking's advertised distance; unmatched pairs fall back to the road
/// distance estimate.
pub fn active_km(route: &[GeoPoint], table: &BookingTable) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    while i + 1 < route.len() {
        let (pickup, drop) = (route[i], route[i + 1]);
        let advertised = table.iter().find_map(|b| {
            let matches = (b.pickup.0 - pickup.0).abs() < MATCH_EPS
                && (b.pickup.1 - pickup.1).abs() < MATCH_EPS
                && (b.drop.0 - drop.0).abs() < MATCH_EPS
                && (b.drop.1 - drop.1).abs() < MATCH_EPS;
            matches.then_some(b.distance_km)
        });
        total += advertised.unwrap_or_else(|| road_distance_km(pickup, drop));
        i += 2;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{Booking, BookingOrigin, VehicleClass};

    const HOME: GeoPoint = (12.97, 77.59);
    const P1: GeoPoint = (12.99, 77.61);
    const D1: GeoPoint = (13.01, 77.63);
    const P2: GeoPoint = (13.02, 77.64);
    const D2: GeoPoint = (12.98, 77.60);

    fn booking(id: i64, pickup: GeoPoint, drop: GeoPoint, km: f64) -> Booking {
        Booking {
            id,
            pickup,
            drop,
            pickup_time: String::new(),
            pickup_minute: 420.0,
            class: VehicleClass::Class1,
            distance_km: km,
            travel_time_min: 20.0,
            origin: BookingOrigin::Scheduled,
        }
    }

    #[test]
    fn closed_form_covers_all_three_leg_kinds() {
        let route = vec![P1, D1, P2, D2];
        let expected = road_distance_km(HOME, P1)
            + road_distance_km(D1, P2)
            + road_distance_km(D2, HOME);
        assert!((dead_km_closed(&route, HOME) - expected).abs() < 1e-9);
    }

    #[test]
    fn open_form_omits_the_return_leg() {
        let route = vec![P1, D1, P2, D2];
        let expected = road_distance_km(HOME, P1) + road_distance_km(D1, P2);
        assert!((dead_km_open(&route, HOME) - expected).abs() < 1e-9);
    }

    #[test]
    fn legs_between_identical_points_are_skipped() {
        // Pickup at home, back-to-back drop/pickup at the same spot.
        let route = vec![HOME, D1, D1, D2];
        let expected = road_distance_km(D2, HOME);
        assert!((dead_km_closed(&route, HOME) - expected).abs() < 1e-9);
        assert_eq!(dead_km_open(&route, HOME), 0.0);
    }

    #[test]
    fn empty_and_single_point_routes_cost_nothing() {
        assert_eq!(dead_km_closed(&[], HOME), 0.0);
        assert_eq!(dead_km_closed(&[P1], HOME), 0.0);
    }

    #[test]
    fn active_km_prefers_advertised_distance() {
        let table = BookingTable::new(vec![booking(1, P1, D1, 9.5)]);
        let route = vec![P1, D1];
        assert!((active_km(&route, &table) - 9.5).abs() < 1e-9);
    }

    #[test]
    fn active_km_falls_back_to_road_distance() {
        let table = BookingTable::new(vec![booking(1, P1, D1, 9.5)]);
        let route = vec![P2, D2];
        let expected = road_distance_km(P2, D2);
        assert!((active_km(&route, &table) - expected).abs() < 1e-9);
    }
}
