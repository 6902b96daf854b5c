//! End-to-end planner scenarios over the public API.

use std::collections::HashSet;

use dispatch_core::fleet::{
    Booking, BookingId, BookingOrigin, BookingTable, VehicleClass, VehicleSpec,
};
use dispatch_core::matching::Dispatcher;
use dispatch_core::metrics::fleet_metrics;
use dispatch_core::routing::dead_km_closed;
use dispatch_core::spatial::road_distance_km;

const DEPOT: (f64, f64) = (12.97, 77.59);

fn vehicle(id: i64, class: VehicleClass, home: (f64, f64)) -> VehicleSpec {
    VehicleSpec { id, class, home }
}

fn booking(
    id: BookingId,
    class: VehicleClass,
    pickup: (f64, f64),
    drop: (f64, f64),
    minute: f64,
    km: f64,
    ride_min: f64,
) -> Booking {
    Booking {
        id,
        pickup,
        drop,
        pickup_time: String::new(),
        pickup_minute: minute,
        class,
        distance_km: km,
        travel_time_min: ride_min,
        origin: BookingOrigin::Scheduled,
    }
}

/// One vehicle, one booking starting at its home: the ride is assigned, the
/// active distance is the advertised one, and the only dead kilometres are the
/// finalisation leg from the drop back home.
#[test]
fn single_booking_day_accounts_active_and_return_leg() {
    let drop = (12.98, 77.60);
    let table = BookingTable::new(vec![booking(
        1,
        VehicleClass::Class1,
        DEPOT,
        drop,
        420.0,
        2.0,
        10.0,
    )]);
    let mut dispatcher = Dispatcher::new(&[vehicle(1, VehicleClass::Class1, DEPOT)]);
    let mut assigned = HashSet::new();

    let summary = dispatcher.plan(&table, &mut assigned);

    assert_eq!(summary.assigned, 1);
    assert_eq!(summary.unassigned, 0);
    let v = &dispatcher.vehicles[0];
    assert_eq!(v.assigned_bookings, vec![1]);
    assert_eq!(v.active_km, 2.0);
    assert!(v.is_routed);
    let return_leg = road_distance_km(drop, DEPOT);
    assert!((v.dead_km - return_leg).abs() < 0.02);
}

/// Two identical vehicles, two bookings from the same stand: the nearer (ring
/// zero) vehicle takes each booking in turn and nothing is double-booked.
#[test]
fn two_vehicles_split_two_bookings() {
    let drop = (13.00, 77.60);
    let table = BookingTable::new(vec![
        booking(1, VehicleClass::Class1, DEPOT, drop, 420.0, 4.0, 30.0),
        booking(2, VehicleClass::Class1, DEPOT, drop, 480.0, 4.0, 30.0),
    ]);
    let mut dispatcher = Dispatcher::new(&[
        vehicle(1, VehicleClass::Class1, DEPOT),
        vehicle(2, VehicleClass::Class1, DEPOT),
    ]);
    let mut assigned = HashSet::new();
    dispatcher.plan(&table, &mut assigned);

    let owner_1 = dispatcher.vehicle_of(1).expect("booking 1 assigned");
    let owner_2 = dispatcher.vehicle_of(2).expect("booking 2 assigned");
    assert_ne!(owner_1, owner_2, "bookings must not share a vehicle");

    let mut seen = HashSet::new();
    for v in &dispatcher.vehicles {
        for id in &v.assigned_bookings {
            assert!(seen.insert(*id), "booking {id} appears twice");
        }
    }
}

/// No vehicle of the booking's class exists, but one class up is feasible: the
/// planner upgrades and assigns.
#[test]
fn class_upgrade_places_the_booking_one_class_up() {
    let table = BookingTable::new(vec![booking(
        1,
        VehicleClass::Class1,
        DEPOT,
        (12.98, 77.60),
        420.0,
        2.0,
        10.0,
    )]);
    let mut dispatcher = Dispatcher::new(&[vehicle(9, VehicleClass::Class2, DEPOT)]);
    let mut assigned = HashSet::new();

    let summary = dispatcher.plan(&table, &mut assigned);
    assert_eq!(summary.assigned, 1);
    assert_eq!(dispatcher.vehicle_of(1), Some(9));
}

/// A mixed day: every invariant that survives a full pass must hold, and the
/// running accumulators must agree with a from-scratch recomputation.
#[test]
fn full_pass_preserves_invariants_and_cost_round_trip() {
    let bookings = vec![
        booking(1, VehicleClass::Class1, DEPOT, (13.05, 77.65), 420.0, 12.0, 40.0),
        booking(2, VehicleClass::Class1, (13.05, 77.65), (13.10, 77.70), 540.0, 9.0, 30.0),
        booking(3, VehicleClass::Class1, (13.10, 77.70), (12.975, 77.595), 1020.0, 14.0, 45.0),
        booking(4, VehicleClass::Class2, (12.99, 77.61), (13.02, 77.63), 480.0, 6.0, 25.0),
        booking(5, VehicleClass::Class1, (12.96, 77.58), (12.99, 77.62), 700.0, 5.0, 20.0),
        booking(6, VehicleClass::Class3, DEPOT, (13.00, 77.61), 600.0, 5.5, 25.0),
    ];
    let all_ids: HashSet<BookingId> = bookings.iter().map(|b| b.id).collect();
    let table = BookingTable::new(bookings);

    let mut dispatcher = Dispatcher::new(&[
        vehicle(1, VehicleClass::Class1, DEPOT),
        vehicle(2, VehicleClass::Class1, (12.99, 77.61)),
        vehicle(3, VehicleClass::Class2, (12.96, 77.58)),
    ]);
    let mut assigned = HashSet::new();
    dispatcher.plan(&table, &mut assigned);

    let mut placed = HashSet::new();
    for v in &dispatcher.vehicles {
        // Route shape and accumulator consistency.
        assert_eq!(v.route.len(), 2 * v.assigned_bookings.len());
        let advertised: f64 = v
            .assigned_bookings
            .iter()
            .map(|id| table.get(*id).expect("known booking").distance_km)
            .sum();
        assert!((v.active_km - advertised).abs() < 1e-9);

        if !v.assigned_bookings.is_empty() {
            assert!(v.is_routed, "vehicles with work are finalized");
            // Finalized dead km equals the closed-form recomputation.
            let recomputed = dead_km_closed(&v.route, v.home);
            assert!(
                (v.dead_km - recomputed).abs() < 0.02,
                "vehicle {}: dead {} vs recomputed {recomputed}",
                v.id,
                v.dead_km
            );
        }

        for id in &v.assigned_bookings {
            assert!(placed.insert(*id), "booking {id} double-assigned");
        }
    }

    // Placed plus unassigned partitions the input set.
    let unplaced: HashSet<BookingId> = dispatcher.unassigned.iter().copied().collect();
    assert!(placed.is_disjoint(&unplaced));
    let mut union = placed.clone();
    union.extend(&unplaced);
    assert_eq!(union, all_ids);

    let metrics = fleet_metrics(&dispatcher, &table);
    assert_eq!(
        metrics.assigned_bookings + metrics.unassigned_bookings,
        all_ids.len()
    );
    assert!((metrics.total_profit - (metrics.total_customer_fare - metrics.total_driver_pay)).abs() < 1e-9);
}
