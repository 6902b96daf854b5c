//! Single-booking commit: the only mutator of vehicle state during planning.

use tracing::info;

use crate::clock::{travel_time_min, SERVICE_BUFFER_MIN};
use crate::fleet::{Booking, VehicleState};
use crate::pricing::{active_pay_rate, dead_pay_rate};
use crate::routing::dead_km_open;
use crate::spatial::{cell_of, road_distance_km};

/// Commit `booking` onto `vehicle`, keeping every vehicle invariant intact:
/// route and assignment lists grow pair-for-pair, the position and hex move to
/// the drop, the availability clock advances through arrival/wait/ride/service,
/// and the kilometre and pay accumulators are refreshed.
pub fn assign_booking(vehicle: &mut VehicleState, booking: &Booking) {
    let approach_km = road_distance_km(vehicle.current, booking.pickup);

    vehicle.route.push(booking.pickup);
    vehicle.route.push(booking.drop);
    vehicle.assigned_bookings.push(booking.id);

    vehicle.current = booking.drop;
    vehicle.hex = cell_of(booking.drop.0, booking.drop.1);

    // Arrive (possibly early, then wait), ride, then the service buffer.
    let arrival = vehicle.available_time + travel_time_min(approach_km);
    let ride_start = arrival.max(booking.pickup_minute);
    vehicle.available_time = ride_start + booking.travel_time_min + SERVICE_BUFFER_MIN;

    vehicle.active_km += booking.distance_km;
    // Open form: the return-home leg is accounted for once, at finalisation.
    vehicle.dead_km = dead_km_open(&vehicle.route, vehicle.home);

    vehicle.total_driver_pay += booking.distance_km * active_pay_rate(vehicle.class)
        + approach_km * dead_pay_rate(vehicle.class);

    info!(
        vehicle_id = vehicle.id,
        booking_id = booking.id,
        approach_km,
        available_until = vehicle.available_time,
        "assigned booking"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{BookingOrigin, VehicleClass, VehicleSpec};
    use crate::routing::dead_km_open;

    const HOME: (f64, f64) = (12.97, 77.59);

    fn vehicle() -> VehicleState {
        VehicleState::new(&VehicleSpec {
            id: 1,
            class: VehicleClass::Class1,
            home: HOME,
        })
    }

    fn booking(id: i64, pickup: (f64, f64), drop: (f64, f64), minute: f64) -> Booking {
        Booking {
            id,
            pickup,
            drop,
            pickup_time: String::new(),
            pickup_minute: minute,
            class: VehicleClass::Class1,
            distance_km: 4.0,
            travel_time_min: 15.0,
            origin: BookingOrigin::Scheduled,
        }
    }

    #[test]
    fn commit_keeps_route_and_accumulators_consistent() {
        let mut v = vehicle();
        let b1 = booking(10, (12.99, 77.61), (13.01, 77.63), 420.0);
        let b2 = booking(11, (13.02, 77.64), (12.98, 77.60), 600.0);

        assign_booking(&mut v, &b1);
        assign_booking(&mut v, &b2);

        assert_eq!(v.route.len(), 2 * v.assigned_bookings.len());
        assert_eq!(v.assigned_bookings, vec![10, 11]);
        assert_eq!(v.current, b2.drop);
        assert_eq!(v.active_km, 8.0);
        let recomputed = dead_km_open(&v.route, v.home);
        assert!((v.dead_km - recomputed).abs() < 1e-9);
        assert_eq!(v.hex, cell_of(b2.drop.0, b2.drop.1));
    }

    #[test]
    fn early_arrival_waits_for_the_pickup_time() {
        let mut v = vehicle();
        // Pickup at the vehicle's own position: zero approach time, so the
        // vehicle waits from 06:00 until the 08:00 pickup.
        let b = booking(10, HOME, (12.98, 77.60), 480.0);
        assign_booking(&mut v, &b);
        assert_eq!(v.available_time, 480.0 + 15.0 + SERVICE_BUFFER_MIN);
    }

    #[test]
    fn late_arrival_starts_on_arrival() {
        let mut v = vehicle();
        v.available_time = 500.0;
        let pickup = (12.99, 77.61);
        let b = booking(10, pickup, (13.01, 77.63), 480.0);

        let approach = travel_time_min(road_distance_km(HOME, pickup));
        assign_booking(&mut v, &b);
        assert!((v.available_time - (500.0 + approach + 15.0 + SERVICE_BUFFER_MIN)).abs() < 1e-9);
    }

    #[test]
    fn availability_clock_never_goes_backwards() {
        let mut v = vehicle();
        let mut last = v.available_time;
        for (i, minute) in [420.0, 430.0, 800.0].iter().enumerate() {
            let b = booking(i as i64, (12.99, 77.61), (13.01, 77.63), *minute);
            assign_booking(&mut v, &b);
            assert!(v.available_time >= last);
            last = v.available_time;
        }
    }

    #[test]
    fn pay_accrues_active_and_approach_legs() {
        let mut v = vehicle();
        let pickup = (12.99, 77.61);
        let approach_km = road_distance_km(HOME, pickup);
        let b = booking(10, pickup, (13.01, 77.63), 420.0);

        assign_booking(&mut v, &b);
        let expected = 4.0 * 16.0 + approach_km * 10.0;
        assert!((v.total_driver_pay - expected).abs() < 1e-9);
    }
}
