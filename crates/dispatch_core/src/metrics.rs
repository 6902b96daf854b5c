//! Fleet-level financial and efficiency metrics.
//!
//! Fares are charged at the serving vehicle's class rates (an upgraded booking
//! is priced at the class that actually drove it); profit is fare minus driver
//! pay. All figures are pure functions of dispatcher state and the booking
//! table.

use serde::Serialize;

use crate::fleet::{BookingTable, VehicleState};
use crate::matching::Dispatcher;
use crate::pricing::booking_fare;

/// Aggregated metrics from one planning pass or simulation tick.
#[derive(Debug, Clone, Serialize)]
pub struct FleetMetrics {
    pub total_customer_fare: f64,
    pub total_driver_pay: f64,
    pub total_profit: f64,
    pub total_active_km: f64,
    pub total_dead_km: f64,
    /// Fleet-wide paid share of kilometres, in `[0, 1]`.
    pub overall_efficiency: f64,
    pub assigned_bookings: usize,
    pub unassigned_bookings: usize,
}

/// Customer fare earned by one vehicle across its assigned bookings.
pub fn vehicle_fare(vehicle: &VehicleState, table: &BookingTable) -> f64 {
    vehicle
        .assigned_bookings
        .iter()
        .filter_map(|&id| table.get(id))
        .map(|b| booking_fare(b.distance_km, vehicle.class))
        .sum()
}

/// Roll up fares, pay, kilometres, and efficiency across the fleet.
pub fn fleet_metrics(dispatcher: &Dispatcher, table: &BookingTable) -> FleetMetrics {
    let mut fare = 0.0;
    let mut pay = 0.0;
    let mut active = 0.0;
    let mut dead = 0.0;
    let mut assigned = 0;

    for vehicle in &dispatcher.vehicles {
        if vehicle.assigned_bookings.is_empty() {
            continue;
        }
        fare += vehicle_fare(vehicle, table);
        pay += vehicle.total_driver_pay;
        active += vehicle.active_km;
        dead += vehicle.dead_km;
        assigned += vehicle.assigned_bookings.len();
    }

    let total_km = active + dead;
    FleetMetrics {
        total_customer_fare: fare,
        total_driver_pay: pay,
        total_profit: fare - pay,
        total_active_km: active,
        total_dead_km: dead,
        overall_efficiency: if total_km > 0.0 { active / total_km } else { 0.0 },
        assigned_bookings: assigned,
        unassigned_bookings: dispatcher.unassigned.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{Booking, BookingOrigin, VehicleClass, VehicleSpec};
    use crate::matching::assign_booking;

    const HOME: (f64, f64) = (12.97, 77.59);

    #[test]
    fn fare_uses_the_serving_vehicle_class() {
        let booking = Booking {
            id: 1,
            pickup: HOME,
            drop: (12.98, 77.60),
            pickup_time: String::new(),
            pickup_minute: 480.0,
            class: VehicleClass::Class1,
            distance_km: 10.0,
            travel_time_min: 20.0,
            origin: BookingOrigin::Scheduled,
        };
        let table = BookingTable::new(vec![booking.clone()]);

        // Upgraded onto a class2 vehicle: fare is priced at class2 rates.
        let mut vehicle = crate::fleet::VehicleState::new(&VehicleSpec {
            id: 1,
            class: VehicleClass::Class2,
            home: HOME,
        });
        assign_booking(&mut vehicle, &booking);

        let fare = vehicle_fare(&vehicle, &table);
        assert!((fare - (10.0 + 10.0 * 0.40) * 24.0).abs() < 1e-9);
    }
}
