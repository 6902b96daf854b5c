//! JSON input loaders for the vehicle and booking files.
//!
//! Both booking files use `pickup_lon`/`drop_lon` as the canonical longitude
//! keys; the `_lng` spellings are accepted as aliases. Missing `travel_time`
//! defaults to 30 minutes, missing `distance_km` to zero.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::clock::minutes_from_midnight;
use crate::error::DispatchError;
use crate::fleet::{Booking, BookingOrigin, VehicleClass, VehicleSpec};

/// Default advertised ride duration when the record omits it.
const DEFAULT_TRAVEL_TIME_MIN: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct VehicleRecord {
    vehicle_id: i64,
    vehicle_type: String,
    home_lat: f64,
    home_lng: f64,
}

#[derive(Debug, Deserialize)]
struct BookingRecord {
    booking_id: i64,
    vehicle_type: String,
    pickup_lat: f64,
    #[serde(alias = "pickup_lng")]
    pickup_lon: f64,
    drop_lat: f64,
    #[serde(alias = "drop_lng")]
    drop_lon: f64,
    pickup_time: String,
    #[serde(default)]
    distance_km: f64,
    #[serde(default)]
    travel_time: Option<f64>,
}

/// Load the vehicle fleet from a JSON array.
pub fn load_vehicles(path: &Path) -> Result<Vec<VehicleSpec>, DispatchError> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<VehicleRecord> = serde_json::from_str(&raw)?;
    let specs = records
        .into_iter()
        .map(|r| VehicleSpec {
            id: r.vehicle_id,
            class: VehicleClass::parse(&r.vehicle_type),
            home: (r.home_lat, r.home_lng),
        })
        .collect::<Vec<_>>();
    info!(count = specs.len(), path = %path.display(), "loaded vehicles");
    Ok(specs)
}

/// Load a booking file as `origin`-tagged bookings.
pub fn load_bookings(path: &Path, origin: BookingOrigin) -> Result<Vec<Booking>, DispatchError> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<BookingRecord> = serde_json::from_str(&raw)?;
    let bookings = records
        .into_iter()
        .map(|r| Booking {
            id: r.booking_id,
            pickup: (r.pickup_lat, r.pickup_lon),
            drop: (r.drop_lat, r.drop_lon),
            pickup_minute: minutes_from_midnight(&r.pickup_time),
            pickup_time: r.pickup_time,
            class: VehicleClass::parse(&r.vehicle_type),
            distance_km: r.distance_km,
            travel_time_min: r.travel_time.unwrap_or(DEFAULT_TRAVEL_TIME_MIN),
            origin,
        })
        .collect::<Vec<_>>();
    info!(count = bookings.len(), path = %path.display(), "loaded bookings");
    Ok(bookings)
}
