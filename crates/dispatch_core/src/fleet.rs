//! Fleet data model: vehicle classes, bookings, and mutable vehicle state.
//!
//! Bookings are immutable once admitted. Vehicles carry the running state the
//! planner mutates: position, availability clock, route waypoints, and the
//! active/dead kilometre accumulators. Cross-references between the two are
//! expressed as ids resolved through [`BookingTable`] lookups, never as
//! object pointers.

use std::collections::HashMap;

use h3o::CellIndex;
use tracing::warn;

use crate::clock::START_OF_DAY_MIN;
use crate::spatial::{cell_of, GeoPoint};

pub type BookingId = i64;
pub type VehicleId = i64;

/// Ordered vehicle class ladder, `class1` (economy) through `class9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VehicleClass {
    Class1,
    Class2,
    Class3,
    Class4,
    Class5,
    Class6,
    Class7,
    Class8,
    Class9,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 9] = [
        VehicleClass::Class1,
        VehicleClass::Class2,
        VehicleClass::Class3,
        VehicleClass::Class4,
        VehicleClass::Class5,
        VehicleClass::Class6,
        VehicleClass::Class7,
        VehicleClass::Class8,
        VehicleClass::Class9,
    ];

    /// Parse a `"classN"` tag. Unknown tags degrade to `Class1` with a warning,
    /// matching the rate-table fallback policy.
    pub fn parse(tag: &str) -> VehicleClass {
        let n = tag
            .strip_prefix("class")
            .and_then(|digits| digits.parse::<usize>().ok());
        match n {
            Some(n @ 1..=9) => Self::ALL[n - 1],
            _ => {
                warn!(tag, "unknown vehicle class, falling back to class1");
                VehicleClass::Class1
            }
        }
    }

    /// Zero-based index into the per-class rate tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next class up the ladder, `None` at `class9`.
    pub fn upgrade(self) -> Option<VehicleClass> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Class1 => "class1",
            VehicleClass::Class2 => "class2",
            VehicleClass::Class3 => "class3",
            VehicleClass::Class4 => "class4",
            VehicleClass::Class5 => "class5",
            VehicleClass::Class6 => "class6",
            VehicleClass::Class7 => "class7",
            VehicleClass::Class8 => "class8",
            VehicleClass::Class9 => "class9",
        }
    }

    /// True when a vehicle of class `self` may serve a booking of `booking`
    /// class on the home-oriented extension path: same class or one above.
    pub fn serves(self, booking: VehicleClass) -> bool {
        self == booking || Some(self) == booking.upgrade()
    }
}

/// Where a booking entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOrigin {
    Scheduled,
    Instant,
}

/// A passenger booking, immutable once admitted.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: BookingId,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    /// Raw timestamp string, kept for reporting.
    pub pickup_time: String,
    /// Pickup time reduced to minutes from midnight; all scheduling uses this.
    pub pickup_minute: f64,
    pub class: VehicleClass,
    /// Advertised active distance, authoritative for pay and active-km accounting.
    pub distance_km: f64,
    /// Advertised ride duration in minutes.
    pub travel_time_min: f64,
    pub origin: BookingOrigin,
}

/// Stable booking store with id lookup. Planner passes hold indices into
/// `bookings`; the table itself is never reordered after construction.
#[derive(Debug, Default)]
pub struct BookingTable {
    bookings: Vec<Booking>,
    by_id: HashMap<BookingId, usize>,
}

impl BookingTable {
    pub fn new(bookings: Vec<Booking>) -> Self {
        let by_id = bookings
            .iter()
            .enumerate()
            .map(|(idx, b)| (b.id, idx))
            .collect();
        Self { bookings, by_id }
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.by_id.get(&id).map(|&idx| &self.bookings[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Booking indices sorted ascending by pickup minute (morning to evening).
    pub fn ascending(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.bookings.len()).collect();
        order.sort_by(|&a, &b| {
            self.bookings[a]
                .pickup_minute
                .total_cmp(&self.bookings[b].pickup_minute)
        });
        order
    }

    /// Booking indices sorted descending by pickup minute, the scan order for
    /// ending-booking selection.
    pub fn descending(&self) -> Vec<usize> {
        let mut order = self.ascending();
        order.reverse();
        order
    }

    pub fn booking_at(&self, idx: usize) -> &Booking {
        &self.bookings[idx]
    }
}

/// Immutable vehicle registration data.
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub home: GeoPoint,
}

/// Per-vehicle mutable planning state.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub home: GeoPoint,
    /// Position after the last committed drop; starts at home.
    pub current: GeoPoint,
    /// Minutes from midnight at which the vehicle is free for its next task.
    pub available_time: f64,
    /// Alternating (pickup, drop) waypoints, one pair per assigned booking.
    pub route: Vec<GeoPoint>,
    /// Booking ids in commit order, pair-for-pair with `route`.
    pub assigned_bookings: Vec<BookingId>,
    pub active_km: f64,
    pub dead_km: f64,
    pub total_driver_pay: f64,
    /// Spatial index cell of `current`; `None` when conversion failed.
    pub hex: Option<CellIndex>,
    /// Set once the home-oriented completion has accepted a full route.
    pub is_routed: bool,
}

impl VehicleState {
    pub fn new(spec: &VehicleSpec) -> Self {
        Self {
            id: spec.id,
            class: spec.class,
            home: spec.home,
            current: spec.home,
            available_time: START_OF_DAY_MIN,
            route: Vec::new(),
            assigned_bookings: Vec::new(),
            active_km: 0.0,
            dead_km: 0.0,
            total_driver_pay: 0.0,
            hex: cell_of(spec.home.0, spec.home.1),
            is_routed: false,
        }
    }

    /// Snapshot of every mutable field, for completion rollback.
    pub fn snapshot(&self) -> VehicleState {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: VehicleState) {
        *self = snapshot;
    }

    /// Paid share of total kilometres, in `[0, 1]`. Zero when the vehicle has
    /// not moved.
    pub fn efficiency(&self) -> f64 {
        let total = self.active_km + self.dead_km;
        if total > 0.0 {
            self.active_km / total
        } else {
            0.0
        }
    }
}
