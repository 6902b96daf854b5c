//! # Ride-Dispatch Core
//!
//! A dispatch engine that assigns a fleet of home-based vehicles to
//! time-stamped passenger bookings while minimising dead (unpaid) kilometres
//! and steering every vehicle back towards its home by end of day.
//!
//! ## Overview
//!
//! - **Spatial search**: H3 expanding-ring lookup of feasible vehicles
//! - **Home-oriented routing**: fresh booking → middle fill → ending near home,
//!   guarded by an efficiency gate
//! - **Batch planner**: assigns a known set of scheduled bookings in
//!   pickup-time order, with a one-class upgrade retry
//! - **Real-time simulator**: tick loop admitting instant bookings, locking
//!   imminent pickups, and re-planning the unlocked residue
//!
//! The engine is single-threaded and deterministic: a seeded RNG drives the
//! only stochastic input (instant-booking load times), and the tick sleep is
//! the only suspension point.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::HashSet;
//! use std::path::Path;
//! use dispatch_core::fleet::{BookingOrigin, BookingTable};
//! use dispatch_core::input::{load_bookings, load_vehicles};
//! use dispatch_core::matching::Dispatcher;
//!
//! let vehicles = load_vehicles(Path::new("data/vehicles.json")).unwrap();
//! let bookings = load_bookings(Path::new("data/bookings.json"), BookingOrigin::Scheduled).unwrap();
//!
//! let table = BookingTable::new(bookings);
//! let mut dispatcher = Dispatcher::new(&vehicles);
//! let summary = dispatcher.plan(&table, &mut HashSet::new());
//! println!("assigned {} bookings", summary.assigned);
//! ```

pub mod clock;
pub mod error;
pub mod fleet;
pub mod input;
pub mod matching;
pub mod metrics;
pub mod pricing;
pub mod routing;
pub mod simulation;
pub mod spatial;
