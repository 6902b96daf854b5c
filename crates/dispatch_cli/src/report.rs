//! Human-readable report tables.
//!
//! Every function here is a pure function of dispatcher/simulator state and
//! the booking table, returning a `String` so the binaries can tee the same
//! text to stdout and the log file and tests can assert on content.

use std::fmt::Write;

use dispatch_core::clock::format_minute;
use dispatch_core::fleet::{BookingId, BookingTable, VehicleState};
use dispatch_core::matching::Dispatcher;
use dispatch_core::metrics::{fleet_metrics, vehicle_fare, FleetMetrics};
use dispatch_core::simulation::{Simulator, TickReport};
use dispatch_core::spatial::road_distance_km;

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn position_label(index: usize, total: usize) -> &'static str {
    match (index, total) {
        (_, 1) => "fresh only",
        (0, _) => "fresh",
        (i, n) if i == n - 1 => "ending",
        _ => "middle",
    }
}

/// Per-vehicle financial and efficiency summary.
pub fn vehicle_summary(title: &str, dispatcher: &Dispatcher, table: &BookingTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule(120));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", rule(120));
    let _ = writeln!(
        out,
        "{:<10} {:<7} {:<9} {:<10} {:<9} {:<13} {:<11} {:<10} {:<10}",
        "Vehicle", "Type", "Bookings", "Active KM", "Dead KM", "Fare", "Pay", "Profit", "Efficiency"
    );
    let _ = writeln!(out, "{}", "-".repeat(120));

    for v in &dispatcher.vehicles {
        if v.assigned_bookings.is_empty() {
            continue;
        }
        let fare = vehicle_fare(v, table);
        let profit = fare - v.total_driver_pay;
        let _ = writeln!(
            out,
            "{:<10} {:<7} {:<9} {:<10.2} {:<9.2} {:<13.2} {:<11.2} {:<10.2} {:<9.1}%",
            v.id,
            v.class.as_str(),
            v.assigned_bookings.len(),
            v.active_km,
            v.dead_km,
            fare,
            v.total_driver_pay,
            profit,
            v.efficiency() * 100.0
        );
    }
    out
}

fn assignment_rows(
    out: &mut String,
    dispatcher: &Dispatcher,
    table: &BookingTable,
    mut annotate: impl FnMut(BookingId) -> String,
) {
    // booking id -> (vehicle, position within its route)
    let placement: Vec<(BookingId, &VehicleState, usize)> = dispatcher
        .vehicles
        .iter()
        .flat_map(|v| {
            v.assigned_bookings
                .iter()
                .enumerate()
                .map(move |(i, &id)| (id, v, i))
        })
        .collect();

    for idx in table.ascending() {
        let b = table.booking_at(idx);
        let row = placement.iter().find(|(id, _, _)| *id == b.id);
        match row {
            Some((_, v, i)) => {
                let _ = writeln!(
                    out,
                    "{:<10} {:<7} {:<9.1} {:<12} {:<10} {:<13} {:<12} {}",
                    b.id,
                    b.class.as_str(),
                    b.distance_km,
                    format_minute(b.pickup_minute),
                    v.id,
                    v.class.as_str(),
                    position_label(*i, v.assigned_bookings.len()),
                    annotate(b.id)
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "{:<10} {:<7} {:<9.1} {:<12} {:<10} {:<13} {:<12} {}",
                    b.id,
                    b.class.as_str(),
                    b.distance_km,
                    format_minute(b.pickup_minute),
                    "UNASSIGNED",
                    "-",
                    "-",
                    annotate(b.id)
                );
            }
        }
    }
}

/// Booking-by-booking assignment table for the batch planner.
pub fn booking_assignments(title: &str, dispatcher: &Dispatcher, table: &BookingTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule(120));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", rule(120));
    let _ = writeln!(
        out,
        "{:<10} {:<7} {:<9} {:<12} {:<10} {:<13} {:<12}",
        "Booking", "Type", "Distance", "Pickup", "Vehicle", "Vehicle Type", "Position"
    );
    let _ = writeln!(out, "{}", "-".repeat(120));
    assignment_rows(&mut out, dispatcher, table, |_| String::new());
    out
}

/// Assignment table for the simulator: adds lock status and booking origin.
pub fn booking_assignments_live(title: &str, sim: &Simulator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule(130));
    let _ = writeln!(out, "{title} (simulated time {})", format_minute(sim.now()));
    let _ = writeln!(out, "{}", rule(130));
    let _ = writeln!(
        out,
        "{:<10} {:<7} {:<9} {:<12} {:<10} {:<13} {:<12} {:<10} {:<9}",
        "Booking", "Type", "Distance", "Pickup", "Vehicle", "Vehicle Type", "Position", "Source", "Lock"
    );
    let _ = writeln!(out, "{}", "-".repeat(130));
    assignment_rows(&mut out, sim.dispatcher(), sim.table(), |id| {
        let source = if sim.is_instant(id) { "instant" } else { "scheduled" };
        let lock = if sim.locked().contains(&id) {
            "LOCKED"
        } else {
            "unlocked"
        };
        format!("{source:<10} {lock:<9}")
    });
    out
}

/// Per-vehicle route narrative with per-leg dead kilometres.
pub fn route_narrative(dispatcher: &Dispatcher, table: &BookingTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule(120));
    let _ = writeln!(out, "VEHICLE ROUTES");
    let _ = writeln!(out, "{}", rule(120));

    for v in &dispatcher.vehicles {
        if v.assigned_bookings.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "\nVehicle {} ({}) home ({:.3}, {:.3}): {} bookings, active {:.1} km, dead {:.1} km, efficiency {:.1}%",
            v.id,
            v.class.as_str(),
            v.home.0,
            v.home.1,
            v.assigned_bookings.len(),
            v.active_km,
            v.dead_km,
            v.efficiency() * 100.0
        );

        let mut from = v.home;
        for (i, id) in v.assigned_bookings.iter().enumerate() {
            let Some(b) = table.get(*id) else { continue };
            let approach = road_distance_km(from, b.pickup);
            let _ = writeln!(
                out,
                "  {}. booking {} at {}: {:.1} km dead to pickup ({:.3}, {:.3}), {:.1} km active to ({:.3}, {:.3})",
                i + 1,
                b.id,
                format_minute(b.pickup_minute),
                approach,
                b.pickup.0,
                b.pickup.1,
                b.distance_km,
                b.drop.0,
                b.drop.1
            );
            from = b.drop;
        }
        let _ = writeln!(
            out,
            "  return home: {:.1} km dead",
            road_distance_km(from, v.home)
        );
    }
    out
}

/// Fleet totals block.
pub fn metrics_summary(title: &str, metrics: &FleetMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== {title} ===");
    let _ = writeln!(out, "Total Customer Fare: {:.2}", metrics.total_customer_fare);
    let _ = writeln!(out, "Total Driver Pay:    {:.2}", metrics.total_driver_pay);
    let _ = writeln!(out, "Total Profit:        {:.2}", metrics.total_profit);
    let _ = writeln!(out, "Total Active KM:     {:.2}", metrics.total_active_km);
    let _ = writeln!(out, "Total Dead KM:       {:.2}", metrics.total_dead_km);
    let _ = writeln!(
        out,
        "Overall Efficiency:  {:.1}%",
        metrics.overall_efficiency * 100.0
    );
    let _ = writeln!(out, "Assigned Bookings:   {}", metrics.assigned_bookings);
    let _ = writeln!(out, "Unassigned Bookings: {}", metrics.unassigned_bookings);
    out
}

/// What changed at a tick: admissions plus per-vehicle assignment deltas.
pub fn tick_changes(report: &TickReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n--- tick {} at {} ---",
        report.tick,
        format_minute(report.sim_minute)
    );
    if !report.admitted.is_empty() {
        let ids: Vec<String> = report.admitted.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(out, "admitted instant bookings: {}", ids.join(", "));
    }
    let _ = writeln!(out, "locked bookings: {}", report.locked_count);
    for change in &report.changes {
        let added: Vec<String> = change.added.iter().map(|id| id.to_string()).collect();
        let removed: Vec<String> = change.removed.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(
            out,
            "vehicle {}: +[{}] -[{}]",
            change.vehicle_id,
            added.join(", "),
            removed.join(", ")
        );
    }
    out
}

/// Shorthand: vehicle summary + assignments + metrics for a batch result.
pub fn batch_report(dispatcher: &Dispatcher, table: &BookingTable) -> String {
    let mut out = String::new();
    out.push_str(&vehicle_summary("VEHICLE SUMMARY", dispatcher, table));
    out.push_str(&booking_assignments(
        "BOOKING ASSIGNMENTS",
        dispatcher,
        table,
    ));
    out.push_str(&route_narrative(dispatcher, table));
    out.push_str(&metrics_summary(
        "ASSIGNMENT RESULTS",
        &fleet_metrics(dispatcher, table),
    ));
    out
}
