//! Real-time simulator entry point: batch-plan the scheduled day, then run
//! the tick loop admitting instant bookings and re-planning around locked
//! pickups.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use dispatch_cli::output::{init_logging, Tee};
use dispatch_cli::report::{
    booking_assignments_live, metrics_summary, tick_changes, vehicle_summary,
};
use dispatch_core::error::DispatchError;
use dispatch_core::fleet::BookingOrigin;
use dispatch_core::input::{load_bookings, load_vehicles};
use dispatch_core::metrics::fleet_metrics;
use dispatch_core::simulation::{Simulator, SimulatorConfig};

/// Ticks between status reports when nothing changed.
const STATUS_EVERY_TICKS: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Real-time ride-dispatch simulator")]
struct Args {
    /// Vehicle fleet JSON file.
    #[arg(long, default_value = "data/vehicles.json")]
    vehicles: PathBuf,

    /// Scheduled bookings JSON file.
    #[arg(long, default_value = "data/bookings.json")]
    bookings: PathBuf,

    /// Instant bookings JSON file.
    #[arg(long, default_value = "data/instant_bookings.json")]
    instant_bookings: PathBuf,

    /// Log file mirroring stdout tables and diagnostics.
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    /// Seed for instant-booking load-time draws.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated minute at which the day ends.
    #[arg(long, default_value_t = 1200.0)]
    end_minute: f64,

    /// Real seconds slept per tick (0 disables pacing).
    #[arg(long, default_value_t = 6)]
    step_seconds: u64,
}

fn run(args: Args) -> Result<(), DispatchError> {
    let log = init_logging(&args.log_file)?;
    let mut tee = Tee::new(log);

    let vehicles = load_vehicles(&args.vehicles)?;
    let scheduled = load_bookings(&args.bookings, BookingOrigin::Scheduled)?;
    let instants = load_bookings(&args.instant_bookings, BookingOrigin::Instant)?;

    let config = SimulatorConfig::default()
        .with_seed(args.seed)
        .with_end_minute(args.end_minute)
        .with_real_step(Duration::from_secs(args.step_seconds));
    let mut sim = Simulator::new(vehicles, scheduled, instants, config);

    // Committed state of the scheduled day before any ticks run.
    tee.emit(&vehicle_summary(
        "SCHEDULED VEHICLE SUMMARY",
        sim.dispatcher(),
        sim.table(),
    ));
    tee.emit(&booking_assignments_live("SCHEDULED ASSIGNMENTS", &sim));
    tee.emit(&metrics_summary(
        "SCHEDULED METRICS",
        &fleet_metrics(sim.dispatcher(), sim.table()),
    ));

    sim.run(|sim, report| {
        if report.replanned {
            tee.emit(&tick_changes(report));
            tee.emit(&booking_assignments_live(
                &format!("TICK {} ASSIGNMENTS", report.tick),
                sim,
            ));
            tee.emit(&metrics_summary(
                &format!("TICK {} METRICS", report.tick),
                &fleet_metrics(sim.dispatcher(), sim.table()),
            ));
        } else if report.tick % STATUS_EVERY_TICKS == 0 {
            tee.emit(&tick_changes(report));
        }
    });

    tee.emit(&format!(
        "\nInstant bookings admitted: {}\n",
        sim.admitted_count()
    ));
    tee.emit(&vehicle_summary(
        "FINAL VEHICLE SUMMARY",
        sim.dispatcher(),
        sim.table(),
    ));
    tee.emit(&booking_assignments_live("FINAL ASSIGNMENTS", &sim));
    tee.emit(&metrics_summary(
        "FINAL METRICS",
        &fleet_metrics(sim.dispatcher(), sim.table()),
    ));
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}
