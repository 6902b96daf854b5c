//! Batch planner entry point: assign the day's scheduled bookings and print
//! the result tables to stdout and the log file.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use dispatch_cli::output::{init_logging, Tee};
use dispatch_cli::report::batch_report;
use dispatch_core::error::DispatchError;
use dispatch_core::fleet::{BookingOrigin, BookingTable};
use dispatch_core::input::{load_bookings, load_vehicles};
use dispatch_core::matching::Dispatcher;

#[derive(Debug, Parser)]
#[command(name = "plan", about = "Batch ride-dispatch planner")]
struct Args {
    /// Vehicle fleet JSON file.
    #[arg(long, default_value = "data/vehicles.json")]
    vehicles: PathBuf,

    /// Scheduled bookings JSON file.
    #[arg(long, default_value = "data/bookings.json")]
    bookings: PathBuf,

    /// Log file mirroring stdout tables and diagnostics.
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,
}

fn run(args: Args) -> Result<(), DispatchError> {
    let log = init_logging(&args.log_file)?;
    let mut tee = Tee::new(log);

    let vehicles = load_vehicles(&args.vehicles)?;
    let bookings = load_bookings(&args.bookings, BookingOrigin::Scheduled)?;
    let table = BookingTable::new(bookings);

    let mut dispatcher = Dispatcher::new(&vehicles);
    let summary = dispatcher.plan(&table, &mut Default::default());
    info!(
        assigned = summary.assigned,
        unassigned = summary.unassigned,
        "batch plan complete"
    );

    tee.emit(&batch_report(&dispatcher, &table));
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}
