//! Logging and stdout/log-file tee.
//!
//! Both binaries write their tables to stdout and mirror them into a log
//! file; `tracing` diagnostics go to stderr and the same file.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use dispatch_core::error::DispatchError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Create the log file and install the tracing subscriber: human-readable
/// output on stderr, the same events (without ANSI colours) appended to the
/// log file. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(log_path: &Path) -> Result<Arc<File>, DispatchError> {
    let log = Arc::new(File::create(log_path)?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(log.clone()))
        .init();

    Ok(log)
}

/// Writes report text to stdout and mirrors it into the shared log file.
pub struct Tee {
    log: Arc<File>,
}

impl Tee {
    pub fn new(log: Arc<File>) -> Self {
        Self { log }
    }

    pub fn emit(&mut self, text: &str) {
        print!("{text}");
        let _ = (&*self.log).write_all(text.as_bytes());
        let _ = (&*self.log).flush();
    }
}
