//! Logging setup for o3dexport
//!
//! Libraries only emit `tracing` events. Binaries install a subscriber once
//! with [`init_default`] or [`init_with_config`]; `RUST_LOG` overrides the
//! configured filter.

use std::sync::atomic::{AtomicBool, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Filter used when neither `RUST_LOG` nor `-v` says otherwise
pub const DEFAULT_FILTER: &str = "warn,o3dexport=info";

/// Installs the subscriber with [`TracingConfig::default`]. Later calls do nothing.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

pub fn init_with_config(config: TracingConfig) {
    if INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return;
    }

    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let layer = fmt::layer()
        .with_target(config.targets)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    // A host application may own the global subscriber already
    let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
}

/// Subscriber options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// `EnvFilter` directives, e.g. `warn,o3dexport=debug`
    pub filter: String,
    /// Print the module path of each event
    pub targets: bool,
    pub thread_ids: bool,
    /// Print file and line of each event
    pub source_location: bool,
}

impl TracingConfig {
    /// Options for a CLI `-v` count
    pub fn from_verbosity(verbosity: u8) -> Self {
        let filter = match verbosity {
            0 => DEFAULT_FILTER,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            filter: filter.to_string(),
            targets: verbosity >= 2,
            thread_ids: verbosity >= 3,
            source_location: verbosity >= 3,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_verbosity(0)
    }
}

/// Span covering one export phase with its expected unit count
pub fn progress_span(phase: &str, total: usize) -> tracing::Span {
    tracing::info_span!("export", phase = %phase, total = %total)
}
