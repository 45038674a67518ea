//! Stderr logger for the calibration tools.
//!
//! Prints `[elapsed LEVEL crate] message`. Install once at startup with
//! [`init_for_crates`], or enable the `tracing` feature and call
//! `init_tracing` for span timings of the search stages.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct ElapsedLogger {
    level: LevelFilter,
    started: Instant,
    /// Crates whose records are printed; empty prints every crate.
    crates: Vec<String>,
}

/// Crate part of a log target such as `dotgrid_lens::distortion`.
fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

impl ElapsedLogger {
    fn accepts(&self, target: &str) -> bool {
        let name = crate_of(target);
        self.crates.is_empty() || self.crates.iter().any(|c| c == name)
    }
}

impl Log for ElapsedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && self.accepts(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(
            std::io::stderr(),
            "[{:8.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            crate_of(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<ElapsedLogger> = OnceLock::new();

/// Install the stderr logger, printing only records whose target lies in
/// one of `crates` (for example `dotgrid_lens`). An empty list prints all.
///
/// Only the first call installs the logger; later calls are no-ops.
pub fn init_for_crates(level: LevelFilter, crates: &[String]) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| ElapsedLogger {
        level,
        started: Instant::now(),
        crates: crates.to_vec(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`. Without it, `info`
/// events of `crates` (or of everything, when empty) are shown.
///
/// `json` selects flattened JSON events, otherwise human-readable lines with
/// uptime stamps. Span close events carry the stage durations.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, crates: &[String]) {
    let fallback = if crates.is_empty() {
        "info".to_string()
    } else {
        crates
            .iter()
            .map(|c| format!("{c}=info"))
            .collect::<Vec<_>>()
            .join(",")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(crates: &[&str]) -> ElapsedLogger {
        ElapsedLogger {
            level: LevelFilter::Info,
            started: Instant::now(),
            crates: crates.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn target_is_reduced_to_its_crate() {
        assert_eq!(crate_of("dotgrid_lens::distortion"), "dotgrid_lens");
        assert_eq!(crate_of("dotgrid_calib"), "dotgrid_calib");
    }

    #[test]
    fn crate_list_filters_targets() {
        let all = logger(&[]);
        assert!(all.accepts("image::codecs::png"));

        let ours = logger(&["dotgrid_lens", "dotgrid_calib"]);
        assert!(ours.accepts("dotgrid_lens::overlay"));
        assert!(ours.accepts("dotgrid_calib"));
        assert!(!ours.accepts("dotgrid_lensfoo::x"));
        assert!(!ours.accepts("image::codecs::png"));
    }

    fn meta(level: log::Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn level_and_crate_both_gate_records() {
        let ours = logger(&["dotgrid_graph"]);
        assert!(ours.enabled(&meta(log::Level::Info, "dotgrid_graph::linking")));
        assert!(!ours.enabled(&meta(log::Level::Debug, "dotgrid_graph::linking")));
        assert!(!ours.enabled(&meta(log::Level::Info, "png::decoder")));
    }
}
