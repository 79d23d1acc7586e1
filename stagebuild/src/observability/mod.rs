//! Logging setup and span helpers.
//!
//! The orchestrator only emits `tracing` events; binaries embedding it pick
//! a subscriber with [`init_logging`]. `RUST_LOG` overrides the default
//! filter, e.g. `RUST_LOG=stagebuild=debug`.

use std::time::Instant;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
}

/// Installs a global subscriber.
///
/// Returns false if a subscriber was already installed, in which case the
/// call has no effect.
pub fn init_logging(format: LogFormat, default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
    .is_ok()
}

/// Creates the span a stage's module runs in.
#[must_use]
pub fn stage_span(stage: &str, module: &str, run_id: &str) -> Span {
    tracing::info_span!("stage", stage = stage, module = module, run_id = run_id)
}

/// Measures how long a stage takes.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
    stage: String,
}

impl StageTimer {
    /// Starts timing `stage`.
    #[must_use]
    pub fn start(stage: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            stage: stage.into(),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer and logs the duration.
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        tracing::info!(stage = %self.stage, duration_ms, "Stage finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LogFormat::Compact, "info");
        assert!(!init_logging(LogFormat::Json, "debug"));
    }

    #[test]
    fn test_stage_span() {
        let span = stage_span("synth", "yosys", "0190a4d4");
        let _guard = span.enter();
        tracing::info!("inside stage span");
    }

    #[test]
    fn test_timer() {
        let timer = StageTimer::start("place");
        assert_eq!(timer.stage(), "place");
        assert!(timer.finish() >= 0.0);
    }
}
