//! Telemetry utilities for formatting and emitting page load timings.
//! Kept independent of `HtmlPage`; callers pass in the counters explicitly.
use core::time::Duration;
use log::info;
use serde::Serialize;

/// Wall-clock cost of the load phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTimings {
    pub eager_ms: u64,
    pub lazy_ms: u64,
    /// Sections moved to `loaded` across both phases.
    pub sections_loaded: usize,
}

/// Whole milliseconds, saturating.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn phase_timings_json(timings: &PhaseTimings) -> String {
    serde_json::to_string(timings).unwrap_or_else(|_| String::from("{}"))
}

/// Emit one JSON line on the `telemetry` log target.
pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        info!(target: "telemetry", "{json_line}");
    }
}
