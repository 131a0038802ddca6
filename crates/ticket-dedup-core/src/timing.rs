use std::time::{Duration, Instant};

use serde_json::json;

/// Wall-clock duration of one pipeline phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTiming {
    /// Phase name (`scan`, `select`, `prune`).
    pub name: String,
    /// Time spent in the phase.
    pub elapsed: Duration,
}

/// Ordered per-phase timings for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingReport {
    pub phases: Vec<PhaseTiming>,
}

/// Returns true when `TICKET_DEDUP_TIMING` enables the timing report.
///
/// Supported truthy values: `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("TICKET_DEDUP_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(value.as_str()))
}

impl TimingReport {
    /// Run `f`, appending its duration under `name`.
    pub fn time<R>(&mut self, name: &str, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        self.phases.push(PhaseTiming {
            name: name.to_string(),
            elapsed: started.elapsed(),
        });
        result
    }

    /// Sum of all recorded phases.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|p| p.elapsed).sum()
    }

    /// Render the timing report as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let phases = self
            .phases
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "elapsed_us": p.elapsed.as_micros(),
                })
            })
            .collect::<Vec<_>>();

        json!({ "phases": phases, "total_us": self.total().as_micros() })
    }

    /// Render the timing report as a simple table for terminal output.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.phases.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("phase                elapsed\n");
        out.push_str("----------------------------\n");
        for phase in &self.phases {
            out.push_str(&format!(
                "{:<16} {:>11}\n",
                phase.name,
                format_duration(phase.elapsed)
            ));
        }
        out.push_str(&format!(
            "{:<16} {:>11}\n",
            "total",
            format_duration(self.total())
        ));
        out
    }
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
