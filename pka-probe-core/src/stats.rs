use crate::LatencySet;
use serde::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Pass/fail tally of a single named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            0.
        } else {
            self.passes as f64 / self.total() as f64
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub p99: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub max: Duration,
}

impl From<&LatencySet> for LatencySummary {
    fn from(set: &LatencySet) -> Self {
        Self {
            p50: set.quantile(0.50),
            p90: set.quantile(0.90),
            p95: set.quantile(0.95),
            p99: set.quantile(0.99),
            max: set.max(),
        }
    }
}

/// Statistics for a completed Scenario run.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub name: String,
    pub vus: usize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    /// Iterations that ran to completion, including the errored ones.
    pub iterations: u64,
    pub iteration_errors: u64,
    /// Iterations aborted by the graceful stop. Checks and requests they recorded before the
    /// abort are still counted.
    pub interrupted: u64,
    pub requests: u64,
    pub request_latency: LatencySummary,
    pub checks: Vec<CheckSummary>,
}

impl RunStatistics {
    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn checks_passed(&self) -> bool {
        self.checks.iter().all(|c| c.fails == 0)
    }

    /// True when every check held and no iteration surfaced an error.
    pub fn clean(&self) -> bool {
        self.checks_passed() && self.iteration_errors == 0
    }

    /// Every iteration that was started: completed plus interrupted.
    pub fn started_iterations(&self) -> u64 {
        self.iterations + self.interrupted
    }

    pub fn iteration_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0. {
            self.iterations as f64 / secs
        } else {
            0.
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.name)?;
        writeln!(
            f,
            "  vus={} elapsed={}",
            self.vus,
            humantime::format_duration(round_millis(self.elapsed))
        )?;
        for check in &self.checks {
            let mark = if check.fails == 0 { "ok" } else { "FAIL" };
            writeln!(
                f,
                "  [{mark}] {}: {:.2}% ({} passed, {} failed)",
                check.name,
                check.pass_rate() * 100.,
                check.passes,
                check.fails
            )?;
        }
        writeln!(
            f,
            "  iterations={} ({:.2}/s) errors={} interrupted={} started={}",
            self.iterations,
            self.iteration_rate(),
            self.iteration_errors,
            self.interrupted,
            self.started_iterations()
        )?;
        let l = &self.request_latency;
        write!(
            f,
            "  requests={} p50={:?} p90={:?} p95={:?} p99={:?} max={:?}",
            self.requests, l.p50, l.p90, l.p95, l.p99, l.max
        )
    }
}

fn round_millis(dur: Duration) -> Duration {
    Duration::from_millis(dur.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(checks: Vec<CheckSummary>, iteration_errors: u64) -> RunStatistics {
        RunStatistics {
            name: "search_pka_event".to_string(),
            vus: 2,
            elapsed: Duration::from_secs(4),
            iterations: 8,
            iteration_errors,
            interrupted: 0,
            requests: 8,
            request_latency: LatencySummary::from(&LatencySet::new()),
            checks,
        }
    }

    #[test]
    fn clean_run() {
        let s = stats(
            vec![CheckSummary {
                name: "status was 200".to_string(),
                passes: 8,
                fails: 0,
            }],
            0,
        );
        assert!(s.checks_passed());
        assert!(s.clean());
        assert_eq!(s.iteration_rate(), 2.);
        assert_eq!(s.check("status was 200").map(|c| c.pass_rate()), Some(1.));
        assert!(s.to_string().contains("[ok] status was 200"));
    }

    #[test]
    fn failed_check_is_not_clean() {
        let s = stats(
            vec![CheckSummary {
                name: "status was 200".to_string(),
                passes: 6,
                fails: 2,
            }],
            0,
        );
        assert!(!s.checks_passed());
        assert!(!s.clean());
        assert!(s.to_string().contains("[FAIL] status was 200: 75.00%"));
    }

    #[test]
    fn interrupted_iterations_count_as_started() {
        let mut s = stats(vec![], 0);
        s.interrupted = 2;
        assert_eq!(s.started_iterations(), 10);
        assert!(s.to_string().contains("interrupted=2 started=10"));
        assert!(s.clean());
    }

    #[test]
    fn errored_iterations_are_not_clean() {
        let s = stats(vec![], 1);
        assert!(s.checks_passed());
        assert!(!s.clean());
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let s = stats(vec![], 0);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["elapsed"], 4.0);
        assert_eq!(json["vus"], 2);
        assert_eq!(json["request_latency"]["p99"], 0.0);
    }
}
