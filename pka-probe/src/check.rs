//! Check recording
//!
//! Checks and request latencies are recorded into the hook of the scenario the calling task
//! belongs to. Every virtual user task is spawned inside that scope, so iteration code only ever
//! calls [`check`] and never sees the registry.
use metrics_util::AtomicBucket;
use pka_probe_core::{CheckSummary, LatencySet};
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{error, trace};

/// Record the outcome of a named check for the running scenario.
///
/// Returns `passed` so the call can be used inline.
///
/// # Example
/// ```no_run
/// use pka_probe::check;
///
/// # let status = 200;
/// let ok = check("status was 200", status == 200);
/// ```
pub fn check(name: &str, passed: bool) -> bool {
    if let Ok(hook) = CHECK_HOOK.try_with(|hook| hook.checks.clone()) {
        hook.record(name, passed);

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "pka_probe_checks",
            "check" => name.to_string(),
            "result" => if passed { "pass" } else { "fail" }
        )
        .increment(1);
    } else {
        error!("Check {name:?} recorded outside of a scenario.");
    }
    passed
}

pub(crate) fn record_request(latency: Duration) {
    let _ = CHECK_HOOK.try_with(|hook| {
        hook.requests.fetch_add(1, Ordering::Relaxed);
        hook.latency.push(latency);
    });

    #[cfg(feature = "metrics")]
    {
        metrics::describe_histogram!(
            "pka_probe_http_req_duration",
            metrics::Unit::Seconds,
            "Time spent on a single search request"
        );
        metrics::histogram!("pka_probe_http_req_duration").record(latency.as_secs_f64());
    }

    trace!("Request completed in {latency:?}");
}

#[derive(Debug, Default)]
struct CheckCounter {
    passes: AtomicU64,
    fails: AtomicU64,
}

/// Pass/fail counters keyed by check name.
#[derive(Debug, Default)]
pub(crate) struct CheckRegistry {
    counters: RwLock<BTreeMap<String, Arc<CheckCounter>>>,
}

impl CheckRegistry {
    fn counter(&self, name: &str) -> Arc<CheckCounter> {
        if let Some(counter) = self
            .counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return counter.clone();
        }

        self.counters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    pub fn record(&self, name: &str, passed: bool) {
        let counter = self.counter(name);
        if passed {
            counter.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            counter.fails.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn summaries(&self) -> Vec<CheckSummary> {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, counter)| CheckSummary {
                name: name.clone(),
                passes: counter.passes.load(Ordering::Relaxed),
                fails: counter.fails.load(Ordering::Relaxed),
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub(crate) struct CheckData {
    pub checks: Arc<CheckRegistry>,
    pub requests: Arc<AtomicU64>,
    pub latency: Arc<AtomicBucket<Duration>>,
}

impl CheckData {
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn drain_latencies(&self, set: &mut LatencySet) {
        self.latency.clear_with(|chunk| set.extend(chunk));
    }
}

tokio::task_local! {
    pub(crate) static CHECK_HOOK: CheckData;
}
