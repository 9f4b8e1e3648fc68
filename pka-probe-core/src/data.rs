use pdatastructs::tdigest::{TDigest, K1};
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Request latencies observed over a run.
#[derive(Debug, Clone)]
pub struct LatencySet {
    digest: TDigest<K1>,
    count: u64,
    max: Duration,
}

impl Default for LatencySet {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencySet {
    pub fn new() -> Self {
        Self {
            digest: default_tdigest(),
            count: 0,
            max: Duration::ZERO,
        }
    }

    pub fn push(&mut self, latency: Duration) {
        self.digest.insert(latency.as_secs_f64());
        self.count += 1;
        self.max = self.max.max(latency);
    }

    pub fn extend(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.push(*latency);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn quantile(&self, quantile: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }

        // NOTE: TDigest can return NaN on sparse inputs.
        let secs = self.digest.quantile(quantile);
        if secs.is_finite() && secs >= 0. {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
