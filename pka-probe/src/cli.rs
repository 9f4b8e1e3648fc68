//! Command line options for the `pka-probe` binary
use crate::probe::ProbeSettings;
use crate::SEARCH_PKA_EVENT;
use anyhow::Context;
use clap::Parser;
use pka_probe_core::{RunStatistics, ScenarioConfig, DEFAULT_BASE_URL, DEFAULT_QUERY};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "pka-probe",
    version,
    about = "Load probe for the PKA event search endpoint."
)]
pub struct ProbeCli {
    /// Scheme, host and port of the PKA service.
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Value of the `query` field in the request body.
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Number of virtual users.
    #[arg(short('u'), long, default_value_t = 1)]
    pub vus: usize,

    /// Run for this long, e.g. `30s` or `5m`.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Total iterations, shared between all virtual users.
    #[arg(short, long)]
    pub iterations: Option<u64>,

    /// Time in-flight iterations get to finish once the duration has elapsed.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    pub graceful_stop: Duration,

    /// Per-request timeout.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "60s")]
    pub timeout: Duration,

    /// Pause after every iteration.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub think_time: Duration,

    /// Write the run statistics as JSON to this file.
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Exit with status 1 if any check failed or any iteration errored.
    #[arg(long)]
    pub strict: bool,

    /// Serve Prometheus metrics on this address while the probe runs (requires the `metrics`
    /// feature).
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl ProbeCli {
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            base_url: self.base_url.clone(),
            query: self.query.clone(),
            think_time: self.think_time,
            timeout: self.timeout,
        }
    }

    pub fn scenario_config(&self) -> ScenarioConfig {
        let mut config = ScenarioConfig::new(SEARCH_PKA_EVENT);
        config.vus = self.vus;
        config.duration = self.duration;
        config.iterations = self.iterations;
        config.graceful_stop = self.graceful_stop;
        config
    }

    /// Write `stats` to the `--summary-export` file, if one was given.
    pub fn export_summary(&self, stats: &RunStatistics) -> anyhow::Result<()> {
        let Some(path) = &self.summary_export else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(stats)?;
        std::fs::write(path, json)
            .with_context(|| format!("unable to write summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
        Ok(())
    }

    /// Under `--strict`, a run with a failed check or an errored iteration fails the process.
    pub fn exit_code(&self, stats: &RunStatistics) -> ExitCode {
        if self.strict && !stats.clean() {
            warn!("Run was not clean.");
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}
