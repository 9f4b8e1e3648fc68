//! Scenario logic
use crate::check::CheckData;
use crate::vu::{IterationCounters, VuPool};
use pka_probe_core::{
    ConfigError, LatencySet, LatencySummary, RunStatistics, ScenarioConfig, PROGRESS_INTERVAL,
};
use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

type RunnerFut = Pin<Box<dyn Future<Output = Result<RunStatistics, ConfigError>> + Send>>;

/// Load test scenario
///
/// Drives an iteration function with a number of virtual users until the configured stop
/// condition is met. A `Scenario` is a future; awaiting it runs the load and yields the
/// [`RunStatistics`].
///
/// # Example
/// ```no_run
/// use pka_probe::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let stats = Scenario::new("noop", || async { Ok::<(), std::io::Error>(()) })
///         .vus(10)
///         .duration(Duration::from_secs(30))
///         .await
///         .unwrap();
///     println!("{stats}");
/// }
/// ```
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<RunnerFut>,
    config: ScenarioConfig,
}

impl<T> Scenario<T> {
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
        }
    }

    pub fn with_config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }
}

impl<T, F, E> Future for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    type Output = Result<RunStatistics, ConfigError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.runner_fut.is_none() {
            let func = this.func.clone();
            let config = this.config.clone();
            *this.runner_fut = Some(Box::pin(async move { run_scenario(func, config).await }));
        }

        if let Some(runner) = this.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn vus(self, vus: usize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn iterations(self, iterations: u64) -> Self;
    fn graceful_stop(self, grace: Duration) -> Self;
}

impl<T, F, E> ConfigurableScenario<Result<RunStatistics, ConfigError>> for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    /// Number of virtual users running the iteration concurrently. Defaults to 1.
    fn vus(mut self, vus: usize) -> Self {
        self.config.vus = vus;
        self
    }

    /// Run for the given duration. No iteration starts once it has elapsed.
    ///
    /// # Example
    /// ```no_run
    /// use pka_probe::prelude::*;
    /// use std::time::Duration;
    ///
    /// # async fn run() {
    /// Scenario::new("noop", || async { Ok::<(), std::io::Error>(()) })
    ///     .vus(5)
    ///     .duration(Duration::from_secs(120))
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Total number of iterations, shared between all virtual users.
    fn iterations(mut self, iterations: u64) -> Self {
        self.config.iterations = Some(iterations);
        self
    }

    /// Time in-flight iterations get to finish after the duration elapses.
    fn graceful_stop(mut self, grace: Duration) -> Self {
        self.config.graceful_stop = grace;
        self
    }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F, E>(
    func: T,
    config: ScenarioConfig,
) -> Result<RunStatistics, ConfigError>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    config.validate()?;
    info!("Running {} with config {:?}", config.name, &config);

    let start = Instant::now();
    let deadline = config.duration.map(|d| start + d);

    let hook = CheckData::default();
    let counters = Arc::new(IterationCounters::new(config.iteration_limit()));
    let mut pool = VuPool::new(func, counters.clone(), hook.clone());
    pool.spawn(config.vus);

    let mut progress = interval(PROGRESS_INTERVAL);
    progress.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // NOTE: First tick completes instantly
    progress.tick().await;

    loop {
        tokio::select! {
            more = pool.join_next() => {
                if !more {
                    debug!("All virtual users finished.");
                    break;
                }
            }
            _ = wait_for(deadline) => {
                debug!("Duration elapsed.");
                break;
            }
            _ = progress.tick() => {
                debug!(
                    "elapsed={:?} vus={} iterations={} errors={}",
                    start.elapsed(),
                    pool.active(),
                    counters.completed(),
                    counters.errors()
                );
            }
        }
    }

    let interrupted = pool.shutdown(config.graceful_stop).await;
    let elapsed = start.elapsed();

    let mut latency = LatencySet::new();
    hook.drain_latencies(&mut latency);

    let stats = RunStatistics {
        name: config.name.clone(),
        vus: config.vus,
        elapsed,
        iterations: counters.completed(),
        iteration_errors: counters.errors(),
        interrupted,
        requests: hook.requests(),
        request_latency: LatencySummary::from(&latency),
        checks: hook.checks.summaries(),
    };

    info!("Scenario complete");
    Ok(stats)
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
