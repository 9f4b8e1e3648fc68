use crate::check::{CheckData, CHECK_HOOK};
use std::fmt::Display;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Iteration bookkeeping shared by every virtual user of a scenario.
#[derive(Debug, Default)]
pub(crate) struct IterationCounters {
    /// `None` when the number of iterations is bounded only by time.
    remaining: Option<AtomicU64>,
    stopped: AtomicBool,
    completed: AtomicU64,
    errors: AtomicU64,
}

impl IterationCounters {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            remaining: limit.map(AtomicU64::new),
            ..Default::default()
        }
    }

    /// Reserve the next iteration. Returns false once the run is over.
    fn claim(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }

        match &self.remaining {
            Some(remaining) => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok(),
            None => true,
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// The set of virtual user tasks running a single iteration function.
pub(crate) struct VuPool<T> {
    iteration: T,
    tasks: JoinSet<()>,
    counters: Arc<IterationCounters>,
    hook: CheckData,
}

impl<T, F, E> VuPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    pub fn new(iteration: T, counters: Arc<IterationCounters>, hook: CheckData) -> Self {
        Self {
            iteration,
            tasks: JoinSet::new(),
            counters,
            hook,
        }
    }

    pub fn spawn(&mut self, vus: usize) {
        for vu in 1..=vus {
            let iteration = self.iteration.clone();
            let counters = self.counters.clone();

            let vu_fut = async move {
                while counters.claim() {
                    match iteration().await {
                        Ok(()) => {}
                        Err(err) => {
                            warn!("VU {vu}: iteration failed: {err}");
                            counters.errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                trace!("VU {vu} finished");
            };

            self.tasks
                .spawn(CHECK_HOOK.scope(self.hook.clone(), vu_fut).in_current_span());
        }
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the next virtual user to exit. Resolves to `false` once none are left.
    pub async fn join_next(&mut self) -> bool {
        match self.tasks.join_next().await {
            Some(Err(err)) if err.is_panic() => {
                error!("Virtual user panicked: {err}");
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Stop handing out iterations and give in-flight ones `grace` to finish. Returns the number
    /// of virtual users that had to be aborted.
    ///
    /// A virtual user only holds on to its task while inside an iteration, so every aborted
    /// virtual user is exactly one interrupted iteration.
    pub async fn shutdown(mut self, grace: Duration) -> u64 {
        self.counters.stop();
        let deadline = Instant::now() + grace;

        loop {
            match timeout_at(deadline, self.join_next()).await {
                Ok(true) => continue,
                Ok(false) => return 0,
                Err(_) => {
                    debug!("Graceful stop elapsed; aborting {} virtual users.", self.active());
                    self.tasks.abort_all();

                    // Tasks that finished between the deadline and the abort join normally and
                    // are not interrupted.
                    let mut interrupted = 0;
                    while let Some(res) = self.tasks.join_next().await {
                        match res {
                            Err(err) if err.is_cancelled() => interrupted += 1,
                            Err(err) if err.is_panic() => error!("Virtual user panicked: {err}"),
                            _ => {}
                        }
                    }
                    warn!("Graceful stop elapsed; interrupted {interrupted} iterations.");
                    return interrupted;
                }
            }
        }
    }
}
