#![doc = include_str!("../README.md")]

mod check;
pub mod cli;
mod error;
pub mod probe;
pub mod scenario;
pub(crate) mod vu;

pub use check::check;
pub use error::ProbeError;
pub use pka_probe_core::RunStatistics;
pub use probe::{status_check, ProbeSettings, RequestDescriptor, SearchProbe, SearchQuery};
pub use scenario::{ConfigurableScenario, Scenario};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Name of the event search scenario.
pub const SEARCH_PKA_EVENT: &str = "search_pka_event";

/// A boxed iteration future, as produced by [`search_pka_event`].
pub type BoxedIteration = Pin<Box<dyn Future<Output = Result<(), ProbeError>> + Send>>;

/// The default scenario: every virtual user repeatedly runs [`SearchProbe::iteration`].
///
/// # Example
/// ```no_run
/// use pka_probe::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let stats = pka_probe::search_pka_event(&ProbeSettings::default())?
///         .vus(10)
///         .duration(Duration::from_secs(30))
///         .await?;
///     println!("{stats}");
///     Ok(())
/// }
/// ```
pub fn search_pka_event(
    settings: &ProbeSettings,
) -> Result<Scenario<impl Fn() -> BoxedIteration + Clone + Send + Sync + 'static>, ProbeError> {
    let probe = Arc::new(SearchProbe::new(settings)?);
    let iteration = move || -> BoxedIteration {
        let probe = probe.clone();
        Box::pin(async move { probe.iteration().await })
    };
    Ok(Scenario::new(SEARCH_PKA_EVENT, iteration))
}

pub mod prelude {
    pub use crate::check;
    pub use crate::probe::ProbeSettings;
    pub use crate::scenario::{ConfigurableScenario, Scenario};
    pub use pka_probe_core::{RunStatistics, ScenarioConfig};
}
