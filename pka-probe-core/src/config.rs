use crate::DEFAULT_GRACEFUL_STOP;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one virtual user is required")]
    ZeroVus,

    #[error("iteration count must be greater than zero")]
    ZeroIterations,

    #[error("duration must be greater than zero")]
    ZeroDuration,
}

/// How a scenario is driven: how many virtual users, and when to stop.
///
/// With neither `duration` nor `iterations` set, a single iteration is run.
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: usize,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
    pub graceful_stop: Duration,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vus: 1,
            duration: None,
            iterations: None,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vus == 0 {
            return Err(ConfigError::ZeroVus);
        }
        if self.iterations == Some(0) {
            return Err(ConfigError::ZeroIterations);
        }
        if self.duration == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(())
    }

    /// Total number of iterations to run across all virtual users, if bounded.
    pub fn iteration_limit(&self) -> Option<u64> {
        match self {
            ScenarioConfig {
                iterations: Some(n),
                ..
            } => Some(*n),
            ScenarioConfig { duration: None, .. } => Some(1),
            _ => None,
        }
    }
}
