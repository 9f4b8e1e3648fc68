use std::time::Duration;

/// Scheme, host and port of the PKA service when none is given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";

/// Path of the event search endpoint, relative to the base URL.
pub const SEARCH_PKA_EVENT_PATH: &str = "/v1/api/search_pka_event";

/// Value sent in the `query` field of every search request.
pub const DEFAULT_QUERY: &str = "woody";

/// Name under which the status check is recorded.
pub const STATUS_CHECK: &str = "status was 200";

/// Pause after every iteration.
pub const DEFAULT_THINK_TIME: Duration = Duration::from_secs(1);

/// Time in-flight iterations get to finish once the duration has elapsed.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval at which the runner logs progress.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
