use axum::{
    debug_handler,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const SEARCH_PKA_EVENT_PATH: &str = "/v1/api/search_pka_event";

/// How the mock answers the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// 200 with an empty `application/octet-stream` body.
    Ok,
    /// Always answer with this status.
    Status(u16),
    /// 200 below the given TPS, 503 above it.
    Limited(u32),
    /// 200 after sleeping this many milliseconds.
    Delay(u64),
    /// 500 with the given probability, 200 otherwise.
    Flaky(f64),
}

impl FromStr for Behavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        let arg = || arg.ok_or_else(|| format!("`{kind}` needs an argument, e.g. `{kind}:100`"));

        match kind {
            "ok" => Ok(Behavior::Ok),
            "status" => arg()?
                .parse()
                .map(Behavior::Status)
                .map_err(|e| format!("invalid status: {e}")),
            "limited" => match arg()?.parse() {
                Ok(0) => Err("TPS limit must be greater than zero".to_string()),
                Ok(tps) => Ok(Behavior::Limited(tps)),
                Err(e) => Err(format!("invalid TPS limit: {e}")),
            },
            "delay" => arg()?
                .parse()
                .map(Behavior::Delay)
                .map_err(|e| format!("invalid delay: {e}")),
            "flaky" => match arg()?.parse::<f64>() {
                Ok(p) if (0.0..=1.0).contains(&p) => Ok(Behavior::Flaky(p)),
                Ok(_) => Err("error probability must be within 0..=1".to_string()),
                Err(e) => Err(format!("invalid error probability: {e}")),
            },
            _ => Err(format!("unknown behavior `{kind}`")),
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Ok => write!(f, "ok"),
            Behavior::Status(code) => write!(f, "status:{code}"),
            Behavior::Limited(tps) => write!(f, "limited:{tps}"),
            Behavior::Delay(ms) => write!(f, "delay:{ms}"),
            Behavior::Flaky(p) => write!(f, "flaky:{p}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// A search request as the mock received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub content_type: Option<String>,
    pub query: String,
}

#[derive(Clone)]
pub struct MockState {
    behavior: Behavior,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockState {
    pub fn new(behavior: Behavior) -> Self {
        let limiter = match behavior {
            Behavior::Limited(tps) => NonZeroU32::new(tps).map(|tps| Arc::new(rate_limiter(tps))),
            _ => None,
        };
        Self {
            behavior,
            limiter,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Every search request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
    }

    async fn respond(&self) -> StatusCode {
        match self.behavior {
            Behavior::Ok => StatusCode::OK,
            Behavior::Status(code) => {
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Behavior::Limited(_) => match self.limiter.as_ref().map(|l| l.check()) {
                Some(Ok(_)) | None => StatusCode::OK,
                Some(Err(_)) => {
                    debug!("MOCK SERVER ___ LIMITED");
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            Behavior::Delay(delay_ms) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                StatusCode::OK
            }
            Behavior::Flaky(p) => {
                if rand::thread_rng().gen_bool(p) {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::OK
                }
            }
        }
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route(SEARCH_PKA_EVENT_PATH, post(search_pka_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, behavior: Behavior) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(MockState::new(behavior))).await?;
    Ok(())
}

/// Serve the mock on an ephemeral local port in the background.
pub async fn spawn(behavior: Behavior) -> anyhow::Result<(SocketAddr, MockState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::new(behavior);
    let app = router(state.clone());

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    Ok((addr, state))
}

#[debug_handler]
pub async fn search_pka_event(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(payload): Json<SearchQuery>,
) -> Response {
    counter!("mock-server.tps").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);

    state.record(RecordedRequest {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: payload.query,
    });

    match state.respond().await {
        status if status == StatusCode::OK => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            Vec::<u8>::new(),
        )
            .into_response(),
        status => status.into_response(),
    }
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        println!("{transactions} TPS");
    }
}
