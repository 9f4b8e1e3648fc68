//! The event search iteration
use crate::check::{check, record_request};
use crate::error::ProbeError;
use pka_probe_core::{
    DEFAULT_BASE_URL, DEFAULT_QUERY, DEFAULT_REQUEST_TIMEOUT, DEFAULT_THINK_TIME,
    SEARCH_PKA_EVENT_PATH, STATUS_CHECK,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};
use url::Url;

/// JSON body of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Everything needed to issue one search request. Built fresh for every iteration.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    url: Url,
    body: SearchQuery,
}

impl RequestDescriptor {
    pub fn new(url: Url, query: &str) -> Self {
        Self {
            url,
            body: SearchQuery {
                query: query.to_string(),
            },
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        Method::POST
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    pub fn encode_body(&self) -> Result<Vec<u8>, ProbeError> {
        Ok(serde_json::to_vec(&self.body)?)
    }
}

/// Settings for [`SearchProbe`].
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Scheme, host and port of the target. Any path is replaced by the search endpoint's.
    pub base_url: String,
    pub query: String,
    pub think_time: Duration,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            think_time: DEFAULT_THINK_TIME,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// The status check. 200 passes, every other status fails.
pub fn status_check(status: StatusCode) -> bool {
    status == StatusCode::OK
}

/// Sends the event search request and checks its status.
///
/// Holds no per-iteration state: the client is a handle to a shared connection pool, everything
/// else is read-only.
#[derive(Debug, Clone)]
pub struct SearchProbe {
    client: Client,
    url: Url,
    query: String,
    think_time: Duration,
}

impl SearchProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(ProbeError::Client)?;
        let url = Url::parse(&settings.base_url)?.join(SEARCH_PKA_EVENT_PATH)?;

        Ok(Self {
            client,
            url,
            query: settings.query.clone(),
            think_time: settings.think_time,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor::new(self.url.clone(), &self.query)
    }

    /// Issue one request and return the status code. The body is drained but not inspected.
    pub async fn send(&self) -> Result<StatusCode, ProbeError> {
        let descriptor = self.descriptor();
        let body = descriptor.encode_body()?;

        let start = Instant::now();
        let response = self
            .client
            .request(descriptor.method(), descriptor.url().clone())
            .headers(descriptor.headers())
            .body(body)
            .send()
            .await
            .map_err(ProbeError::Transport)?;
        let status = response.status();

        if let Err(err) = response.bytes().await {
            debug!("Unable to read response body: {err}");
        }
        record_request(start.elapsed());

        Ok(status)
    }

    /// One iteration: send, check the status, pause for the think time.
    ///
    /// Transport errors fail the check and are returned after the pause.
    pub async fn iteration(&self) -> Result<(), ProbeError> {
        let outcome = self.send().await;

        let passed = match &outcome {
            Ok(status) => {
                trace!("Search returned {status}");
                status_check(*status)
            }
            Err(_) => false,
        };
        check(STATUS_CHECK, passed);

        tokio::time::sleep(self.think_time).await;

        outcome.map(|_| ())
    }
}
