//! HTTP client for the travel backend: submit a query, probe health, fetch
//! stats, and keep the backend awake with a periodic health ping.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Response, StatusCode, Url};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, KeepAliveRestart};
use crate::error::{ClientError, QueryError};
use crate::keepalive::KeepAlive;
use crate::messages::{BackendStats, ErrorBody, Preferences, QueryRequest, QueryResponse};

pub const QUERY_PATH: &str = "/api/query";
pub const HEALTH_PATH: &str = "/health";
pub const STATS_PATH: &str = "/api/stats";

/// State shared between the client and its keep-alive task.
#[derive(Debug)]
struct Shared {
    http: reqwest::Client,
    base_url: String,
    query_timeout: Duration,
    health_timeout: Duration,
    /// Latest health probe result; `None` until the first probe.
    health: watch::Sender<Option<bool>>,
}

/// Client for the travel backend.
///
/// Calls take `&self` and are independent: concurrent queries share the
/// connection pool but nothing else, and may complete in any order. The
/// keep-alive timer is owned by the client and stops when it is dropped.
#[derive(Debug)]
pub struct BackendClient {
    shared: Arc<Shared>,
    keep_alive_interval: Duration,
    keep_alive_restart: KeepAliveRestart,
    keep_alive: Mutex<Option<KeepAlive>>,
}

impl BackendClient {
    /// Build a client and, if `config.keep_alive_on_start`, arm the keep-alive timer.
    ///
    /// A zero keep-alive interval is rejected even when the timer is not armed
    /// at construction, since `start_keep_alive` may arm it later.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.keep_alive_interval.is_zero() {
            return Err(ClientError::ZeroKeepAliveInterval);
        }
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder().build()?;
        let (health, _) = watch::channel(None);

        let client = Self {
            shared: Arc::new(Shared {
                http,
                base_url,
                query_timeout: config.query_timeout,
                health_timeout: config.health_timeout,
                health,
            }),
            keep_alive_interval: config.keep_alive_interval,
            keep_alive_restart: config.keep_alive_restart,
            keep_alive: Mutex::new(None),
        };

        if config.keep_alive_on_start {
            client.start_keep_alive()?;
        }
        Ok(client)
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.shared.base_url
    }

    /// Send `message` to `POST /api/query`.
    ///
    /// The caller trims and validates `message`. Fails with the server's
    /// `detail` on a non-2xx status, or with a timeout hinting at a cold
    /// backend once the query deadline passes.
    pub async fn submit_query(
        &self,
        message: &str,
        preferences: &Preferences,
    ) -> Result<QueryResponse, QueryError> {
        self.shared.submit_query(message, preferences).await
    }

    /// `GET /health`, reporting the failure kind. Never retried.
    pub async fn probe_health(&self) -> Result<StatusCode, QueryError> {
        self.shared.probe_health().await
    }

    /// True only for a 2xx health response. Never fails.
    pub async fn check_health(&self) -> bool {
        self.shared.check_health().await
    }

    /// `GET /api/stats`.
    pub async fn fetch_stats(&self) -> Result<BackendStats, QueryError> {
        self.shared.fetch_stats().await
    }

    /// Latest health result from [`check_health`](Self::check_health) or the keep-alive.
    pub fn health_status(&self) -> Option<bool> {
        *self.shared.health.borrow()
    }

    /// Watch health results as they are recorded.
    pub fn subscribe_health(&self) -> watch::Receiver<Option<bool>> {
        self.shared.health.subscribe()
    }

    /// Arm the keep-alive timer: one health ping per interval, results only logged.
    ///
    /// If a timer is already running, the configured [`KeepAliveRestart`]
    /// decides between leaving it alone and replacing it.
    pub fn start_keep_alive(&self) -> Result<(), ClientError> {
        let mut slot = self
            .keep_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if slot.as_ref().is_some_and(KeepAlive::is_running)
            && self.keep_alive_restart == KeepAliveRestart::KeepExisting
        {
            debug!("keep-alive already armed");
            return Ok(());
        }

        tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let shared = Arc::clone(&self.shared);
        let keep_alive = KeepAlive::spawn(self.keep_alive_interval, move || {
            let shared = Arc::clone(&shared);
            async move {
                shared.check_health().await;
            }
        });
        if let Some(previous) = slot.replace(keep_alive) {
            previous.stop();
        }

        info!(
            interval_secs = self.keep_alive_interval.as_secs(),
            "keep-alive armed"
        );
        Ok(())
    }

    /// Cancel the keep-alive timer. Returns whether one was armed.
    pub fn stop_keep_alive(&self) -> bool {
        let previous = self
            .keep_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(keep_alive) => {
                keep_alive.stop();
                info!("keep-alive stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_keep_alive_running(&self) -> bool {
        self.keep_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(KeepAlive::is_running)
    }
}

impl Shared {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn submit_query(
        &self,
        message: &str,
        preferences: &Preferences,
    ) -> Result<QueryResponse, QueryError> {
        let url = self.endpoint(QUERY_PATH);
        debug!(%url, language = preferences.language.code(), "submitting query");

        let request = self
            .http
            .post(&url)
            .json(&QueryRequest::new(message, preferences));
        let result = with_deadline(self.query_timeout, async {
            let response = request.send().await.map_err(transport_error)?;
            let response = reject_non_success(response).await?;
            response.json::<QueryResponse>().await.map_err(body_error)
        })
        .await;

        if let Err(e) = &result {
            warn!(error = %e, "query failed");
        }
        result
    }

    async fn probe_health(&self) -> Result<StatusCode, QueryError> {
        let request = self
            .http
            .get(self.endpoint(HEALTH_PATH))
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");
        with_deadline(self.health_timeout, async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if status.is_success() {
                Ok(status)
            } else {
                Err(QueryError::Http {
                    status: status.as_u16(),
                    message: generic_http_message(status),
                })
            }
        })
        .await
    }

    async fn check_health(&self) -> bool {
        let healthy = match self.probe_health().await {
            Ok(status) => {
                debug!(status = status.as_u16(), "backend healthy");
                true
            }
            Err(e) => {
                warn!(error = %e, "health check failed");
                false
            }
        };
        self.health.send_replace(Some(healthy));
        healthy
    }

    async fn fetch_stats(&self) -> Result<BackendStats, QueryError> {
        let request = self.http.get(self.endpoint(STATS_PATH));
        with_deadline(self.health_timeout, async {
            let response = request.send().await.map_err(transport_error)?;
            let response = reject_non_success(response).await?;
            response.json::<BackendStats>().await.map_err(body_error)
        })
        .await
    }
}

/// Run `call` inside its own deadline. Expiry drops the call, which cancels
/// the request and releases its connection.
async fn with_deadline<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, QueryError>>,
) -> Result<T, QueryError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| QueryError::Timeout(limit))?
}

/// Turn a non-2xx response into an error carrying the server's `detail`, if any.
async fn reject_non_success(response: Response) -> Result<Response, QueryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .map(|b| b.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| generic_http_message(status));

    Err(QueryError::Http {
        status: status.as_u16(),
        message,
    })
}

fn generic_http_message(status: StatusCode) -> String {
    format!("HTTP error! status: {}", status.as_u16())
}

fn transport_error(e: reqwest::Error) -> QueryError {
    QueryError::Network(error_chain(&e))
}

fn body_error(e: reqwest::Error) -> QueryError {
    if e.is_decode() {
        QueryError::InvalidBody(error_chain(&e))
    } else {
        transport_error(e)
    }
}

/// `e` followed by each of its sources, so "connection refused" is not lost.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}
