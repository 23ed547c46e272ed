//! Blocking HTTP requests over a shared async client.
//!
//! The batch loop is strictly sequential, so requests are issued from the
//! calling thread through `block_on` on a small shared runtime. Only one
//! request is ever in flight.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout (the per-request timeout is set by the caller)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that prevent a response from being obtained at all.
///
/// A non-2xx status is *not* a `FetchError`: the caller receives the
/// status and body and classifies them itself.
#[derive(Debug)]
pub enum FetchError {
    /// No response within the request timeout
    Timeout,
    /// DNS, connect, TLS or redirect failure
    Connect(String),
    /// Response started but the body could not be read
    Body(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect(message) => write!(f, "connection failed: {message}"),
            Self::Body(message) => write!(f, "failed to read body: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Classify a reqwest error. The request URL is stripped from the
    /// message because it carries the row's target URL in its query.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.without_url().to_string())
        } else {
            Self::Connect(e.without_url().to_string())
        }
    }
}

/// Status and decoded text body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Shared async HTTP client. Redirects are followed (reqwest default policy).
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("sheetfill/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime driving the async client.
static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Send a request and wait for the full body.
///
/// Any status code is returned as `Ok`; only transport-level failures
/// become `Err`.
pub fn send_blocking(request: reqwest::RequestBuilder) -> Result<HttpResponse, FetchError> {
    SHARED_RUNTIME.handle().block_on(async {
        let response = request.send().await.map_err(FetchError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(FetchError::from_reqwest)?;
        Ok(HttpResponse { status, body })
    })
}
